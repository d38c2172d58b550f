//! Owner of a typing session and its collaborators.

use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::runtime::{AppEvent, RequestId, Scheduler, TickHandle, TimerId, WordBatch};
use crate::score::{ScoreHistory, ScoreStore};
use crate::session::{DraftOutcome, Phase, Snapshot, TypingSession};
use crate::settings::{is_valid_duration, Topic};
use crate::word_source::WordSource;
use crate::words::{default_words, resolve_words};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingRequest {
    id: RequestId,
    topic: Topic,
}

/// Wires a [`TypingSession`] to its timer, word source and score store.
///
/// All methods run on the event loop thread. Timer and word generation work
/// happens on other threads and comes back as [`AppEvent`]s.
pub struct Trainer {
    session: TypingSession,
    history: ScoreHistory,
    store: Box<dyn ScoreStore>,
    source: Arc<dyn WordSource>,
    scheduler: Box<dyn Scheduler>,
    events: Sender<AppEvent>,
    timer: Option<TickHandle>,
    pending: Option<PendingRequest>,
    next_request: u64,
}

impl Trainer {
    /// Starts idle with the configured duration and topic. Themed topics
    /// begin with a word request; the session is not startable until it is
    /// answered.
    pub fn new(
        duration_secs: u32,
        topic: Topic,
        store: Box<dyn ScoreStore>,
        source: Arc<dyn WordSource>,
        scheduler: Box<dyn Scheduler>,
        events: Sender<AppEvent>,
    ) -> Self {
        let session = TypingSession::new(duration_secs, Topic::Random, default_words());
        Self::with_session(session, topic, store, source, scheduler, events)
    }

    /// Like [`Trainer::new`] with a caller-built session.
    pub fn with_session(
        session: TypingSession,
        topic: Topic,
        store: Box<dyn ScoreStore>,
        source: Arc<dyn WordSource>,
        scheduler: Box<dyn Scheduler>,
        events: Sender<AppEvent>,
    ) -> Self {
        let history = ScoreHistory::from_entries(store.load_all());
        debug!(entries = history.len(), "loaded score history");
        let mut trainer = Self {
            session,
            history,
            store,
            source,
            scheduler,
            events,
            timer: None,
            pending: None,
            next_request: 0,
        };
        if topic != *trainer.session.topic() {
            trainer.select_topic(topic);
        }
        trainer
    }

    pub fn session(&self) -> &TypingSession {
        &self.session
    }

    pub fn snapshot(&self) -> Snapshot {
        self.session.snapshot()
    }

    pub fn subscribe(&mut self) -> Receiver<Snapshot> {
        self.session.subscribe()
    }

    pub fn history(&self) -> &ScoreHistory {
        &self.history
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    /// Topic of the outstanding word request, if any.
    pub fn loading_topic(&self) -> Option<&Topic> {
        self.pending.as_ref().map(|p| &p.topic)
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Id of the running timer; a cancelled handle counts as no timer.
    pub fn timer_id(&self) -> Option<TimerId> {
        self.timer
            .as_ref()
            .filter(|handle| !handle.is_cancelled())
            .map(TickHandle::id)
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Tick(id) => self.on_tick(id),
            AppEvent::Words(batch) => self.on_words(batch),
            AppEvent::Key(_) | AppEvent::Resize => {}
        }
    }

    /// Forwards a draft change. Refused while new words are loading so a
    /// game cannot start on a stream that is about to be replaced.
    pub fn on_draft(&mut self, text: &str) -> DraftOutcome {
        if self.session.phase() == Phase::Idle && self.is_loading() {
            debug!("draft ignored while words are loading");
            return DraftOutcome::Ignored;
        }
        let was_idle = self.session.phase() == Phase::Idle;
        let outcome = self.session.submit_draft(text);
        if was_idle && self.session.phase() == Phase::Playing {
            self.start_timer();
        }
        outcome
    }

    fn start_timer(&mut self) {
        let handle = self.scheduler.start(TICK_PERIOD, self.events.clone());
        debug!(timer = handle.id().0, "timer started");
        // replacing drops, and so cancels, any previous handle
        self.timer = Some(handle);
    }

    fn stop_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            debug!(timer = handle.id().0, "timer stopped");
            handle.cancel();
        }
    }

    pub fn on_tick(&mut self, id: TimerId) {
        if self.timer_id() != Some(id) {
            debug!(timer = id.0, "stale tick ignored");
            return;
        }
        if let Some(entry) = self.session.tick() {
            self.stop_timer();
            if let Err(e) = self.store.append(entry.clone()) {
                warn!(error = %e, "could not persist score");
            }
            self.history.push(entry);
        }
    }

    /// Applies the answer to the outstanding request; anything else is stale.
    pub fn on_words(&mut self, batch: WordBatch) {
        let current = matches!(&self.pending, Some(p) if p.id == batch.request);
        if !current {
            debug!(request = batch.request.0, topic = %batch.topic, "superseded word batch discarded");
            return;
        }
        self.pending = None;
        if self.session.phase() == Phase::Playing {
            warn!("word batch arrived mid-game, discarded");
            return;
        }
        let words = resolve_words(batch.result);
        info!(topic = %batch.topic, words = words.len(), "word list applied");
        let duration = self.session.duration_secs();
        if let Err(e) = self.session.reconfigure(duration, batch.topic, words) {
            warn!(error = %e, "could not apply word list");
        }
    }

    /// Changes the topic outside of a game. Themed topics go through the word
    /// source; the previous request, if any, is superseded.
    pub fn select_topic(&mut self, topic: Topic) {
        if self.session.phase() == Phase::Playing {
            return;
        }
        if !topic.needs_generation() {
            self.pending = None;
            let duration = self.session.duration_secs();
            if let Err(e) = self.session.reconfigure(duration, topic, default_words()) {
                warn!(error = %e, "could not switch topic");
            }
            return;
        }
        self.request_words(topic);
    }

    fn request_words(&mut self, topic: Topic) {
        self.next_request += 1;
        let id = RequestId(self.next_request);
        self.pending = Some(PendingRequest {
            id,
            topic: topic.clone(),
        });
        debug!(request = id.0, topic = %topic, "requesting words");

        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        std::thread::spawn(move || {
            let result = source.generate(&topic.to_string());
            let _ = events.send(AppEvent::Words(WordBatch {
                request: id,
                topic,
                result,
            }));
        });
    }

    pub fn select_duration(&mut self, duration_secs: u32) {
        if self.session.phase() == Phase::Playing || !is_valid_duration(duration_secs) {
            return;
        }
        let topic = self.session.topic().clone();
        let words = self.session.base_words().to_vec();
        if let Err(e) = self.session.reconfigure(duration_secs, topic, words) {
            warn!(error = %e, "could not change duration");
        }
    }

    /// Same words, reshuffled.
    pub fn restart(&mut self) {
        if self.session.phase() == Phase::Playing {
            return;
        }
        if let Err(e) = self.session.reset() {
            warn!(error = %e, "could not restart session");
        }
    }

    /// Fresh words for the current topic.
    pub fn new_words(&mut self) {
        let topic = self.session.topic().clone();
        if topic.needs_generation() {
            self.select_topic(topic);
        } else {
            self.restart();
        }
    }

    pub fn clear_history(&mut self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "could not clear score history");
            return;
        }
        self.history.clear();
    }
}

impl Drop for Trainer {
    fn drop(&mut self) {
        self.stop_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ManualScheduler;
    use crate::score::KvScoreStore;
    use crate::settings::Theme;
    use crate::storage::MemoryStore;
    use crate::word_source::StaticWordSource;
    use std::sync::mpsc;

    struct Harness {
        trainer: Trainer,
        scheduler: ManualScheduler,
        rx: Receiver<AppEvent>,
    }

    fn harness(topic: Topic) -> Harness {
        let (tx, rx) = mpsc::channel();
        let scheduler = ManualScheduler::new();
        let session = TypingSession::with_seed(15, Topic::Random, vec!["the".into()], 3);
        let trainer = Trainer::with_session(
            session,
            topic,
            Box::new(KvScoreStore::new(MemoryStore::new())),
            Arc::new(StaticWordSource::new(["comet", "orbit"])),
            Box::new(scheduler.clone()),
            tx,
        );
        Harness {
            trainer,
            scheduler,
            rx,
        }
    }

    fn next_words(rx: &Receiver<AppEvent>) -> WordBatch {
        match rx.recv_timeout(Duration::from_secs(5)) {
            Ok(AppEvent::Words(batch)) => batch,
            other => panic!("expected words, got {:?}", other),
        }
    }

    #[test]
    fn test_first_keystroke_starts_the_timer() {
        let mut h = harness(Topic::Random);
        assert!(h.trainer.timer_id().is_none());
        h.trainer.on_draft("t");
        assert_eq!(h.trainer.phase(), Phase::Playing);
        assert_eq!(h.trainer.timer_id(), h.scheduler.current());
        assert_eq!(h.scheduler.started_count(), 1);

        h.trainer.on_draft("th");
        assert_eq!(h.scheduler.started_count(), 1);
    }

    #[test]
    fn test_finishing_cancels_timer_and_records_history() {
        let mut h = harness(Topic::Random);
        h.trainer.on_draft("the ");
        let timer = h.trainer.timer_id().unwrap();
        for _ in 0..15 {
            h.trainer.on_tick(timer);
        }

        assert_eq!(h.trainer.phase(), Phase::Finished);
        assert!(h.trainer.timer_id().is_none());
        assert!(h.scheduler.is_cancelled(timer));
        assert_eq!(h.trainer.history().len(), 1);
        assert_eq!(h.trainer.history().latest().unwrap().wpm, 4);
    }

    #[test]
    fn test_stale_ticks_are_ignored() {
        let mut h = harness(Topic::Random);
        h.trainer.on_draft("t");
        h.trainer.on_tick(TimerId(u64::MAX));
        assert_eq!(h.trainer.session().remaining_secs(), 15);
    }

    #[test]
    fn test_themed_topic_loads_words_before_play() {
        let mut h = harness(Topic::Preset(Theme::Space));
        assert!(h.trainer.is_loading());
        assert_eq!(h.trainer.on_draft("c"), DraftOutcome::Ignored);
        assert_eq!(h.trainer.phase(), Phase::Idle);

        let batch = next_words(&h.rx);
        h.trainer.on_words(batch);

        assert!(!h.trainer.is_loading());
        assert_eq!(h.trainer.session().topic(), &Topic::Preset(Theme::Space));
        let mut base = h.trainer.session().base_words().to_vec();
        base.sort();
        assert_eq!(base, vec!["comet", "orbit"]);
    }

    #[test]
    fn test_superseded_request_is_discarded() {
        let mut h = harness(Topic::Random);
        h.trainer.select_topic(Topic::Preset(Theme::Food));
        let first = next_words(&h.rx);
        h.trainer.select_topic(Topic::Custom("boats".into()));
        let second = next_words(&h.rx);

        h.trainer.on_words(first);
        assert!(h.trainer.is_loading());
        assert_eq!(h.trainer.session().topic(), &Topic::Random);

        h.trainer.on_words(second);
        assert_eq!(h.trainer.session().topic(), &Topic::Custom("boats".into()));
    }

    #[test]
    fn test_switching_back_to_random_drops_pending_request() {
        let mut h = harness(Topic::Preset(Theme::Music));
        h.trainer.select_topic(Topic::Random);
        assert!(!h.trainer.is_loading());

        let late = next_words(&h.rx);
        h.trainer.on_words(late);
        assert_eq!(h.trainer.session().topic(), &Topic::Random);
    }

    #[test]
    fn test_failed_generation_falls_back_to_default_words() {
        let (tx, rx) = mpsc::channel();
        let mut trainer = Trainer::new(
            30,
            Topic::Custom("anything".into()),
            Box::new(KvScoreStore::new(MemoryStore::new())),
            Arc::new(StaticWordSource::default()),
            Box::new(ManualScheduler::new()),
            tx,
        );
        let batch = next_words(&rx);
        assert!(batch.result.is_err());
        trainer.on_words(batch);

        assert_eq!(trainer.session().base_words(), default_words().as_slice());
        assert_eq!(trainer.phase(), Phase::Idle);
        assert_eq!(trainer.on_draft("x"), DraftOutcome::Updated);
    }

    #[test]
    fn test_duration_changes_only_outside_play() {
        let mut h = harness(Topic::Random);
        h.trainer.select_duration(60);
        assert_eq!(h.trainer.session().remaining_secs(), 60);
        h.trainer.select_duration(45);
        assert_eq!(h.trainer.session().duration_secs(), 60);

        h.trainer.on_draft("t");
        h.trainer.select_duration(15);
        assert_eq!(h.trainer.session().duration_secs(), 60);
    }

    #[test]
    fn test_clear_history_empties_store_and_view() {
        let mut h = harness(Topic::Random);
        h.trainer.on_draft("the ");
        let timer = h.trainer.timer_id().unwrap();
        for _ in 0..15 {
            h.trainer.on_tick(timer);
        }
        h.trainer.clear_history();
        assert!(h.trainer.history().is_empty());
    }

    #[test]
    fn test_dropping_the_trainer_cancels_the_timer() {
        let mut h = harness(Topic::Random);
        h.trainer.on_draft("t");
        let timer = h.trainer.timer_id().unwrap();
        drop(h.trainer);
        assert!(h.scheduler.is_cancelled(timer));
    }
}
