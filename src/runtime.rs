use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};
use tracing::debug;

use crate::error::GenerationError;
use crate::settings::Topic;

/// Identifies one timer; ticks from any other timer are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Identifies one word-generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

/// Answer to a word-generation request.
#[derive(Debug, Clone)]
pub struct WordBatch {
    pub request: RequestId,
    pub topic: Topic,
    pub result: Result<Vec<String>, GenerationError>,
}

/// Everything the event loop reacts to.
#[derive(Debug, Clone)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick(TimerId),
    Words(WordBatch),
}

/// Cancellation token for a running timer. Dropping it cancels the timer.
#[derive(Debug)]
pub struct TickHandle {
    id: TimerId,
    cancelled: Arc<AtomicBool>,
}

impl TickHandle {
    pub fn new(id: TimerId) -> Self {
        Self {
            id,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Shared flag for the thread driving the timer.
    pub fn token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Starts periodic ticks posted to the event channel.
pub trait Scheduler {
    fn start(&self, period: Duration, events: Sender<AppEvent>) -> TickHandle;
}

static NEXT_TIMER: AtomicU64 = AtomicU64::new(1);

fn next_timer_id() -> TimerId {
    TimerId(NEXT_TIMER.fetch_add(1, Ordering::Relaxed))
}

/// One sleeping thread per timer; it exits once cancelled or when the
/// receiver is gone.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalScheduler;

impl Scheduler for IntervalScheduler {
    fn start(&self, period: Duration, events: Sender<AppEvent>) -> TickHandle {
        let handle = TickHandle::new(next_timer_id());
        let id = handle.id();
        let cancelled = handle.token();

        std::thread::spawn(move || loop {
            std::thread::sleep(period);
            if cancelled.load(Ordering::SeqCst) {
                debug!(timer = id.0, "timer thread exiting");
                break;
            }
            if events.send(AppEvent::Tick(id)).is_err() {
                break;
            }
        });

        handle
    }
}

/// Hands out handles without a thread; tests deliver `Tick` events themselves.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    started: Arc<Mutex<Vec<(TimerId, Arc<AtomicBool>)>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently started timer.
    pub fn current(&self) -> Option<TimerId> {
        self.started
            .lock()
            .ok()
            .and_then(|timers| timers.last().map(|(id, _)| *id))
    }

    pub fn started_count(&self) -> usize {
        self.started.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_cancelled(&self, id: TimerId) -> bool {
        self.started
            .lock()
            .ok()
            .and_then(|timers| {
                timers
                    .iter()
                    .find(|(t, _)| *t == id)
                    .map(|(_, flag)| flag.load(Ordering::SeqCst))
            })
            .unwrap_or(false)
    }
}

impl Scheduler for ManualScheduler {
    fn start(&self, _period: Duration, _events: Sender<AppEvent>) -> TickHandle {
        let handle = TickHandle::new(next_timer_id());
        if let Ok(mut timers) = self.started.lock() {
            timers.push((handle.id(), handle.token()));
        }
        handle
    }
}

/// Forwards terminal key presses and resizes to the event channel.
pub fn spawn_terminal_events(events: Sender<AppEvent>) {
    std::thread::spawn(move || loop {
        let forwarded = match event::read() {
            Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => AppEvent::Key(key),
            Ok(CtEvent::Resize(_, _)) => AppEvent::Resize,
            Ok(_) => continue,
            Err(_) => break,
        };
        if events.send(forwarded).is_err() {
            break;
        }
    });
}
