use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    fs::File,
    io::{self, stdin},
    path::PathBuf,
    str::FromStr,
    sync::{
        mpsc::{self, Receiver},
        Arc,
    },
};
use tracing::{info, warn};
use webbrowser::Browser;

use rapidtype::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    export::write_csv,
    logging::init_file_logging,
    runtime::{spawn_terminal_events, AppEvent, IntervalScheduler},
    score::{KvScoreStore, ScoreHistory, ScoreStore},
    session::{Phase, Snapshot},
    settings::{next_duration, parse_duration, Topic},
    storage::SqliteStore,
    trainer::Trainer,
    ui::{
        history::{best_line, relative_time, summary_line, HistoryState},
        screen::{current_screen, AppScreen},
        share_url, View,
    },
    word_source::{ChatWordSource, StaticWordSource, WordSource},
    words::default_words,
};

const PAGE_ROWS: usize = 10;

/// typing speed trainer with themed word lists and score history
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A timed typing trainer. Words come from a built-in list or are generated for a theme by an OpenAI-compatible endpoint, and every finished session is kept in a local score history."
)]
pub struct Cli {
    /// session length in seconds: 15, 30, 60, 120 or 300
    #[clap(short = 'd', long, value_parser = parse_duration)]
    duration: Option<u32>,

    /// word topic: random, a theme such as space or food, or any custom text
    #[clap(short = 't', long, value_parser = Topic::from_str)]
    topic: Option<Topic>,

    /// base url of the OpenAI-compatible API used for themed words
    #[clap(long)]
    endpoint: Option<String>,

    /// model name sent to the word generation endpoint
    #[clap(long)]
    model: Option<String>,

    /// print the score history and exit
    #[clap(long)]
    history: bool,

    /// write the score history as CSV to PATH and exit
    #[clap(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// delete the score history and exit
    #[clap(long)]
    clear_history: bool,
}

impl Cli {
    /// Command line flags win over the saved config.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(duration) = self.duration {
            config.duration_secs = duration;
        }
        if let Some(topic) = &self.topic {
            config.topic = topic.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.generator.endpoint = endpoint.clone();
        }
        if let Some(model) = &self.model {
            config.generator.model = model.clone();
        }
        config.sanitized()
    }

    fn is_history_command(&self) -> bool {
        self.history || self.export.is_some() || self.clear_history
    }
}

pub struct App {
    pub trainer: Trainer,
    pub snapshot: Snapshot,
    snapshots: Receiver<Snapshot>,
    pub show_history: bool,
    pub history_state: HistoryState,
}

impl App {
    pub fn new(mut trainer: Trainer) -> Self {
        let snapshots = trainer.subscribe();
        // subscribing delivers the current state right away
        let snapshot = snapshots.try_recv().unwrap_or_else(|_| trainer.snapshot());
        Self {
            trainer,
            snapshot,
            snapshots,
            show_history: false,
            history_state: HistoryState::default(),
        }
    }

    pub fn screen(&self) -> AppScreen {
        if self.show_history {
            return AppScreen::History;
        }
        match self.snapshot.phase {
            Phase::Finished => AppScreen::Results,
            Phase::Idle | Phase::Playing => AppScreen::Typing,
        }
    }

    /// Picks up the newest snapshot the session has published.
    pub fn refresh(&mut self) {
        if let Some(latest) = self.snapshots.try_iter().last() {
            self.snapshot = latest;
        }
    }

    pub fn handle(&mut self, event: AppEvent) -> bool {
        let keep_running = match event {
            AppEvent::Key(key) => self.on_key(key),
            other => {
                self.trainer.handle_event(other);
                true
            }
        };
        self.refresh();
        keep_running
    }

    /// Returns false when the user asked to quit.
    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return false;
        }

        match self.screen() {
            AppScreen::Typing => match key.code {
                KeyCode::Esc => return false,
                KeyCode::Backspace => {
                    let mut draft = self.snapshot.draft.clone();
                    if draft.pop().is_some() {
                        self.trainer.on_draft(&draft);
                    }
                }
                KeyCode::Char(c) => {
                    let draft = format!("{}{}", self.snapshot.draft, c);
                    self.trainer.on_draft(&draft);
                }
                KeyCode::Tab if self.snapshot.phase == Phase::Idle => {
                    self.trainer
                        .select_duration(next_duration(self.snapshot.duration_secs));
                }
                KeyCode::Up if self.snapshot.phase == Phase::Idle => {
                    self.trainer.select_topic(self.current_topic().previous_preset());
                }
                KeyCode::Down if self.snapshot.phase == Phase::Idle => {
                    self.trainer.select_topic(self.current_topic().next_preset());
                }
                _ => {}
            },
            AppScreen::Results => match key.code {
                KeyCode::Esc => return false,
                KeyCode::Char('r') | KeyCode::Enter => self.trainer.restart(),
                KeyCode::Char('n') => self.trainer.new_words(),
                KeyCode::Char('h') => {
                    self.show_history = true;
                    self.history_state.top();
                }
                KeyCode::Char('t') => self.share(),
                _ => {}
            },
            AppScreen::History => match key.code {
                KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b') => {
                    self.show_history = false;
                }
                KeyCode::Up => self.history_state.scroll_up(1),
                // clamped when rendering
                KeyCode::Down => self.history_state.scroll_down(1),
                KeyCode::PageUp => self.history_state.scroll_up(PAGE_ROWS),
                KeyCode::PageDown => self.history_state.scroll_down(PAGE_ROWS),
                KeyCode::Home => self.history_state.top(),
                _ => {}
            },
        }
        true
    }

    /// The topic being loaded, or the one in play.
    fn current_topic(&self) -> Topic {
        self.trainer
            .loading_topic()
            .cloned()
            .unwrap_or_else(|| self.snapshot.topic.clone())
    }

    fn share(&self) {
        let Some(score) = &self.snapshot.last_score else {
            return;
        };
        if Browser::is_available() {
            let url = share_url(score.wpm, score.accuracy, &score.topic);
            if let Err(e) = webbrowser::open(&url) {
                warn!(error = %e, "could not open browser");
            }
        }
    }

    pub fn render(&mut self, f: &mut Frame) {
        let screen = current_screen(self.screen());
        let view = View {
            snapshot: &self.snapshot,
            history: self.trainer.history(),
            loading: self.trainer.loading_topic(),
        };
        screen.render(&view, &mut self.history_state, f);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.is_history_command() {
        return run_history_command(&cli);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Err(e) = init_file_logging(&AppDirs::log_path()) {
        eprintln!("logging disabled: {e}");
    }

    let config_store = FileConfigStore::new();
    let config = cli.apply(config_store.load());
    info!(
        config = %config_store.path().display(),
        duration = config.duration_secs,
        topic = %config.topic,
        "starting"
    );

    let store = KvScoreStore::new(SqliteStore::open(AppDirs::db_path())?);
    let source: Arc<dyn WordSource> = match ChatWordSource::new(config.generator.clone()) {
        Ok(source) => Arc::new(source),
        Err(e) => {
            warn!(error = %e, "word generation unavailable, using built-in words");
            Arc::new(StaticWordSource::new(default_words()))
        }
    };

    let (tx, rx) = mpsc::channel();
    spawn_terminal_events(tx.clone());
    let trainer = Trainer::new(
        config.duration_secs,
        config.topic.clone(),
        Box::new(store),
        source,
        Box::new(IntervalScheduler),
        tx,
    );
    let mut app = App::new(trainer);

    let result = {
        let mut guard = TerminalGuard::enable()?;
        guard.enter_alternate_screen()?;
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        let result = start_tui(&mut terminal, &mut app, &rx);
        terminal.show_cursor()?;
        result
    };

    let saved = Config {
        duration_secs: app.snapshot.duration_secs,
        topic: app.current_topic(),
        ..config
    };
    if let Err(e) = config_store.save(&saved) {
        warn!(error = %e, "could not save config");
    }

    result
}

/// Leaves the alternate screen and raw mode when dropped, including on
/// early returns.
struct TerminalGuard {
    alternate_screen: bool,
}

impl TerminalGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self {
            alternate_screen: false,
        })
    }

    fn enter_alternate_screen(&mut self) -> io::Result<()> {
        execute!(io::stdout(), EnterAlternateScreen)?;
        self.alternate_screen = true;
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.alternate_screen {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
        let _ = disable_raw_mode();
    }
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    events: &Receiver<AppEvent>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| app.render(f))?;
    loop {
        let event = events.recv()?;
        if !app.handle(event) {
            break;
        }
        terminal.draw(|f| app.render(f))?;
    }
    Ok(())
}

fn run_history_command(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let mut store = KvScoreStore::new(SqliteStore::open(AppDirs::db_path())?);

    if cli.clear_history {
        store.clear()?;
        println!("score history cleared");
        return Ok(());
    }

    let history = ScoreHistory::from_entries(store.load_all());
    if let Some(path) = &cli.export {
        write_csv(history.entries(), File::create(path)?)?;
        println!("exported {} sessions to {}", history.len(), path.display());
    }
    if cli.history {
        print!("{}", format_history(&history));
    }
    Ok(())
}

fn format_history(history: &ScoreHistory) -> String {
    let now = chrono::Local::now();
    let mut out = format!("{}\n", summary_line(history));
    if let Some(best) = best_line(history) {
        out.push_str(&best);
        out.push('\n');
    }
    for entry in history.recent(history.len()) {
        out.push_str(&format!(
            "{:<18} {:<16} {:>4} wpm {:>4}% acc {:>4}s\n",
            relative_time(&entry.timestamp, &now),
            entry.topic,
            entry.wpm,
            entry.accuracy,
            entry.time_spent
        ));
    }
    out
}
