mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use flashword::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    level_pack::LevelPack,
    report::{MemoryReporter, ResultReporter},
    runtime::{until_deadline, Clock, CrosstermEventSource, FixedTicker, HostEvent, MonotonicClock, Runner},
    stats::{ResultStore, StoredResult},
    ExerciseLevel, GridPattern, Phase, SessionConfig, SessionError, SessionEvent,
    SessionStateMachine, SessionSummary,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    cell::RefCell,
    error::Error,
    fs::{self, File, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    rc::Rc,
    sync::Mutex,
    time::Duration,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TICK_RATE_MS: u64 = 50;
const HISTORY_ROWS: usize = 5;

/// Options never shown beyond what the number keys can pick.
const MAX_KEYED_OPTIONS: usize = 9;

/// adaptive speed-reading trainer
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Words flash across a grid; answer which came first or last. Correct answers speed the next run up, mistakes slow it down."
)]
pub struct Cli {
    /// bundled level pack to play
    #[clap(short = 'p', long)]
    pack: Option<String>,

    /// load levels from a JSON level pack file instead of a bundled pack
    #[clap(long)]
    pack_file: Option<PathBuf>,

    /// grid pattern to train on, as COLSxROWS (default: first grid in the pack)
    #[clap(short = 'g', long)]
    grid: Option<GridPattern>,

    /// maximum number of answered questions per session
    #[clap(short = 'a', long)]
    max_attempts: Option<u32>,

    /// seed for word and option shuffling
    #[clap(long)]
    seed: Option<u64>,

    /// skip the "where to look" sweep before the first run
    #[clap(long)]
    no_locator: bool,

    /// print recent results and exit
    #[clap(long)]
    history: bool,

    /// write all stored results as CSV to PATH and exit
    #[clap(long, value_name = "PATH")]
    export_csv: Option<PathBuf>,

    /// list bundled level packs and exit
    #[clap(long)]
    list_packs: bool,

    /// persist the effective settings as the new defaults
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Stored config with this invocation's overrides applied.
    fn effective_config(&self, mut config: Config) -> Config {
        if let Some(pack) = &self.pack {
            config.level_pack = pack.clone();
        }
        if let Some(grid) = self.grid {
            config.grid = Some(grid);
        }
        if let Some(max_attempts) = self.max_attempts {
            config.max_attempts = max_attempts;
        }
        if self.no_locator {
            config.locator_duration_ms = 0;
        }
        config
    }
}

/// What the screen currently shows, folded from session events.
#[derive(Debug, Default)]
pub struct View {
    pub grid: Option<GridPattern>,
    pub word: Option<(usize, String)>,
    pub locator: Option<usize>,
    pub markers: bool,
    pub question: Option<(&'static str, Vec<String>)>,
    pub last_answer: Option<bool>,
    pub summary: Option<SessionSummary>,
    pub no_levels: bool,
}

pub struct App {
    pub machine: SessionStateMachine,
    pub view: View,
    pub pack_name: String,
    pub history: Vec<StoredResult>,
    pub best_speed: Option<u32>,
    store: Option<Rc<RefCell<ResultStore>>>,
}

impl App {
    pub fn new(
        levels: Vec<ExerciseLevel>,
        session: SessionConfig,
        pack_name: String,
        seed: Option<u64>,
    ) -> Self {
        let store = match ResultStore::new() {
            Ok(store) => Some(store),
            Err(err) => {
                warn!("results will not be saved: {err}");
                None
            }
        };
        Self::with_store(levels, session, pack_name, seed, store)
    }

    pub fn with_store(
        levels: Vec<ExerciseLevel>,
        session: SessionConfig,
        pack_name: String,
        seed: Option<u64>,
        store: Option<ResultStore>,
    ) -> Self {
        let store = store.map(|store| Rc::new(RefCell::new(store)));
        let reporter: Box<dyn ResultReporter> = match &store {
            Some(store) => Box::new(store.clone()),
            None => Box::new(MemoryReporter::new()),
        };

        let grid = levels.first().map(|level| level.grid_pattern);
        let mut machine = SessionStateMachine::new(levels, session, reporter);
        if let Some(seed) = seed {
            machine = machine.with_seed(seed);
        }

        Self {
            machine,
            view: View {
                grid,
                ..View::default()
            },
            pack_name,
            history: Vec::new(),
            best_speed: None,
            store,
        }
    }

    pub fn start(&mut self, now_ms: u64) {
        match self.machine.start(now_ms) {
            Ok(events) => self.apply(events),
            Err(SessionError::NoLevelsAvailable) => self.view.no_levels = true,
        }
    }

    pub fn restart(&mut self, now_ms: u64) {
        self.machine.reset();
        self.view = View {
            grid: self.view.grid,
            ..View::default()
        };
        self.start(now_ms);
    }

    /// Answers with the option under number key `key` (1-based).
    pub fn answer(&mut self, key: usize, now_ms: u64) {
        let Some(option) = self
            .view
            .question
            .as_ref()
            .and_then(|(_, options)| options.get(key.checked_sub(1)?))
            .cloned()
        else {
            return;
        };
        let events = self.machine.submit_answer(&option, now_ms);
        self.apply(events);
    }

    pub fn apply(&mut self, events: Vec<SessionEvent>) {
        for event in events {
            match event {
                SessionEvent::PhaseChanged { to, .. } => {
                    self.view.locator = None;
                    self.view.word = None;
                    if to != Phase::Prepare {
                        self.view.markers = false;
                    }
                    if to != Phase::Question {
                        self.view.question = None;
                    }
                }
                SessionEvent::LocatorCue { position } => self.view.locator = Some(position),
                SessionEvent::MarkersShown { grid_pattern, .. } => {
                    self.view.grid = Some(grid_pattern);
                    self.view.markers = true;
                }
                SessionEvent::Stimulus(stimulus) => {
                    self.view.word = Some((stimulus.position, stimulus.word));
                }
                SessionEvent::QuestionAsked { prompt, options } => {
                    let options = options.into_iter().take(MAX_KEYED_OPTIONS).collect();
                    self.view.question = Some((prompt, options));
                }
                SessionEvent::AnswerResolved { correct, .. } => {
                    self.view.last_answer = Some(correct);
                }
                SessionEvent::Finished(summary) => {
                    self.view.summary = Some(summary);
                    self.refresh_history();
                }
            }
        }
    }

    fn refresh_history(&mut self) {
        let Some(store) = &self.store else {
            return;
        };
        let store = store.borrow();
        match store.recent(HISTORY_ROWS) {
            Ok(history) => self.history = history,
            Err(err) => warn!("unable to read history: {err}"),
        }
        if let Some(grid) = self.view.grid {
            match store.best_speed(grid) {
                Ok(best) => self.best_speed = best,
                Err(err) => warn!("unable to read best speed: {err}"),
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    let config_store = FileConfigStore::new();
    let config = cli.effective_config(config_store.load());
    if cli.save_config {
        config_store.save(&config)?;
        println!("saved settings to {}", config_store.path().display());
    }

    if cli.list_packs {
        for name in LevelPack::bundled_names() {
            println!("{name}");
        }
        return Ok(());
    }
    if cli.history {
        return print_history();
    }
    if let Some(path) = &cli.export_csv {
        let written = ResultStore::new()?.export_csv(File::create(path)?)?;
        println!("exported {written} results to {}", path.display());
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let levels = load_levels(&cli, &config);
    let mut session = SessionConfig::from(&config);
    session.option_count = Some(
        session
            .option_count
            .map_or(MAX_KEYED_OPTIONS, |n| n.min(MAX_KEYED_OPTIONS)),
    );

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(levels, session, config.level_pack.clone(), cli.seed);
    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    result
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_env("FLASHWORD_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
}

fn load_levels(cli: &Cli, config: &Config) -> Vec<ExerciseLevel> {
    let pack = match &cli.pack_file {
        Some(path) => LevelPack::from_path(path),
        None => LevelPack::bundled(&config.level_pack),
    };
    let pack = match pack {
        Ok(pack) => pack,
        Err(err) => {
            warn!("no levels loaded: {err}");
            return Vec::new();
        }
    };

    let Some(grid) = config.grid.or_else(|| pack.patterns().first().copied()) else {
        return Vec::new();
    };
    let levels = pack.ladder_levels(grid);
    info!(pack = %pack.name, %grid, levels = levels.len(), "levels loaded");
    levels
}

fn print_history() -> Result<(), Box<dyn Error>> {
    let store = ResultStore::new()?;
    let history = store.recent(20)?;
    if history.is_empty() {
        println!("no sessions recorded yet");
        return Ok(());
    }
    for result in &history {
        let s = &result.summary;
        println!(
            "{}  {:>5}  {:>4} wpm  {:>3}%  {}/{} correct",
            result.finished_at.format("%Y-%m-%d %H:%M"),
            s.grid_pattern.to_string(),
            s.max_speed_achieved,
            s.accuracy_percent,
            s.correct_count,
            s.attempts_used,
        );
    }
    let speeds: Vec<u32> = history.iter().map(|r| r.summary.max_speed_achieved).collect();
    if let Some(avg) = flashword::util::mean_speed(&speeds) {
        println!("average top speed over {} sessions: {avg} wpm", speeds.len());
    }
    Ok(())
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let clock = MonotonicClock::new();
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    app.start(clock.now_ms());

    loop {
        terminal.draw(|f| ui::draw(app, f))?;

        let wait = until_deadline(clock.now_ms(), app.machine.next_deadline());
        if let HostEvent::Key(key) = runner.step_within(wait) {
            match key.code {
                KeyCode::Esc => break,
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
                KeyCode::Char('r') => app.restart(clock.now_ms()),
                KeyCode::Char(c) if c.is_ascii_digit() => {
                    let key = c.to_digit(10).unwrap_or(0) as usize;
                    app.answer(key, clock.now_ms());
                }
                _ => {}
            }
        }

        let events = app.machine.tick(clock.now_ms());
        app.apply(events);
    }

    app.machine.cancel();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashword::QuestionType;

    fn levels() -> Vec<ExerciseLevel> {
        vec![ExerciseLevel {
            level_index: 1,
            words_per_minute: 120,
            grid_pattern: GridPattern::new(2, 2),
            word_sequence: vec!["sol".into(), "luna".into()],
            option_pool: vec!["sol".into(), "luna".into(), "mar".into()],
            question_type: QuestionType::FirstWord,
        }]
    }

    fn quiet() -> SessionConfig {
        SessionConfig {
            locator_duration_ms: 0,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn finished_session_refreshes_history_and_best() {
        let store = ResultStore::open_in_memory().unwrap();
        let mut app = App::with_store(levels(), quiet(), "test".into(), Some(1), Some(store));

        app.start(0);
        let mut now = 0;
        while app.view.question.is_none() {
            now = app.machine.next_deadline().unwrap();
            let events = app.machine.tick(now);
            app.apply(events);
        }

        let correct = app.machine.question().unwrap().correct().to_string();
        let key = app
            .view
            .question
            .as_ref()
            .and_then(|(_, options)| options.iter().position(|o| *o == correct))
            .unwrap()
            + 1;
        app.answer(key, now);

        assert_eq!(app.machine.phase(), Phase::Final);
        assert_eq!(app.history.len(), 1);
        assert_eq!(app.best_speed, Some(120));
    }

    #[test]
    fn no_levels_shows_message() {
        let mut app = App::with_store(vec![], quiet(), "empty".into(), None, None);
        app.start(0);
        assert!(app.view.no_levels);
        assert_eq!(app.machine.phase(), Phase::Ready);
    }

    #[test]
    fn cli_overrides_stored_config() {
        let cli = Cli::parse_from(["flashword", "--grid", "3x3", "-a", "4", "--no-locator"]);
        let config = cli.effective_config(Config::default());
        assert_eq!(config.grid, Some(GridPattern::new(3, 3)));
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.locator_duration_ms, 0);
        assert_eq!(config.level_pack, "standard");
    }
}
