mod ui;

use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
        MouseEvent,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use flick::{
    app_dirs::AppDirs,
    arena::{Arena, Pointer},
    clock::MonotonicClock,
    config::{Config, ConfigStore, FileConfigStore},
    history::{HistoryDb, HistoryEntry, ModeSummary},
    kinematics::Movement,
    runtime::{AimEvent, CrosstermEventSource, FixedTicker, Runner},
    session::{AimSession, ConfigOverrides, GameConfig, GameMode, GameState},
    sound::TerminalBell,
    spawn::Spawner,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    Frame, Terminal,
};
use std::{
    error::Error,
    fs::{File, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use webbrowser::Browser;

/// Runs listed on the history screen.
const HISTORY_LIMIT: usize = 50;

const DURATION_STEP: f64 = 5.0;
const DURATION_RANGE: (f64, f64) = (5.0, 300.0);
const TARGET_COUNT_STEP: u32 = 5;
const TARGET_COUNT_RANGE: (u32, u32) = (5, 200);
const DISMISS_CHOICES: [f64; 6] = [0.0, 0.75, 1.0, 1.5, 2.0, 3.0];
const SIZE_CHOICES: [f64; 5] = [15.0, 20.0, 30.0, 40.0, 50.0];

/// terminal aim trainer with moving targets and run history
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal aim trainer: click targets with the mouse in Time Attack or Precision mode, with static, linear or bouncing targets, and keep a local history of every run."
)]
pub struct Cli {
    /// game mode
    #[clap(short = 'm', long, value_enum)]
    mode: Option<CliMode>,

    /// seconds per Time Attack run
    #[clap(short = 'd', long)]
    duration: Option<f64>,

    /// hits needed to finish a Precision run
    #[clap(short = 't', long)]
    targets: Option<u32>,

    /// how targets move
    #[clap(short = 'v', long, value_enum)]
    movement: Option<CliMovement>,

    /// seconds before an untouched target disappears (0 = never)
    #[clap(long)]
    dismiss: Option<f64>,

    /// target radius in game units (one terminal column is 8 units wide)
    #[clap(short = 'z', long)]
    size: Option<f64>,

    /// seed target placement for reproducible runs
    #[clap(long)]
    seed: Option<u64>,

    /// silence the terminal bell
    #[clap(long)]
    mute: bool,

    /// bell volume between 0 and 1
    #[clap(long)]
    volume: Option<f64>,

    /// print recent runs and exit
    #[clap(long)]
    history: bool,

    /// write the run history as CSV to PATH and exit
    #[clap(long, value_name = "PATH")]
    export: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, ValueEnum, strum_macros::Display)]
pub enum CliMode {
    TimeAttack,
    Precision,
}

impl From<CliMode> for GameMode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::TimeAttack => GameMode::TimeAttack,
            CliMode::Precision => GameMode::Precision,
        }
    }
}

#[derive(Debug, Copy, Clone, ValueEnum, strum_macros::Display)]
pub enum CliMovement {
    Static,
    Linear,
    Bounce,
}

impl From<CliMovement> for Movement {
    fn from(movement: CliMovement) -> Self {
        match movement {
            CliMovement::Static => Movement::Static,
            CliMovement::Linear => Movement::Linear,
            CliMovement::Bounce => Movement::Bounce,
        }
    }
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            mode: self.mode.map(Into::into),
            duration: self.duration,
            target_count: self.targets,
            movement: self.movement.map(Into::into),
            auto_dismiss_time: self.dismiss,
            target_size: self.size,
        }
    }

    /// Sound preferences with command-line flags taking precedence.
    fn sound_prefs(&self, prefs: &Config) -> (f64, bool) {
        (
            self.volume.unwrap_or(prefs.volume).clamp(0.0, 1.0),
            self.mute || prefs.muted,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Menu,
    Playing,
    Results,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug)]
pub struct HistoryState {
    pub scroll_offset: usize,
    pub entries: Vec<HistoryEntry>,
    pub summaries: Vec<(GameMode, ModeSummary)>,
    pub return_to: AppState,
}

impl Default for HistoryState {
    fn default() -> Self {
        Self {
            scroll_offset: 0,
            entries: Vec::new(),
            summaries: Vec::new(),
            return_to: AppState::Menu,
        }
    }
}

pub struct App {
    pub session: AimSession,
    pub state: AppState,
    /// Settings the next run starts with.
    pub selection: GameConfig,
    pub prefs: Config,
    pub arena: Arena,
    pub history: Option<HistoryDb>,
    pub history_state: HistoryState,
    pub last_saved: Option<i64>,
    pub best: Option<ModeSummary>,
    /// Consecutive days played, up to today.
    pub streak: u32,
    pub notice: Option<String>,
    store: Box<dyn ConfigStore>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("session", &self.session)
            .field("state", &self.state)
            .field("selection", &self.selection)
            .finish()
    }
}

impl App {
    pub fn new(
        prefs: Config,
        selection: GameConfig,
        session: AimSession,
        history: Option<HistoryDb>,
        store: Box<dyn ConfigStore>,
    ) -> Self {
        let mut app = Self {
            session,
            state: AppState::Menu,
            selection,
            prefs,
            arena: Arena::default(),
            history,
            history_state: HistoryState::default(),
            last_saved: None,
            best: None,
            streak: 0,
            notice: None,
            store,
        };
        app.refresh_streak();
        app
    }

    fn from_cli(cli: &Cli) -> Self {
        let store = FileConfigStore::new();
        let prefs = store.load();
        let selection = cli.overrides().apply(&prefs.game_config());
        if let Err(e) = selection.validate() {
            Cli::command().error(ErrorKind::ValueValidation, e).exit();
        }

        let (volume, muted) = cli.sound_prefs(&prefs);
        let spawner = cli.seed.map_or_else(Spawner::from_entropy, Spawner::seeded);
        let mut session = AimSession::new(
            selection.clone(),
            MonotonicClock::new(),
            TerminalBell::new(io::stdout()),
            spawner,
        );
        session.set_sound_volume(volume);
        session.set_sound_muted(muted);

        let history = match HistoryDb::new() {
            Ok(db) => Some(db),
            Err(e) => {
                warn!(error = %e, "history unavailable, runs will not be saved");
                None
            }
        };

        Self::new(prefs, selection, session, history, Box::new(store))
    }

    /// Lays the playfield out for a terminal of the given size and passes the
    /// new bounds to the session.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.arena = Arena::new(ui::playfield(Rect::new(0, 0, width, height)));
        let area = self.arena.game_area();
        self.session.set_game_area(area.width, area.height);
    }

    pub fn start_run(&mut self) {
        match self.session.start(&ConfigOverrides::from(&self.selection)) {
            Ok(()) => {
                self.state = AppState::Playing;
                self.notice = None;
                self.last_saved = None;
            }
            Err(e) => self.notice = Some(e.to_string()),
        }
    }

    /// Advances the frame loop. Returns true when the screen needs redrawing.
    pub fn on_tick(&mut self) -> bool {
        if self.state != AppState::Playing {
            return false;
        }
        self.session.tick();
        self.sync();
        true
    }

    pub fn on_mouse(&mut self, mouse: MouseEvent) {
        if self.state != AppState::Playing {
            return;
        }
        match self.arena.pick(self.session.targets(), mouse.column, mouse.row) {
            Pointer::Target(id) => self.session.on_target_hit(id),
            Pointer::Background => self.session.on_miss(),
            Pointer::Outside => {}
        }
        self.sync();
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Flow {
        if key.kind != KeyEventKind::Press {
            return Flow::Continue;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Flow::Quit;
        }

        match self.state {
            AppState::Menu => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => return Flow::Quit,
                KeyCode::Enter | KeyCode::Char(' ') => self.start_run(),
                KeyCode::Char('m') => self.update_selection(|c| c.mode = c.mode.next()),
                KeyCode::Char('v') => self.update_selection(|c| c.movement = c.movement.next()),
                KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Right => self.adjust_goal(1),
                KeyCode::Char('-') | KeyCode::Left => self.adjust_goal(-1),
                KeyCode::Char('d') => self.update_selection(|c| {
                    c.auto_dismiss_time = next_choice(&DISMISS_CHOICES, c.auto_dismiss_time)
                }),
                KeyCode::Char('z') => self.update_selection(|c| {
                    c.target_size = next_choice(&SIZE_CHOICES, c.target_size)
                }),
                KeyCode::Char('h') => self.open_history(),
                _ => {}
            },
            AppState::Playing => match key.code {
                KeyCode::Esc => {
                    self.session.stop();
                    self.sync();
                }
                KeyCode::Char('r') => {
                    self.session.reset();
                    self.state = AppState::Menu;
                }
                _ => {}
            },
            AppState::Results => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => return Flow::Quit,
                KeyCode::Char('r') => self.start_run(),
                KeyCode::Char('n') | KeyCode::Enter => {
                    self.session.reset();
                    self.state = AppState::Menu;
                }
                KeyCode::Char('h') => self.open_history(),
                KeyCode::Char('t') => self.share(),
                _ => {}
            },
            AppState::History => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => return Flow::Quit,
                KeyCode::Char('b') | KeyCode::Backspace => {
                    self.state = self.history_state.return_to;
                }
                KeyCode::Up => {
                    self.history_state.scroll_offset =
                        self.history_state.scroll_offset.saturating_sub(1);
                }
                KeyCode::Down => {
                    // clamped against the visible rows when rendering
                    self.history_state.scroll_offset += 1;
                }
                KeyCode::PageUp => {
                    self.history_state.scroll_offset =
                        self.history_state.scroll_offset.saturating_sub(10);
                }
                KeyCode::PageDown => self.history_state.scroll_offset += 10,
                KeyCode::Home => self.history_state.scroll_offset = 0,
                KeyCode::Char('x') => self.clear_history(),
                _ => {}
            },
        }
        Flow::Continue
    }

    /// Moves to Results once the session reports the run is over, saving it.
    fn sync(&mut self) {
        if self.state == AppState::Playing && self.session.state() == GameState::Finished {
            self.persist();
            self.state = AppState::Results;
        }
    }

    fn persist(&mut self) {
        let Some(result) = self.session.result() else {
            return;
        };
        let Some(db) = &self.history else {
            return;
        };
        match db.record(&result, Local::now()) {
            Ok(id) => {
                info!(id, score = result.score, "run saved");
                self.last_saved = Some(id);
            }
            Err(e) => warn!(error = %e, "failed to save run"),
        }
        self.best = db.summary(result.mode).ok();
        self.refresh_streak();
    }

    fn refresh_streak(&mut self) {
        let Some(db) = &self.history else {
            self.streak = 0;
            return;
        };
        self.streak = db.streak(Local::now().date_naive()).unwrap_or_else(|e| {
            warn!(error = %e, "failed to read streak");
            0
        });
    }

    fn update_selection(&mut self, change: impl FnOnce(&mut GameConfig)) {
        let mut next = self.selection.clone();
        change(&mut next);
        if let Err(e) = next.validate() {
            self.notice = Some(e.to_string());
            return;
        }
        self.selection = next;
        self.session.set_defaults(self.selection.clone());
        self.prefs = self.prefs.with_game(&self.selection);
        if let Err(e) = self.store.save(&self.prefs) {
            warn!(error = %e, "failed to save preferences");
        }
    }

    /// Steps the mode's goal: seconds for Time Attack, hits for Precision.
    fn adjust_goal(&mut self, direction: i32) {
        self.update_selection(|c| match c.mode {
            GameMode::TimeAttack => {
                let (lo, hi) = DURATION_RANGE;
                c.duration = (c.duration + DURATION_STEP * direction as f64).clamp(lo, hi);
            }
            GameMode::Precision => {
                let (lo, hi) = TARGET_COUNT_RANGE;
                let next = c.target_count as i64 + (TARGET_COUNT_STEP as i64 * direction as i64);
                c.target_count = next.clamp(lo as i64, hi as i64) as u32;
            }
        });
    }

    fn open_history(&mut self) {
        self.history_state.return_to = self.state;
        self.history_state.scroll_offset = 0;
        self.reload_history();
        self.state = AppState::History;
    }

    fn reload_history(&mut self) {
        let Some(db) = &self.history else {
            self.history_state.entries.clear();
            self.history_state.summaries.clear();
            self.streak = 0;
            return;
        };
        self.history_state.entries = db.recent(HISTORY_LIMIT).unwrap_or_else(|e| {
            warn!(error = %e, "failed to load history");
            Vec::new()
        });
        self.history_state.summaries = [GameMode::TimeAttack, GameMode::Precision]
            .into_iter()
            .filter_map(|mode| db.summary(mode).ok().map(|s| (mode, s)))
            .collect();
        self.refresh_streak();
    }

    fn clear_history(&mut self) {
        if let Some(db) = &self.history {
            if let Err(e) = db.clear() {
                warn!(error = %e, "failed to clear history");
            }
        }
        self.best = None;
        self.reload_history();
    }

    fn share(&self) {
        let Some(result) = self.session.result() else {
            return;
        };
        if Browser::is_available() {
            let url = format!(
                "https://twitter.com/intent/tweet?text={}%20hits%20%2F%20{:.0}%25%20acc%20%2F%20{:.0}ms%20per%20target%20in%20flick",
                result.score, result.accuracy, result.avg_time_per_target_ms
            );
            webbrowser::open(&url).unwrap_or_default();
        }
    }
}

/// The entry after `current` in `choices`, wrapping around.
fn next_choice(choices: &[f64], current: f64) -> f64 {
    choices
        .iter()
        .position(|&c| (c - current).abs() < f64::EPSILON)
        .map_or(choices[0], |i| choices[(i + 1) % choices.len()])
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_env("FLICK_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

/// `--history` and `--export` run without a terminal UI.
fn run_offline(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let db = HistoryDb::new()?;

    if let Some(path) = &cli.export {
        let rows = db.export_csv(File::create(path)?)?;
        println!("exported {} runs to {}", rows, path.display());
    }

    if cli.history {
        for entry in db.recent(HISTORY_LIMIT)? {
            let r = &entry.result;
            println!(
                "{}  {:<11} {:<6} {:>4} hits {:>4} clicks {:>5.1}% {:>7.0} ms/target",
                entry.recorded_at.format("%Y-%m-%d %H:%M"),
                r.mode,
                r.movement,
                r.score,
                r.total_clicks,
                r.accuracy,
                r.avg_time_per_target_ms
            );
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    if cli.history || cli.export.is_some() {
        return run_offline(&cli);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mut app = App::from_cli(&cli);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    outcome
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let size = terminal.size()?;
    app.resize(size.width, size.height);

    let mut runner = Runner::new(CrosstermEventSource::new(), FixedTicker::frame_rate());
    terminal.draw(|f| draw(app, f))?;

    loop {
        match runner.step() {
            AimEvent::Tick => {
                if app.on_tick() {
                    terminal.draw(|f| draw(app, f))?;
                }
            }
            AimEvent::Resize(width, height) => {
                app.resize(width, height);
                terminal.draw(|f| draw(app, f))?;
            }
            AimEvent::Mouse(mouse) => {
                app.on_mouse(mouse);
                terminal.draw(|f| draw(app, f))?;
            }
            AimEvent::Key(key) => {
                if app.on_key(key) == Flow::Quit {
                    break;
                }
                terminal.draw(|f| draw(app, f))?;
            }
        }
    }

    Ok(())
}

fn draw(app: &mut App, f: &mut Frame) {
    ui::screen::current_screen(&app.state).render(app, f);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{MouseButton, MouseEventKind};
    use flick::clock::ManualClock;
    use flick::sound::NoopSound;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct MemoryStore {
        saved: Rc<RefCell<Vec<Config>>>,
    }

    impl ConfigStore for MemoryStore {
        fn load(&self) -> Config {
            self.saved.borrow().last().cloned().unwrap_or_default()
        }

        fn save(&self, cfg: &Config) -> flick::Result<()> {
            self.saved.borrow_mut().push(cfg.clone());
            Ok(())
        }
    }

    fn test_app(selection: GameConfig) -> (App, ManualClock, MemoryStore) {
        let clock = ManualClock::new(0.0);
        let store = MemoryStore::default();
        let session = AimSession::new(
            selection.clone(),
            clock.clone(),
            NoopSound,
            Spawner::seeded(17),
        );
        let mut app = App::new(
            Config::default(),
            selection,
            session,
            Some(HistoryDb::in_memory().unwrap()),
            Box::new(store.clone()),
        );
        app.resize(80, 24);
        (app, clock, store)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    /// Terminal cell at the centre of the first live target.
    fn cell_of_first_target(app: &App) -> (u16, u16) {
        let t = &app.session.targets()[0];
        let rect = app.arena.rect;
        (
            rect.x + (t.x / flick::arena::CELL_WIDTH) as u16,
            rect.y + (t.y / flick::arena::CELL_HEIGHT) as u16,
        )
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["flick"]);
        assert!(cli.mode.is_none());
        assert!(cli.duration.is_none());
        assert!(!cli.mute);
        assert!(!cli.history);
        assert_eq!(cli.overrides(), ConfigOverrides::default());
    }

    #[test]
    fn test_cli_game_flags() {
        let cli = Cli::parse_from([
            "flick", "-m", "precision", "-t", "12", "-v", "bounce", "--dismiss", "1.5", "-z", "20",
        ]);
        let cfg = cli.overrides().apply(&GameConfig::default());
        assert_eq!(cfg.mode, GameMode::Precision);
        assert_eq!(cfg.target_count, 12);
        assert_eq!(cfg.movement, Movement::Bounce);
        assert_eq!(cfg.auto_dismiss_time, 1.5);
        assert_eq!(cfg.target_size, 20.0);
    }

    #[test]
    fn test_cli_time_attack_value_name() {
        let cli = Cli::parse_from(["flick", "--mode", "time-attack", "--duration", "45"]);
        assert!(matches!(cli.mode, Some(CliMode::TimeAttack)));
        assert_eq!(cli.duration, Some(45.0));
    }

    #[test]
    fn test_cli_rejects_unknown_movement() {
        assert!(Cli::try_parse_from(["flick", "--movement", "zigzag"]).is_err());
    }

    #[test]
    fn test_cli_sound_prefs() {
        let cli = Cli::parse_from(["flick", "--volume", "3", "--mute"]);
        assert_eq!(cli.sound_prefs(&Config::default()), (1.0, true));
        let cli = Cli::parse_from(["flick"]);
        let prefs = Config {
            muted: true,
            volume: 0.25,
            ..Config::default()
        };
        assert_eq!(cli.sound_prefs(&prefs), (0.25, true));
    }

    #[test]
    fn test_resize_sets_game_area() {
        let (app, _, _) = test_app(GameConfig::default());
        let area = app.session.area();
        assert!(!area.is_empty());
        assert_eq!(area, app.arena.game_area());
    }

    #[test]
    fn test_menu_start_and_escape_to_results() {
        let (mut app, _, _) = test_app(GameConfig::default());
        app.on_key(press(KeyCode::Enter));
        assert_eq!(app.state, AppState::Playing);
        assert_eq!(app.session.targets().len(), 5);

        app.on_key(press(KeyCode::Esc));
        assert_eq!(app.state, AppState::Results);
        assert_eq!(app.session.state(), GameState::Finished);
    }

    #[test]
    fn test_click_on_target_background_and_border() {
        let (mut app, clock, _) = test_app(GameConfig::default());
        app.start_run();

        let (col, row) = cell_of_first_target(&app);
        app.on_mouse(click(col, row));
        assert_eq!(app.session.stats().score, 1);
        assert_eq!(app.session.stats().total_clicks, 1);

        let rect = app.arena.rect;
        let (col, row) = (rect.top()..rect.bottom())
            .flat_map(|r| (rect.left()..rect.right()).map(move |c| (c, r)))
            .find(|&(c, r)| app.arena.pick(app.session.targets(), c, r) == Pointer::Background)
            .unwrap();
        clock.advance(100.0);
        app.on_mouse(click(col, row));
        assert_eq!(app.session.stats().score, 1);
        assert_eq!(app.session.stats().total_clicks, 2);

        // the border is outside the playfield
        assert_eq!(app.arena.pick(app.session.targets(), 0, 0), Pointer::Outside);
        app.on_mouse(click(0, 0));
        assert_eq!(app.session.stats().total_clicks, 2);
    }

    #[test]
    fn test_precision_run_is_saved() {
        let selection = GameConfig {
            mode: GameMode::Precision,
            target_count: 2,
            ..GameConfig::default()
        };
        let (mut app, clock, _) = test_app(selection);
        app.start_run();

        for _ in 0..2 {
            clock.advance(300.0);
            let (col, row) = cell_of_first_target(&app);
            app.on_mouse(click(col, row));
        }

        assert_eq!(app.state, AppState::Results);
        assert!(app.last_saved.is_some());
        let db = app.history.as_ref().unwrap();
        assert_eq!(db.count().unwrap(), 1);
        assert_eq!(app.best.as_ref().unwrap().runs, 1);
        assert_eq!(app.streak, 1);
    }

    #[test]
    fn test_streak_clears_with_history() {
        let (mut app, _, _) = test_app(GameConfig::default());
        assert_eq!(app.streak, 0);

        app.start_run();
        let (col, row) = cell_of_first_target(&app);
        app.on_mouse(click(col, row));
        app.on_key(press(KeyCode::Esc));
        assert_eq!(app.state, AppState::Results);
        assert_eq!(app.streak, 1);

        app.on_key(press(KeyCode::Char('h')));
        assert_eq!(app.state, AppState::History);
        app.on_key(press(KeyCode::Char('x')));
        assert_eq!(app.streak, 0);
    }

    #[test]
    fn test_time_attack_ends_on_tick() {
        let selection = GameConfig {
            duration: 1.0,
            ..GameConfig::default()
        };
        let (mut app, clock, _) = test_app(selection);
        app.start_run();
        app.on_mouse(click(40, 12));

        for _ in 0..100 {
            clock.advance(16.0);
            app.on_tick();
        }
        assert_eq!(app.state, AppState::Results);
    }

    #[test]
    fn test_menu_changes_are_saved() {
        let (mut app, _, store) = test_app(GameConfig::default());
        app.on_key(press(KeyCode::Char('m')));
        app.on_key(press(KeyCode::Char('v')));
        app.on_key(press(KeyCode::Char('+')));

        assert_eq!(app.selection.mode, GameMode::Precision);
        assert_eq!(app.selection.movement, Movement::Linear);
        assert_eq!(app.selection.target_count, 25);
        assert_eq!(store.load().target_count, 25);
        assert_eq!(app.session.defaults(), &app.selection);
    }

    #[test]
    fn test_goal_is_clamped() {
        let (mut app, _, _) = test_app(GameConfig::default());
        for _ in 0..20 {
            app.on_key(press(KeyCode::Char('-')));
        }
        assert_eq!(app.selection.duration, DURATION_RANGE.0);
    }

    #[test]
    fn test_next_choice_wraps() {
        assert_eq!(next_choice(&DISMISS_CHOICES, 0.0), 0.75);
        assert_eq!(next_choice(&DISMISS_CHOICES, 3.0), 0.0);
        assert_eq!(next_choice(&SIZE_CHOICES, 33.0), 15.0);
    }

    #[test]
    fn test_reset_from_playing_returns_to_menu() {
        let (mut app, _, _) = test_app(GameConfig::default());
        app.start_run();
        app.on_key(press(KeyCode::Char('r')));
        assert_eq!(app.state, AppState::Menu);
        assert_eq!(app.session.state(), GameState::Idle);
    }

    #[test]
    fn test_history_navigation() {
        let (mut app, _, _) = test_app(GameConfig::default());
        app.on_key(press(KeyCode::Char('h')));
        assert_eq!(app.state, AppState::History);
        assert_eq!(app.history_state.summaries.len(), 2);

        app.on_key(press(KeyCode::Down));
        app.on_key(press(KeyCode::PageUp));
        assert_eq!(app.history_state.scroll_offset, 0);

        app.on_key(press(KeyCode::Char('b')));
        assert_eq!(app.state, AppState::Menu);
    }

    #[test]
    fn test_ctrl_c_quits_everywhere() {
        let (mut app, _, _) = test_app(GameConfig::default());
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(app.on_key(ctrl_c), Flow::Quit);
        app.start_run();
        assert_eq!(app.on_key(ctrl_c), Flow::Quit);
    }

    #[test]
    fn test_clicks_ignored_outside_play() {
        let (mut app, _, _) = test_app(GameConfig::default());
        app.on_mouse(click(40, 12));
        assert_eq!(app.session.stats().total_clicks, 0);
    }
}
