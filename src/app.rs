use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::action::{Action, Direction};
use crate::config::{Config, KeybindsConfig, parse_key, save_theme};
use crate::event::ChannelBridge;
use crate::system::differ::SnapshotDiff;
use crate::system::gpu::GpuInfo;
use crate::system::scheduler::{Publication, RefreshScheduler, SchedulerState};
use crate::system::selection::SharedSelection;
use crate::system::snapshot::{ProcessIdentity, Snapshot};
use crate::system::source::SnapshotSource;
use crate::system::terminate::{KillMode, TerminationTarget, Terminator, terminate_batch};
use crate::ui::table::data_area;
use crate::ui::theme::Theme;

const MESSAGE_TTL: Duration = Duration::from_secs(5);
const WHEEL_STEP: isize = 3;

pub type Scheduler = RefreshScheduler<Box<dyn SnapshotSource>, ChannelBridge>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Help,
}

#[derive(Debug, Clone)]
pub struct ResolvedKeybinds {
    pub quit: KeyCode,
    pub terminate: KeyCode,
    pub force_terminate: KeyCode,
    pub toggle_select: KeyCode,
    pub select_all: KeyCode,
    pub cycle_theme: KeyCode,
    pub pause: KeyCode,
    pub refresh: KeyCode,
    pub help: KeyCode,
}

impl ResolvedKeybinds {
    pub fn from_config(kb: &KeybindsConfig) -> Self {
        Self {
            quit: parse_key(&kb.quit).unwrap_or(KeyCode::Char('q')),
            terminate: parse_key(&kb.terminate).unwrap_or(KeyCode::Char('k')),
            force_terminate: parse_key(&kb.force_terminate).unwrap_or(KeyCode::Char('K')),
            toggle_select: parse_key(&kb.toggle_select).unwrap_or(KeyCode::Char(' ')),
            select_all: parse_key(&kb.select_all).unwrap_or(KeyCode::Char('a')),
            cycle_theme: parse_key(&kb.cycle_theme).unwrap_or(KeyCode::Char('t')),
            pause: parse_key(&kb.pause).unwrap_or(KeyCode::Char('p')),
            refresh: parse_key(&kb.refresh).unwrap_or(KeyCode::Char('r')),
            help: parse_key(&kb.help).unwrap_or(KeyCode::Char('?')),
        }
    }

    /// Returns (key_label, description) pairs for the help overlay.
    pub fn help_entries(&self) -> Vec<(String, &'static str)> {
        vec![
            (key_label(self.quit), "Quit"),
            (key_label(self.toggle_select), "Select / deselect row"),
            (key_label(self.select_all), "Select all"),
            ("Esc".to_string(), "Clear selection"),
            (key_label(self.terminate), "Terminate (SIGTERM)"),
            (key_label(self.force_terminate), "Force kill (SIGKILL)"),
            (key_label(self.pause), "Pause / resume"),
            (key_label(self.refresh), "Refresh / restart"),
            (key_label(self.cycle_theme), "Cycle theme"),
            (key_label(self.help), "Toggle help"),
            ("\u{2191}\u{2193} PgUp PgDn".to_string(), "Move cursor"),
            ("Click".to_string(), "Select row"),
            ("Ctrl+Click".to_string(), "Add / remove row"),
            ("Ctrl+C".to_string(), "Quit (always)"),
        ]
    }
}

fn key_label(code: KeyCode) -> String {
    match code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Backspace => "Bksp".to_string(),
        KeyCode::Delete => "Del".to_string(),
        _ => "?".to_string(),
    }
}

/// What the status bar reports about sampling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SamplingHealth {
    #[default]
    Ok,
    /// A recent sample failed; the last good snapshot is still shown.
    Degraded(String),
    /// Refreshing halted after repeated failures until restarted.
    Halted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub kind: MessageKind,
    created: Instant,
}

impl StatusMessage {
    pub fn new(text: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            text: text.into(),
            kind,
            created: Instant::now(),
        }
    }

    fn is_expired(&self) -> bool {
        self.created.elapsed() >= MESSAGE_TTL
    }
}

pub struct App {
    pub running: bool,
    pub input_mode: InputMode,
    pub keybinds: ResolvedKeybinds,
    pub theme: Theme,
    pub selection: SharedSelection,
    pub health: SamplingHealth,
    pub status_message: Option<StatusMessage>,
    /// Stopped on request, as opposed to halted by failures.
    pub paused: bool,
    pub offset: usize,
    pub gpu: GpuInfo,
    pub elevated: bool,
    frame: Option<Publication>,
    last_seq: u64,
    cursor: Option<ProcessIdentity>,
    cursor_index: usize,
    top: Option<ProcessIdentity>,
    table_area: Option<Rect>,
    scheduler: Scheduler,
    interval: Duration,
    terminator: Box<dyn Terminator>,
    config_path: Option<PathBuf>,
}

impl App {
    pub fn new(
        config: &Config,
        source: Box<dyn SnapshotSource>,
        bridge: Arc<ChannelBridge>,
        terminator: Box<dyn Terminator>,
    ) -> Self {
        let selection = SharedSelection::new();
        let options = config.general.scheduler_options();
        let scheduler = RefreshScheduler::new(source, bridge, selection.clone(), options);

        App {
            running: true,
            input_mode: InputMode::Normal,
            keybinds: ResolvedKeybinds::from_config(&config.keybinds),
            theme: Theme::from_preference(config.theme),
            selection,
            health: SamplingHealth::Ok,
            status_message: None,
            paused: false,
            offset: 0,
            gpu: GpuInfo::default(),
            elevated: false,
            frame: None,
            last_seq: 0,
            cursor: None,
            cursor_index: 0,
            top: None,
            table_area: None,
            scheduler,
            interval: options.interval,
            terminator,
            config_path: None,
        }
    }

    /// Where theme changes are persisted; `None` keeps them in memory.
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn with_gpu(mut self, gpu: GpuInfo) -> Self {
        self.gpu = gpu;
        self
    }

    pub fn with_elevated(mut self, elevated: bool) -> Self {
        self.elevated = elevated;
        self
    }

    /// Starts refreshing. Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        self.scheduler.start(self.interval);
        self.paused = false;
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.frame.as_ref().map(|f| f.snapshot.as_ref())
    }

    pub fn diff(&self) -> Option<&SnapshotDiff> {
        self.frame.as_ref().map(|f| &f.diff)
    }

    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    pub fn cursor(&self) -> Option<ProcessIdentity> {
        self.cursor
    }

    pub fn cursor_index(&self) -> Option<usize> {
        self.cursor.map(|_| self.cursor_index)
    }

    /// Installs a publication unless a newer one has already been shown.
    pub fn apply_publication(&mut self, mut publication: Publication) -> bool {
        if publication.seq <= self.last_seq {
            tracing::debug!(
                seq = publication.seq,
                last = self.last_seq,
                "discarding stale publication"
            );
            return false;
        }
        self.last_seq = publication.seq;
        self.health = SamplingHealth::Ok;
        let snapshot = Arc::clone(&publication.snapshot);
        // edits made while the previous frame was shown may name rows this
        // snapshot no longer has
        publication.selection = self.selection.reconcile(&snapshot);
        self.frame = Some(publication);
        self.restore_viewport(&snapshot);
        true
    }

    pub fn on_sampling_failed(&mut self, persistent: bool, message: String) {
        if persistent {
            self.health = SamplingHealth::Halted(message);
            self.paused = false;
        } else {
            self.health = SamplingHealth::Degraded(message);
        }
    }

    pub fn on_tick(&mut self) {
        if self
            .status_message
            .as_ref()
            .is_some_and(StatusMessage::is_expired)
        {
            self.status_message = None;
        }
    }

    pub fn set_table_area(&mut self, area: Rect) {
        self.table_area = Some(area);
        if let Some(snapshot) = self.current_snapshot() {
            self.sync_viewport(&snapshot);
        }
    }

    pub fn map_key(&self, key: KeyEvent) -> Action {
        // Ctrl+C always quits (hardwired safety)
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Action::Quit;
        }

        match self.input_mode {
            InputMode::Normal => self.map_key_normal(key),
            InputMode::Help => self.map_key_help(key),
        }
    }

    fn map_key_normal(&self, key: KeyEvent) -> Action {
        let code = key.code;
        let kb = &self.keybinds;

        // Navigation keys are hardwired (not configurable)
        match code {
            KeyCode::Up => return Action::Navigate(Direction::Up),
            KeyCode::Down => return Action::Navigate(Direction::Down),
            KeyCode::PageUp => return Action::PageUp,
            KeyCode::PageDown => return Action::PageDown,
            KeyCode::Home => return Action::Home,
            KeyCode::End => return Action::End,
            KeyCode::Esc => return Action::ClearSelection,
            _ => {}
        }

        if code == kb.quit {
            return Action::Quit;
        }
        if code == kb.toggle_select {
            return Action::ToggleSelect;
        }
        if code == kb.select_all {
            return Action::SelectAll;
        }
        if code == kb.terminate {
            return Action::Terminate(KillMode::Graceful);
        }
        if code == kb.force_terminate {
            return Action::Terminate(KillMode::Force);
        }
        if code == kb.cycle_theme {
            return Action::CycleTheme;
        }
        if code == kb.pause {
            return Action::TogglePause;
        }
        if code == kb.refresh {
            return Action::Refresh;
        }
        if code == kb.help {
            return Action::ToggleHelp;
        }

        Action::None
    }

    fn map_key_help(&self, key: KeyEvent) -> Action {
        let code = key.code;
        // In help mode, only the help key and Esc dismiss, everything else is ignored
        if code == self.keybinds.help || code == KeyCode::Esc {
            return Action::ToggleHelp;
        }
        Action::None
    }

    pub fn map_mouse(&self, mouse: MouseEvent) -> Action {
        if self.input_mode == InputMode::Help {
            return Action::None;
        }
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let Some(area) = self.table_area else {
                    return Action::None;
                };
                let data = data_area(area);
                if mouse.column < data.x
                    || mouse.column >= data.x + data.width
                    || mouse.row < data.y
                    || mouse.row >= data.y + data.height
                {
                    return Action::None;
                }
                Action::ClickRow {
                    index: self.offset + (mouse.row - data.y) as usize,
                    toggle: mouse.modifiers.contains(KeyModifiers::CONTROL),
                }
            }
            MouseEventKind::ScrollUp => Action::ScrollUp,
            MouseEventKind::ScrollDown => Action::ScrollDown,
            _ => Action::None,
        }
    }

    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::Quit => {
                self.scheduler.stop();
                self.running = false;
            }
            Action::Navigate(Direction::Up) => self.move_cursor(-1),
            Action::Navigate(Direction::Down) => self.move_cursor(1),
            Action::PageUp => self.move_cursor(-(self.page_size() as isize)),
            Action::PageDown => self.move_cursor(self.page_size() as isize),
            Action::Home => self.move_cursor(isize::MIN / 2),
            Action::End => self.move_cursor(isize::MAX / 2),
            Action::ScrollUp => self.move_cursor(-WHEEL_STEP),
            Action::ScrollDown => self.move_cursor(WHEEL_STEP),
            Action::ToggleSelect => {
                if let Some(identity) = self.cursor {
                    self.selection.toggle(identity);
                }
            }
            Action::SelectAll => {
                if let Some(snapshot) = self.snapshot() {
                    let all = snapshot.identities().collect();
                    self.selection.replace(all);
                }
            }
            Action::ClearSelection => self.selection.clear(),
            Action::ClickRow { index, toggle } => self.click_row(index, toggle),
            Action::Terminate(mode) => self.terminate(mode),
            Action::CycleTheme => self.cycle_theme(),
            Action::TogglePause => self.toggle_pause(),
            Action::Refresh => self.refresh(),
            Action::ToggleHelp => {
                self.input_mode = if self.input_mode == InputMode::Help {
                    InputMode::Normal
                } else {
                    InputMode::Help
                };
            }
            Action::None => {}
        }
    }

    pub fn show_help(&self) -> bool {
        self.input_mode == InputMode::Help
    }

    pub fn help_entries(&self) -> Vec<(String, &'static str)> {
        self.keybinds.help_entries()
    }

    fn current_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.frame.as_ref().map(|f| Arc::clone(&f.snapshot))
    }

    fn page_size(&self) -> usize {
        self.table_area
            .map(|area| data_area(area).height as usize)
            .unwrap_or(0)
            .max(1)
    }

    /// Re-finds cursor and scroll position by identity after a refresh.
    fn restore_viewport(&mut self, snapshot: &Snapshot) {
        if snapshot.is_empty() {
            self.cursor = None;
            self.cursor_index = 0;
            self.offset = 0;
            self.top = None;
            return;
        }
        let last = snapshot.len() - 1;

        match self.cursor.and_then(|id| snapshot.position(id)) {
            Some(index) => self.cursor_index = index,
            None => {
                self.cursor_index = self.cursor_index.min(last);
                self.cursor = Some(snapshot.rows()[self.cursor_index].identity);
            }
        }
        if let Some(index) = self.top.and_then(|id| snapshot.position(id)) {
            self.offset = index;
        }
        self.sync_viewport(snapshot);
    }

    fn sync_viewport(&mut self, snapshot: &Snapshot) {
        let len = snapshot.len();
        if len == 0 {
            return;
        }
        let visible = self.page_size();
        self.offset = self.offset.min(len.saturating_sub(visible));
        if self.cursor_index < self.offset {
            self.offset = self.cursor_index;
        } else if self.cursor_index >= self.offset + visible {
            self.offset = self.cursor_index + 1 - visible;
        }
        self.top = Some(snapshot.rows()[self.offset].identity);
    }

    fn set_cursor(&mut self, snapshot: &Snapshot, index: usize) {
        self.cursor_index = index;
        self.cursor = Some(snapshot.rows()[index].identity);
        self.sync_viewport(snapshot);
    }

    fn move_cursor(&mut self, delta: isize) {
        let Some(snapshot) = self.current_snapshot() else {
            return;
        };
        if snapshot.is_empty() {
            return;
        }
        let last = (snapshot.len() - 1) as isize;
        let index = (self.cursor_index as isize).saturating_add(delta).clamp(0, last);
        self.set_cursor(&snapshot, index as usize);
    }

    fn click_row(&mut self, index: usize, toggle: bool) {
        let Some(snapshot) = self.current_snapshot() else {
            return;
        };
        if index >= snapshot.len() {
            return;
        }
        self.set_cursor(&snapshot, index);
        let identity = snapshot.rows()[index].identity;
        if toggle {
            self.selection.toggle(identity);
        } else {
            self.selection.select_only(identity);
        }
    }

    /// Targets the selection, or the cursor row when nothing is selected.
    fn termination_targets(&self, snapshot: &Snapshot) -> Vec<TerminationTarget> {
        let selection = self.selection.snapshot();
        let mut targets: Vec<TerminationTarget> = snapshot
            .rows()
            .iter()
            .filter(|row| selection.contains(&row.identity))
            .map(|row| TerminationTarget {
                identity: row.identity,
                name: row.name.clone(),
            })
            .collect();
        if targets.is_empty()
            && let Some(row) = self
                .cursor
                .and_then(|id| snapshot.position(id))
                .map(|index| &snapshot.rows()[index])
        {
            targets.push(TerminationTarget {
                identity: row.identity,
                name: row.name.clone(),
            });
        }
        targets
    }

    fn terminate(&mut self, mode: KillMode) {
        let Some(snapshot) = self.current_snapshot() else {
            return;
        };
        let targets = self.termination_targets(&snapshot);
        if targets.is_empty() {
            self.status_message = Some(StatusMessage::new("No process selected", MessageKind::Info));
            return;
        }

        let report = terminate_batch(&mut *self.terminator, targets, mode);
        for entry in report.entries.iter().filter(|e| e.status.is_success()) {
            self.selection.remove(&entry.target.identity);
        }
        let kind = if report.failed().next().is_some() {
            MessageKind::Error
        } else {
            MessageKind::Info
        };
        self.status_message = Some(StatusMessage::new(report.summary(), kind));
        self.scheduler.refresh_now();
    }

    fn cycle_theme(&mut self) {
        let next = self.theme.preference.next();
        self.theme = Theme::from_preference(next);

        let saved = match &self.config_path {
            Some(path) => save_theme(path, next),
            None => Ok(()),
        };
        self.status_message = Some(match saved {
            Ok(()) => StatusMessage::new(format!("Theme: {}", next.tag()), MessageKind::Info),
            Err(err) => {
                tracing::warn!(%err, "failed to persist theme");
                StatusMessage::new(format!("Theme not saved: {err}"), MessageKind::Error)
            }
        });
    }

    fn toggle_pause(&mut self) {
        if self.paused {
            self.start();
            self.status_message = Some(StatusMessage::new("Monitoring resumed", MessageKind::Info));
        } else if self.scheduler.is_running() {
            self.scheduler.stop();
            self.paused = true;
            self.status_message = Some(StatusMessage::new("Monitoring paused", MessageKind::Info));
        }
    }

    /// Refreshes immediately, or restarts ticking when stopped.
    fn refresh(&mut self) {
        if self.scheduler.is_running() {
            self.scheduler.refresh_now();
            return;
        }
        self.health = SamplingHealth::Ok;
        self.start();
        self.status_message = Some(StatusMessage::new("Monitoring restarted", MessageKind::Info));
    }
}
