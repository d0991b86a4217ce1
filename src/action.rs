use crate::system::terminate::KillMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    Navigate(Direction),
    PageUp,
    PageDown,
    Home,
    End,
    ToggleSelect,
    SelectAll,
    ClearSelection,
    Terminate(KillMode),
    CycleTheme,
    TogglePause,
    Refresh,
    ToggleHelp,
    /// Mouse click on the row at `index`; `toggle` is set when Ctrl is held.
    ClickRow { index: usize, toggle: bool },
    ScrollUp,
    ScrollDown,
    None,
}
