pub mod header;
pub mod help;
pub mod statusbar;
pub mod table;
pub mod theme;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};

use crate::app::App;
use crate::ui::statusbar::StatusInfo;
use crate::ui::table::TableView;

pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let table_area = chunks[1];
    app.set_table_area(table_area);

    header::render(
        frame,
        chunks[0],
        app.snapshot().map(|s| s.memory()),
        &app.gpu,
        app.elevated,
        &app.theme,
    );

    let selection = app.selection.snapshot();
    let view = TableView {
        snapshot: app.snapshot(),
        diff: app.diff(),
        selection: &selection,
        cursor: app.cursor_index(),
        offset: app.offset,
    };
    table::render(frame, table_area, &view, &app.theme);

    statusbar::render_hints(frame, chunks[2], app.paused, &app.theme);
    let info = StatusInfo {
        captured_at: app.snapshot().map(|s| s.captured_at()),
        total: app.snapshot().map_or(0, |s| s.len()),
        selected: selection.len(),
        paused: app.paused,
        health: &app.health,
        message: app.status_message.as_ref(),
    };
    statusbar::render(frame, chunks[3], &info, &app.theme);

    // Help overlay, rendered last to appear on top
    if app.show_help() {
        help::render(frame, frame.area(), &app.help_entries(), &app.theme);
    }
}
