use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table};

use crate::format::{format_mb, format_percent, truncate_unicode};
use crate::system::differ::{RowChange, SnapshotDiff};
use crate::system::selection::SelectionSet;
use crate::system::snapshot::{ProcessRow, Snapshot};
use crate::ui::theme::Theme;

const NAME_MIN_WIDTH: u16 = 16;

/// Everything the process table needs for one frame.
pub struct TableView<'a> {
    pub snapshot: Option<&'a Snapshot>,
    pub diff: Option<&'a SnapshotDiff>,
    pub selection: &'a SelectionSet,
    pub cursor: Option<usize>,
    pub offset: usize,
}

/// Screen region holding data rows: inside the border, below the header.
pub fn data_area(area: Rect) -> Rect {
    let inner = Rect::new(
        area.x.saturating_add(1),
        area.y.saturating_add(1),
        area.width.saturating_sub(2),
        area.height.saturating_sub(2),
    );
    Rect::new(
        inner.x,
        inner.y.saturating_add(1),
        inner.width,
        inner.height.saturating_sub(1),
    )
}

pub fn render(frame: &mut Frame, area: Rect, view: &TableView, theme: &Theme) {
    let title = match view.snapshot {
        Some(snapshot) => format!(" Processes ({}) ", snapshot.len()),
        None => " Processes ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.overlay_border))
        .title(Span::styled(
            title,
            Style::default()
                .fg(theme.text_secondary)
                .add_modifier(Modifier::BOLD),
        ));

    let Some(snapshot) = view.snapshot else {
        let waiting = Paragraph::new(Span::styled(
            " Collecting process data...",
            Style::default().fg(theme.text_secondary),
        ))
        .block(block);
        frame.render_widget(waiting, area);
        return;
    };

    let visible = data_area(area).height as usize;
    let name_width = area.width.saturating_sub(2 + 2 + 8 + 11 + 8 + 4) as usize;

    let rows: Vec<Row> = snapshot
        .rows()
        .iter()
        .enumerate()
        .skip(view.offset)
        .take(visible)
        .map(|(index, row)| {
            table_row(
                index,
                row,
                snapshot.row_memory_percent(row),
                view,
                name_width.max(NAME_MIN_WIDTH as usize),
                theme,
            )
        })
        .collect();

    let header = Row::new(["", "PID", "Process Name", "RAM (MB)", "RAM (%)"]).style(
        Style::default()
            .fg(theme.table_header_fg)
            .bg(theme.table_header_bg)
            .add_modifier(Modifier::BOLD),
    );

    let widths = [
        Constraint::Length(2),
        Constraint::Length(8),
        Constraint::Min(NAME_MIN_WIDTH),
        Constraint::Length(11),
        Constraint::Length(8),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .column_spacing(1)
        .style(Style::default().fg(theme.text_primary).bg(theme.row_bg));

    frame.render_widget(table, area);
}

fn table_row<'a>(
    index: usize,
    row: &'a ProcessRow,
    memory_percent: f64,
    view: &TableView,
    name_width: usize,
    theme: &Theme,
) -> Row<'a> {
    let selected = view.selection.contains(&row.identity);
    let is_cursor = view.cursor == Some(index);
    let added = view
        .diff
        .is_some_and(|d| !d.is_initial() && d.change_at(index) == Some(RowChange::Added));

    let mut style = Style::default()
        .fg(theme.text_primary)
        .bg(theme.row_background(index, memory_percent));
    if selected {
        style = style.fg(theme.selection_fg).bg(theme.selection_bg);
    }
    if is_cursor {
        style = style.add_modifier(Modifier::BOLD);
    }

    let marker = if is_cursor {
        Span::styled("\u{25b6}", Style::default().fg(theme.cursor_fg))
    } else {
        Span::raw(" ")
    };

    let name = truncate_unicode(&row.name, name_width);
    let name_cell = if added && !selected {
        Cell::from(Span::styled(
            name,
            Style::default()
                .fg(theme.added_fg)
                .add_modifier(Modifier::BOLD),
        ))
    } else {
        Cell::from(name)
    };

    let (memory, percent) = if row.access_denied {
        let denied = Style::default().fg(theme.denied_fg);
        (
            Cell::from(Span::styled("denied", denied)),
            Cell::from(Span::styled("-", denied)),
        )
    } else {
        (
            Cell::from(format!("{:>10}", format_mb(row.memory_bytes))),
            Cell::from(format!("{:>7}", format_percent(memory_percent))),
        )
    };

    Row::new([
        Cell::from(marker),
        Cell::from(row.pid().to_string()),
        name_cell,
        memory,
        percent,
    ])
    .style(style)
}
