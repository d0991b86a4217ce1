use chrono::{DateTime, Local};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::{MessageKind, SamplingHealth, StatusMessage};
use crate::ui::theme::Theme;

pub struct StatusInfo<'a> {
    pub captured_at: Option<DateTime<Local>>,
    pub total: usize,
    pub selected: usize,
    pub paused: bool,
    pub health: &'a SamplingHealth,
    pub message: Option<&'a StatusMessage>,
}

pub fn render(frame: &mut Frame, area: Rect, info: &StatusInfo, theme: &Theme) {
    let bg_style = Style::default().bg(theme.statusbar_bg);

    // Status message takes priority
    if let Some(message) = info.message {
        let color = match message.kind {
            MessageKind::Info => theme.status_ok,
            MessageKind::Error => theme.status_err,
        };
        let line = Line::from(Span::styled(
            format!(" {}", message.text),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(Paragraph::new(line).style(bg_style), area);
        return;
    }

    let text_style = Style::default().fg(theme.text_primary);
    let mut spans = vec![Span::styled(format!(" {}", summary_text(info)), text_style)];

    match info.health {
        SamplingHealth::Ok => {}
        SamplingHealth::Degraded(reason) => spans.push(Span::styled(
            format!(" | Refresh failed, showing last data: {reason}"),
            Style::default().fg(theme.status_warn),
        )),
        SamplingHealth::Halted(reason) => spans.push(Span::styled(
            format!(" | Refresh stopped: {reason} - press r to retry"),
            Style::default()
                .fg(theme.status_err)
                .add_modifier(Modifier::BOLD),
        )),
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).style(bg_style), area);
}

pub fn summary_text(info: &StatusInfo) -> String {
    let mut text = match info.captured_at {
        Some(at) => format!(
            "Ready - Last updated {} | Total Processes: {}",
            at.format("%H:%M:%S"),
            info.total
        ),
        None => "Starting...".to_string(),
    };
    if info.selected > 0 {
        text.push_str(&format!(" | Selected: {}", info.selected));
    }
    if info.paused {
        text.push_str(" | Paused");
    }
    text
}

/// Key hints shown above the status line.
pub fn render_hints(frame: &mut Frame, area: Rect, paused: bool, theme: &Theme) {
    let mut spans = Vec::new();
    spans.extend(pill_spans("q", "Quit", theme));
    spans.extend(pill_spans("Space", "Select", theme));
    spans.extend(pill_spans("a", "All", theme));
    spans.extend(pill_spans("k", "Terminate", theme));
    spans.extend(pill_spans("K", "Kill", theme));
    spans.extend(pill_spans("p", if paused { "Resume" } else { "Pause" }, theme));
    spans.extend(pill_spans("r", "Refresh", theme));
    spans.extend(pill_spans("t", "Theme", theme));
    spans.extend(pill_spans("?", "Help", theme));

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.surface_bg)),
        area,
    );
}

fn pill_spans<'a>(key: &'a str, desc: &'a str, theme: &Theme) -> Vec<Span<'a>> {
    vec![
        Span::raw(" "),
        Span::styled(
            format!(" {key} "),
            Style::default()
                .fg(theme.pill_key_fg)
                .bg(theme.pill_key_bg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {desc}"),
            Style::default().fg(theme.pill_desc_fg).bg(theme.surface_bg),
        ),
    ]
}
