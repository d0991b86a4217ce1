use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Gauge, Paragraph};

use crate::format::format_gb;
use crate::system::gpu::GpuInfo;
use crate::system::snapshot::MemorySummary;
use crate::ui::theme::Theme;

pub fn render(
    frame: &mut Frame,
    area: Rect,
    memory: Option<MemorySummary>,
    gpu: &GpuInfo,
    elevated: bool,
    theme: &Theme,
) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_overview(frame, chunks[0], memory, gpu, elevated, theme);
    render_ram_gauge(frame, chunks[1], memory, theme);
}

fn render_overview(
    frame: &mut Frame,
    area: Rect,
    memory: Option<MemorySummary>,
    gpu: &GpuInfo,
    elevated: bool,
    theme: &Theme,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.overlay_border));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let secondary = Style::default().fg(theme.text_secondary);
    let mut brand = vec![Span::styled(
        " ramtop ",
        Style::default()
            .fg(theme.header_accent_fg)
            .bg(theme.header_accent_bg)
            .add_modifier(Modifier::BOLD),
    )];
    if elevated {
        brand.push(Span::styled(
            " root ",
            Style::default()
                .fg(theme.header_accent_fg)
                .bg(theme.status_err)
                .add_modifier(Modifier::BOLD),
        ));
    }
    brand.push(Span::raw("  "));
    match memory {
        Some(m) => brand.extend([
            Span::styled(format!("Total: {}", format_gb(m.total_bytes)), secondary),
            Span::raw("  "),
            Span::styled(format!("Used: {}", format_gb(m.used_bytes)), secondary),
            Span::raw("  "),
            Span::styled(
                format!("Available: {}", format_gb(m.available_bytes)),
                secondary,
            ),
        ]),
        None => brand.push(Span::styled("Waiting for first sample", secondary)),
    }

    let gpu_line = Line::from(vec![
        Span::styled(
            " GPU ",
            Style::default()
                .fg(theme.text_primary)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("{}  Driver: {}", gpu.name, gpu.driver), secondary),
    ]);

    frame.render_widget(Paragraph::new(vec![Line::from(brand), gpu_line]), inner);
}

fn render_ram_gauge(frame: &mut Frame, area: Rect, memory: Option<MemorySummary>, theme: &Theme) {
    let percent = memory.map(|m| m.used_percent()).unwrap_or(0.0);

    let ram_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.overlay_border))
        .title(Span::styled(
            " RAM ",
            Style::default()
                .fg(theme.text_secondary)
                .add_modifier(Modifier::BOLD),
        ));

    let gauge = Gauge::default()
        .block(ram_block)
        .gauge_style(
            Style::default()
                .fg(theme.gauge_color(percent))
                .bg(theme.gauge_unfilled),
        )
        .ratio((percent / 100.0).clamp(0.0, 1.0))
        .label(format!("{percent:.1}%"));

    frame.render_widget(gauge, area);
}
