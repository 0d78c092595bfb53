use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, BarChart, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table,
        Widget, Wrap,
    },
};

use super::charting::{compute_chart_params, format_label, meter};
use super::{bold_style, dim_style, legend_style, HORIZONTAL_MARGIN};
use crate::dashboard::{Dashboard, PatientStatus, PatientSummary, StatCard};

const MIN_WIDTH: u16 = 60;
const MIN_HEIGHT: u16 = 20;

fn status_style(status: PatientStatus) -> Style {
    match status {
        PatientStatus::Normal => Style::default().fg(Color::Green),
        PatientStatus::Concern => Style::default().fg(Color::Yellow),
        PatientStatus::Flagged => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}

fn render_card(card: &StatCard, area: Rect, buf: &mut Buffer) {
    let mut lines = vec![
        Line::from(Span::styled(card.value.clone(), bold_style())),
        Line::from(Span::styled(card.description.clone(), dim_style())),
    ];
    if let Some((pct, up)) = card.trend {
        let (arrow, color) = if up {
            ("↑", Color::Green)
        } else {
            ("↓", Color::Red)
        };
        lines.push(Line::from(Span::styled(
            format!("{arrow} {pct}% from last month"),
            Style::default().fg(color),
        )));
    }
    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(card.title.as_str()))
        .wrap(Wrap { trim: true })
        .render(area, buf);
}

fn render_progress_chart(dashboard: &Dashboard, area: Rect, buf: &mut Buffer) {
    let points = dashboard.score_points();
    let (last_x, top) = compute_chart_params(&points);

    let first_month = dashboard.progress.first().map(|p| p.month).unwrap_or("");
    let last_month = dashboard.progress.last().map(|p| p.month).unwrap_or("");

    let datasets = vec![Dataset::default()
        .name("avg score")
        .marker(symbols::Marker::Braille)
        .style(Style::default().fg(Color::Magenta))
        .graph_type(GraphType::Line)
        .data(&points)];

    Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Monthly Progress"),
        )
        .x_axis(
            Axis::default()
                .title("month")
                .bounds([1.0, last_x])
                .labels(vec![
                    Span::styled(first_month, bold_style()),
                    Span::styled(last_month, bold_style()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("score")
                .bounds([0.0, top])
                .labels(vec![
                    Span::styled("0", bold_style()),
                    Span::styled(format_label(top), bold_style()),
                ]),
        )
        .render(area, buf);
}

fn render_speech_metrics(dashboard: &Dashboard, area: Rect, buf: &mut Buffer) {
    let data: Vec<(&str, u64)> = dashboard
        .speech_metrics
        .iter()
        .map(|m| (m.name, m.value))
        .collect();

    BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Speech Analysis"),
        )
        .data(data.as_slice())
        .bar_width(10)
        .bar_gap(2)
        .max(100)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(bold_style().fg(Color::Black).bg(Color::Cyan))
        .render(area, buf);
}

/// Returns a Row for the recent patients table
pub fn present_row(patient: &PatientSummary) -> Row<'static> {
    let last_test = patient
        .last_test
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());
    Row::new(vec![
        Cell::from(patient.name),
        Cell::from(patient.age.to_string()),
        Cell::from(last_test),
        Cell::from(format!("{:>3} {}", patient.score, meter(patient.score as u64, 100, 10))),
        Cell::from(Span::styled(
            patient.status.to_string(),
            status_style(patient.status),
        )),
    ])
}

fn render_patients(dashboard: &Dashboard, area: Rect, buf: &mut Buffer) {
    let header = Row::new(vec![
        Cell::from("Patient"),
        Cell::from("Age"),
        Cell::from("Last Test"),
        Cell::from("Score"),
        Cell::from("Status"),
    ])
    .style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );

    let widths = [
        Constraint::Min(16),    // name
        Constraint::Length(5),  // age
        Constraint::Length(12), // last test
        Constraint::Length(16), // score + meter
        Constraint::Length(9),  // status
    ];

    Table::new(dashboard.recent_patients.iter().map(present_row), widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Recent Patients"),
        )
        .column_spacing(2)
        .render(area, buf);
}

pub fn render_dashboard(dashboard: &Dashboard, area: Rect, buf: &mut Buffer) {
    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        Paragraph::new("Enlarge the window to view the dashboard. (b) back / (q) quit")
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(area, buf);
        return;
    }

    let table_height = dashboard.recent_patients.len() as u16 + 3;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(1)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Length(5), // stat cards
            Constraint::Min(8),    // charts
            Constraint::Length(table_height),
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled(
        "Clinician Dashboard",
        bold_style().fg(Color::Magenta),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    if !dashboard.cards.is_empty() {
        let card_areas = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![
                Constraint::Ratio(1, dashboard.cards.len() as u32);
                dashboard.cards.len()
            ])
            .split(chunks[1]);
        for (card, card_area) in dashboard.cards.iter().zip(card_areas.iter()) {
            render_card(card, *card_area, buf);
        }
    }

    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[2]);
    render_progress_chart(dashboard, charts[0], buf);
    render_speech_metrics(dashboard, charts[1], buf);

    render_patients(dashboard, chunks[3], buf);

    Paragraph::new(Span::styled(
        "(n) new screening / (b) back / (q) quit",
        legend_style(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[4], buf);
}
