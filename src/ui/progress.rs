use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Gauge, Paragraph, Widget, Wrap},
};

use super::{bold_style, dim_style};
use crate::catalog::TestStep;
use crate::sequencer::{StepSequencer, StepStatus};

fn marker(status: StepStatus) -> (&'static str, Style) {
    match status {
        StepStatus::Completed => ("✓", Style::default().fg(Color::Green)),
        StepStatus::Current => ("●", bold_style().fg(Color::Cyan)),
        StepStatus::Upcoming => ("○", dim_style()),
    }
}

/// Step counter, completion gauge and the row of step markers
pub fn render_progress(steps: &[TestStep], sequencer: &StepSequencer, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // step counter
            Constraint::Length(1), // gauge
            Constraint::Min(1),    // markers
        ])
        .split(area);

    let current = sequencer.current();
    let total = sequencer.len();
    Paragraph::new(Span::styled(
        format!("Step {} of {}", current + 1, total),
        bold_style(),
    ))
    .render(chunks[0], buf);

    let ratio = ((current + 1) as f64 / total as f64).clamp(0.0, 1.0);
    Gauge::default()
        .gauge_style(Style::default().fg(Color::Magenta))
        .ratio(ratio)
        .label(format!("{:.0}%", ratio * 100.0))
        .render(chunks[1], buf);

    let mut spans = Vec::with_capacity(steps.len() * 2);
    for (i, step) in steps.iter().enumerate() {
        let (symbol, style) = marker(sequencer.step_status(i));
        spans.push(Span::styled(format!("{symbol} {}", step.title), style));
        spans.push(Span::raw("   "));
    }
    spans.pop();

    Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[2], buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::ui::buffer_text;

    #[test]
    fn shows_counter_and_markers() {
        let catalog = Catalog::standard();
        let mut sequencer = StepSequencer::new(catalog.len());
        sequencer.advance();

        let area = Rect::new(0, 0, 120, 4);
        let mut buf = Buffer::empty(area);
        render_progress(catalog.steps(), &sequencer, area, &mut buf);
        let text = buffer_text(&buf);

        assert!(text.contains("Step 2 of 5"));
        assert!(text.contains("40%"));
        assert!(text.contains("✓"));
        assert!(text.contains("●"));
        assert!(text.contains("○"));
    }
}
