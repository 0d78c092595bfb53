use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Widget},
};

use super::{bold_style, dim_style, legend_style, render_notice, HORIZONTAL_MARGIN, VERTICAL_MARGIN};
use crate::app::App;
use crate::catalog::{Catalog, QUIZ_ITEMS};
use crate::responses::ResultRecord;

/// Returns one table row per catalog step, in flow order
pub fn summary_rows(catalog: &Catalog, record: &ResultRecord) -> Vec<Row<'static>> {
    catalog
        .steps()
        .iter()
        .map(|step| {
            let answer = match record.responses.get(&step.id) {
                Some(answer) => Cell::from(answer.summary()),
                None => Cell::from(Span::styled("no answer", dim_style())),
            };
            Row::new(vec![Cell::from(step.title.clone()), answer])
        })
        .collect()
}

pub fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(3), // heading + times
            Constraint::Min(3),    // per-step table
            Constraint::Length(1), // notice
            Constraint::Length(1), // legend
        ])
        .split(area);

    let Some(record) = app.last_record.as_ref() else {
        Paragraph::new("No results yet.")
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
        return;
    };

    let score = match record.animal_score() {
        Some(score) => format!("Animal score {score}/{QUIZ_ITEMS}"),
        None => "Animal step not taken".to_string(),
    };
    let finished = record
        .completed_at
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    Paragraph::new(vec![
        Line::from(Span::styled(
            "Screening Complete",
            bold_style().fg(Color::Magenta),
        )),
        Line::from(Span::styled(score, bold_style().fg(Color::Green))),
        Line::from(Span::styled(
            format!(
                "started {}   finished {}",
                record.started_at.format("%Y-%m-%d %H:%M:%S"),
                finished
            ),
            dim_style(),
        )),
    ])
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let header = Row::new(vec![Cell::from("Step"), Cell::from("Answer")]).style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );
    let widths = [Constraint::Length(22), Constraint::Min(10)];
    Table::new(summary_rows(app.catalog(), record), widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Responses"))
        .column_spacing(2)
        .render(chunks[1], buf);

    render_notice(app.notice.as_ref(), chunks[2], buf);

    Paragraph::new(Span::styled(
        "(n) new screening / (d) dashboard / (h) home / (q) quit",
        legend_style(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[3], buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppState;
    use crate::ui::{render_to_text, test_app};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    #[test]
    fn shows_each_step_after_completion() {
        let mut app = test_app();
        app.start_screening();
        for _ in 0..5 {
            app.on_key(KeyEvent::new(KeyCode::Right, KeyModifiers::NONE));
        }
        assert_eq!(app.state, AppState::Results);

        let text = render_to_text(&app, 120, 30);
        assert!(text.contains("Screening Complete"));
        assert!(text.contains("Animal score 0/3"));
        assert!(text.contains("Sentence Repetition"));
        assert!(text.contains("0 sentence(s) repeated"));
    }

    #[test]
    fn empty_state() {
        let mut app = test_app();
        app.state = AppState::Results;
        assert!(render_to_text(&app, 80, 20).contains("No results yet."));
    }

    #[test]
    fn unanswered_steps_are_marked() {
        let catalog = Catalog::standard();
        let record = ResultRecord::new(
            chrono::Local::now(),
            None,
            &crate::responses::ResponseCollector::new(),
        );
        assert_eq!(summary_rows(&catalog, &record).len(), catalog.len());
    }
}
