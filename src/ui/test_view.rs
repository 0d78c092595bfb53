use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthChar;

use super::{
    bold_style, dim_style, legend_style, progress::render_progress, render_notice,
    HORIZONTAL_MARGIN, VERTICAL_MARGIN,
};
use crate::app::App;
use crate::catalog::{TestContent, QUIZ_ITEMS};
use crate::session::{ScreeningSession, StepDraft};

const CURSOR: &str = "▏";

/// Right-most part of `text` that fits in `width` terminal cells
pub fn visible_tail(text: &str, width: usize) -> &str {
    let mut used = 0;
    let mut start = text.len();
    for (i, c) in text.char_indices().rev() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        start = i;
    }
    &text[start..]
}

pub fn render_test(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(session) = app.session.as_ref() else {
        Paragraph::new("No screening in progress. Press (esc) to return home.")
            .alignment(Alignment::Center)
            .render(area, buf);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(3), // progress
            Constraint::Min(6),    // step card
            Constraint::Length(3), // input
            Constraint::Length(1), // notice
            Constraint::Length(1), // legend
        ])
        .split(area);

    render_progress(
        session.catalog().steps(),
        session.sequencer(),
        chunks[0],
        buf,
    );
    render_step_card(session, chunks[1], buf);
    render_input(session, chunks[2], buf);
    render_notice(app.notice.as_ref(), chunks[3], buf);

    let sequencer = session.sequencer();
    let mut legend = vec!["(enter) submit"];
    if !sequencer.is_first() {
        legend.push("(←) back");
    }
    legend.push(if sequencer.is_last() {
        "(→) finish"
    } else {
        "(→) next"
    });
    legend.push("(F2) speak");
    legend.push("(esc) quit test");
    Paragraph::new(Span::styled(legend.join(" / "), legend_style()))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
}

fn render_step_card(session: &ScreeningSession, area: Rect, buf: &mut Buffer) {
    let step = session.current_step();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(format!(" {} ", step.title), bold_style()));

    let Some(content) = session.current_content() else {
        Paragraph::new(step.description.as_str())
            .block(block)
            .wrap(Wrap { trim: true })
            .render(area, buf);
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            content.title().to_string(),
            bold_style().fg(Color::Magenta),
        )),
        Line::from(Span::styled(content.instruction().to_string(), dim_style())),
        Line::default(),
    ];

    match content {
        TestContent::AnimalGuess { .. } => lines.extend(animal_lines(session)),
        other => {
            if let Some(draft) = session.current_draft() {
                lines.extend(draft_lines(other, draft));
            }
        }
    }

    Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .render(area, buf);
}

fn score_line(score: u8) -> Line<'static> {
    Line::from(vec![
        Span::raw("Current Score: "),
        Span::styled(format!("{score}/{QUIZ_ITEMS}"), bold_style().fg(Color::Green)),
    ])
}

fn animal_lines(session: &ScreeningSession) -> Vec<Line<'static>> {
    let Some(quiz) = session.quiz() else {
        return vec![Line::from(Span::styled(
            "Not enough animal pictures to run this step.",
            Style::default().fg(Color::Red),
        ))];
    };

    if quiz.is_done() {
        let guesses = quiz
            .guesses()
            .iter()
            .map(|g| if g.is_empty() { "-" } else { g.as_str() })
            .join(", ");
        return vec![
            Line::from(Span::styled("All animals answered.", bold_style())),
            Line::from(format!("Your guesses: {guesses}")),
            score_line(quiz.score()),
        ];
    }

    let n = quiz.current_index() + 1;
    let clue = quiz
        .current_item()
        .map(|card| card.clue.as_str())
        .filter(|clue| !clue.is_empty())
        .unwrap_or("No description for this picture.");
    vec![
        Line::from(Span::styled(
            format!("Animal {n} of {QUIZ_ITEMS}"),
            bold_style(),
        )),
        Line::from(vec![
            Span::styled(
                format!(" picture {n} "),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::REVERSED),
            ),
            Span::raw(" "),
            Span::styled(clue.to_string(), bold_style().fg(Color::Yellow)),
        ]),
        score_line(quiz.score()),
    ]
}

fn checklist(items: impl Iterator<Item = String>, done: usize) -> Vec<Line<'static>> {
    items
        .enumerate()
        .map(|(i, item)| {
            if i < done {
                Line::from(Span::styled(
                    format!("✓ {item}"),
                    Style::default().fg(Color::Green),
                ))
            } else {
                Line::from(format!("  {item}"))
            }
        })
        .collect()
}

fn entries_line(draft: &StepDraft) -> Line<'static> {
    if draft.entries().is_empty() {
        return Line::from(Span::styled("No answers yet", dim_style()));
    }
    let joined = draft
        .entries()
        .iter()
        .enumerate()
        .map(|(i, e)| format!("{}. {e}", i + 1))
        .join("   ");
    Line::from(vec![Span::styled("Answers: ", bold_style()), Span::raw(joined)])
}

fn draft_lines(content: &TestContent, draft: &StepDraft) -> Vec<Line<'static>> {
    let done = draft.entries().len();
    let mut lines = match content {
        TestContent::Naming { images, .. } => checklist(
            images.iter().map(|img| format!("{}. {}", img.id, img.description)),
            done,
        ),
        TestContent::Repetition { sentences, .. } => checklist(
            sentences
                .iter()
                .enumerate()
                .map(|(i, s)| format!("{}. \"{s}\"", i + 1)),
            done,
        ),
        TestContent::Abstraction { pairs, .. } => checklist(
            pairs
                .iter()
                .map(|p| format!("{} and {}", p.first, p.second)),
            done,
        ),
        TestContent::Memory { words, .. } => {
            // Words stay visible until the patient starts recalling them
            if draft.entries().is_empty() && draft.input().is_empty() {
                vec![Line::from(Span::styled(
                    words.join("    "),
                    bold_style().fg(Color::Cyan),
                ))]
            } else {
                vec![Line::from(Span::styled(
                    "The words are hidden. Type the ones you remember.",
                    dim_style(),
                ))]
            }
        }
        TestContent::Fluency { .. } => vec![fluency_timer_line(draft)],
        TestContent::AnimalGuess { .. } => Vec::new(),
    };
    lines.push(Line::default());
    lines.push(entries_line(draft));
    lines
}

fn fluency_timer_line(draft: &StepDraft) -> Line<'static> {
    match (draft.seconds_remaining(), draft.time_limit()) {
        (Some(_), _) if draft.time_expired() => Line::from(Span::styled(
            "Time is up",
            bold_style().fg(Color::Red),
        )),
        (Some(remaining), _) => Line::from(Span::styled(
            format!("{:.0}s remaining", remaining.ceil()),
            bold_style().fg(Color::Yellow),
        )),
        (None, Some(limit)) => Line::from(Span::styled(
            format!("{limit:.0}s, starts when you begin typing"),
            dim_style(),
        )),
        (None, None) => Line::default(),
    }
}

fn render_input(session: &ScreeningSession, area: Rect, buf: &mut Buffer) {
    let title = if session.is_recording() {
        Span::styled(
            format!(" ● Recording ({}) ", session.voice().backend_name()),
            bold_style().fg(Color::Red),
        )
    } else {
        Span::styled(" Your answer ", dim_style())
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    let inner_width = area.width.saturating_sub(3) as usize;
    let text = visible_tail(session.input(), inner_width);
    Paragraph::new(Line::from(vec![
        Span::raw(text.to_string()),
        Span::styled(CURSOR, Style::default().add_modifier(Modifier::SLOW_BLINK)),
    ]))
    .block(block)
    .render(area, buf);
}
