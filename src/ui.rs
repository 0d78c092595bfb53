pub mod charting;
pub mod dashboard;
pub mod progress;
pub mod results;
pub mod screen;
pub mod test_view;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};

use crate::app::{App, Notice, HOME_MENU};

pub const HORIZONTAL_MARGIN: u16 = 5;
pub const VERTICAL_MARGIN: u16 = 2;

const HOW_IT_WORKS: [(&str, &str); 3] = [
    (
        "Take the assessment",
        "A short series of naming, repetition, fluency, memory and abstraction tasks.",
    ),
    (
        "Answer by typing or speaking",
        "Type each answer, or use the voice key when a recognizer is configured.",
    ),
    (
        "Review the results",
        "Answers are summarised at the end for a clinician to review.",
    ),
];

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        screen::current_screen(self.state).render(self, area, buf);
    }
}

pub fn bold_style() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

pub fn dim_style() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

pub fn legend_style() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

pub fn render_notice(notice: Option<&Notice>, area: Rect, buf: &mut Buffer) {
    let Some(notice) = notice else {
        return;
    };
    let style = match notice {
        Notice::Info(_) => Style::default().fg(Color::Cyan),
        Notice::Error(_) => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    };
    Paragraph::new(Span::styled(notice.text().to_string(), style))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(area, buf);
}

pub fn render_home(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(3), // title + tagline
            Constraint::Min(4),    // how it works
            Constraint::Length(HOME_MENU.len() as u16 + 1),
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(vec![
        Line::from(Span::styled(
            "Cognitive Screening",
            bold_style().fg(Color::Magenta),
        )),
        Line::from(Span::styled(
            "A brief check of naming, language, memory and reasoning",
            dim_style(),
        )),
    ])
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let mut steps = Vec::new();
    for (i, (title, description)) in HOW_IT_WORKS.iter().enumerate() {
        steps.push(Line::from(vec![
            Span::styled(format!("{}. ", i + 1), bold_style().fg(Color::Cyan)),
            Span::styled(*title, bold_style()),
        ]));
        steps.push(Line::from(Span::styled(format!("   {description}"), dim_style())));
    }
    Paragraph::new(steps)
        .wrap(Wrap { trim: false })
        .render(chunks[1], buf);

    let menu: Vec<Line> = HOME_MENU
        .iter()
        .enumerate()
        .map(|(i, item)| {
            if i == app.menu_index {
                Line::from(Span::styled(
                    format!("> {item} <"),
                    bold_style().fg(Color::Green),
                ))
            } else {
                Line::from(Span::raw(item.to_string()))
            }
        })
        .collect();
    Paragraph::new(menu)
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    Paragraph::new(Span::styled(
        "(↑/↓) select / (enter) open / (s)tart / (d)ashboard / (q)uit",
        legend_style(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[3], buf);
}

/// Flattens a rendered buffer to text, for tests
#[cfg(test)]
pub(crate) fn buffer_text(buf: &Buffer) -> String {
    buf.content().iter().map(|c| c.symbol()).collect()
}

#[cfg(test)]
pub(crate) fn test_app() -> App {
    let (tx, _rx) = std::sync::mpsc::channel();
    App::new(
        crate::catalog::Catalog::standard(),
        crate::app::AppSettings {
            seed: Some(1),
            ..Default::default()
        },
        crate::voice::CaptureSink::from_sender(tx),
    )
}

#[cfg(test)]
pub(crate) fn render_to_text(app: &App, width: u16, height: u16) -> String {
    let area = Rect::new(0, 0, width, height);
    let mut buffer = Buffer::empty(area);
    app.render(area, &mut buffer);
    buffer_text(&buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppState;

    #[test]
    fn home_screen_shows_menu() {
        let app = test_app();
        let rendered = render_to_text(&app, 100, 30);
        assert!(rendered.contains("Cognitive Screening"));
        assert!(rendered.contains("Start screening"));
        assert!(rendered.contains("Clinician dashboard"));
    }

    #[test]
    fn every_screen_renders_in_small_areas() {
        let mut app = test_app();
        for state in [
            AppState::Home,
            AppState::Test,
            AppState::Results,
            AppState::Dashboard,
        ] {
            if state == AppState::Test {
                app.start_screening();
            }
            app.state = state;
            for (w, h) in [(80, 24), (200, 5), (20, 40), (1, 1)] {
                let area = Rect::new(0, 0, w, h);
                let mut buffer = Buffer::empty(area);
                (&app).render(area, &mut buffer);
                assert!(*buffer.area() == area);
            }
        }
    }

    #[test]
    fn notice_is_rendered() {
        let area = Rect::new(0, 0, 60, 1);
        let mut buffer = Buffer::empty(area);
        render_notice(
            Some(&Notice::Error("nothing to submit".into())),
            area,
            &mut buffer,
        );
        assert!(buffer_text(&buffer).contains("nothing to submit"));
    }
}
