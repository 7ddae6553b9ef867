use chrono::{DateTime, Utc};
use ratatui::{
    prelude::*,
    widgets::{
        block::{Position, Title},
        *,
    },
};
use revu_config::DisplayZone;
use revu_provider::models::Review;

use crate::format::{avatar_initial, format_date, format_phone_number, format_relative};

const BORDER: u16 = 2;

pub struct ReviewCard<'a> {
    review: &'a Review,
    zone: DisplayZone,
    now: DateTime<Utc>,
    selected: bool,
}

impl<'a> ReviewCard<'a> {
    pub fn new(review: &'a Review, zone: DisplayZone, now: DateTime<Utc>) -> Self {
        Self {
            review,
            zone,
            now,
            selected: false,
        }
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Height that fits the whole card, review body included, at the given
    /// outer width.
    pub fn height(&self, width: u16) -> u16 {
        let inner = width.saturating_sub(BORDER).max(1);
        let rows = self.body().line_count(inner);

        BORDER.saturating_add(rows.min(u16::MAX as usize) as u16)
    }

    /// Card content without the border, wrapped the same way for measuring
    /// and rendering.
    fn body(&self) -> Paragraph<'a> {
        Paragraph::new(self.lines()).wrap(Wrap { trim: false })
    }

    fn lines(&self) -> Vec<Line<'a>> {
        let review = self.review;
        let muted = Style::default().fg(Color::DarkGray);

        let mut lines = vec![
            Line::from(vec![
                Span::styled(
                    format!(" {} ", avatar_initial(&review.user_name)),
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(" "),
                Span::styled(
                    review.user_name.as_str(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::styled(format_phone_number(&review.contact_number), muted),
            Line::styled(
                format!(
                    "{} · {}",
                    format_date(&review.created_at, self.zone),
                    format_relative(&review.created_at, self.now)
                ),
                muted,
            ),
            Line::from(Span::styled(
                format!(" {} ", review.product_name),
                Style::default().fg(Color::Black).bg(Color::Cyan),
            )),
            Line::default(),
        ];

        lines.extend(review.product_review.split('\n').map(Line::raw));

        lines
    }
}

impl Widget for ReviewCard<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.selected {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(border_style);

        // The grid cuts cards off at the bottom of the screen; the detail
        // overlay shows the rest.
        if area.height < self.height(area.width) {
            block = block.title(
                Title::from(" enter: read more ")
                    .position(Position::Bottom)
                    .alignment(Alignment::Right),
            );
        }

        self.body().block(block).render(area, buf);
    }
}

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};
    use ratatui::{backend::TestBackend, Terminal};
    use revu_config::DisplayZone;
    use revu_provider::models::Review;

    use super::ReviewCard;

    fn review(body: &str) -> Review {
        Review {
            id: 1,
            user_name: "Ana".into(),
            contact_number: "whatsapp:+1555".into(),
            product_name: "Widget".into(),
            product_review: body.into(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 5, 15, 42, 0).unwrap(),
        }
    }

    /// Renders the card into a terminal exactly as tall as the card asks for.
    fn render_fitted(review: &Review, width: u16) -> Vec<String> {
        let card = ReviewCard::new(review, DisplayZone::Utc, review.created_at);
        let height = card.height(width);

        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|f| f.render_widget(card, f.size()))
            .unwrap();

        let buffer = terminal.backend().buffer();
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer.get(x, y).symbol())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn test_height_counts_header_and_body_lines() {
        let card_review = review("first\nsecond\nthird");
        let card = ReviewCard::new(&card_review, DisplayZone::Utc, card_review.created_at);

        // border, four header lines, a spacer, three body lines
        assert_eq!(2 + 5 + 3, card.height(60));
    }

    #[test]
    fn test_wide_characters_fit_in_the_card() {
        let body = format!("{} END", "好".repeat(37));

        let rows = render_fitted(&review(&body), 44);

        assert!(rows.iter().any(|row| row.contains("END")), "{rows:#?}");
        assert!(!rows.iter().any(|row| row.contains("read more")));
    }

    #[test]
    fn test_runs_of_spaces_fit_in_the_card() {
        let body = "aaaa          bbbb          cccc          dddd          eeee          END";

        let rows = render_fitted(&review(body), 24);

        assert!(rows.iter().any(|row| row.contains("END")), "{rows:#?}");
    }

    #[test]
    fn test_long_words_fit_in_the_card() {
        let body = format!("{}END", "a".repeat(70));

        let rows = render_fitted(&review(&body), 24);

        assert!(rows.iter().any(|row| row.contains("END")), "{rows:#?}");
    }

    #[test]
    fn test_clipped_card_points_at_the_detail_view() {
        let card_review = review("one\ntwo\nthree\nfour");
        let card = ReviewCard::new(&card_review, DisplayZone::Utc, card_review.created_at);

        let mut terminal = Terminal::new(TestBackend::new(40, 8)).unwrap();
        terminal
            .draw(|f| f.render_widget(card, f.size()))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let bottom = (0..40)
            .map(|x| buffer.get(x, 7).symbol())
            .collect::<String>();
        assert!(bottom.contains("enter: read more"), "{bottom}");
    }
}
