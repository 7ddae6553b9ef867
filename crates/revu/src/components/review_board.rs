use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use ratatui::{prelude::*, widgets::*};
use revu_config::DisplayZone;
use revu_provider::{
    models::{Review, ReviewId},
    FetchError, ReviewProvider,
};
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    action::{Action, DetailOutcome, FetchFailed, ReviewAction},
    config::Config,
    format::{format_date, format_phone_number, format_relative, review_count_label},
    tui::Frame,
    view_state::{Mode, Settled, ViewState},
};

use super::{review_card::ReviewCard, Component};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];
const HELP: &str = " q quit · r refresh · j/k move · enter open · esc close · pgup/pgdn scroll";
const MIN_CARD_WIDTH: u16 = 44;
const MAX_COLUMNS: u16 = 3;

/// The review viewer: polls the backend and renders the collection as cards.
pub struct ReviewBoard {
    provider: ReviewProvider,
    action_tx: Option<UnboundedSender<Action>>,
    state: ViewState,
    selected: Option<ReviewId>,
    scroll_row: usize,
    detail: Option<Detail>,
    refresh_interval: Duration,
    zone: DisplayZone,
    ticks: usize,
    cancellation_token: CancellationToken,
    timer: Option<JoinHandle<()>>,
}

struct Detail {
    review: Review,
    status: DetailStatus,
    scroll: u16,
    page: u16,
}

impl Detail {
    fn new(review: Review) -> Self {
        Self {
            review,
            status: DetailStatus::Loading,
            scroll: 0,
            page: 1,
        }
    }

    /// Moves the view by `rows`; the upper bound is applied when drawing,
    /// once the wrapped length is known.
    fn scroll_by(&mut self, rows: i32) {
        let scroll = (self.scroll as i32 + rows).clamp(0, u16::MAX as i32);
        self.scroll = scroll as u16;
    }

    fn scroll_page(&mut self, forward: bool) {
        let page = self.page.max(1) as i32;
        self.scroll_by(if forward { page } else { -page });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetailStatus {
    Loading,
    Fresh,
    Missing,
    Stale,
}

impl ReviewBoard {
    pub fn new(provider: ReviewProvider) -> Self {
        let defaults = revu_config::ViewerConfig::default();

        Self {
            provider,
            action_tx: None,
            state: ViewState::new(),
            selected: None,
            scroll_row: 0,
            detail: None,
            refresh_interval: defaults.refresh_interval,
            zone: defaults.timezone,
            ticks: 0,
            cancellation_token: CancellationToken::new(),
            timer: None,
        }
    }

    fn sender(&self) -> anyhow::Result<UnboundedSender<Action>> {
        self.action_tx
            .clone()
            .context("action handler to be registered")
    }

    fn schedule_fetch(&mut self) -> anyhow::Result<()> {
        let tx = self.sender()?;
        let provider = self.provider.clone();
        let token = self.cancellation_token.clone();
        let ticket = self.state.begin_fetch();

        tracing::debug!(ticket, "fetching reviews");

        tokio::spawn(async move {
            let outcome = provider
                .list_reviews()
                .await
                .map_err(|e| FetchFailed {
                    cause: e.to_string(),
                });

            if token.is_cancelled() {
                tracing::debug!(ticket, "viewer is gone, dropping reviews response");
                return;
            }

            // A closed channel means the app loop has already shut down.
            let _ = tx.send(Action::Reviews(ReviewAction::Settled { ticket, outcome }));
        });

        Ok(())
    }

    fn start_polling(&mut self) -> anyhow::Result<()> {
        let tx = self.sender()?;
        let token = self.cancellation_token.clone();
        let period = self.refresh_interval;

        tracing::info!("polling reviews every {:?}", period);

        self.timer = Some(tokio::spawn(async move {
            // The first tick completes immediately and performs the initial load.
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if tx.send(Action::Reviews(ReviewAction::Poll)).is_err() {
                            break;
                        }
                    }
                }
            }

            tracing::debug!("stopped polling reviews");
        }));

        Ok(())
    }

    fn settle(&mut self, ticket: u64, outcome: Result<Vec<Review>, FetchFailed>) {
        if let Err(failed) = &outcome {
            tracing::warn!(ticket, "failed to fetch reviews: {}", failed.cause);
        }

        let previous = self.selected_index();

        match self.state.settle(ticket, outcome) {
            Settled::Applied => {
                tracing::debug!(ticket, count = self.state.reviews().len(), "applied reviews");
                self.reconcile_selection(previous);
            }
            Settled::Discarded => {
                tracing::debug!(ticket, "discarded reviews response older than the one shown");
            }
        }
    }

    fn selected_index(&self) -> Option<usize> {
        let id = self.selected?;
        self.state.reviews().iter().position(|r| r.id == id)
    }

    /// Keeps the selection on the same review across refreshes, falling back
    /// to the nearest position when that review is gone.
    fn reconcile_selection(&mut self, previous: Option<usize>) {
        if self.selected_index().is_some() {
            return;
        }

        let reviews = self.state.reviews();
        self.selected = match reviews.len() {
            0 => None,
            len => Some(reviews[previous.unwrap_or(0).min(len - 1)].id),
        };
    }

    fn move_selection(&mut self, forward: bool) {
        if let Some(detail) = &mut self.detail {
            detail.scroll_by(if forward { 1 } else { -1 });
            return;
        }

        let reviews = self.state.reviews();
        if reviews.is_empty() {
            return;
        }

        let current = self
            .selected
            .and_then(|id| reviews.iter().position(|r| r.id == id))
            .unwrap_or(0);
        let next = if forward {
            (current + 1).min(reviews.len() - 1)
        } else {
            current.saturating_sub(1)
        };

        self.selected = Some(reviews[next].id);
    }

    fn page_detail(&mut self, forward: bool) {
        if let Some(detail) = &mut self.detail {
            detail.scroll_page(forward);
        }
    }

    fn open_detail(&mut self) -> anyhow::Result<()> {
        if self.detail.is_some() {
            return Ok(());
        }
        let Some(index) = self.selected_index() else {
            return Ok(());
        };

        let review = self.state.reviews()[index].clone();
        let id = review.id;
        self.detail = Some(Detail::new(review));

        let tx = self.sender()?;
        let provider = self.provider.clone();
        let token = self.cancellation_token.clone();

        tokio::spawn(async move {
            let outcome = match provider.get_review(id).await {
                Ok(review) => DetailOutcome::Found(review),
                Err(FetchError::NotFound(_)) => DetailOutcome::Missing,
                Err(e) => DetailOutcome::Failed(e.to_string()),
            };

            if token.is_cancelled() {
                return;
            }

            let _ = tx.send(Action::Reviews(ReviewAction::DetailLoaded { id, outcome }));
        });

        Ok(())
    }

    fn apply_detail(&mut self, id: ReviewId, outcome: DetailOutcome) {
        let Some(detail) = self.detail.as_mut().filter(|d| d.review.id == id) else {
            tracing::debug!(id, "ignoring review detail, overlay was closed");
            return;
        };

        match outcome {
            DetailOutcome::Found(review) => {
                detail.review = review;
                detail.status = DetailStatus::Fresh;
            }
            DetailOutcome::Missing => detail.status = DetailStatus::Missing,
            DetailOutcome::Failed(cause) => {
                tracing::warn!(id, "failed to fetch review: {cause}");
                detail.status = DetailStatus::Stale;
            }
        }
    }

    fn spinner(&self) -> &'static str {
        SPINNER[self.ticks % SPINNER.len()]
    }

    fn draw_loading(&self, f: &mut Frame<'_>, area: Rect) {
        let popup = centered_rect(40, 20, area);

        f.render_widget(
            Paragraph::new(format!("{} Loading reviews...", self.spinner()))
                .alignment(Alignment::Center)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_type(BorderType::Rounded),
                ),
            popup,
        );
    }

    fn draw_header(&self, f: &mut Frame<'_>, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green))
            .title(Span::styled(
                " WhatsApp Product Reviews ",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(16)])
            .split(inner);

        f.render_widget(
            Paragraph::new("Real-time customer feedback via WhatsApp")
                .style(Style::default().fg(Color::DarkGray)),
            columns[0],
        );

        let refresh = if self.state.refreshing() {
            Span::styled(
                format!("{} Refreshing", self.spinner()),
                Style::default().fg(Color::DarkGray),
            )
        } else {
            Span::styled(
                "[r] Refresh",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )
        };
        f.render_widget(
            Paragraph::new(Line::from(refresh)).alignment(Alignment::Right),
            columns[1],
        );
    }

    fn draw_reviews(&mut self, f: &mut Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(area);

        let heading = Line::from(vec![
            Span::styled(
                "Customer Reviews",
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                review_count_label(self.state.reviews().len()),
                Style::default().fg(Color::Green),
            ),
        ]);
        f.render_widget(Paragraph::new(heading), chunks[0]);

        self.draw_grid(f, chunks[1]);
    }

    fn draw_grid(&mut self, f: &mut Frame<'_>, area: Rect) {
        let columns = grid_columns(area.width);
        let card_width = area.width / columns as u16;
        let selected = self.selected_index();
        let zone = self.zone;
        let now = Utc::now();

        let reviews = self.state.reviews();
        let rows = reviews.chunks(columns).collect::<Vec<_>>();
        let heights = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|review| ReviewCard::new(review, zone, now).height(card_width))
                    .max()
                    .unwrap_or(0)
            })
            .collect::<Vec<_>>();

        self.scroll_row = scroll_to_show(
            self.scroll_row,
            selected.map(|i| i / columns),
            &heights,
            area.height,
        );

        let mut y = area.y;
        for (row_index, row) in rows.iter().enumerate().skip(self.scroll_row) {
            if y >= area.bottom() {
                break;
            }
            let height = heights[row_index].min(area.bottom() - y);

            for (column, review) in row.iter().enumerate() {
                let rect = Rect::new(area.x + column as u16 * card_width, y, card_width, height);
                let card = ReviewCard::new(review, zone, now)
                    .selected(selected == Some(row_index * columns + column));

                f.render_widget(card, rect);
            }

            y += height;
        }
    }

    fn draw_detail(&self, f: &mut Frame<'_>, area: Rect, detail: &mut Detail) {
        let popup = centered_rect(80, 80, area);

        let review = &detail.review;
        let muted = Style::default().fg(Color::DarkGray);

        let mut lines = vec![
            Line::styled(
                review.user_name.as_str(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Line::styled(format_phone_number(&review.contact_number), muted),
            Line::styled(
                format!(
                    "{} · {}",
                    format_date(&review.created_at, self.zone),
                    format_relative(&review.created_at, Utc::now())
                ),
                muted,
            ),
            Line::from(vec![
                Span::raw("Product: "),
                Span::styled(
                    review.product_name.as_str(),
                    Style::default().fg(Color::Cyan),
                ),
            ]),
        ];

        match detail.status {
            DetailStatus::Loading => lines.push(Line::styled("Refreshing from server...", muted)),
            DetailStatus::Fresh => {}
            DetailStatus::Missing => lines.push(Line::styled(
                "This review no longer exists on the server.",
                Style::default().fg(Color::Red),
            )),
            DetailStatus::Stale => lines.push(Line::styled(
                "Could not reach the backend; showing the cached copy.",
                Style::default().fg(Color::Yellow),
            )),
        }

        lines.push(Line::default());
        lines.extend(review.product_review.split('\n').map(Line::raw));

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Yellow))
            .title(format!(" Review #{} ", review.id));
        let inner = block.inner(popup);

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
        let content = paragraph.line_count(inner.width).min(u16::MAX as usize) as u16;
        let max_scroll = content.saturating_sub(inner.height);

        detail.scroll = detail.scroll.min(max_scroll);
        detail.page = inner.height;

        f.render_widget(Clear, popup);
        f.render_widget(
            paragraph.scroll((detail.scroll, 0)).block(block),
            popup,
        );

        if max_scroll > 0 {
            let mut scroll_state = ScrollbarState::new(max_scroll as usize + 1)
                .position(detail.scroll as usize);

            f.render_stateful_widget(
                Scrollbar::default()
                    .orientation(ScrollbarOrientation::VerticalRight)
                    .begin_symbol(Some("↑"))
                    .end_symbol(Some("↓")),
                popup.inner(&Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut scroll_state,
            );
        }
    }
}

impl Component for ReviewBoard {
    fn register_action_handler(&mut self, tx: UnboundedSender<Action>) -> anyhow::Result<()> {
        self.action_tx = Some(tx);

        Ok(())
    }

    fn register_config_handler(&mut self, config: Config) -> anyhow::Result<()> {
        self.refresh_interval = config.viewer.refresh_interval;
        self.zone = config.viewer.timezone;

        Ok(())
    }

    fn init(&mut self) -> anyhow::Result<()> {
        self.start_polling()
    }

    fn update(&mut self, action: Action) -> anyhow::Result<Option<Action>> {
        match action {
            Action::Tick => self.ticks = self.ticks.wrapping_add(1),
            Action::Refresh => {
                if self.state.refreshing() {
                    tracing::debug!("refresh already in progress");
                } else {
                    self.schedule_fetch()?;
                }
            }
            Action::SelectNext => self.move_selection(true),
            Action::SelectPrevious => self.move_selection(false),
            Action::PageDown => self.page_detail(true),
            Action::PageUp => self.page_detail(false),
            Action::OpenDetail => self.open_detail()?,
            Action::CloseDetail => self.detail = None,
            Action::Reviews(action) => match action {
                ReviewAction::Poll => self.schedule_fetch()?,
                ReviewAction::Settled { ticket, outcome } => self.settle(ticket, outcome),
                ReviewAction::DetailLoaded { id, outcome } => self.apply_detail(id, outcome),
            },
            _ => {}
        }

        Ok(None)
    }

    fn draw(&mut self, f: &mut Frame<'_>, area: Rect) -> anyhow::Result<()> {
        if self.state.mode() == Mode::Loading {
            self.draw_loading(f, area);
            return Ok(());
        }

        let banner_height = if self.state.error().is_some() { 3 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(banner_height),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        self.draw_header(f, chunks[0]);

        if let Some(message) = self.state.error() {
            f.render_widget(
                Paragraph::new(format!("⚠ {message}"))
                    .style(Style::default().fg(Color::Red))
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .border_style(Style::default().fg(Color::Red)),
                    ),
                chunks[1],
            );
        }

        if self.state.shows_grid() {
            self.draw_reviews(f, chunks[2]);
        } else if self.state.shows_empty_state() {
            draw_empty_state(f, chunks[2]);
        }

        f.render_widget(
            Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray)),
            chunks[3],
        );

        if let Some(mut detail) = self.detail.take() {
            self.draw_detail(f, area, &mut detail);
            self.detail = Some(detail);
        }

        Ok(())
    }

    fn unmount(&mut self) -> anyhow::Result<()> {
        self.cancellation_token.cancel();
        self.timer = None;

        Ok(())
    }
}

impl Drop for ReviewBoard {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

fn draw_empty_state(f: &mut Frame<'_>, area: Rect) {
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let text = vec![
        Line::styled("No Reviews Yet", bold),
        Line::default(),
        Line::raw("Reviews submitted via WhatsApp will appear here."),
        Line::default(),
        Line::styled("How to submit a review:", bold),
        Line::raw("1. Send a message to the WhatsApp number"),
        Line::raw("2. Follow the conversation prompts"),
        Line::raw("3. Your review will appear here automatically"),
    ];

    f.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded),
            ),
        area,
    );
}

fn grid_columns(width: u16) -> usize {
    (width / MIN_CARD_WIDTH).clamp(1, MAX_COLUMNS) as usize
}

/// First row to draw so that `target` is fully visible, moving as little as
/// possible from `current`.
fn scroll_to_show(current: usize, target: Option<usize>, heights: &[u16], viewport: u16) -> usize {
    let mut first = current.min(heights.len().saturating_sub(1));

    let Some(target) = target else {
        return first;
    };
    if target < first {
        return target;
    }

    while first < target
        && heights[first..=target].iter().map(|h| *h as u32).sum::<u32>() > viewport as u32
    {
        first += 1;
    }

    first
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
