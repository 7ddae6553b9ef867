use revu_provider::models::Review;

use crate::action::FetchFailed;

pub const FETCH_FAILED_MESSAGE: &str =
    "Failed to fetch reviews. Make sure the backend is reachable.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Loading,
    Error,
    Empty,
    Populated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Applied,
    /// A newer request had already been applied.
    Discarded,
}

/// What the review board shows. Mutated only from the UI loop.
///
/// Every fetch takes a ticket from [`ViewState::begin_fetch`]; a response is
/// only applied when its ticket is newer than the last applied one, so a slow
/// response can never overwrite a fresher collection.
#[derive(Debug)]
pub struct ViewState {
    reviews: Vec<Review>,
    loading: bool,
    error: Option<String>,
    in_flight: usize,
    issued: u64,
    applied: u64,
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            reviews: Vec::new(),
            loading: true,
            error: None,
            in_flight: 0,
            issued: 0,
            applied: 0,
        }
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn refreshing(&self) -> bool {
        self.in_flight > 0
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn begin_fetch(&mut self) -> u64 {
        self.issued += 1;
        self.in_flight += 1;
        self.issued
    }

    pub fn settle(&mut self, ticket: u64, outcome: Result<Vec<Review>, FetchFailed>) -> Settled {
        self.loading = false;
        self.in_flight = self.in_flight.saturating_sub(1);

        if ticket <= self.applied {
            return Settled::Discarded;
        }
        self.applied = ticket;

        match outcome {
            Ok(reviews) => {
                self.reviews = reviews;
                self.error = None;
            }
            Err(_) => {
                self.error = Some(FETCH_FAILED_MESSAGE.to_string());
            }
        }

        Settled::Applied
    }

    pub fn mode(&self) -> Mode {
        if self.loading {
            Mode::Loading
        } else if self.error.is_some() {
            Mode::Error
        } else if self.reviews.is_empty() {
            Mode::Empty
        } else {
            Mode::Populated
        }
    }

    pub fn shows_empty_state(&self) -> bool {
        !self.loading && self.reviews.is_empty()
    }

    pub fn shows_grid(&self) -> bool {
        !self.loading && !self.reviews.is_empty()
    }
}
