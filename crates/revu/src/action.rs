use revu_provider::models::{Review, ReviewId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Tick,
    Render,
    Resize(u16, u16),
    Quit,
    Refresh,
    Error(String),
    SelectNext,
    SelectPrevious,
    PageDown,
    PageUp,
    OpenDetail,
    CloseDetail,
    Reviews(ReviewAction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewAction {
    /// Periodic refresh; unlike [`Action::Refresh`] it fires even while a
    /// fetch is outstanding.
    Poll,
    Settled {
        ticket: u64,
        outcome: Result<Vec<Review>, FetchFailed>,
    },
    DetailLoaded {
        id: ReviewId,
        outcome: DetailOutcome,
    },
}

/// A list fetch that did not produce a collection. `cause` is for the log
/// only and never reaches the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailed {
    pub cause: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailOutcome {
    Found(Review),
    Missing,
    Failed(String),
}
