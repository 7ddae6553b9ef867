use std::{ops::Deref, sync::Arc};

use crate::http::{HttpOptions, HttpReviewSource};

pub mod error;
pub mod http;
pub mod models;
pub mod traits;

pub use error::FetchError;
pub use reqwest::StatusCode;
pub use traits::ReviewSource;

/// Shared handle to whatever backend serves the review collection.
#[derive(Clone)]
pub struct ReviewProvider {
    source: Arc<dyn ReviewSource>,
}

impl ReviewProvider {
    pub fn new(source: impl ReviewSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn http(options: HttpOptions) -> anyhow::Result<Self> {
        let source = HttpReviewSource::new(options)?;

        Ok(Self::new(source))
    }
}

impl Deref for ReviewProvider {
    type Target = Arc<dyn ReviewSource>;

    fn deref(&self) -> &Self::Target {
        &self.source
    }
}
