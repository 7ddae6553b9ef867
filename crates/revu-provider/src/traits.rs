use async_trait::async_trait;

use crate::{
    models::{Review, ReviewId},
    FetchError,
};

#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Returns the complete current collection, in server order.
    async fn list_reviews(&self) -> Result<Vec<Review>, FetchError>;

    async fn get_review(&self, id: ReviewId) -> Result<Review, FetchError>;
}
