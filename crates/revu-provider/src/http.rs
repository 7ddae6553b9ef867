use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    models::{Review, ReviewId},
    traits::ReviewSource,
    FetchError,
};

pub struct HttpOptions {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            timeout: Duration::from_secs(10),
        }
    }
}

pub struct HttpReviewSource {
    client: Client,
    base_url: String,
}

impl HttpReviewSource {
    pub fn new(options: HttpOptions) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("revu/", env!("CARGO_PKG_VERSION")))
            .timeout(options.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: options.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn reviews_url(&self) -> String {
        format!("{}/api/reviews", self.base_url)
    }

    fn review_url(&self, id: ReviewId) -> String {
        format!("{}/api/reviews/{}", self.base_url, id)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
    ) -> Result<(StatusCode, Option<T>), FetchError> {
        tracing::debug!("GET {}", url);

        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.clone(),
                source,
            })?;

        // Only a plain 200 carries a collection; other 2xx responses are not
        // part of the contract.
        let status = res.status();
        if status != StatusCode::OK {
            return Ok((status, None));
        }

        let body = res.text().await.map_err(|source| FetchError::Transport {
            url: url.clone(),
            source,
        })?;

        let item = serde_json::from_str(&body).map_err(|source| FetchError::Payload { url, source })?;

        Ok((status, Some(item)))
    }
}

#[async_trait]
impl ReviewSource for HttpReviewSource {
    async fn list_reviews(&self) -> Result<Vec<Review>, FetchError> {
        let url = self.reviews_url();

        match self.get_json(url.clone()).await? {
            (_, Some(reviews)) => Ok(reviews),
            (status, None) => Err(FetchError::Status { url, status }),
        }
    }

    async fn get_review(&self, id: ReviewId) -> Result<Review, FetchError> {
        let url = self.review_url(id);

        match self.get_json(url.clone()).await? {
            (_, Some(review)) => Ok(review),
            (StatusCode::NOT_FOUND, None) => Err(FetchError::NotFound(id)),
            (status, None) => Err(FetchError::Status { url, status }),
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };
    use tracing_test::traced_test;

    use super::{HttpOptions, HttpReviewSource};
    use crate::{traits::ReviewSource, FetchError, StatusCode};

    const ONE_REVIEW: &str = r#"[{"id":1,"user_name":"Ana","contact_number":"whatsapp:+1555","product_name":"Widget","product_review":"Great!","created_at":"2024-01-05T15:42:00.000123"}]"#;

    /// Answers exactly one request with the given status line and body and
    /// hands back the raw request it saw.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{addr}/"), handle)
    }

    fn source(base_url: String) -> HttpReviewSource {
        HttpReviewSource::new(HttpOptions {
            base_url,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    #[traced_test]
    async fn test_lists_reviews() -> anyhow::Result<()> {
        let (base_url, server) = serve_once("200 OK", ONE_REVIEW).await;

        let reviews = source(base_url).list_reviews().await?;

        assert_eq!(1, reviews.len());
        assert_eq!("Widget", reviews[0].product_name);

        let request = server.await?;
        assert!(request.starts_with("GET /api/reviews HTTP/1.1"));
        assert!(logs_contain("/api/reviews"));

        Ok(())
    }

    #[tokio::test]
    async fn test_server_error_is_a_status_failure() -> anyhow::Result<()> {
        let (base_url, _server) = serve_once("500 Internal Server Error", "{}").await;

        let err = source(base_url).list_reviews().await.unwrap_err();

        assert!(matches!(
            err,
            FetchError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                ..
            }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_non_array_body_is_a_payload_failure() -> anyhow::Result<()> {
        let (base_url, _server) =
            serve_once("200 OK", r#"{"message":"WhatsApp Product Review Collector API"}"#).await;

        let err = source(base_url).list_reviews().await.unwrap_err();

        assert!(matches!(err, FetchError::Payload { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_other_success_statuses_are_rejected() -> anyhow::Result<()> {
        let (base_url, _server) = serve_once("201 Created", ONE_REVIEW).await;

        let err = source(base_url).list_reviews().await.unwrap_err();

        assert!(matches!(
            err,
            FetchError::Status {
                status: StatusCode::CREATED,
                ..
            }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_a_transport_failure() -> anyhow::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let err = source(format!("http://{addr}"))
            .list_reviews()
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Transport { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_review_is_not_found() -> anyhow::Result<()> {
        let (base_url, server) =
            serve_once("404 Not Found", r#"{"detail":"Review not found"}"#).await;

        let err = source(base_url).get_review(42).await.unwrap_err();

        assert!(matches!(err, FetchError::NotFound(42)));
        assert!(server.await?.starts_with("GET /api/reviews/42 HTTP/1.1"));

        Ok(())
    }
}
