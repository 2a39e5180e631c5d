use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::fmt;
use tracing::{debug, error, info, instrument};

use crate::config::Config;
use crate::error::BotError;
use crate::model::Cursor;

/// Source of raw homework status batches.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// One request for every change since `cursor`. No retries.
    async fn fetch(&self, cursor: Cursor) -> Result<Value, BotError>;
}

#[derive(Clone)]
pub struct PracticumClient {
    http: Client,
    endpoint: Url,
    token: String,
}

impl fmt::Debug for PracticumClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticumClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl PracticumClient {
    pub fn new(http: Client, endpoint: Url, token: String) -> Self {
        Self {
            http,
            endpoint,
            token,
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let http = Client::builder()
            .user_agent("hw-statusbot/0.1")
            .timeout(cfg.app.request_timeout())
            .build()
            .context("failed to build HTTP client")?;
        let endpoint = cfg.endpoint_url()?;
        Ok(Self::new(http, endpoint, cfg.practicum.token.clone()))
    }

    pub fn build_request(&self, cursor: Cursor) -> Result<reqwest::Request, BotError> {
        let from_date = effective_cursor(cursor);
        self.http
            .get(self.endpoint.clone())
            .header("Authorization", format!("OAuth {}", self.token))
            .query(&[("from_date", from_date)])
            .build()
            .map_err(|err| BotError::unavailable(format!("failed to build request: {err}")))
    }
}

/// A zero cursor means "from now".
pub fn effective_cursor(cursor: Cursor) -> Cursor {
    if cursor == 0 {
        chrono::Utc::now().timestamp()
    } else {
        cursor
    }
}

#[async_trait]
impl StatusSource for PracticumClient {
    #[instrument(skip_all, fields(cursor = cursor))]
    async fn fetch(&self, cursor: Cursor) -> Result<Value, BotError> {
        let request = self.build_request(cursor)?;
        info!(url = %request.url(), "requesting homework statuses");

        let res = self.http.execute(request).await.map_err(|err| {
            error!(?err, "request to status endpoint failed");
            BotError::unavailable(format!("request failed: {err}"))
        })?;

        let status = res.status();
        if status != StatusCode::OK {
            let body = res.text().await.unwrap_or_default();
            error!(%status, %body, "status endpoint did not answer 200 OK");
            return Err(BotError::EndpointUnavailable {
                status: Some(status.as_u16()),
                reason: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
                body,
            });
        }

        let body = res.text().await.map_err(|err| {
            BotError::unavailable(format!("failed to read response body: {err}"))
        })?;
        let payload: Value = serde_json::from_str(&body).map_err(|err| {
            error!(?err, %body, "status endpoint returned invalid JSON");
            BotError::EndpointUnavailable {
                status: Some(status.as_u16()),
                reason: format!("invalid JSON: {err}"),
                body: body.clone(),
            }
        })?;
        debug!(%payload, "received homework statuses");
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> PracticumClient {
        PracticumClient::new(
            Client::new(),
            Url::parse("https://example.test/api/user_api/homework_statuses/").unwrap(),
            "secret".into(),
        )
    }

    #[test]
    fn request_carries_cursor_and_oauth_header() {
        let req = client().build_request(1_700_000_000).unwrap();
        assert_eq!(req.method(), reqwest::Method::GET);
        assert_eq!(req.url().query(), Some("from_date=1700000000"));
        assert_eq!(req.url().path(), "/api/user_api/homework_statuses/");
        assert_eq!(
            req.headers().get("Authorization").unwrap().to_str().unwrap(),
            "OAuth secret"
        );
    }

    #[test]
    fn zero_cursor_means_now() {
        let before = chrono::Utc::now().timestamp();
        let ts = effective_cursor(0);
        assert!(ts >= before);
        assert_eq!(effective_cursor(42), 42);
    }

    #[test]
    fn debug_hides_token() {
        assert!(!format!("{:?}", client()).contains("secret"));
    }

    const PATH: &str = "/api/user_api/homework_statuses/";

    fn mock_client(server: &MockServer) -> PracticumClient {
        let endpoint = Url::parse(&server.uri()).unwrap().join(PATH).unwrap();
        PracticumClient::new(Client::new(), endpoint, "secret".into())
    }

    #[tokio::test]
    async fn ok_response_is_returned_as_json() {
        let server = MockServer::start().await;
        let body = json!({
            "homeworks": [{"homework_name": "proj1", "status": "approved"}],
            "current_date": 1700000000
        });
        Mock::given(method("GET"))
            .and(path(PATH))
            .and(query_param("from_date", "1667322796"))
            .and(header("Authorization", "OAuth secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let payload = mock_client(&server).fetch(1_667_322_796).await.unwrap();
        assert_eq!(payload, body);
    }

    #[tokio::test]
    async fn non_ok_status_keeps_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .expect(1)
            .mount(&server)
            .await;

        let err = mock_client(&server).fetch(1).await.unwrap_err();
        match err {
            BotError::EndpointUnavailable { status, reason, body } => {
                assert_eq!(status, Some(503));
                assert_eq!(reason, "Service Unavailable");
                assert_eq!(body, "maintenance");
            }
            other => panic!("wrong error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_200_success_is_still_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let err = mock_client(&server).fetch(1).await.unwrap_err();
        assert!(matches!(err, BotError::EndpointUnavailable { status: Some(204), .. }));
    }

    #[tokio::test]
    async fn undecodable_body_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = mock_client(&server).fetch(1).await.unwrap_err();
        match err {
            BotError::EndpointUnavailable { status, reason, body } => {
                assert_eq!(status, Some(200));
                assert!(reason.starts_with("invalid JSON"));
                assert_eq!(body, "<html>oops</html>");
            }
            other => panic!("wrong error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_is_unavailable_without_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"homeworks": [], "current_date": 1}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let http = Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let endpoint = Url::parse(&server.uri()).unwrap().join(PATH).unwrap();
        let client = PracticumClient::new(http, endpoint, "secret".into());

        let err = client.fetch(1).await.unwrap_err();
        assert!(matches!(err, BotError::EndpointUnavailable { status: None, .. }));
    }
}
