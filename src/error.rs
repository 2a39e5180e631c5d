use thiserror::Error;

/// Every failure a polling cycle can run into.
#[derive(Debug, Error)]
pub enum BotError {
    /// Transport failure, non-200 status or an undecodable body. `body` is
    /// kept for logs only and stays out of the rendered message.
    #[error("status endpoint unavailable: {reason} (status: {status:?})")]
    EndpointUnavailable {
        status: Option<u16>,
        reason: String,
        body: String,
    },
    #[error("malformed API response: {0}")]
    MalformedResponse(String),
    #[error("missing field `{0}` in homework record")]
    MissingField(&'static str),
    #[error("unknown homework status: {0}")]
    UnknownVerdict(String),
    #[error("failed to send notification: {0}")]
    NotificationSendFailure(String),
}

impl BotError {
    pub(crate) fn unavailable(reason: impl Into<String>) -> Self {
        BotError::EndpointUnavailable {
            status: None,
            reason: reason.into(),
            body: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_error_text_omits_body() {
        let page = format!("<html>{}</html>", "x".repeat(5000));
        let err = BotError::EndpointUnavailable {
            status: Some(502),
            reason: "Bad Gateway".into(),
            body: page,
        };
        let text = err.to_string();
        assert_eq!(text, "status endpoint unavailable: Bad Gateway (status: Some(502))");
        assert!(!text.contains("<html>"));
    }
}
