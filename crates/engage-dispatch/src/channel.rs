//! Delivery channels for reward events.

use std::time::Duration;

use async_trait::async_trait;
use engage_core::RewardEvent;
use reqwest::{Client, Url};

use crate::error::DispatchError;

/// Longest response body kept in a [`DispatchError::Status`].
const MAX_ERROR_BODY: usize = 300;

/// One way of handing a reward event to the downstream service.
#[async_trait]
pub trait RewardChannel: Send + Sync {
    /// Short label used in logs and errors.
    fn name(&self) -> &str;

    /// Delivers `event`, succeeding only when the service acknowledged it.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] on transport failure, a non-2xx status, a
    /// non-JSON body, or an explicit rejection.
    async fn send(&self, event: &RewardEvent) -> Result<(), DispatchError>;
}

/// POSTs the event as JSON to a fixed endpoint.
pub struct HttpChannel {
    name: String,
    client: Client,
    url: Url,
    api_key: Option<String>,
}

impl HttpChannel {
    /// # Errors
    ///
    /// Returns [`DispatchError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`DispatchError::InvalidUrl`] if `url` does not parse.
    pub fn new(
        name: &str,
        url: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(5)))
            .user_agent("engage-poller/0.1")
            .build()?;
        let parsed = Url::parse(url).map_err(|e| DispatchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            name: name.to_string(),
            client,
            url: parsed,
            api_key: api_key.map(str::to_string),
        })
    }
}

#[async_trait]
impl RewardChannel for HttpChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, event: &RewardEvent) -> Result<(), DispatchError> {
        let mut request = self.client.post(self.url.clone()).json(event);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DispatchError::Status {
                channel: self.name.clone(),
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }
        check_acknowledgement(&self.name, &body)
    }
}

/// Accepts any JSON body unless it carries `"success": false`.
pub(crate) fn check_acknowledgement(channel: &str, body: &str) -> Result<(), DispatchError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|source| DispatchError::NotJson {
            channel: channel.to_string(),
            source,
        })?;

    if value.get("success").and_then(serde_json::Value::as_bool) == Some(false) {
        let message = value
            .get("error")
            .or_else(|| value.get("message"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or("no reason given")
            .to_string();
        return Err(DispatchError::Rejected {
            channel: channel.to_string(),
            message,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json_ack_is_success() {
        assert!(check_acknowledgement("public", r#"{"id":"r-1"}"#).is_ok());
        assert!(check_acknowledgement("public", r#"{"success":true}"#).is_ok());
    }

    #[test]
    fn html_body_is_not_json() {
        let err = check_acknowledgement("internal", "<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, DispatchError::NotJson { ref channel, .. } if channel == "internal"));
    }

    #[test]
    fn explicit_failure_is_rejected_with_reason() {
        let err =
            check_acknowledgement("public", r#"{"success":false,"error":"unknown brand"}"#)
                .unwrap_err();
        assert!(err.to_string().contains("unknown brand"));
    }

    #[test]
    fn unparsable_endpoint_is_rejected() {
        let err = HttpChannel::new("public", "not a url", None, 5)
            .err()
            .expect("construction should fail");
        assert!(matches!(err, DispatchError::InvalidUrl { .. }));
    }
}
