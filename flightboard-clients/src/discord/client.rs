//! Discord REST client implementing the chat transport

use super::types::{ApiError, MessagePayload, MessageResponse, UNKNOWN_CHANNEL_CODE};
use crate::build_http_client;
use async_trait::async_trait;
use flightboard_core::{
    ApiToken, ClientConfig, ConfigError, MessageId, RenderedMessage, TransportError,
};
use flightboard_sync::ChatTransport;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

const DISCORD_USER_AGENT: &str = concat!("DiscordBot (flightboard, ", env!("CARGO_PKG_VERSION"), ")");

/// Posts and edits the board message in one channel.
#[derive(Clone)]
pub struct DiscordClient {
    client: Client,
    token: ApiToken,
    base_url: String,
    channel_id: u64,
}

impl DiscordClient {
    /// Create a client for `channel_id`.
    ///
    /// # Arguments
    /// * `token` - Bot token, sent as `Authorization: Bot <token>`
    /// * `channel_id` - Channel holding the board message
    /// * `timeout` - Per-request network timeout
    pub fn new(token: ApiToken, channel_id: u64, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            token,
            base_url: flightboard_core::config::DEFAULT_DISCORD_API_BASE.to_string(),
            channel_id,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.discord_token.clone(),
            config.channel_id,
            config.request_timeout,
        )?
        .with_base_url(&config.discord_api_base))
    }

    /// Point the client at another API root (a proxy or a test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn channel_id(&self) -> u64 {
        self.channel_id
    }

    fn messages_url(&self) -> String {
        format!("{}/channels/{}/messages", self.base_url, self.channel_id)
    }

    fn message_url(&self, id: MessageId) -> String {
        format!("{}/{}", self.messages_url(), id)
    }

    fn payload(&self, message: &RenderedMessage) -> MessagePayload {
        let (payload, dropped) = MessagePayload::from_rendered(message);
        if dropped > 0 {
            tracing::warn!(
                channel_id = self.channel_id,
                dropped,
                total_chars = payload.total_chars(),
                "Board exceeds the embed field or size limit, extra rows omitted"
            );
        }
        payload
    }

    /// Send a request and classify any non-success response.
    async fn send(
        &self,
        request: RequestBuilder,
        target: Option<MessageId>,
    ) -> Result<Response, TransportError> {
        let response = request
            .header("Authorization", format!("Bot {}", self.token.expose()))
            .header("User-Agent", DISCORD_USER_AGENT)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(
            status.as_u16(),
            &body,
            retry_after.as_deref(),
            target,
        ))
    }
}

impl std::fmt::Debug for DiscordClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordClient")
            .field("base_url", &self.base_url)
            .field("channel_id", &self.channel_id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl ChatTransport for DiscordClient {
    async fn create_message(&self, message: &RenderedMessage) -> Result<MessageId, TransportError> {
        let request = self.client.post(self.messages_url()).json(&self.payload(message));
        let response = self.send(request, None).await?;

        let created: MessageResponse =
            response
                .json()
                .await
                .map_err(|e| TransportError::InvalidResponse {
                    reason: format!("Failed to parse created message: {}", e),
                })?;
        MessageId::parse(&created.id).ok_or_else(|| TransportError::InvalidResponse {
            reason: format!("Created message has invalid id {:?}", created.id),
        })
    }

    async fn edit_message(
        &self,
        id: MessageId,
        message: &RenderedMessage,
    ) -> Result<(), TransportError> {
        let request = self.client.patch(self.message_url(id)).json(&self.payload(message));
        self.send(request, Some(id)).await?;
        Ok(())
    }
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// Map a failed HTTP response to a transport error.
///
/// `target` is the message addressed by the call, if any. A 404 on an
/// addressed message means the message is gone, unless Discord reports the
/// channel itself as unknown.
pub fn classify_status(
    status: u16,
    body: &str,
    retry_after_header: Option<&str>,
    target: Option<MessageId>,
) -> TransportError {
    let api_error: ApiError = serde_json::from_str(body).unwrap_or_default();
    let reason = api_error
        .message
        .clone()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.chars().take(200).collect());

    match status {
        404 => match (target, api_error.code) {
            (_, Some(UNKNOWN_CHANNEL_CODE)) | (None, _) => TransportError::Permanent {
                status: Some(status),
                reason,
            },
            (Some(id), _) => TransportError::NotFound {
                message_id: id.to_string(),
            },
        },
        429 => {
            let seconds = api_error
                .retry_after
                .or_else(|| retry_after_header.and_then(|h| h.trim().parse::<f64>().ok()));
            TransportError::RateLimited {
                retry_after_ms: seconds
                    .filter(|s| s.is_finite() && *s >= 0.0)
                    .map(|s| (s * 1000.0).ceil() as u64),
            }
        }
        500 | 502 | 503 | 504 => TransportError::Transient {
            status: Some(status),
            reason,
        },
        _ => TransportError::Permanent {
            status: Some(status),
            reason,
        },
    }
}

fn classify_request_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() || err.is_connect() {
        TransportError::Transient {
            status: None,
            reason: format!("HTTP request failed: {}", err),
        }
    } else {
        TransportError::Permanent {
            status: None,
            reason: format!("HTTP request failed: {}", err),
        }
    }
}
