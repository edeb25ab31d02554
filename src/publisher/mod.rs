//! Alert publishing boundary
//!
//! The monitor's obligation ends at handing rendered text to an
//! [`AlertPublisher`]. Publishing is fire-once: a failure is logged by
//! [`publish_alert`] and never retried, queued or escalated.
//!
//! Channels:
//! - `bluesky` - posts to a Bluesky PDS (needs credentials)
//! - [`LogPublisher`] - writes the text to the diagnostic log (`--dry-run`)

pub mod bluesky;
pub mod render;

pub use bluesky::BlueskyPublisher;
pub use render::render_alert;

use crate::debug_log::DebugLogger;
use crate::types::{AlertEvent, AlertKind};
use async_trait::async_trait;
use std::fmt;

/// Post category understood by the publishing channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Simulation,
    Alert,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::Simulation => "simulation",
            PostKind::Alert => "alert",
        }
    }
}

impl From<AlertKind> for PostKind {
    fn from(kind: AlertKind) -> Self {
        match kind {
            AlertKind::Simulation => PostKind::Simulation,
            AlertKind::Detonation => PostKind::Alert,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Channel-specific identifier of the created post, if any
    pub uri: Option<String>,
}

#[derive(Debug)]
pub enum PublishError {
    MissingCredentials,
    Http(reqwest::Error),
    Status {
        stage: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
    Decode(String),
}

impl From<reqwest::Error> for PublishError {
    fn from(err: reqwest::Error) -> Self {
        PublishError::Http(err)
    }
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::MissingCredentials => {
                write!(f, "Missing Bluesky credentials in environment variables")
            }
            PublishError::Http(e) => write!(f, "HTTP error: {}", e),
            PublishError::Status { stage, status, body } => {
                write!(f, "{} failed with status {}: {}", stage, status, body)
            }
            PublishError::Decode(e) => write!(f, "Unexpected response: {}", e),
        }
    }
}

impl std::error::Error for PublishError {}

#[async_trait]
pub trait AlertPublisher: Send + Sync {
    async fn publish(&self, kind: PostKind, text: &str) -> Result<PublishReceipt, PublishError>;

    /// Channel name for logging
    fn channel(&self) -> &'static str;
}

/// Publishes into the diagnostic log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPublisher {
    logger: DebugLogger,
}

impl LogPublisher {
    pub fn new(logger: DebugLogger) -> Self {
        Self { logger }
    }
}

#[async_trait]
impl AlertPublisher for LogPublisher {
    async fn publish(&self, kind: PostKind, text: &str) -> Result<PublishReceipt, PublishError> {
        self.logger.info(format!("[dry-run {} post]\n{}", kind.as_str(), text));
        Ok(PublishReceipt::default())
    }

    fn channel(&self) -> &'static str {
        "log"
    }
}

/// Render `alert`, publish it once and log the outcome.
///
/// Returns whether the channel accepted the post.
pub async fn publish_alert(publisher: &dyn AlertPublisher, alert: &AlertEvent, logger: &DebugLogger) -> bool {
    let kind = PostKind::from(alert.kind);
    logger.info(format!(
        "Preparing to publish to {}, post type: {}",
        publisher.channel(),
        kind.as_str()
    ));

    let text = render_alert(alert);
    logger.detail(format!("Final post content: {}", text));

    match publisher.publish(kind, &text).await {
        Ok(receipt) => {
            logger.info(format!(
                "✅ Post published, received URI: {}",
                receipt.uri.as_deref().unwrap_or("unknown")
            ));
            true
        }
        Err(PublishError::MissingCredentials) => {
            logger.error("Missing Bluesky credentials in environment variables; post skipped");
            false
        }
        Err(e) => {
            logger.error(format!("❌ Failed to publish {} post: {}", kind.as_str(), e));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coordinates;

    struct RejectingPublisher;

    #[async_trait]
    impl AlertPublisher for RejectingPublisher {
        async fn publish(&self, _kind: PostKind, _text: &str) -> Result<PublishReceipt, PublishError> {
            Err(PublishError::Decode("boom".to_string()))
        }

        fn channel(&self) -> &'static str {
            "rejecting"
        }
    }

    #[test]
    fn test_post_kind_mapping() {
        assert_eq!(PostKind::from(AlertKind::Detonation), PostKind::Alert);
        assert_eq!(PostKind::from(AlertKind::Simulation).as_str(), "simulation");
    }

    #[tokio::test]
    async fn test_log_publisher_accepts() {
        let alert = AlertEvent::simulation(Coordinates::new(1.0, 2.0), 10.0);
        let logger = DebugLogger::default();
        assert!(publish_alert(&LogPublisher::new(logger), &alert, &logger).await);
    }

    #[tokio::test]
    async fn test_failed_publish_reports_false() {
        let alert = AlertEvent::simulation(Coordinates::new(1.0, 2.0), 10.0);
        assert!(!publish_alert(&RejectingPublisher, &alert, &DebugLogger::default()).await);
    }
}
