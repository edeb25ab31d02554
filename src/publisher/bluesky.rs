//! Bluesky (AT Protocol) publisher
//!
//! Two calls per post, no retry:
//! 1. `com.atproto.server.createSession` with handle + app password
//! 2. `com.atproto.repo.createRecord` with an `app.bsky.feed.post` record

use super::{AlertPublisher, PostKind, PublishError, PublishReceipt};
use crate::config::BlueskyCredentials;
use crate::debug_log::{DebugLevel, DebugLogger};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct Session {
    did: String,
    #[serde(rename = "accessJwt")]
    access_jwt: String,
}

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    #[serde(default)]
    uri: Option<String>,
}

pub struct BlueskyPublisher {
    http: reqwest::Client,
    pds_url: String,
    credentials: Option<BlueskyCredentials>,
    logger: DebugLogger,
}

impl BlueskyPublisher {
    pub fn new(
        http: reqwest::Client,
        pds_url: impl Into<String>,
        credentials: Option<BlueskyCredentials>,
        logger: DebugLogger,
    ) -> Self {
        Self {
            http,
            pds_url: pds_url.into(),
            credentials,
            logger,
        }
    }

    async fn login(&self, credentials: &BlueskyCredentials) -> Result<Session, PublishError> {
        self.logger.info(format!(
            "Attempting Bluesky login with handle: {}",
            credentials.handle
        ));
        self.logger.emit_fields(
            DebugLevel::Trace,
            "Login payload",
            &[
                ("identifier", credentials.handle.clone()),
                ("password", credentials.password.clone()),
            ],
        );

        let url = format!("{}/xrpc/com.atproto.server.createSession", self.pds_url);
        self.logger.detail(format!("Sending login request to {}", url));

        let response = self
            .http
            .post(&url)
            .json(&json!({
                "identifier": credentials.handle,
                "password": credentials.password,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Status {
                stage: "Bluesky login",
                status,
                body,
            });
        }

        let session: Session = response
            .json()
            .await
            .map_err(|e| PublishError::Decode(e.to_string()))?;
        self.logger
            .info(format!("Bluesky login successful for {}", credentials.handle));
        self.logger
            .trace(format!("Received session data with DID: {}", session.did));
        Ok(session)
    }

    async fn create_post(&self, session: &Session, text: &str) -> Result<PublishReceipt, PublishError> {
        self.logger.info("Creating Bluesky post");

        let payload = json!({
            "repo": session.did,
            "collection": "app.bsky.feed.post",
            "record": {
                "$type": "app.bsky.feed.post",
                "text": text,
                "createdAt": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        });
        if self.logger.enabled(DebugLevel::Trace) {
            let pretty = serde_json::to_string_pretty(&payload).unwrap_or_default();
            self.logger.trace(format!("Post request payload: {}", pretty));
        }

        let url = format!("{}/xrpc/com.atproto.repo.createRecord", self.pds_url);
        self.logger.detail(format!("Sending post request to {}", url));

        let response = self
            .http
            .post(&url)
            .bearer_auth(&session.access_jwt)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Status {
                stage: "Bluesky post creation",
                status,
                body,
            });
        }

        let record: CreatedRecord = response
            .json()
            .await
            .map_err(|e| PublishError::Decode(e.to_string()))?;
        Ok(PublishReceipt { uri: record.uri })
    }
}

#[async_trait]
impl AlertPublisher for BlueskyPublisher {
    async fn publish(&self, kind: PostKind, text: &str) -> Result<PublishReceipt, PublishError> {
        let credentials = self.credentials.as_ref().ok_or(PublishError::MissingCredentials)?;
        self.logger
            .info(format!("Preparing to post to Bluesky, post type: {}", kind.as_str()));

        let session = self.login(credentials).await?;
        self.create_post(&session, text).await
    }

    fn channel(&self) -> &'static str {
        "bluesky"
    }
}
