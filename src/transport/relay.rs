use async_trait::async_trait;
use log::debug;
use serde::Serialize;

use super::Transport;
use crate::{config::Config, error::TransportError};

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Posts each message as JSON to an HTTP mail relay.
#[derive(Debug, Clone)]
pub struct RelayTransport {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    from: String,
}

impl RelayTransport {
    pub fn new(endpoint: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            token: None,
            from: from.into(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// `None` when no relay URL is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        let endpoint = config.mail_relay_url.as_ref()?;
        let transport = Self::new(endpoint.clone(), config.mail_from.clone());
        Some(match &config.mail_relay_token {
            Some(token) => transport.with_token(token.clone()),
            None => transport,
        })
    }
}

#[async_trait]
impl Transport for RelayTransport {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), TransportError> {
        let mut request = self.client.post(&self.endpoint).json(&RelayMessage {
            from: &self.from,
            to,
            subject,
            html,
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Relay accepted email to {}", to);
        Ok(())
    }
}
