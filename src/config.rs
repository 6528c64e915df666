use std::env;

use dotenv::dotenv;

use crate::error::ConfigError;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_MAIL_FROM: &str = "Join Events <no-reply@localhost>";
const DEFAULT_TEMPLATE_DIR: &str = "templates";
const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: Option<String>,
    pub base_url: String,
    pub mail_from: String,
    pub mail_relay_url: Option<String>,
    pub mail_relay_token: Option<String>,
    pub template_dir: String,
    pub concurrency: usize,
}

impl Config {
    /// Reads settings from the environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let concurrency = match env::var("INVITE_CONCURRENCY") {
            Ok(raw) => parse_concurrency(&raw)?,
            Err(_) => DEFAULT_CONCURRENCY,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok(),
            base_url: env::var("APP_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            mail_from: env::var("MAIL_FROM").unwrap_or_else(|_| DEFAULT_MAIL_FROM.to_string()),
            mail_relay_url: env::var("MAIL_RELAY_URL").ok(),
            mail_relay_token: env::var("MAIL_RELAY_TOKEN").ok(),
            template_dir: env::var("TEMPLATE_DIR")
                .unwrap_or_else(|_| DEFAULT_TEMPLATE_DIR.to_string()),
            concurrency,
        })
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            base_url: self.base_url.clone(),
            concurrency: self.concurrency,
        }
    }
}

/// What the batch processor needs from configuration.
#[derive(Clone, Debug)]
pub struct DispatchSettings {
    pub base_url: String,
    pub concurrency: usize,
}

impl DispatchSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

fn parse_concurrency(raw: &str) -> Result<usize, ConfigError> {
    raw.trim()
        .parse::<usize>()
        .map(|n| n.max(1))
        .map_err(|_| ConfigError::InvalidNumber {
            name: "INVITE_CONCURRENCY",
            value: raw.to_string(),
        })
}
