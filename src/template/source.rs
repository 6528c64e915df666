use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::fs;

use crate::{config::Config, error::TemplateError};

pub const EVENT_INVITATION: &str = "event-invitation";

const BUNDLED: &[(&str, &str)] = &[(
    EVENT_INVITATION,
    include_str!("../../templates/event-invitation.html"),
)];

/// Where raw template text comes from. A missing template is a deployment
/// error and aborts whatever operation asked for it.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn load(&self, name: &str) -> Result<String, TemplateError>;
}

/// Reads `<dir>/<name>.html`.
#[derive(Debug, Clone)]
pub struct FsTemplateSource {
    dir: PathBuf,
}

impl FsTemplateSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.template_dir)
    }
}

#[async_trait]
impl TemplateSource for FsTemplateSource {
    async fn load(&self, name: &str) -> Result<String, TemplateError> {
        let path = self.dir.join(format!("{}.html", name));
        fs::read_to_string(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => TemplateError::NotFound(name.to_string()),
            _ => TemplateError::Io {
                name: name.to_string(),
                source: e,
            },
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticTemplateSource {
    templates: HashMap<String, String>,
}

impl StaticTemplateSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// The templates compiled into the crate.
    pub fn bundled() -> Self {
        BUNDLED
            .iter()
            .fold(Self::new(), |source, (name, body)| source.with(*name, *body))
    }

    pub fn with(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.templates.insert(name.into(), body.into());
        self
    }
}

#[async_trait]
impl TemplateSource for StaticTemplateSource {
    async fn load(&self, name: &str) -> Result<String, TemplateError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }
}
