use derive_builder::{Builder, UninitializedFieldError};
use reqwest::Url;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;

/// Pause observed after every per-problem request.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Builder)]
#[builder(build_fn(error = "Error"))]
pub struct PortalConfig {
    base_url: Url,
    #[builder(default, setter(strip_option))]
    credentials: Option<Credentials>,
    #[builder(default = "PathBuf::from(\".\")", setter(into))]
    output_dir: PathBuf,
    #[builder(default = "DEFAULT_DELAY")]
    delay: Duration,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl PortalConfig {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn texts_dir(&self) -> PathBuf {
        self.output_dir.join("pdf")
    }

    pub fn samples_dir(&self) -> PathBuf {
        self.output_dir.join("samples")
    }

    pub fn merged_path(&self) -> PathBuf {
        self.texts_dir().join("all.pdf")
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl From<UninitializedFieldError> for Error {
    fn from(err: UninitializedFieldError) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_should_fill_defaults() {
        let config = PortalConfigBuilder::default()
            .base_url(Url::parse("https://judge.example.com").unwrap())
            .build()
            .unwrap();

        assert_eq!(config.output_dir(), Path::new("."));
        assert_eq!(config.delay(), DEFAULT_DELAY);
        assert!(config.credentials().is_none());
        assert_eq!(config.merged_path(), PathBuf::from("./pdf/all.pdf"));
        assert_eq!(config.samples_dir(), PathBuf::from("./samples"));
    }

    #[test]
    fn builder_without_url_should_fail() {
        let err = PortalConfigBuilder::default().build().unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("base_url")));
    }

    #[test]
    fn credentials_debug_should_hide_password() {
        let creds = Credentials::new("team1", "hunter2");
        let out = format!("{:?}", creds);
        assert!(out.contains("team1"));
        assert!(!out.contains("hunter2"));
    }
}
