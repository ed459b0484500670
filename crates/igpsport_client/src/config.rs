use crate::IgpsportError;
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://prod.zh.igpsport.com/service/";
pub const APP_ID: &str = "igpsport-web";
pub const PAGE_SIZE: u32 = 20;

const LOGIN_PATH: &str = "auth/account/login";
const ACTIVITY_PATH: &str = "web-gateway/web-analyze/activity";

/// Service endpoints, derived from a single base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    base_url: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn login_url(&self) -> String {
        format!("{}/{}", self.base_url, LOGIN_PATH)
    }

    pub fn query_url(&self) -> String {
        format!("{}/{}/queryMyActivity", self.base_url, ACTIVITY_PATH)
    }

    pub fn download_url(&self, ride_id: i64) -> String {
        format!("{}/{}/getDownloadUrl/{}", self.base_url, ACTIVITY_PATH, ride_id)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Output folders, one per export format, under a common root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputLayout {
    pub root: PathBuf,
    pub gpx_dir: String,
    pub tcx_dir: String,
    pub fit_dir: String,
}

impl OutputLayout {
    pub fn under(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            gpx_dir: "GPX_OUT".into(),
            tcx_dir: "TCX_OUT".into(),
            fit_dir: "FIT_OUT".into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub username: String,
    pub password: SecretString,
    /// Pre-seeded bearer token; skips the login round-trip when present.
    pub token: Option<SecretString>,
    pub endpoints: Endpoints,
    pub output: OutputLayout,
}

impl Config {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
            token: None,
            endpoints: Endpoints::default(),
            output: OutputLayout::default(),
        }
    }

    /// Set the pre-seeded token. Empty strings are treated as no token.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token
            .filter(|t| !t.is_empty())
            .map(|t| SecretString::new(t.into()));
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.endpoints = Endpoints::new(base_url);
        self
    }

    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output.root = root.into();
        self
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.expose_secret().is_empty()
    }

    pub fn from_env() -> Result<Self, IgpsportError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values through `get`
    /// instead of the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, IgpsportError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let username = get("IGPSPORT_USERNAME")
            .ok_or_else(|| IgpsportError::Config("IGPSPORT_USERNAME missing".into()))?;
        let password = get("IGPSPORT_PASSWORD")
            .ok_or_else(|| IgpsportError::Config("IGPSPORT_PASSWORD missing".into()))?;
        let base_url = get("IGPSPORT_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());

        let mut cfg = Self::new(username, SecretString::new(password.into()))
            .with_token(get("IGPSPORT_TOKEN"))
            .with_base_url(&base_url);
        if let Some(root) = get("IGPSPORT_OUTPUT_DIR") {
            cfg = cfg.with_output_root(root);
        }
        Ok(cfg)
    }
}
