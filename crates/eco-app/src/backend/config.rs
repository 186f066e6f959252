use std::env;
use std::path::PathBuf;
use std::time::Duration;
use reqwest::Url;
use crate::error::AppError;

const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_GENERATE_TIMEOUT_SECS: u64 = 600;

/// Which upload endpoint the detection call goes to. The two deployed
/// backends disagree on both the path and the multipart field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectRoute {
    Upload,
    Detect,
}

impl DetectRoute {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Detect => "detect",
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            Self::Upload => "image",
            Self::Detect => "file",
        }
    }
}

impl std::str::FromStr for DetectRoute {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upload" => Ok(Self::Upload),
            "detect" => Ok(Self::Detect),
            other => Err(AppError::Config(format!(
                "ECO_DETECT_ROUTE must be `upload` or `detect`, got `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub detect_route: DetectRoute,
    pub request_timeout: Duration,
    pub generate_timeout: Duration,
    pub download_dir: PathBuf,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            detect_route: DetectRoute::Upload,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            generate_timeout: Duration::from_secs(DEFAULT_GENERATE_TIMEOUT_SECS),
            download_dir: PathBuf::from("."),
        }
    }
}

impl BackendConfig {
    /// Reads `.env` when present, then the process environment.
    pub fn load() -> Result<Self, AppError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(AppError::Config(format!("failed to read .env: {e}"))),
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();

        let base_url = lookup("ECO_BACKEND_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.base_url);
        Url::parse(&base_url)
            .map_err(|e| AppError::Config(format!("ECO_BACKEND_URL `{base_url}` is not a URL: {e}")))?;

        let detect_route = match lookup("ECO_DETECT_ROUTE") {
            Some(route) => route.parse()?,
            None => defaults.detect_route,
        };

        let request_timeout = seconds(&lookup, "ECO_REQUEST_TIMEOUT_SECS")?.unwrap_or(defaults.request_timeout);
        let generate_timeout = seconds(&lookup, "ECO_GENERATE_TIMEOUT_SECS")?.unwrap_or(defaults.generate_timeout);

        let download_dir = lookup("ECO_DOWNLOAD_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.download_dir);

        Ok(Self {
            base_url,
            detect_route,
            request_timeout,
            generate_timeout,
            download_dir,
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn seconds(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Duration>, AppError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };

    match raw.trim().parse::<u64>() {
        Ok(0) => Err(AppError::Config(format!("{key} must be greater than zero"))),
        Ok(secs) => Ok(Some(Duration::from_secs(secs))),
        Err(_) => Err(AppError::Config(format!("{key} must be a number of seconds, got `{raw}`"))),
    }
}
