use crate::constants::{env as env_keys, limits};
use crate::errors::ToolError;
use crate::utils::redact::is_safe_header;
use url::Url;

/// Static authentication resolved once at startup. At most one scheme
/// is active; when several are configured, Basic wins over Bearer,
/// which wins over API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthConfig {
    None,
    Basic { username: String, password: String },
    Bearer { token: String },
    ApiKey { header_name: String, value: String },
}

impl AuthConfig {
    fn from_env() -> Self {
        let get = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|value| !value.trim().is_empty())
        };
        if let (Some(username), Some(password)) = (
            get(env_keys::BASIC_USERNAME),
            get(env_keys::BASIC_PASSWORD),
        ) {
            return AuthConfig::Basic { username, password };
        }
        if let Some(token) = get(env_keys::BEARER_TOKEN) {
            return AuthConfig::Bearer { token };
        }
        if let (Some(header_name), Some(value)) = (
            get(env_keys::APIKEY_HEADER_NAME),
            get(env_keys::APIKEY_HEADER_VALUE),
        ) {
            return AuthConfig::ApiKey { header_name, value };
        }
        AuthConfig::None
    }

    pub fn label(&self) -> &'static str {
        match self {
            AuthConfig::None => "none",
            AuthConfig::Basic { .. } => "basic",
            AuthConfig::Bearer { .. } => "bearer",
            AuthConfig::ApiKey { .. } => "apikey",
        }
    }

    /// Name of the API-key header when that scheme is active, for the
    /// sanitizer's redaction rule.
    pub fn api_key_header(&self) -> Option<&str> {
        match self {
            AuthConfig::ApiKey { header_name, .. } => Some(header_name),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            AuthConfig::None => "None configured".to_string(),
            AuthConfig::Basic { username, .. } => {
                format!("Basic Auth with username: {}", username)
            }
            AuthConfig::Bearer { .. } => "Bearer token".to_string(),
            AuthConfig::ApiKey { header_name, .. } => {
                format!("API Key using header: {}", header_name)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Normalized base URL: origin plus path, no trailing slash.
    pub base_url: String,
    pub response_size_limit: usize,
    pub file_upload_size_limit: u64,
    pub ssl_verify: bool,
    pub auth: AuthConfig,
    /// Default headers from `HEADER_*` environment variables, sorted
    /// by name for stable reporting.
    pub custom_headers: Vec<(String, String)>,
}

impl Config {
    pub fn from_env() -> Result<Self, ToolError> {
        let raw_base = std::env::var(env_keys::BASE_URL).map_err(|_| {
            ToolError::config(format!(
                "{} environment variable is required",
                env_keys::BASE_URL
            ))
        })?;
        let base_url = normalize_base_url(&raw_base)?;

        let response_size_limit = positive_limit(
            env_keys::RESPONSE_SIZE_LIMIT,
            limits::DEFAULT_RESPONSE_SIZE_BYTES as u64,
        )? as usize;
        let file_upload_size_limit = positive_limit(
            env_keys::FILE_UPLOAD_SIZE_LIMIT,
            limits::DEFAULT_FILE_UPLOAD_SIZE_BYTES,
        )?;

        let ssl_verify = std::env::var(env_keys::SSL_VERIFY)
            .map(|value| value != "false")
            .unwrap_or(true);

        Ok(Self {
            base_url,
            response_size_limit,
            file_upload_size_limit,
            ssl_verify,
            auth: AuthConfig::from_env(),
            custom_headers: custom_headers_from_env(std::env::vars()),
        })
    }

    /// Human-readable summary appended to the tool description so a
    /// caller can see the effective target and auth without access to
    /// the environment.
    pub fn describe(&self) -> String {
        let mut parts = vec![
            format!("Base URL: {}", self.base_url),
            format!(
                "SSL Verification {}",
                if self.ssl_verify { "enabled" } else { "disabled" }
            ),
            format!("Authentication: {}", self.auth.describe()),
            format!("Response size limit: {} bytes", self.response_size_limit),
            format!(
                "File upload size limit: {} bytes",
                self.file_upload_size_limit
            ),
        ];
        if !self.custom_headers.is_empty() {
            let rendered: Vec<String> = self
                .custom_headers
                .iter()
                .map(|(name, value)| {
                    if is_safe_header(name) {
                        format!("{}: {}", name, value)
                    } else {
                        name.clone()
                    }
                })
                .collect();
            parts.push(format!("Custom headers: {}", rendered.join(", ")));
        }
        parts.join(" | ")
    }
}

/// Normalizes the configured base URL to `origin + path` with any
/// trailing slash removed. Rejects non-HTTP schemes up front so every
/// later request starts from a usable base.
fn normalize_base_url(raw: &str) -> Result<String, ToolError> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|err| {
        ToolError::config(format!("{} is not a valid URL: {}", env_keys::BASE_URL, err))
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ToolError::config(format!(
            "{} must use the http or https scheme",
            env_keys::BASE_URL
        )));
    }
    let origin = parsed.origin().ascii_serialization();
    let path = parsed.path().trim_end_matches('/');
    Ok(format!("{}{}", origin, path))
}

fn positive_limit(key: &str, fallback: u64) -> Result<u64, ToolError> {
    match std::env::var(key) {
        Err(_) => Ok(fallback),
        Ok(raw) => {
            let parsed = raw.trim().parse::<i64>().ok().filter(|value| *value > 0);
            parsed.map(|value| value as u64).ok_or_else(|| {
                ToolError::config(format!("{} must be a positive number", key))
            })
        }
    }
}

/// Collects `HEADER_*` variables (prefix matched case-insensitively,
/// suffix casing preserved) into sorted name/value pairs.
fn custom_headers_from_env(vars: impl Iterator<Item = (String, String)>) -> Vec<(String, String)> {
    let prefix_len = env_keys::CUSTOM_HEADER_PREFIX.len();
    let mut headers: Vec<(String, String)> = vars
        .filter_map(|(key, value)| {
            if key.len() <= prefix_len {
                return None;
            }
            // Byte-wise prefix compare: slicing the str could land inside
            // a multibyte character in an arbitrary env-var name.
            let head = &key.as_bytes()[..prefix_len];
            if !head.eq_ignore_ascii_case(env_keys::CUSTOM_HEADER_PREFIX.as_bytes()) {
                return None;
            }
            // The prefix bytes are ASCII, so this offset is a char boundary.
            let name = key[prefix_len..].to_string();
            if name.trim().is_empty() || value.trim().is_empty() {
                return None;
            }
            Some((name, value))
        })
        .collect();
    headers.sort_by(|a, b| a.0.cmp(&b.0));
    headers
}
