use crate::config::{AuthConfig, Config};
use crate::errors::ToolError;
use crate::managers::upload::{build_form, validate_files, FileUpload};
use crate::services::logger::Logger;
use crate::utils::redact::sanitize_header;
use crate::utils::text::truncate_utf8_prefix;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

static ABSOLUTE_ENDPOINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(https?://|www\.)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RequestMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
}

impl RequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::GET => "GET",
            RequestMethod::POST => "POST",
            RequestMethod::PUT => "PUT",
            RequestMethod::DELETE => "DELETE",
            RequestMethod::PATCH => "PATCH",
        }
    }

    fn to_method(self) -> Method {
        match self {
            RequestMethod::GET => Method::GET,
            RequestMethod::POST => Method::POST,
            RequestMethod::PUT => Method::PUT,
            RequestMethod::DELETE => Method::DELETE,
            RequestMethod::PATCH => Method::PATCH,
        }
    }

    fn allows_body(self) -> bool {
        matches!(
            self,
            RequestMethod::POST | RequestMethod::PUT | RequestMethod::PATCH
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EndpointArgs {
    pub method: RequestMethod,
    pub endpoint: String,
    pub body: Option<Value>,
    pub headers: Option<BTreeMap<String, String>>,
    pub host: Option<String>,
    pub files: Option<Vec<FileUpload>>,
    pub form_fields: Option<BTreeMap<String, String>>,
}

/// Which layer a header came from. Per-call headers are reported
/// verbatim; the other two layers go through the sanitizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderSource {
    Config,
    Call,
    Auth,
}

#[derive(Debug, Clone)]
struct HeaderEntry {
    name: String,
    value: String,
    source: HeaderSource,
}

/// Result of a single endpoint test. `failed` marks transport-level
/// failures, rendered to the caller as an error content block while
/// HTTP error statuses stay ordinary results.
#[derive(Debug)]
pub struct TestOutcome {
    pub payload: Value,
    pub failed: bool,
}

#[derive(Clone)]
pub struct RestManager {
    logger: Logger,
    config: Arc<Config>,
    client: Client,
}

impl RestManager {
    pub fn new(logger: Logger, config: Arc<Config>) -> Result<Self, ToolError> {
        let mut builder = Client::builder();
        if !config.ssl_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder
            .build()
            .map_err(|err| ToolError::internal(format!("Failed to build HTTP client: {}", err)))?;
        Ok(Self {
            logger: logger.child("rest"),
            config,
            client,
        })
    }

    pub async fn test_request(&self, args: Value) -> Result<TestOutcome, ToolError> {
        let args = self.parse_args(args)?;
        let method = args.method;
        let normalized_endpoint = normalize_endpoint(&args.endpoint);
        let base = match &args.host {
            Some(host) => normalize_host(host)?,
            None => self.config.base_url.clone(),
        };
        let full_url = format!("{}{}", base, normalized_endpoint);

        self.logger.debug(
            "Testing endpoint",
            Some(&serde_json::json!({"method": method.as_str(), "url": full_url})),
        );

        let headers = self.layer_headers(args.headers.as_ref());
        let mut header_map = headers_to_headermap(&headers)?;

        let files = args.files.as_deref().unwrap_or(&[]);
        let mut reported_body = Value::Null;
        let request = if !files.is_empty() {
            validate_files(files, self.config.file_upload_size_limit).await?;
            let form = build_form(files, args.form_fields.as_ref(), args.body.as_ref()).await?;
            if let Some(body) = &args.body {
                reported_body = body.clone();
            }
            self.client
                .request(method.to_method(), &full_url)
                .headers(header_map)
                .multipart(form)
        } else if method.allows_body() && args.body.is_some() {
            let body = args.body.as_ref().unwrap_or(&Value::Null);
            reported_body = body.clone();
            let text = serde_json::to_string(body)
                .map_err(|_| ToolError::invalid_params("body must be JSON-serializable"))?;
            if !header_map.contains_key("content-type") {
                header_map.insert(
                    HeaderName::from_static("content-type"),
                    HeaderValue::from_static("application/json"),
                );
            }
            self.client
                .request(method.to_method(), &full_url)
                .headers(header_map)
                .body(text)
        } else {
            self.client
                .request(method.to_method(), &full_url)
                .headers(header_map)
        };

        let reported_headers = self.report_headers(&headers);
        let started = Instant::now();
        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let response_headers = response.headers().clone();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, response_headers, body))
        }
        .await;

        let (status, response_headers, body_text) = match exchange {
            Ok(parts) => parts,
            Err(err) => {
                self.logger.warn(
                    "Request transport failure",
                    Some(&serde_json::json!({"url": full_url, "error": err.to_string()})),
                );
                return Ok(self.error_outcome(
                    err,
                    &full_url,
                    method,
                    reported_headers,
                    reported_body,
                ));
            }
        };
        let elapsed_ms = started.elapsed().as_millis();

        let failed_status = status.as_u16() >= 400;
        let mut messages = vec![if failed_status {
            format!("Request failed with status {}", status.as_u16())
        } else {
            "Request completed successfully".to_string()
        }];

        let limit = self.config.response_size_limit;
        let original_size = body_text.len();
        let (body_value, truncated) = if original_size > limit {
            let prefix = truncate_utf8_prefix(&body_text, limit);
            let returned_size = prefix.len();
            messages.push(format!(
                "Response truncated: {} of {} bytes returned due to size limit ({} bytes)",
                returned_size, original_size, limit
            ));
            let details = serde_json::json!({
                "originalSize": original_size,
                "returnedSize": returned_size,
                "truncationPoint": returned_size,
                "sizeLimit": limit,
            });
            (Value::String(prefix), Some(details))
        } else {
            let parsed = serde_json::from_str::<Value>(&body_text)
                .unwrap_or(Value::String(body_text));
            (parsed, None)
        };

        let mut validation = serde_json::json!({
            "isError": failed_status,
            "messages": messages,
        });
        if let Some(details) = truncated {
            validation["truncated"] = details;
        }

        let payload = serde_json::json!({
            "request": {
                "url": full_url,
                "method": method.as_str(),
                "headers": reported_headers,
                "body": reported_body,
                "authMethod": self.config.auth.label(),
            },
            "response": {
                "statusCode": status.as_u16(),
                "statusText": status.canonical_reason().unwrap_or(""),
                "timing": format!("{}ms", elapsed_ms),
                "headers": crate::utils::redact::sanitize_header_map(
                    &response_headers,
                    self.config.auth.api_key_header(),
                ),
                "body": body_value,
            },
            "validation": validation,
        });

        Ok(TestOutcome {
            payload,
            failed: false,
        })
    }

    fn parse_args(&self, args: Value) -> Result<EndpointArgs, ToolError> {
        let parsed: EndpointArgs = serde_json::from_value(args)
            .map_err(|err| ToolError::invalid_params(format!("Invalid arguments: {}", err)))?;
        if ABSOLUTE_ENDPOINT.is_match(&parsed.endpoint) {
            let resolved = format!(
                "{}/{}",
                self.config.base_url,
                parsed.endpoint.trim_matches('/')
            );
            return Err(ToolError::invalid_params(format!(
                "Invalid endpoint format. Do not include full URLs. Instead of \"{}\", use just the path (e.g. \"/api/users\"). Your path will be resolved to: {}. To test a different base URL, update the REST_BASE_URL environment variable.",
                parsed.endpoint, resolved
            )));
        }
        Ok(parsed)
    }

    /// Applies the three header layers in precedence order: config
    /// defaults, then per-call headers, then the configured auth
    /// scheme. Later layers replace earlier entries with the same
    /// exact name.
    fn layer_headers(&self, call_headers: Option<&BTreeMap<String, String>>) -> Vec<HeaderEntry> {
        let mut layered: Vec<HeaderEntry> = Vec::new();
        let mut push = |name: String, value: String, source: HeaderSource| {
            if let Some(existing) = layered.iter_mut().find(|entry| entry.name == name) {
                existing.value = value;
                existing.source = source;
            } else {
                layered.push(HeaderEntry {
                    name,
                    value,
                    source,
                });
            }
        };
        for (name, value) in &self.config.custom_headers {
            push(name.clone(), value.clone(), HeaderSource::Config);
        }
        if let Some(call) = call_headers {
            for (name, value) in call {
                push(name.clone(), value.clone(), HeaderSource::Call);
            }
        }
        match &self.config.auth {
            AuthConfig::None => {}
            AuthConfig::Basic { username, password } => {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, password));
                push(
                    "Authorization".to_string(),
                    format!("Basic {}", encoded),
                    HeaderSource::Auth,
                );
            }
            AuthConfig::Bearer { token } => {
                push(
                    "Authorization".to_string(),
                    format!("Bearer {}", token),
                    HeaderSource::Auth,
                );
            }
            AuthConfig::ApiKey { header_name, value } => {
                push(header_name.clone(), value.clone(), HeaderSource::Auth);
            }
        }
        layered
    }

    /// Renders the sent headers for the report. Per-call headers are
    /// shown verbatim, config and auth headers are sanitized.
    fn report_headers(&self, headers: &[HeaderEntry]) -> Value {
        let api_key_header = self.config.auth.api_key_header();
        let mut out = serde_json::Map::new();
        for entry in headers {
            let rendered = match entry.source {
                HeaderSource::Call => entry.value.clone(),
                HeaderSource::Config | HeaderSource::Auth => {
                    sanitize_header(&entry.name, &entry.value, api_key_header)
                }
            };
            out.insert(entry.name.clone(), Value::String(rendered));
        }
        Value::Object(out)
    }

    fn error_outcome(
        &self,
        err: reqwest::Error,
        url: &str,
        method: RequestMethod,
        reported_headers: Value,
        reported_body: Value,
    ) -> TestOutcome {
        let payload = serde_json::json!({
            "error": {
                "message": err.to_string(),
                "code": transport_error_code(&err),
                "request": {
                    "url": url,
                    "method": method.as_str(),
                    "headers": reported_headers,
                    "body": reported_body,
                },
            },
        });
        TestOutcome {
            payload,
            failed: true,
        }
    }
}

/// `/users//` and `users` both become `/users`.
fn normalize_endpoint(endpoint: &str) -> String {
    format!("/{}", endpoint.trim_matches('/'))
}

/// Parses a per-call host override and reduces it to origin plus path
/// without the trailing slash.
fn normalize_host(host: &str) -> Result<String, ToolError> {
    let parsed = Url::parse(host).map_err(|_| invalid_host(host))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(invalid_host(host));
    }
    let origin = parsed.origin().ascii_serialization();
    let path = parsed.path().trim_end_matches('/');
    Ok(format!("{}{}", origin, path))
}

fn invalid_host(host: &str) -> ToolError {
    ToolError::invalid_params(format!(
        "Invalid host format. The 'host' argument must be a valid URL starting with http:// or https://, e.g. \"https://example.com\" or \"http://localhost:3001/api/v1\". Received: \"{}\"",
        host
    ))
}

fn headers_to_headermap(headers: &[HeaderEntry]) -> Result<HeaderMap, ToolError> {
    let mut map = HeaderMap::new();
    for entry in headers {
        let name = HeaderName::from_bytes(entry.name.as_bytes())
            .map_err(|_| ToolError::invalid_params(format!("Invalid header name: {}", entry.name)))?;
        let value = HeaderValue::from_str(&entry.value).map_err(|_| {
            ToolError::invalid_params(format!("Invalid header value for {}", entry.name))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

fn transport_error_code(err: &reqwest::Error) -> &'static str {
    if err.is_timeout() {
        "TIMEOUT"
    } else if err.is_connect() {
        "CONNECT"
    } else if err.is_body() {
        "BODY"
    } else if err.is_decode() {
        "DECODE"
    } else {
        "REQUEST"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::logger::Logger;

    fn test_config(auth: AuthConfig, custom_headers: Vec<(String, String)>) -> Arc<Config> {
        Arc::new(Config {
            base_url: "https://api.example.com".to_string(),
            response_size_limit: 10_000,
            file_upload_size_limit: 1024,
            ssl_verify: true,
            auth,
            custom_headers,
        })
    }

    fn manager(auth: AuthConfig, custom_headers: Vec<(String, String)>) -> RestManager {
        RestManager::new(Logger::new("test"), test_config(auth, custom_headers)).unwrap()
    }

    #[test]
    fn endpoint_is_normalized_to_single_leading_slash() {
        assert_eq!(normalize_endpoint("users"), "/users");
        assert_eq!(normalize_endpoint("/users/"), "/users");
        assert_eq!(normalize_endpoint("//api//users//"), "/api//users");
    }

    #[test]
    fn host_is_reduced_to_origin_and_path() {
        assert_eq!(
            normalize_host("http://localhost:3001/api/v1/").unwrap(),
            "http://localhost:3001/api/v1"
        );
        assert_eq!(
            normalize_host("https://example.com").unwrap(),
            "https://example.com"
        );
        assert!(normalize_host("ftp://example.com").is_err());
        assert!(normalize_host("not-a-url").is_err());
    }

    #[test]
    fn absolute_endpoints_are_rejected() {
        let manager = manager(AuthConfig::None, Vec::new());
        for endpoint in ["https://evil.example.com/x", "http://other/x", "www.other.com/x"] {
            let err = manager
                .parse_args(serde_json::json!({"method": "GET", "endpoint": endpoint}))
                .unwrap_err();
            assert!(err.message.contains("Do not include full URLs"));
        }
    }

    #[test]
    fn auth_layer_overrides_call_headers() {
        let manager = manager(
            AuthConfig::Bearer {
                token: "secret".to_string(),
            },
            Vec::new(),
        );
        let mut call = BTreeMap::new();
        call.insert("Authorization".to_string(), "Bearer forged".to_string());
        let headers = manager.layer_headers(Some(&call));
        let auth = headers
            .iter()
            .find(|entry| entry.name == "Authorization")
            .unwrap();
        assert_eq!(auth.value, "Bearer secret");
        assert_eq!(auth.source, HeaderSource::Auth);
    }

    #[test]
    fn call_headers_override_config_headers() {
        let manager = manager(
            AuthConfig::None,
            vec![("X-Trace-Id".to_string(), "from-config".to_string())],
        );
        let mut call = BTreeMap::new();
        call.insert("X-Trace-Id".to_string(), "from-call".to_string());
        let headers = manager.layer_headers(Some(&call));
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].value, "from-call");
        assert_eq!(headers[0].source, HeaderSource::Call);
    }

    #[test]
    fn call_headers_are_reported_verbatim_but_auth_is_redacted() {
        let manager = manager(
            AuthConfig::Basic {
                username: "user".to_string(),
                password: "pass".to_string(),
            },
            Vec::new(),
        );
        let mut call = BTreeMap::new();
        call.insert("X-Debug-Token".to_string(), "visible".to_string());
        let headers = manager.layer_headers(Some(&call));
        let reported = manager.report_headers(&headers);
        assert_eq!(reported["X-Debug-Token"], "visible");
        assert_eq!(reported["Authorization"], "[REDACTED]");
    }

    #[test]
    fn basic_auth_credentials_are_base64_encoded() {
        let manager = manager(
            AuthConfig::Basic {
                username: "user".to_string(),
                password: "pass".to_string(),
            },
            Vec::new(),
        );
        let headers = manager.layer_headers(None);
        assert_eq!(headers[0].value, "Basic dXNlcjpwYXNz");
    }
}
