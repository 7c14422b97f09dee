mod common;
use common::ENV_LOCK;

use restcheck::config::{AuthConfig, Config};
use restcheck::errors::ToolErrorKind;

const MANAGED_VARS: &[&str] = &[
    "REST_BASE_URL",
    "REST_RESPONSE_SIZE_LIMIT",
    "FILE_UPLOAD_SIZE_LIMIT",
    "REST_ENABLE_SSL_VERIFY",
    "AUTH_BASIC_USERNAME",
    "AUTH_BASIC_PASSWORD",
    "AUTH_BEARER",
    "AUTH_APIKEY_HEADER_NAME",
    "AUTH_APIKEY_VALUE",
    "HEADER_X-Trace-Id",
];

fn clear_env() {
    for key in MANAGED_VARS {
        std::env::remove_var(key);
    }
}

#[tokio::test]
async fn missing_base_url_is_fatal() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();

    let err = Config::from_env().expect_err("base URL is required");
    assert_eq!(err.kind, ToolErrorKind::Config);
    assert!(err.message.contains("REST_BASE_URL"));
}

#[tokio::test]
async fn non_positive_limits_are_fatal() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();
    std::env::set_var("REST_BASE_URL", "https://api.example.com");

    for bad in ["0", "-5", "ten"] {
        std::env::set_var("REST_RESPONSE_SIZE_LIMIT", bad);
        let err = Config::from_env().expect_err("limit must be positive");
        assert_eq!(err.kind, ToolErrorKind::Config);
        assert!(err.message.contains("REST_RESPONSE_SIZE_LIMIT"));
    }
    clear_env();
}

#[tokio::test]
async fn defaults_apply_when_limits_are_unset() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();
    std::env::set_var("REST_BASE_URL", "https://api.example.com/v2/");

    let config = Config::from_env().expect("config");
    assert_eq!(config.base_url, "https://api.example.com/v2");
    assert_eq!(config.response_size_limit, 10_000);
    assert_eq!(config.file_upload_size_limit, 10 * 1024 * 1024);
    assert!(config.ssl_verify);
    assert_eq!(config.auth, AuthConfig::None);
    clear_env();
}

#[tokio::test]
async fn ssl_verify_disables_only_on_exact_false() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();
    std::env::set_var("REST_BASE_URL", "https://api.example.com");

    std::env::set_var("REST_ENABLE_SSL_VERIFY", "false");
    assert!(!Config::from_env().expect("config").ssl_verify);

    for value in ["FALSE", "0", "no", "true"] {
        std::env::set_var("REST_ENABLE_SSL_VERIFY", value);
        assert!(Config::from_env().expect("config").ssl_verify);
    }
    clear_env();
}

#[tokio::test]
async fn basic_auth_wins_over_bearer_and_api_key() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();
    std::env::set_var("REST_BASE_URL", "https://api.example.com");
    std::env::set_var("AUTH_BASIC_USERNAME", "user");
    std::env::set_var("AUTH_BASIC_PASSWORD", "pass");
    std::env::set_var("AUTH_BEARER", "token");
    std::env::set_var("AUTH_APIKEY_HEADER_NAME", "X-Api-Key");
    std::env::set_var("AUTH_APIKEY_VALUE", "key");

    let config = Config::from_env().expect("config");
    assert_eq!(
        config.auth,
        AuthConfig::Basic {
            username: "user".to_string(),
            password: "pass".to_string(),
        }
    );
    clear_env();
}

#[tokio::test]
async fn blank_credentials_do_not_activate_a_scheme() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();
    std::env::set_var("REST_BASE_URL", "https://api.example.com");
    std::env::set_var("AUTH_BASIC_USERNAME", "user");
    std::env::set_var("AUTH_BASIC_PASSWORD", "  ");
    std::env::set_var("AUTH_BEARER", "token");

    let config = Config::from_env().expect("config");
    assert_eq!(
        config.auth,
        AuthConfig::Bearer {
            token: "token".to_string(),
        }
    );
    clear_env();
}

#[tokio::test]
async fn api_key_requires_both_name_and_value() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();
    std::env::set_var("REST_BASE_URL", "https://api.example.com");
    std::env::set_var("AUTH_APIKEY_HEADER_NAME", "X-Api-Key");

    assert_eq!(Config::from_env().expect("config").auth, AuthConfig::None);

    std::env::set_var("AUTH_APIKEY_VALUE", "key");
    let config = Config::from_env().expect("config");
    assert_eq!(
        config.auth,
        AuthConfig::ApiKey {
            header_name: "X-Api-Key".to_string(),
            value: "key".to_string(),
        }
    );
    clear_env();
}

#[tokio::test]
async fn custom_headers_are_collected_from_the_environment() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();
    std::env::set_var("REST_BASE_URL", "https://api.example.com");
    std::env::set_var("HEADER_X-Trace-Id", "abc123");

    let config = Config::from_env().expect("config");
    assert!(config
        .custom_headers
        .iter()
        .any(|(name, value)| name == "X-Trace-Id" && value == "abc123"));
    clear_env();
}
