//! Loading a client from a TOML config file.

use std::io::Write;
use std::time::Duration;

use europarl_gateway::{ClientConfig, EuroparlClient, RateLimitInterval};

#[test]
fn client_builds_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
base_url = "http://127.0.0.1:9/api/v2"
request_timeout_ms = 2500
retry_enabled = false
max_cache_entries = 7
rate_limit_tokens = 30
rate_limit_interval = "second"
"#
    )
    .unwrap();

    let config = ClientConfig::from_file(file.path()).unwrap();
    assert_eq!(config.request_timeout(), Duration::from_millis(2500));
    assert_eq!(config.rate_limit_interval, RateLimitInterval::Second);

    let client = EuroparlClient::from_config(config).unwrap();
    assert_eq!(client.config().max_cache_entries, 7);
    assert_eq!(client.pipeline().retry_config().max_retries, 0);
    assert_eq!(client.pipeline().base_url(), "http://127.0.0.1:9/api/v2");
    assert_eq!(client.available_tokens(), 30.0);
}

#[test]
fn unknown_interval_is_a_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "rate_limit_interval = \"fortnight\"").unwrap();
    assert!(ClientConfig::from_file(file.path()).is_err());
}

#[test]
fn builder_rejects_invalid_settings() {
    let err = EuroparlClient::builder()
        .max_response_bytes(0)
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("max_response_bytes"));

    let err = EuroparlClient::builder()
        .base_url("ftp://example.org")
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("base_url"));
}

#[test]
fn clients_do_not_share_state() {
    let a = EuroparlClient::builder().rate_limit(5, RateLimitInterval::Hour).build().unwrap();
    let b = EuroparlClient::builder().rate_limit(5, RateLimitInterval::Hour).build().unwrap();
    assert!(a.pipeline().limiter().try_acquire(5));
    assert_eq!(b.available_tokens(), 5.0);
}
