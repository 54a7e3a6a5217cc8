use super::*;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.driver.url, "http://localhost:4444/selenium-server/driver/");
    assert!(config.driver.session_id.is_none());
    assert!(!config.driver.continue_run);
    assert_eq!(config.timing.transport_retry_ms, 2000);
    assert_eq!(config.timing.retry_last_delay_ms, 1000);
    assert_eq!(config.timing.condition_poll_ms, 10);
    assert_eq!(config.timing.default_timeout_ms, 30_000);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_timing_durations() {
    let timing = TimingConfig::default();
    assert_eq!(timing.transport_retry(), Duration::from_secs(2));
    assert_eq!(timing.retry_last_delay(), Duration::from_secs(1));
    assert_eq!(timing.condition_poll(), Duration::from_millis(10));
    assert_eq!(timing.default_timeout(), Duration::from_secs(30));
}

#[test]
fn test_request_timeout_disabled_by_default() {
    let timing = TimingConfig::default();
    assert!(timing.request_timeout().is_none());

    let timing = TimingConfig {
        request_timeout_secs: 90,
        ..TimingConfig::default()
    };
    assert_eq!(timing.request_timeout(), Some(Duration::from_secs(90)));
}

#[test]
fn test_partial_timing_uses_defaults() {
    let timing: TimingConfig = toml::from_str("transport_retry_ms = 50").unwrap();
    assert_eq!(timing.transport_retry_ms, 50);
    assert_eq!(timing.retry_last_delay_ms, 1000);
}

#[test]
fn test_session_id_not_serialized_when_absent() {
    let json = serde_json::to_value(DriverConfig::default()).unwrap();
    assert!(json.get("session_id").is_none());
}

#[test]
fn test_config_serialization_roundtrip() {
    let mut config = Config::default();
    config.driver.session_id = Some("abc".to_string());
    let text = toml::to_string(&config).unwrap();
    let parsed: Config = toml::from_str(&text).unwrap();
    assert_eq!(parsed.driver.session_id.as_deref(), Some("abc"));
    assert_eq!(parsed.timing.default_timeout_ms, config.timing.default_timeout_ms);
}
