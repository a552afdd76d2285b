use scalelink_core::protocol::{ClientConfig, ConfigError, DEFAULT_PASSWORD};
use std::io::Write;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_config(
        r#"{
            "port_name": "/dev/ttyACM0",
            "baud_rate": 19200,
            "timeout_ms": 500,
            "password": [1, 2, 3, 4]
        }"#,
    );

    let config = ClientConfig::load(file.path()).unwrap();
    assert_eq!(config.port_name, "/dev/ttyACM0");
    assert_eq!(config.baud_rate, 19200);
    assert_eq!(config.timeout_ms, 500);
    assert_eq!(config.password, vec![1, 2, 3, 4]);
}

#[test]
fn test_load_empty_object_uses_defaults() {
    let file = write_config("{}");
    let config = ClientConfig::load(file.path()).unwrap();
    assert_eq!(config, ClientConfig::default());
    assert_eq!(config.password, DEFAULT_PASSWORD.to_vec());
}

#[test]
fn test_load_rejects_zero_timeout() {
    let file = write_config(r#"{"timeout_ms": 0}"#);
    assert!(matches!(
        ClientConfig::load(file.path()),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_load_rejects_bad_json() {
    let file = write_config("{ port_name: ");
    assert!(matches!(
        ClientConfig::load(file.path()),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        ClientConfig::load(dir.path().join("missing.json")),
        Err(ConfigError::Io(_))
    ));
}
