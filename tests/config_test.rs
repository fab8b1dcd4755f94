use dissembler::{Error, LogFormat, SupervisorConfig};
use std::io::Write;
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_from_file_and_environment() {
    let file = config_file(
        r#"
signal_buffer = 8
strict_shutdown = true
reload_on_hup = true

[log]
level = "debug"
format = "pretty"
"#,
    );

    let config = SupervisorConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.signal_buffer, 8);
    assert!(config.strict_shutdown);
    assert!(config.reload_on_hup);
    assert!(!config.stop_on_start_failure);
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.log.format, LogFormat::Pretty);

    // Environment overrides the file
    std::env::set_var("DISSEMBLER__STOP_TIMEOUT_SECS", "15");
    let config = SupervisorConfig::load(Some(file.path())).unwrap();
    std::env::remove_var("DISSEMBLER__STOP_TIMEOUT_SECS");

    assert_eq!(config.stop_timeout_secs, Some(15));
    assert_eq!(config.signal_buffer, 8);
}

#[test]
fn test_load_rejects_invalid_values() {
    let file = config_file("signal_buffer = 1\n");

    let result = SupervisorConfig::load(Some(file.path()));
    assert!(matches!(
        result,
        Err(Error::InvalidConfig { ref field, .. }) if field == "signal_buffer"
    ));
}

#[test]
fn test_load_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = SupervisorConfig::load(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_rendered_config_round_trips_through_json() {
    let config = SupervisorConfig {
        stop_timeout_secs: Some(10),
        ..SupervisorConfig::default()
    };

    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"signal_buffer\":2"));
    assert!(json.contains("\"format\":\"json\""));

    let parsed: SupervisorConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
}
