//! Settings tests

use super::*;
use std::collections::HashMap;

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

fn parse(toml_str: &str) -> FileConfig {
    toml::from_str(toml_str).expect("settings should parse")
}

#[test]
fn test_defaults_without_file_or_env() {
    let config = Config::from_parts(FileConfig::default(), env_of(&[]));
    assert_eq!(config, Config::default());
    assert_eq!(config.probe.timeout(), Duration::from_secs(10));
    assert_eq!(config.restart.command, vec!["ccr", "stop"]);
    assert!(config.restart.enabled);
    assert_eq!(config.logging.level, "warn");
    assert!(config
        .document_path
        .ends_with(Path::new(".claude-code-router").join("config.json")));
}

#[test]
fn test_file_values_apply() {
    let file = parse(
        r#"
document_path = "/srv/ccr/config.json"

[probe]
timeout_secs = 3

[restart]
enabled = false
command = ["systemctl", "--user", "restart", "ccr"]

[logging]
level = "debug"
file_dir = "/tmp/ccs-logs"
file_rotation = "hourly"
"#,
    );
    let config = Config::from_parts(file, env_of(&[]));

    assert_eq!(config.document_path, PathBuf::from("/srv/ccr/config.json"));
    assert_eq!(config.probe.timeout_secs, 3);
    assert!(!config.restart.enabled);
    assert_eq!(config.restart.command[0], "systemctl");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.logging.file,
        Some(LogFile {
            dir: PathBuf::from("/tmp/ccs-logs"),
            rotation: LogRotation::Hourly,
        })
    );
}

#[test]
fn test_env_beats_file() {
    let file = parse(
        r#"
document_path = "/from/file.json"
[probe]
timeout_secs = 3
"#,
    );
    let config = Config::from_parts(
        file,
        env_of(&[(ENV_CONFIG, "/from/env.json"), (ENV_PROBE_TIMEOUT, "25")]),
    );
    assert_eq!(config.document_path, PathBuf::from("/from/env.json"));
    assert_eq!(config.probe.timeout_secs, 25);
}

#[test]
fn test_invalid_env_timeout_falls_through() {
    let file = parse("[probe]\ntimeout_secs = 4\n");
    let config = Config::from_parts(file, env_of(&[(ENV_PROBE_TIMEOUT, "soon")]));
    assert_eq!(config.probe.timeout_secs, 4);

    let config = Config::from_parts(FileConfig::default(), env_of(&[(ENV_PROBE_TIMEOUT, "0")]));
    assert_eq!(config.probe.timeout_secs, DEFAULT_PROBE_TIMEOUT_SECS);
}

#[test]
fn test_empty_restart_command_uses_default() {
    let file = parse("[restart]\ncommand = []\n");
    let config = Config::from_parts(file, env_of(&[]));
    assert_eq!(config.restart.command, RestartConfig::default().command);
}

#[test]
fn test_unknown_keys_rejected() {
    let parsed: Result<FileConfig, _> = toml::from_str("documnet_path = \"/typo\"\n");
    assert!(parsed.is_err());
}

#[test]
fn test_home_expansion() {
    if let Some(home) = dirs::home_dir() {
        assert_eq!(expand_home("~/x/config.json"), home.join("x").join("config.json"));
    }
    assert_eq!(expand_home("/abs/config.json"), PathBuf::from("/abs/config.json"));
}

#[test]
fn test_file_logging_needs_dir() {
    let config = Config::from_parts(parse("[logging]\nfile_rotation = \"never\"\n"), env_of(&[]));
    assert_eq!(config.logging.file, None);

    let config = Config::from_parts(parse("[logging]\nfile_dir = \"/var/log/ccs\"\n"), env_of(&[]));
    let file = config.logging.file.expect("file logging enabled");
    assert_eq!(file.rotation, LogRotation::Daily);
}

#[test]
fn test_unknown_rotation_rejected() {
    let parsed: Result<FileConfig, _> = toml::from_str("[logging]\nfile_rotation = \"weekly\"\n");
    assert!(parsed.is_err());
}

#[test]
fn test_missing_settings_file_is_defaults() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = Config::load_file_config(&dir.path().join("absent.toml")).unwrap();
    assert!(file.document_path.is_none());
}

#[test]
fn test_broken_settings_file_errors() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[probe\ntimeout_secs = ").unwrap();
    let err = Config::load_file_config(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse settings file"));
}
