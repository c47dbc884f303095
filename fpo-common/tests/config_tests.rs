//! Configuration file loading tests

use fpo_common::config::OrchestratorConfig;
use std::io::Write;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp config");
    file.write_all(content.as_bytes()).expect("write temp config");
    file
}

#[test]
fn loads_full_config() {
    let file = write_config(
        r#"
port = 6000

[timeouts]
modelMs = 10000
trainingMs = 60000

[[nodes]]
key = "lstm"
displayName = "LSTM baseline"
predictURL = "http://localhost:9001/predict"
trainURL = "http://localhost:9001/train"
healthURL = "http://localhost:9001/health"

[[nodes]]
key = "cnn"
displayName = "CNN ensemble"
predictURL = "http://localhost:9002/predict"
trainURL = "http://localhost:9002/train"
healthURL = "http://localhost:9002/health"
enabled = false
"#,
    );

    let config = OrchestratorConfig::from_file(file.path()).unwrap();
    assert_eq!(config.port(), 6000);
    assert_eq!(config.timeouts.model_ms, 10_000);
    assert_eq!(config.timeouts.training_ms, 60_000);
    assert_eq!(config.nodes.len(), 2);
    assert!(config.nodes[0].enabled);
    assert!(!config.nodes[1].enabled);
}

#[test]
fn partial_config_falls_back_to_defaults() {
    let file = write_config("port = 7000\n");

    let config = OrchestratorConfig::from_file(file.path()).unwrap();
    assert_eq!(config.port(), 7000);
    assert_eq!(config.timeouts.model_ms, 30_000);
    assert!(config.nodes.is_empty());
}

#[test]
fn malformed_config_is_an_error() {
    let file = write_config("port = \"not a number\"\n");

    let result = OrchestratorConfig::from_file(file.path());
    assert!(result.is_err());
}

#[test]
fn missing_explicit_path_uses_defaults() {
    let config = OrchestratorConfig::load(Some("/nonexistent/fpo/config.toml")).unwrap();
    assert_eq!(config.port(), fpo_common::config::DEFAULT_PORT);
}
