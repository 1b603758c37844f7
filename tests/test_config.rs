mod common;
use common::*;

use goodwe_bridge::prelude::*;

use std::io::Write;

fn config_file(yaml: &str) -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(yaml.as_bytes())?;
    Ok(file)
}

fn load(yaml: &str) -> Result<Config> {
    let file = config_file(yaml)?;
    Config::new(file.path().to_string_lossy().to_string())
}

#[test]
fn defaults() -> Result<()> {
    common_setup();

    let config = load(
        r#"
inverters:
  - host: 192.168.1.50
"#,
    )?;

    assert_eq!(config.loglevel(), "info");
    let inverter = &config.inverters()[0];
    assert!(inverter.enabled());
    assert_eq!(inverter.port(), 8899);
    assert_eq!(inverter.family(), None);
    assert_eq!(inverter.comm_addr(), None);
    assert_eq!(inverter.timeout(), Duration::from_secs(2));
    assert_eq!(inverter.retries(), 3);
    assert!(!inverter.include_unknown());
    Ok(())
}

#[test]
fn full_inverter_section() -> Result<()> {
    let config = load(
        r#"
loglevel: debug
inverters:
  - host: 10.0.0.7
    port: 8898
    family: ET
    comm_addr: 247
    timeout: 5
    retries: 1
    include_unknown: true
  - enabled: false
    host: ""
"#,
    )?;

    assert_eq!(config.loglevel(), "debug");
    assert_eq!(config.inverters().len(), 2);
    assert_eq!(config.enabled_inverters().count(), 1);

    let inverter = &config.inverters()[0];
    assert_eq!(inverter.host(), "10.0.0.7");
    assert_eq!(inverter.port(), 8898);
    assert_eq!(inverter.family(), Some("ET"));
    assert_eq!(inverter.comm_addr(), Some(0xF7));
    assert_eq!(inverter.timeout(), Duration::from_secs(5));
    assert_eq!(inverter.retries(), 1);
    assert!(inverter.include_unknown());
    Ok(())
}

#[test]
fn validation_errors() {
    assert!(load("inverters:\n  - host: \"\"\n").is_err());
    assert!(load("inverters:\n  - host: 10.0.0.7\n    port: 0\n").is_err());
    assert!(load("inverters:\n  - host: 10.0.0.7\n    timeout: 0\n").is_err());
    assert!(load("inverters:\n  - host: 10.0.0.7\n    family: XX\n").is_err());
    assert!(load("inverters:\n  - host: 10.0.0.7\n    comm_addr: 300\n").is_err());
}

#[test]
fn missing_file() {
    assert!(Config::new("/nonexistent/config.yaml".to_string()).is_err());
}

#[test]
fn single_host() -> Result<()> {
    let config = Config::single(config::Inverter::from_host("10.0.0.9", None, Some("dt".to_string())))?;

    let inverter = &config.inverters()[0];
    assert_eq!(inverter.port(), 8899);
    assert_eq!(inverter.family(), Some("dt"));
    Ok(())
}
