use axpert_gateway::config::Config;
use std::fs;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.web.listen_address = "127.0.0.1:9100".to_string();
    cfg.devices.paths = vec!["/dev/hidraw0".to_string(), "/dev/hidraw1".to_string()];
    cfg.control.enabled = true;
    cfg.logging.file = path.with_extension("log").to_string_lossy().to_string();

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.web.listen_address, "127.0.0.1:9100");
    assert_eq!(loaded.devices.paths.len(), 2);
    assert!(loaded.control.enabled);
    assert_eq!(loaded.logging.file, cfg.logging.file);
    assert!(loaded.validate().is_ok());
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();

    cfg.web.listen_address.clear();
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.web.metrics_path = "/healthz".to_string();
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.devices.read_timeout_ms = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.poller.interval_secs = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"bad: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}

#[test]
fn from_file_missing_is_io_error() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let err = Config::from_file(tmp_dir.path().join("absent.yaml")).unwrap_err();
    assert!(format!("{}", err).contains("I/O error"));
}
