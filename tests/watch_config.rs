use std::sync::Mutex;

use tempfile::NamedTempFile;

use gunwatch::config::WatchConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "GUNWATCH_CONFIG",
        "GUNWATCH_SERVICE_URL",
        "GUNWATCH_CAMERA_URL",
        "GUNWATCH_INTERVAL_MS",
        "GUNWATCH_EXPORT_DIR",
        "GUNWATCH_MUTED",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_defaults_without_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = WatchConfig::load().expect("load config");

    assert_eq!(cfg.service.base_url, "http://localhost:5000");
    assert_eq!(cfg.camera.url, "stub://camera");
    assert_eq!(cfg.camera.interval_ms, 1000);
    assert_eq!(cfg.scan.step_ms, 1000);
    assert_eq!(cfg.scan.hires_width, 1280);
    assert_eq!(cfg.alert.label, "Gun");
    assert!((cfg.alert.confidence_threshold - 40.0).abs() < f32::EPSILON);
    assert_eq!(cfg.alert.cooldown_ms, 5000);
    assert!(!cfg.alert.muted);

    clear_env();
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "service": {
            "base_url": "http://detector.local:5000",
            "timeout_ms": 2500
        },
        "camera": {
            "url": "http://camera-1:81/stream",
            "width": 800,
            "height": 600,
            "interval_ms": 500
        },
        "scan": {
            "step_ms": 2000,
            "hires_width": 1920
        },
        "alert": {
            "label": "Knife",
            "confidence_threshold": 60.0,
            "cooldown_ms": 10000,
            "export_dir": "/tmp/gunwatch-alerts"
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("GUNWATCH_CONFIG", file.path());
    std::env::set_var("GUNWATCH_CAMERA_URL", "stub://override");
    std::env::set_var("GUNWATCH_MUTED", "true");

    let cfg = WatchConfig::load().expect("load config");

    assert_eq!(cfg.service.base_url, "http://detector.local:5000");
    assert_eq!(cfg.service.timeout.as_millis(), 2500);
    assert_eq!(cfg.camera.url, "stub://override");
    assert_eq!(cfg.camera.width, 800);
    assert_eq!(cfg.camera.height, 600);
    assert_eq!(cfg.camera.interval_ms, 500);
    assert_eq!(cfg.scan.step_ms, 2000);
    assert_eq!(cfg.scan.hires_width, 1920);
    assert_eq!(cfg.alert.label, "Knife");
    assert!((cfg.alert.confidence_threshold - 60.0).abs() < f32::EPSILON);
    assert_eq!(cfg.alert.cooldown_ms, 10000);
    assert!(cfg.alert.muted);
    assert_eq!(
        cfg.alert.export_dir,
        std::path::PathBuf::from("/tmp/gunwatch-alerts")
    );

    clear_env();
}

#[test]
fn rejects_invalid_settings() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{"camera": {"interval_ms": 0}}"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("GUNWATCH_CONFIG", file.path());
    assert!(WatchConfig::load().is_err());

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{"alert": {"confidence_threshold": 150.0}}"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("GUNWATCH_CONFIG", file.path());
    assert!(WatchConfig::load().is_err());

    clear_env();
}
