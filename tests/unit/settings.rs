use super::*;

#[test]
fn defaults_match_editor() {
    let s = Settings::default();
    assert_eq!(s.undo_cap, 25);
    assert_eq!(s.acc_preference, AccPreference::Default);
    assert!(s.cpu_threads() >= 1);
    assert_eq!(s.cache_budget_bytes(), None);
}

#[test]
fn partial_json_fills_defaults() {
    let s = Settings::from_json(r#"{ "cpu_threads_cap": 1, "acc_preference": "gpu_soft" }"#)
        .unwrap();
    assert_eq!(s.cpu_threads(), 1);
    assert_eq!(s.acc_preference, AccPreference::GpuSoft);
    assert_eq!(s.undo_cap, 25);
}

#[test]
fn rejects_unknown_fields_and_zero_undo() {
    assert!(Settings::from_json(r#"{ "threads": 4 }"#).is_err());
    let err = Settings::from_json(r#"{ "undo_cap": 0 }"#).unwrap_err();
    assert!(err.to_string().starts_with("validation error"));
}

#[test]
fn save_then_load() {
    let dir = std::env::temp_dir().join(format!("frameloom-settings-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("settings.json");
    let s = Settings {
        ram_mb_cap: 2048,
        cache_budget_mb: 64,
        ..Settings::default()
    };
    s.save(&path).unwrap();
    let back = Settings::load(&path).unwrap();
    assert_eq!(back, s);
    assert_eq!(back.cache_budget_bytes(), Some(64 * 1024 * 1024));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_file_is_resource_error() {
    let err = Settings::load(Path::new("/nonexistent/frameloom.json")).unwrap_err();
    assert!(matches!(err, FrameloomError::Resource(_)));
}
