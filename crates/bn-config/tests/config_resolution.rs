//! Configuration loading + resolution tests against real files.
//!
//! Covers:
//! - TOML and JSON loading by extension
//! - Resolution order (explicit > env > config dir > XDG)
//! - Validation of loaded files

use bn_config::resolve::{resolve_config, ConfigSource, CONFIG_FILENAME};
use bn_config::{
    load_inference_config, validate_learning, InferenceConfig, LearningConfig, UpdateSchedule,
    ValidationError,
};
use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const ENV_KEYS: [&str; 3] = ["BNET_CONFIG", "BNET_CONFIG_DIR", "XDG_CONFIG_HOME"];

struct EnvGuard {
    keys: Vec<String>,
    saved: Vec<Option<String>>,
}

impl EnvGuard {
    fn new(keys: &[&str]) -> Self {
        let saved = keys.iter().map(|k| env::var(k).ok()).collect();
        for key in keys {
            env::remove_var(key);
        }
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            saved,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (idx, key) in self.keys.iter().enumerate() {
            match self.saved.get(idx).and_then(|v| v.as_ref()) {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("env lock poisoned");
    f()
}

fn write_config(path: &Path, max_iterations: usize) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create config parent");
    }
    fs::write(
        path,
        format!("max_iterations = {}\nschedule = \"colored\"\n", max_iterations),
    )
    .expect("write config");
}

#[test]
fn test_load_toml_and_json_by_extension() {
    let temp = TempDir::new().expect("temp dir");
    let toml_path = temp.path().join("engine.toml");
    let json_path = temp.path().join("engine.json");
    write_config(&toml_path, 40);
    fs::write(&json_path, r#"{"max_iterations": 40, "schedule": "colored"}"#).unwrap();

    let from_toml = InferenceConfig::from_file(&toml_path).expect("toml loads");
    let from_json = InferenceConfig::from_file(&json_path).expect("json loads");
    assert_eq!(from_toml, from_json);
    assert_eq!(from_toml.schedule, UpdateSchedule::Colored);
}

#[test]
fn test_unknown_extension_rejected() {
    let temp = TempDir::new().expect("temp dir");
    let path = temp.path().join("engine.yaml");
    fs::write(&path, "max_iterations: 3").unwrap();
    let err = InferenceConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, ValidationError::ParseError(_)));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = InferenceConfig::from_file(Path::new("/nonexistent/bnet/engine.toml")).unwrap_err();
    assert_eq!(err.code(), 60);
}

#[test]
fn test_missing_required_field_reported() {
    let err = InferenceConfig::from_toml_str("test_elbo = true").unwrap_err();
    assert!(matches!(err, ValidationError::MissingField(_)));
}

#[test]
fn test_learning_file_validation() {
    let temp = TempDir::new().expect("temp dir");
    let path = temp.path().join("learn.toml");
    fs::write(
        &path,
        "[inference]\nmax_iterations = 100\n\n[priors]\ndirichlet_concentration = 0.0\n",
    )
    .unwrap();
    let cfg = LearningConfig::from_file(&path).expect("parses");
    let err = validate_learning(&cfg).expect_err("zero concentration rejected");
    assert!(matches!(err, ValidationError::InvalidValue { .. }));
}

#[test]
fn test_resolve_explicit_over_env() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&ENV_KEYS);
        let temp = TempDir::new().expect("temp dir");
        let explicit = temp.path().join("explicit").join(CONFIG_FILENAME);
        let env_file = temp.path().join("env").join(CONFIG_FILENAME);
        write_config(&explicit, 1);
        write_config(&env_file, 2);

        env::set_var("BNET_CONFIG", env_file.display().to_string());

        let paths = resolve_config(Some(&explicit));
        assert_eq!(paths.source, ConfigSource::Explicit);
        assert_eq!(paths.config.unwrap(), explicit);
    });
}

#[test]
fn test_resolve_env_over_config_dir() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&ENV_KEYS);
        let temp = TempDir::new().expect("temp dir");
        let env_file = temp.path().join("env").join(CONFIG_FILENAME);
        let dir = temp.path().join("dir");
        write_config(&env_file, 2);
        write_config(&dir.join(CONFIG_FILENAME), 3);

        env::set_var("BNET_CONFIG", env_file.display().to_string());
        env::set_var("BNET_CONFIG_DIR", dir.display().to_string());

        let paths = resolve_config(None);
        assert_eq!(paths.source, ConfigSource::Environment);
        assert_eq!(paths.config.unwrap(), env_file);
    });
}

#[test]
fn test_resolve_xdg_fallback_and_load() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&ENV_KEYS);
        let temp = TempDir::new().expect("temp dir");
        let xdg = temp.path().join("xdg");
        let app_file = xdg.join("bnet").join(CONFIG_FILENAME);
        write_config(&app_file, 77);

        env::set_var("XDG_CONFIG_HOME", xdg.display().to_string());

        let paths = resolve_config(None);
        assert_eq!(paths.source, ConfigSource::XdgConfig);

        let (config, snapshot) = load_inference_config(None)
            .expect("valid config")
            .expect("config found");
        assert_eq!(config.max_iterations, 77);
        assert_eq!(snapshot.source, "XDG config");
        assert_eq!(snapshot.summary.max_iterations, 77);
    });
}
