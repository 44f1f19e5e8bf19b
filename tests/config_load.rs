// tests/config_load.rs
use std::path::Path;
use std::{env, fs};

use digest_analyzer::config::pipeline::ENV_CONFIG_PATH;
use digest_analyzer::{Mechanism, PipelineConfig};

#[serial_test::serial]
#[test]
fn shipped_config_file_is_valid() {
    env::remove_var("ENRICH_CONCURRENCY");
    let p = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/pipeline.toml");
    let cfg = PipelineConfig::load_from(&p).unwrap();
    assert_eq!(cfg.enrich.concurrency, 3);
    assert_eq!(cfg.analysis.mechanisms.default, Mechanism::AdoptionCurve);
    assert_eq!(
        cfg.analysis.mechanisms.priority.first(),
        Some(&Mechanism::SecurityBoundary)
    );
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not picked up.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var(ENV_CONFIG_PATH);
    env::remove_var("ENRICH_CONCURRENCY");

    // 1) nothing → built-in defaults
    let cfg = PipelineConfig::load_default().unwrap();
    assert_eq!(cfg.enrich.concurrency, 3);

    // 2) ./config/pipeline.toml
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("pipeline.toml"), "[enrich]\nconcurrency = 4\n").unwrap();
    assert_eq!(PipelineConfig::load_default().unwrap().enrich.concurrency, 4);

    // 3) env path wins over the fallback file
    let p_env = tmp.path().join("custom.toml");
    fs::write(&p_env, "[enrich]\nconcurrency = 6\n").unwrap();
    env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
    assert_eq!(PipelineConfig::load_default().unwrap().enrich.concurrency, 6);

    // 4) env path set but missing → error, not silent defaults
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("nope.toml").display().to_string());
    assert!(PipelineConfig::load_default().is_err());
    env::remove_var(ENV_CONFIG_PATH);

    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn unknown_mechanism_in_file_is_rejected() {
    env::remove_var("ENRICH_CONCURRENCY");
    let tmp = tempfile::tempdir().unwrap();
    let p = tmp.path().join("pipeline.toml");
    fs::write(&p, "[analysis.mechanisms]\ndefault = \"vibes\"\n").unwrap();
    assert!(PipelineConfig::load_from(&p).is_err());
}
