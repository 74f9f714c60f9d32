//! Factory configuration loading.
//!
//! Settings come from a JSON file (`SHORTCAST_CONFIG`, default
//! `config.json`); a missing file means defaults. A handful of environment
//! variables then override individual fields.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use shortcast_models::{DurationMode, FactoryConfig, VoiceEngine};

use crate::error::{WorkerError, WorkerResult};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Load, override and validate the factory configuration.
pub async fn load_config() -> WorkerResult<FactoryConfig> {
    let path = std::env::var("SHORTCAST_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = read_config_file(&path).await?;
    apply_overrides(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Read a config file, falling back to defaults when it does not exist.
pub async fn read_config_file(path: &Path) -> WorkerResult<FactoryConfig> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => {
            let config = serde_json::from_str(&raw).map_err(|e| {
                WorkerError::config_error(format!("{}: {}", path.display(), e))
            })?;
            info!(path = %path.display(), "Loaded configuration file");
            Ok(config)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No configuration file, using defaults");
            Ok(FactoryConfig::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Apply environment overrides through `lookup`.
///
/// Numeric values that fail to parse are ignored; unknown enum names are
/// rejected.
pub fn apply_overrides<F>(config: &mut FactoryConfig, lookup: F) -> WorkerResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(secs) = lookup("SHORTCAST_TARGET_SECS").and_then(|s| s.parse().ok()) {
        config.duration.target_duration_secs = secs;
    }
    if let Some(mode) = lookup("SHORTCAST_MODE") {
        config.duration.mode = mode.parse::<DurationMode>()?;
    }
    if let Some(max) = lookup("SHORTCAST_MAX_COMMENTS").and_then(|s| s.parse().ok()) {
        config.duration.max_comments = max;
    }
    if let Some(engine) = lookup("SHORTCAST_VOICE_ENGINE") {
        config.voice.engine = engine.parse::<VoiceEngine>()?;
    }
    if let Some(voice) = lookup("SHORTCAST_VOICE") {
        config.voice.voice = voice;
    }
    if let Some(dir) = lookup("SHORTCAST_WORK_DIR") {
        config.output.work_dir = PathBuf::from(dir);
    }
    if let Some(dir) = lookup("SHORTCAST_RESULTS_DIR") {
        config.output.results_dir = PathBuf::from(dir);
    }
    if let Some(threads) = lookup("SHORTCAST_ENCODER_THREADS").and_then(|s| s.parse().ok()) {
        config.video.encoding = config.video.encoding.clone().with_threads(threads);
    }
    if let Some(path) = lookup("SHORTCAST_BACKGROUND") {
        config.background.video_path = Some(PathBuf::from(path));
    }
    if let Some(keep) = lookup("SHORTCAST_KEEP_TEMP").and_then(|s| s.parse().ok()) {
        config.output.keep_temp = keep;
    }
    if let Some(dump) = lookup("SHORTCAST_DUMP_TIMINGS").and_then(|s| s.parse().ok()) {
        config.output.dump_timings = dump;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = FactoryConfig::default();
        apply_overrides(
            &mut config,
            lookup(&[
                ("SHORTCAST_TARGET_SECS", "45"),
                ("SHORTCAST_MODE", "long"),
                ("SHORTCAST_MAX_COMMENTS", "not-a-number"),
                ("SHORTCAST_VOICE_ENGINE", "espeak"),
                ("SHORTCAST_WORK_DIR", "/tmp/sc"),
            ]),
        )
        .unwrap();

        assert_eq!(config.duration.target_duration_secs, 45.0);
        assert_eq!(config.duration.mode, DurationMode::Long);
        assert_eq!(config.duration.max_comments, FactoryConfig::default().duration.max_comments);
        assert_eq!(config.voice.engine, VoiceEngine::Espeak);
        assert_eq!(config.output.work_dir, PathBuf::from("/tmp/sc"));
    }

    #[test]
    fn test_encoder_threads_override_is_capped() {
        let mut config = FactoryConfig::default();
        apply_overrides(&mut config, lookup(&[("SHORTCAST_ENCODER_THREADS", "32")])).unwrap();
        assert_eq!(config.video.encoding.threads, shortcast_models::encoding::MAX_ENCODER_THREADS);

        apply_overrides(&mut config, lookup(&[("SHORTCAST_ENCODER_THREADS", "4")])).unwrap();
        assert_eq!(config.video.encoding.threads, 4);
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let mut config = FactoryConfig::default();
        let err = apply_overrides(&mut config, lookup(&[("SHORTCAST_MODE", "medium")])).unwrap_err();
        assert!(matches!(err, WorkerError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = read_config_file(&dir.path().join("absent.json")).await.unwrap();
        assert_eq!(config.video.width, 1080);
    }

    #[tokio::test]
    async fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();
        let err = read_config_file(&path).await.unwrap_err();
        assert!(matches!(err, WorkerError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, r#"{"duration": {"target_duration_secs": 30}}"#)
            .await
            .unwrap();
        let config = read_config_file(&path).await.unwrap();
        assert_eq!(config.duration.target_duration_secs, 30.0);
        assert_eq!(config.voice.voice, "en-US-AriaNeural");
    }
}
