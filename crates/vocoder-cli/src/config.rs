use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use vocoder_core::EffectConfig;

pub(crate) fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vocoder")
        .join("config.toml")
}

/// Effective configuration: the explicit file when given, else the
/// per-user file if one exists, else the built-in defaults.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<EffectConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = config_path();
            if !path.exists() {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(EffectConfig::default());
            }
            path
        }
    };

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = EffectConfig::from_toml_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    tracing::info!(path = %path.display(), "Loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_is_namespaced() {
        let path = config_path();
        assert!(path.ends_with("vocoder/config.toml"));
    }

    #[test]
    fn test_explicit_path_errors_are_fatal() {
        let scratch = |name: &str| {
            std::env::temp_dir().join(format!("vocoder-cli-{name}-{}.toml", std::process::id()))
        };
        let missing = scratch("missing");
        assert!(load_config(Some(&missing)).is_err());

        let broken = scratch("broken");
        std::fs::write(&broken, "[flanger\nenabled = ").unwrap();
        let result = load_config(Some(&broken));
        std::fs::remove_file(&broken).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_path_is_used() {
        let path = std::env::temp_dir().join(format!("vocoder-cli-ok-{}.toml", std::process::id()));
        std::fs::write(&path, "[ring_modulation]\ncarrier_hz = 30.0\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(config.ring_modulation.enabled);
        assert_eq!(config.ring_modulation.params.carrier_hz, 30.0);
    }
}
