use crate::core::models::BuildOptions;
use crate::utils::{KazeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration file format (kaze.config.json)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KazeConfig {
    /// Output directory (default: "dist")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outdir: Option<String>,

    /// Minify transformed modules (default: false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minify: Option<bool>,

    /// Suppress the completion summary (default: false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silent: Option<bool>,

    /// Override directory for the framework runtime files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_dir: Option<String>,

    /// Whole-build timeout budget in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_timeout_ms: Option<u64>,

    /// Tailwind/CSS collaborator timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css_timeout_ms: Option<u64>,
}

/// Loads kaze.config.json when present and merges it under CLI flags
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load_from_file(root: &Path) -> Result<Option<KazeConfig>> {
        let config_path = root.join("kaze.config.json");

        if !config_path.exists() {
            debug!("no kaze.config.json found, using defaults");
            return Ok(None);
        }

        debug!("loading config from {}", config_path.display());
        let content = std::fs::read_to_string(&config_path).map_err(KazeError::Io)?;
        let config: KazeConfig = serde_json::from_str(&content).map_err(|err| {
            KazeError::config(format!("failed to parse kaze.config.json: {}", err))
        })?;

        Ok(Some(config))
    }

    /// CLI flags beat the config file, the config file beats the defaults
    pub fn merge_with_cli(
        file_config: Option<KazeConfig>,
        root: PathBuf,
        outdir: Option<&str>,
        minify: Option<bool>,
        silent: Option<bool>,
        runtime_dir: Option<PathBuf>,
    ) -> BuildOptions {
        let base = file_config.unwrap_or_default();
        let defaults = BuildOptions::default();

        let outdir_str = outdir
            .map(str::to_string)
            .or(base.outdir)
            .unwrap_or_else(|| defaults.outdir.display().to_string());
        let resolved_outdir = if Path::new(&outdir_str).is_absolute() {
            PathBuf::from(&outdir_str)
        } else {
            root.join(&outdir_str)
        };

        let resolved_runtime_dir = runtime_dir.or_else(|| {
            base.runtime_dir.map(|dir| {
                if Path::new(&dir).is_absolute() {
                    PathBuf::from(dir)
                } else {
                    root.join(dir)
                }
            })
        });

        BuildOptions {
            project_root: root,
            outdir: resolved_outdir,
            minify: minify.or(base.minify).unwrap_or(defaults.minify),
            silent: silent.or(base.silent).unwrap_or(defaults.silent),
            runtime_dir: resolved_runtime_dir,
            build_timeout_ms: base.build_timeout_ms.unwrap_or(defaults.build_timeout_ms),
            css_timeout_ms: base.css_timeout_ms.unwrap_or(defaults.css_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_config_file_yields_none() {
        let temp = tempdir().unwrap();
        assert!(ConfigLoader::load_from_file(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_config_file_is_parsed_camel_case() {
        let temp = tempdir().unwrap();
        std::fs::write(
            temp.path().join("kaze.config.json"),
            r#"{ "outdir": "build", "minify": true, "cssTimeoutMs": 5000 }"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(temp.path()).unwrap().unwrap();
        assert_eq!(config.outdir.as_deref(), Some("build"));
        assert_eq!(config.minify, Some(true));
        assert_eq!(config.css_timeout_ms, Some(5000));
    }

    #[test]
    fn test_invalid_config_is_a_config_error() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("kaze.config.json"), "{ not json").unwrap();

        let result = ConfigLoader::load_from_file(temp.path());
        assert!(matches!(result, Err(KazeError::Config(_))));
    }

    #[test]
    fn test_cli_flags_beat_config_file() {
        let config = KazeConfig {
            outdir: Some("build".to_string()),
            minify: Some(false),
            ..KazeConfig::default()
        };

        let options = ConfigLoader::merge_with_cli(
            Some(config),
            PathBuf::from("/proj"),
            Some("dist-cli"),
            Some(true),
            None,
            None,
        );

        assert_eq!(options.outdir, PathBuf::from("/proj/dist-cli"));
        assert!(options.minify);
        assert!(!options.silent);
    }

    #[test]
    fn test_config_file_fills_cli_gaps() {
        let config = KazeConfig {
            outdir: Some("build".to_string()),
            silent: Some(true),
            build_timeout_ms: Some(120_000),
            ..KazeConfig::default()
        };

        let options = ConfigLoader::merge_with_cli(
            Some(config),
            PathBuf::from("/proj"),
            None,
            None,
            None,
            None,
        );

        assert_eq!(options.outdir, PathBuf::from("/proj/build"));
        assert!(options.silent);
        assert_eq!(options.build_timeout_ms, 120_000);
    }
}
