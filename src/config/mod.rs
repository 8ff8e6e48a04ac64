//! Configuration loading for the clipforge binary.
//!
//! The config types live in [`clipforge_common::config`]; this module finds
//! the file, parses it, applies environment overrides and reports problems.

pub use clipforge_common::config::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config = Config::from_toml(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config.apply_env_overrides();
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config.
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./clipforge.toml",
        "./config.toml",
        "~/.config/clipforge/config.toml",
        "/etc/clipforge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    let mut config = Config::default();
    config.apply_env_overrides();
    validate_config(&config)?;
    Ok(config)
}

/// Reject configurations that cannot work; log the merely suspicious ones.
fn validate_config(config: &Config) -> Result<()> {
    if config.transcode.enabled && config.transcode.heights.contains(&0) {
        anyhow::bail!("transcode.heights cannot contain 0");
    }
    if config.transcode.timeout_secs == 0 {
        anyhow::bail!("transcode.timeout_secs cannot be 0");
    }
    if config.artifacts.timeout_secs == 0 {
        anyhow::bail!("artifacts.timeout_secs cannot be 0");
    }

    if !config.scan.video_dir.exists() {
        tracing::warn!("Video directory does not exist: {:?}", config.scan.video_dir);
    }
    for warning in config.validate() {
        tracing::warn!("Config: {warning}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_valid_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[transcode]\nheights = [480]\nuse_hardware = true").unwrap();
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.transcode.heights, vec![480]);
        assert!(config.transcode.use_hardware);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[transcode]\ntimeout_secs = 0").unwrap();
        let err = load_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(load_config_or_default(Some(Path::new("/nonexistent/clipforge.toml"))).is_err());
    }
}
