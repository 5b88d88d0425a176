use std::path::{Path, PathBuf};

use serde::Deserialize;
use tally_rt::SumMethod;

use crate::error::{convert_toml_error, CliError};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "tally.toml";

/// Defaults for every run, read from `tally.toml`. Flags on the command line win.
///
/// ```toml
/// n = 1000000
/// participants = 8
/// granularity = 64
/// method = "iterative"
/// progress = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TallyConfig {
    /// Upper bound of the range to sum.
    pub n: Option<u64>,

    /// World size, rank 0 included.
    pub participants: Option<usize>,

    /// Chunks the dynamic dispatcher cuts the range into.
    pub granularity: Option<u64>,

    /// How each participant sums its range.
    pub method: Option<MethodSetting>,

    /// Show a progress bar during dynamic runs.
    pub progress: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MethodSetting {
    /// n(n+1)/2 per range
    #[default]
    ClosedForm,
    /// Add every integer in turn
    Iterative,
}

impl From<MethodSetting> for SumMethod {
    fn from(setting: MethodSetting) -> Self {
        match setting {
            MethodSetting::ClosedForm => SumMethod::ClosedForm,
            MethodSetting::Iterative => SumMethod::Iterative,
        }
    }
}

impl TallyConfig {
    pub fn parse(src: &str, path: &Path) -> Result<Self, CliError> {
        toml::from_str(src).map_err(|e| convert_toml_error(e, path.to_path_buf(), src.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, CliError> {
        let src = std::fs::read_to_string(path).map_err(|e| CliError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = Self::parse(&src, path)?;
        log::debug!("Loaded configuration from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Reads `explicit` if given, otherwise `tally.toml` in `dir` when present.
    ///
    /// A missing default file is not an error; a missing explicit one is.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self, CliError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default: PathBuf = dir.join(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parses_every_key() -> Result<(), CliError> {
        let src = "n = 100\nparticipants = 4\ngranularity = 12\nmethod = \"iterative\"\nprogress = false\n";
        let config = TallyConfig::parse(src, Path::new("tally.toml"))?;
        assert_eq!(
            config,
            TallyConfig {
                n: Some(100),
                participants: Some(4),
                granularity: Some(12),
                method: Some(MethodSetting::Iterative),
                progress: Some(false),
            }
        );
        Ok(())
    }

    #[test]
    fn test_unknown_key_is_rejected_with_a_span() {
        let err = TallyConfig::parse("workers = 3\n", Path::new("tally.toml")).unwrap_err();
        match err {
            CliError::ConfigParse { span, .. } => assert!(span.is_some()),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_default_file_gives_defaults() -> Result<(), CliError> {
        let dir = tempdir().expect("temp dir");
        assert_eq!(TallyConfig::load(None, dir.path())?, TallyConfig::default());
        Ok(())
    }

    #[test]
    fn test_default_file_is_picked_up() -> Result<(), CliError> {
        let dir = tempdir().expect("temp dir");
        fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "n = 20\n").expect("write config");
        let config = TallyConfig::load(None, dir.path())?;
        assert_eq!(config.n, Some(20));
        assert_eq!(config.participants, None);
        Ok(())
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            TallyConfig::load(Some(&missing), dir.path()),
            Err(CliError::ConfigRead { .. })
        ));
    }
}
