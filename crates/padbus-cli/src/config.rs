use std::fs;
use std::path::{Path, PathBuf};

use padbus::BusOptions;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("yaml deserialize error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Parse bus options from a YAML document. Missing keys keep their defaults.
pub(crate) fn parse_options(source: &str) -> Result<BusOptions, ConfigError> {
    if source.trim().is_empty() {
        return Ok(BusOptions::default());
    }
    Ok(serde_yaml::from_str(source)?)
}

/// Resolve the options the bus starts with. The `dir` override wins over the file.
pub(crate) fn load_options(
    path: Option<&Path>,
    dir: Option<PathBuf>,
) -> Result<BusOptions, ConfigError> {
    let mut options = match path {
        Some(path) => {
            let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            parse_options(&source)?
        }
        None => BusOptions::default(),
    };
    if let Some(dir) = dir {
        options = options.with_device_dir(dir);
    }
    Ok(options)
}
