use thiserror::Error;

/// Errors returned while loading a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(toml::de::Error),
}

impl<E> From<ConfigError> for pp_core::PipelineError<E> {
    fn from(err: ConfigError) -> Self {
        pp_core::PipelineError::ConfigError(err.to_string())
    }
}
