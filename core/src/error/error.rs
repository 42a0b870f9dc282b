use thiserror::Error;

use crate::state::TransitionError;
use crate::wait::WaitError;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("config error: {0}")]
    Config(String),
    #[error("lifecycle error: {0}")]
    Transition(#[from] TransitionError),
    #[error("wait aborted: {0}")]
    Wait(#[from] WaitError),
    #[error("collection {name} failed: {source}")]
    Collection {
        name: String,
        source: anyhow::Error,
    },
    #[error("embed model {model_key} failed to load: {source}")]
    EmbedModel {
        model_key: String,
        source: anyhow::Error,
    },
    #[error("chat init failed: {0}")]
    Chat(String),
    #[error("plugin error: {0}")]
    Plugin(#[from] anyhow::Error),
}

impl EnvError {
    pub fn collection(name: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Collection {
            name: name.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("environment failed: {0}")]
    Env(#[from] EnvError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_error_names_the_collection() {
        let err = EnvError::collection("smart_sources", anyhow::anyhow!("disk full"));
        assert_eq!(err.to_string(), "collection smart_sources failed: disk full");
    }

    #[test]
    fn test_cli_error_wraps_env_error() {
        let err: CliError = EnvError::Config("bad".into()).into();
        assert!(matches!(err, CliError::Env(EnvError::Config(_))));
    }
}
