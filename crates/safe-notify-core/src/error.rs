use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid category: {0}")]
    InvalidCategory(String),

    #[error("invalid severity: {0}")]
    InvalidSeverity(String),

    #[error("invalid {kind}: {value}")]
    InvalidStatus { kind: &'static str, value: String },

    #[error("invalid environment '{0}': expected development, staging, or production")]
    InvalidEnvironment(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NotifyError>;
