use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config directory not found")]
    ConfigDirNotFound,

    #[error(
        "deploy configuration not found. Looked in:\n\
        - current directory: deploy.local.kdl, .deploy.local.kdl, deploy.kdl, .deploy.kdl\n\
        - ./.railyard/\n\
        - ~/.config/railyard/deploy.kdl\n\
        or set RAILYARD_CONFIG to the file path"
    )]
    DeployFileNotFound,

    #[error("RAILYARD_CONFIG points to a missing file: {0}")]
    ExplicitPathMissing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
