use crate::resolver::HostFilter;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error: {path}\nreason: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("required setting '{0}' is not configured")]
    MissingSetting(&'static str),

    #[error("no target hosts for roles [{roles}] (filter: {filter})")]
    NoTargets { roles: String, filter: HostFilter },
}

pub type Result<T> = std::result::Result<T, CoreError>;
