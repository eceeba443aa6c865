//! リモート実行のエラー型

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("failed to launch ssh for {host}: {source}")]
    Spawn {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command failed on {host} (exit {status}): {command}\n{stderr}")]
    CommandFailed {
        host: String,
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("upload of {path} to {host} failed: {message}")]
    UploadFailed {
        host: String,
        path: String,
        message: String,
    },
}

impl RemoteError {
    /// 失敗したホスト
    pub fn host(&self) -> &str {
        match self {
            RemoteError::Spawn { host, .. }
            | RemoteError::CommandFailed { host, .. }
            | RemoteError::UploadFailed { host, .. } => host,
        }
    }
}

pub type Result<T> = std::result::Result<T, RemoteError>;
