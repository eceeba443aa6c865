//! デプロイのエラー型

use railyard_core::CoreError;
use railyard_remote::RemoteError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    /// 非ゼロ終了、到達不能なホスト、アップロード失敗
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// 設定、テンプレート、ターゲット解決
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("precondition failed on {host}: {message}")]
    Precondition { host: String, message: String },

    #[error("unexpected output from {host}: {message}")]
    UnexpectedOutput { host: String, message: String },

    #[error("tracker error: {0}")]
    Tracker(String),

    #[error("local git error: {0}")]
    LocalGit(String),
}

impl DeployError {
    pub fn is_precondition(&self) -> bool {
        matches!(self, DeployError::Precondition { .. })
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
