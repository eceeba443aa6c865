//! railyard デプロイエンジン
//!
//! デプロイのリモート手順を組み合わせる: ブランチのローテーション、finalise、
//! マイグレーション、unicorn のライフサイクル、トラッカーへの報告。
//! リモート操作はすべて [`railyard_remote::Transport`] を経由するため、
//! テストではワークフロー全体を `MockTransport` で動かせる。

pub mod branch;
pub mod error;
pub mod lock;
pub mod logger;
pub mod pending;
pub mod process;
pub mod tracker;
pub mod workers;
pub mod workflow;

pub use branch::{BranchManager, DEPLOY_BRANCH, ROLLBACK_BRANCH, Revisions};
pub use error::{DeployError, Result};
pub use lock::{DeployLock, HeldLock};
pub use logger::{EnvironmentResult, LogOutcome, SkipReason, log_deployment};
pub use pending::{LocalGit, LocalRepo, PendingOutcome, pending};
pub use process::{Lifecycle, LifecycleAction, Unicorn};
pub use tracker::{CodebaseCli, DeploymentRecord, RepositoryRef, Tracker, parse_repository};
pub use workers::{BackgroundWorkers, ScriptedWorkers};
pub use workflow::{DeployMode, DeployReport, DeployState, Deployer};
