//! デプロイの記録
//!
//! 記録は付随的な処理。トラッカー外のリポジトリ、トークンなし、
//! 報告する変更なしは [`LogOutcome::Skipped`] になり、
//! ある環境の報告失敗が他の環境を止めることはない。

use crate::branch::BranchManager;
use crate::error::Result;
use crate::tracker::{DeploymentRecord, Tracker, account_host, parse_repository};
use railyard_core::{DeployConfig, Environment, HostFilter, Role, all_addresses, resolve_targets};
use railyard_remote::Transport;
use std::fmt;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnrecognisedRepository { url: String },
    MissingToken { account_host: String },
    NothingToLog { revision: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnrecognisedRepository { url } => {
                write!(f, "repository URL {} does not match a tracker repository", url)
            }
            SkipReason::MissingToken { account_host } => {
                write!(f, "no tracker token configured for {}", account_host)
            }
            SkipReason::NothingToLog { revision } => write!(
                f,
                "current and rollback release are both {}, nothing to log",
                revision
            ),
        }
    }
}

/// 1環境への報告結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentResult {
    pub environment: Environment,
    /// トラッカーが報告を拒否した場合のエラー内容
    pub error: Option<String>,
}

impl EnvironmentResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutcome {
    Logged {
        record: DeploymentRecord,
        environments: Vec<EnvironmentResult>,
    },
    Skipped(SkipReason),
}

impl LogOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, LogOutcome::Skipped(_))
    }
}

/// 直近の `advance` のリビジョン範囲をトラッカーに報告
///
/// 失敗しうるのはホストからのリビジョン取得だけで、
/// トラッカー側の結果はすべて outcome に含める。
#[instrument(skip_all)]
pub async fn log_deployment(
    config: &DeployConfig,
    transport: &dyn Transport,
    tracker: &dyn Tracker,
) -> Result<LogOutcome> {
    let Some(repository) = parse_repository(&config.repository, &config.tracker.host) else {
        let reason = SkipReason::UnrecognisedRepository {
            url: config.repository.clone(),
        };
        warn!("{}", reason);
        return Ok(LogOutcome::Skipped(reason));
    };

    let account_host = account_host(&repository.account, &config.tracker.host);
    if !tracker.has_token(&account_host).await {
        let reason = SkipReason::MissingToken { account_host };
        warn!("{}", reason);
        return Ok(LogOutcome::Skipped(reason));
    }

    let hosts = resolve_targets(&config.roles, &[Role::APP, Role::STORAGE], HostFilter::Release)?;
    let revisions = BranchManager::new(config, transport)
        .revisions(&hosts[0])
        .await?;

    if revisions.is_unchanged() {
        let reason = SkipReason::NothingToLog {
            revision: revisions.deploy,
        };
        warn!("{}", reason);
        return Ok(LogOutcome::Skipped(reason));
    }

    let record = DeploymentRecord {
        repository,
        from: revisions.rollback,
        to: revisions.deploy,
        servers: all_addresses(&config.roles),
        branch: config.branch.clone(),
        tracker_host: config.tracker.host.clone(),
        protocol: config.tracker.protocol.clone(),
    };

    let mut environments = Vec::with_capacity(config.environments.len());
    for environment in &config.environments {
        let error = match tracker.record(&record, environment).await {
            Ok(()) => {
                info!(environment = %environment, "deployment logged");
                None
            }
            Err(e) => {
                warn!(environment = %environment, "failed to log deployment: {}", e);
                Some(e.to_string())
            }
        };
        environments.push(EnvironmentResult {
            environment: environment.clone(),
            error,
        });
    }

    Ok(LogOutcome::Logged {
        record,
        environments,
    })
}
