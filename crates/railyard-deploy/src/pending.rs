//! デプロイ待ちのコミット
//!
//! ホストで稼働中のリビジョンと、オペレーターのローカルチェックアウトにある
//! デプロイブランチの先端を比較する。

use crate::branch::BranchManager;
use crate::error::{DeployError, Result};
use async_trait::async_trait;
use railyard_core::{DeployConfig, HostFilter, Role, resolve_targets};
use railyard_remote::Transport;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// オペレーターのローカルリポジトリ
#[async_trait]
pub trait LocalRepo: Send + Sync {
    /// `branch` の先端コミット
    async fn tip(&self, branch: &str) -> Result<String>;

    /// `git log from..to`
    async fn log_range(&self, from: &str, to: &str) -> Result<String>;
}

/// `git` バイナリ経由のローカルリポジトリ
#[derive(Debug, Clone)]
pub struct LocalGit {
    dir: PathBuf,
}

impl LocalGit {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn git(&self, args: &[&str]) -> Result<String> {
        debug!("Running: git {}", args.join(" "));

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| DeployError::LocalGit(format!("git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DeployError::LocalGit(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl LocalRepo for LocalGit {
    async fn tip(&self, branch: &str) -> Result<String> {
        let out = self.git(&["log", branch, "--pretty=%H", "-n", "1"]).await?;
        Ok(out.trim().to_string())
    }

    async fn log_range(&self, from: &str, to: &str) -> Result<String> {
        self.git(&["log", &format!("{}..{}", from, to)]).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOutcome {
    /// ホストはすでにローカルの先端で稼働中
    UpToDate(String),
    Pending { from: String, to: String, log: String },
}

/// ローカルのデプロイブランチ上で、まだホストに反映されていないコミットを列挙
pub async fn pending(
    config: &DeployConfig,
    transport: &dyn Transport,
    local: &dyn LocalRepo,
) -> Result<PendingOutcome> {
    let hosts = resolve_targets(&config.roles, &[Role::APP, Role::STORAGE], HostFilter::Release)?;
    let current = BranchManager::new(config, transport)
        .current_revision(&hosts[0])
        .await?;
    let local_tip = local.tip(&config.branch).await?;

    if current == local_tip {
        return Ok(PendingOutcome::UpToDate(current));
    }

    let log = local.log_range(&current, &local_tip).await?;
    Ok(PendingOutcome::Pending {
        from: current,
        to: local_tip,
        log,
    })
}
