//! deploy / rollback ブランチの管理
//!
//! 各ホストは `deploy_to` に作業コピーを持ち、ローカルブランチは2つ:
//! `deploy`（チェックアウト中の稼働コード）と `rollback`（直前の `advance`
//! の前に稼働していたコード）。`rollback` が動くのは `advance` の中だけで、
//! `revert` は何もローテーションせずに `deploy` をそこへリセットする。

use crate::error::{DeployError, Result};
use railyard_core::{DeployConfig, Host};
use railyard_remote::{RemoteCommand, RemoteError, Transport, broadcast, capture};
use tracing::{info, instrument};

pub const DEPLOY_BRANCH: &str = "deploy";
pub const ROLLBACK_BRANCH: &str = "rollback";

/// ref が存在しないときの `git rev-parse --verify --quiet` の終了ステータス
const MISSING_REF_STATUS: i32 = 1;

/// 1ホスト上の2つのブランチの先端コミット
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revisions {
    pub rollback: String,
    pub deploy: String,
}

impl Revisions {
    /// 直近の advance から変化なし（または revert 済み）
    pub fn is_unchanged(&self) -> bool {
        self.rollback == self.deploy
    }
}

pub struct BranchManager<'a> {
    config: &'a DeployConfig,
    transport: &'a dyn Transport,
}

impl<'a> BranchManager<'a> {
    pub fn new(config: &'a DeployConfig, transport: &'a dyn Transport) -> Self {
        Self { config, transport }
    }

    fn git(&self) -> RemoteCommand {
        RemoteCommand::in_dir(&self.config.deploy_to).then("git")
    }

    /// `deploy` と `rollback` ブランチだけを持つ新しいチェックアウト
    ///
    /// `deploy_to` の既存内容はすべて削除される。
    #[instrument(skip_all, fields(branch = %self.config.branch))]
    pub async fn bootstrap(&self, hosts: &[Host]) -> Result<()> {
        let branch = &self.config.branch;
        if branch == DEPLOY_BRANCH || branch == ROLLBACK_BRANCH {
            return Err(DeployError::Precondition {
                host: "local".to_string(),
                message: format!(
                    "branch '{}' collides with the {}/{} pointers",
                    branch, DEPLOY_BRANCH, ROLLBACK_BRANCH
                ),
            });
        }

        info!("bootstrapping checkout at {}", self.config.deploy_to);

        let remove = RemoteCommand::new("rm").args(["-rf", &self.config.deploy_to]);
        broadcast(self.transport, hosts, &remove).await?;

        let clone = RemoteCommand::new("git").args([
            "clone",
            "-n",
            &self.config.repository,
            &self.config.deploy_to,
            "--branch",
            branch,
        ]);
        broadcast(self.transport, hosts, &clone).await?;

        let pointers = self
            .git()
            .args(["branch", ROLLBACK_BRANCH])
            .then("git")
            .args(["checkout", "-b", DEPLOY_BRANCH])
            .then("git")
            .args(["branch", "-d", branch]);
        broadcast(self.transport, hosts, &pointers).await?;

        Ok(())
    }

    /// すべてのホストに `rollback` ブランチがなければ失敗
    ///
    /// 前提条件エラーになるのは ref がない場合のみ。それ以外の非ゼロ終了
    /// （ssh の 255、git の 128 など）はコマンド失敗として扱う。
    pub async fn ensure_rollback_branch(&self, hosts: &[Host]) -> Result<()> {
        let verify = self.git().args([
            "rev-parse",
            "--verify",
            "--quiet",
            &format!("refs/heads/{}", ROLLBACK_BRANCH),
        ]);

        for host in hosts {
            let output = self.transport.execute(host, &verify).await?;
            match output.status {
                0 => {}
                MISSING_REF_STATUS => {
                    return Err(DeployError::Precondition {
                        host: host.to_string(),
                        message: format!(
                            "no '{}' branch in {}; run `yard deploy setup` first",
                            ROLLBACK_BRANCH, self.config.deploy_to
                        ),
                    });
                }
                status => {
                    return Err(RemoteError::CommandFailed {
                        host: host.to_string(),
                        command: verify.render(),
                        status,
                        stderr: output.stderr.trim().to_string(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// `rollback` を現在の `deploy` の先端に付け替え、`deploy` を
    /// fetch したリモートブランチへ進める
    ///
    /// 全ホストに `rollback` ブランチが必要。変更を加える前に
    /// 確認する。
    #[instrument(skip_all, fields(branch = %self.config.branch))]
    pub async fn advance(&self, hosts: &[Host]) -> Result<()> {
        self.ensure_rollback_branch(hosts).await?;

        let rotate = self
            .git()
            .args(["branch", "-D", ROLLBACK_BRANCH])
            .then("git")
            .args(["branch", ROLLBACK_BRANCH]);
        broadcast(self.transport, hosts, &rotate).await?;

        let update = self
            .git()
            .args(["fetch", "origin"])
            .then("git")
            .args(["reset", "--hard", &format!("origin/{}", self.config.branch)]);
        broadcast(self.transport, hosts, &update).await?;

        Ok(())
    }

    /// 作業コピーを `rollback` の先端に hard reset
    #[instrument(skip_all)]
    pub async fn revert(&self, hosts: &[Host]) -> Result<()> {
        let reset = self.git().args(["reset", "--hard", ROLLBACK_BRANCH]);
        broadcast(self.transport, hosts, &reset).await?;
        Ok(())
    }

    /// 1ホスト上の `rollback` と `deploy` の先端
    pub async fn revisions(&self, host: &Host) -> Result<Revisions> {
        let query = self
            .git()
            .args(["log", ROLLBACK_BRANCH, "--pretty=%H", "-n", "1"])
            .then("git")
            .args(["log", DEPLOY_BRANCH, "--pretty=%H", "-n", "1"]);

        let stdout = capture(self.transport, host, &query).await?;
        let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());

        match (lines.next(), lines.next()) {
            (Some(rollback), Some(deploy)) => Ok(Revisions {
                rollback: rollback.to_string(),
                deploy: deploy.to_string(),
            }),
            _ => Err(DeployError::UnexpectedOutput {
                host: host.to_string(),
                message: format!("expected two revisions, got {:?}", stdout),
            }),
        }
    }

    /// 1ホストでチェックアウト中のリビジョン
    pub async fn current_revision(&self, host: &Host) -> Result<String> {
        let query = self.git().args(["log", "--pretty=%H", "-n", "1"]);
        let revision = capture(self.transport, host, &query).await?;
        if revision.is_empty() {
            return Err(DeployError::UnexpectedOutput {
                host: host.to_string(),
                message: "empty revision".to_string(),
            });
        }
        Ok(revision)
    }
}
