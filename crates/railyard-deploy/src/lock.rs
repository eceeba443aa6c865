//! アドバイザリなデプロイロック
//!
//! `<deploy_to>/.railyard.lock` に誰がデプロイ中かを書いたマーカーファイル。
//! 何もブロックしない。他人のロックが残っていれば報告し、
//! 実行はそのまま続ける。

use crate::error::Result;
use chrono::Utc;
use railyard_core::{DeployConfig, Host};
use railyard_remote::{RemoteCommand, Transport, broadcast, upload_all};
use tracing::warn;

/// 取得時にホスト上で見つかったロック
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldLock {
    pub host: String,
    pub owner: String,
}

pub struct DeployLock<'a> {
    config: &'a DeployConfig,
    transport: &'a dyn Transport,
}

impl<'a> DeployLock<'a> {
    pub fn new(config: &'a DeployConfig, transport: &'a dyn Transport) -> Self {
        Self { config, transport }
    }

    /// ロックファイルを書き込み、既存のロックを返す
    pub async fn acquire(&self, hosts: &[Host], owner: &str) -> Result<Vec<HeldLock>> {
        let path = self.config.lock_path();
        let read = RemoteCommand::new("cat").arg(&path);

        let mut held = Vec::new();
        for host in hosts {
            let output = self.transport.execute(host, &read).await?;
            let existing = output.stdout.trim();
            if output.success() && !existing.is_empty() {
                warn!(host = %host, "deploy lock held by {}", existing);
                held.push(HeldLock {
                    host: host.to_string(),
                    owner: existing.to_string(),
                });
            }
        }

        let content = format!("{} {}\n", owner, Utc::now().to_rfc3339());
        upload_all(self.transport, hosts, &content, &path).await?;

        Ok(held)
    }

    pub async fn release(&self, hosts: &[Host]) -> Result<()> {
        let remove = RemoteCommand::new("rm").args(["-f", &self.config.lock_path()]);
        broadcast(self.transport, hosts, &remove).await?;
        Ok(())
    }
}
