//! リモート実行の抽象

use crate::command::RemoteCommand;
use crate::error::Result;
use async_trait::async_trait;
use railyard_core::Host;

/// リモートコマンド1回分の終了ステータスと出力
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// ネットワークとの唯一の接点
///
/// `execute` は実行できたコマンドなら終了ステータスに関わらず `Ok` を返す。
/// `Err` はコマンドを送ることすらできなかったことを意味する。
#[async_trait]
pub trait Transport: Send + Sync {
    /// `host` のログインユーザーとしてコマンドを実行
    async fn execute(&self, host: &Host, command: &RemoteCommand) -> Result<CommandOutput>;

    /// `host` の `path` に `content` を書き込む
    async fn upload(&self, host: &Host, content: &str, path: &str) -> Result<()>;
}
