//! ファンアウト用ヘルパー
//!
//! broadcast は1つのコマンドを全ホストに送り、全ホストが成功した場合のみ成功する。
//! 最初の失敗でそのステップは中断される。

use crate::command::RemoteCommand;
use crate::error::{RemoteError, Result};
use crate::transport::{CommandOutput, Transport};
use futures_util::future::try_join_all;
use railyard_core::Host;

/// 1ホストでのコマンド出力
#[derive(Debug, Clone)]
pub struct HostOutput {
    pub host: Host,
    pub output: CommandOutput,
}

/// 1ホストで `command` を実行（終了ステータス0が必須）
pub async fn run(transport: &dyn Transport, host: &Host, command: &RemoteCommand) -> Result<CommandOutput> {
    let output = transport.execute(host, command).await?;
    if !output.success() {
        return Err(RemoteError::CommandFailed {
            host: host.to_string(),
            command: command.render(),
            status: output.status,
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(output)
}

/// 全ホストで `command` を実行
pub async fn broadcast(
    transport: &dyn Transport,
    hosts: &[Host],
    command: &RemoteCommand,
) -> Result<Vec<HostOutput>> {
    tracing::info!(hosts = hosts.len(), "* executing `{}`", command);

    try_join_all(hosts.iter().map(|host| async move {
        let output = run(transport, host, command).await?;
        Ok::<_, RemoteError>(HostOutput {
            host: host.clone(),
            output,
        })
    }))
    .await
}

/// 全ホストの `path` に同じ内容をアップロード
pub async fn upload_all(
    transport: &dyn Transport,
    hosts: &[Host],
    content: &str,
    path: &str,
) -> Result<()> {
    tracing::info!(hosts = hosts.len(), path = %path, "* uploading");

    try_join_all(
        hosts
            .iter()
            .map(|host| transport.upload(host, content, path)),
    )
    .await?;
    Ok(())
}

/// 1ホストで `command` を実行し、trim した標準出力を返す
pub async fn capture(transport: &dyn Transport, host: &Host, command: &RemoteCommand) -> Result<String> {
    let output = run(transport, host, command).await?;
    Ok(output.stdout.trim().to_string())
}
