//! ssh CLI トランスポート
//!
//! システムの `ssh` バイナリをラップする。アップロードは標準入力経由で
//! `cat` に流すため、ホスト側に scp/sftp は不要。

use crate::command::RemoteCommand;
use crate::error::{RemoteError, Result};
use crate::transport::{CommandOutput, Transport};
use async_trait::async_trait;
use railyard_core::Host;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// ssh CLI トランスポート
#[derive(Debug, Clone)]
pub struct SshTransport {
    program: String,
    connect_timeout: u32,
}

impl SshTransport {
    pub fn new() -> Self {
        Self {
            program: "ssh".to_string(),
            connect_timeout: 10,
        }
    }

    /// 別の ssh バイナリを使う（ラッパースクリプトなど）
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_connect_timeout(mut self, seconds: u32) -> Self {
        self.connect_timeout = seconds;
        self
    }

    /// リモートコマンドの前に付ける引数
    pub fn ssh_args(&self, host: &Host) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            host.port.to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout),
        ];
        if host.forward_agent {
            args.push("-A".to_string());
        }
        args.push(host.ssh_target());
        args
    }
}

impl Default for SshTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn execute(&self, host: &Host, command: &RemoteCommand) -> Result<CommandOutput> {
        let remote = command.render();
        tracing::debug!(host = %host, "Running: {}", remote);

        let output = Command::new(&self.program)
            .args(self.ssh_args(host))
            .arg(&remote)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| RemoteError::Spawn {
                host: host.to_string(),
                source,
            })?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn upload(&self, host: &Host, content: &str, path: &str) -> Result<()> {
        let remote = RemoteCommand::new("cat").stdout_to(path).render();
        tracing::debug!(host = %host, path = %path, bytes = content.len(), "Uploading");

        let upload_error = |message: String| RemoteError::UploadFailed {
            host: host.to_string(),
            path: path.to_string(),
            message,
        };

        let mut child = Command::new(&self.program)
            .args(self.ssh_args(host))
            .arg(&remote)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RemoteError::Spawn {
                host: host.to_string(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(content.as_bytes())
                .await
                .map_err(|e| upload_error(e.to_string()))?;
            // stdin を drop してパイプを閉じ、`cat` に EOF を渡す
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| upload_error(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(upload_error(stderr.trim().to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(forward_agent: bool) -> Host {
        Host {
            address: "a1.example.com".to_string(),
            port: 2222,
            user: "deploy".to_string(),
            forward_agent,
            database_ops: false,
            no_release: false,
        }
    }

    #[test]
    fn test_ssh_args() {
        let ssh = SshTransport::new();
        assert_eq!(
            ssh.ssh_args(&host(true)),
            vec![
                "-p",
                "2222",
                "-o",
                "BatchMode=yes",
                "-o",
                "ConnectTimeout=10",
                "-A",
                "deploy@a1.example.com"
            ]
        );
    }

    #[test]
    fn test_ssh_args_without_agent() {
        let ssh = SshTransport::new().with_connect_timeout(3);
        let args = ssh.ssh_args(&host(false));
        assert!(!args.contains(&"-A".to_string()));
        assert!(args.contains(&"ConnectTimeout=3".to_string()));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let ssh = SshTransport::new().with_program("/nonexistent/railyard-ssh");
        let err = ssh
            .execute(&host(false), &RemoteCommand::new("whoami"))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Spawn { .. }));
        assert_eq!(err.host(), "a1.example.com:2222");
    }
}
