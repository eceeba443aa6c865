//! テスト用のインメモリトランスポート
//!
//! すべての呼び出しを順に記録し、登録したルールでコマンドに応答する。
//! ルールに一致しないコマンドは空の出力で成功する。

use crate::command::RemoteCommand;
use crate::error::{RemoteError, Result};
use crate::transport::{CommandOutput, Transport};
use async_trait::async_trait;
use railyard_core::Host;
use std::sync::{Mutex, MutexGuard};

/// 記録されたトランスポート呼び出し
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Execute { host: String, command: String },
    Upload(Upload),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub host: String,
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone)]
struct Rule {
    host: Option<String>,
    pattern: String,
    output: CommandOutput,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<Call>,
    rules: Vec<Rule>,
    failing_uploads: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 全ホストで `pattern` を含むコマンドに応答
    pub fn respond(&self, pattern: &str, output: CommandOutput) {
        self.state().rules.push(Rule {
            host: None,
            pattern: pattern.to_string(),
            output,
        });
    }

    /// 特定ホストで `pattern` を含むコマンドに応答
    pub fn respond_on_host(&self, host: &str, pattern: &str, output: CommandOutput) {
        self.state().rules.push(Rule {
            host: Some(host.to_string()),
            pattern: pattern.to_string(),
            output,
        });
    }

    /// 特定ホストで `pattern` を含むコマンドを非ゼロ終了させる
    pub fn fail_on_host(&self, host: &str, pattern: &str, status: i32, stderr: &str) {
        self.respond_on_host(host, pattern, CommandOutput::failed(status, stderr));
    }

    /// 全ホストで `pattern` を含むコマンドを非ゼロ終了させる
    pub fn fail(&self, pattern: &str, status: i32, stderr: &str) {
        self.respond(pattern, CommandOutput::failed(status, stderr));
    }

    /// `host` へのアップロードを失敗させる
    pub fn fail_uploads_to(&self, host: &str) {
        self.state().failing_uploads.push(host.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// 実行順の `(host, command)` ペア
    pub fn executed(&self) -> Vec<(String, String)> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Execute { host, command } => Some((host.clone(), command.clone())),
                Call::Upload(_) => None,
            })
            .collect()
    }

    /// 特定ホストで実行したコマンド（順序通り）
    pub fn executed_on(&self, host: &str) -> Vec<String> {
        self.executed()
            .into_iter()
            .filter(|(h, _)| h == host)
            .map(|(_, c)| c)
            .collect()
    }

    /// 全コマンド（順序通り）
    pub fn commands(&self) -> Vec<String> {
        self.executed().into_iter().map(|(_, c)| c).collect()
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Upload(upload) => Some(upload.clone()),
                Call::Execute { .. } => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.state().calls.clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, host: &Host, command: &RemoteCommand) -> Result<CommandOutput> {
        let rendered = command.render();
        let mut state = self.state();
        state.calls.push(Call::Execute {
            host: host.address.clone(),
            command: rendered.clone(),
        });

        // 後に登録したルールを優先
        let output = state
            .rules
            .iter()
            .rev()
            .find(|rule| {
                rule.host.as_deref().is_none_or(|h| h == host.address)
                    && rendered.contains(&rule.pattern)
            })
            .map(|rule| rule.output.clone())
            .unwrap_or_default();

        Ok(output)
    }

    async fn upload(&self, host: &Host, content: &str, path: &str) -> Result<()> {
        let mut state = self.state();
        state.calls.push(Call::Upload(Upload {
            host: host.address.clone(),
            path: path.to_string(),
            content: content.to_string(),
        }));

        if state.failing_uploads.contains(&host.address) {
            return Err(RemoteError::UploadFailed {
                host: host.to_string(),
                path: path.to_string(),
                message: "connection reset".to_string(),
            });
        }
        Ok(())
    }
}
