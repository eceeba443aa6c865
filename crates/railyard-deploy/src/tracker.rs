//! Codebase デプロイトラッカー
//!
//! デプロイは `cb` コマンドラインクライアント経由で報告する。
//! APIトークンはアカウントごとに `cb` 側で管理される。

use crate::error::{DeployError, Result};
use async_trait::async_trait;
use railyard_core::Environment;
use regex::Regex;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// トラッカー上のリポジトリURLからパースした `account/project/repo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub account: String,
    pub project: String,
    pub repo: String,
}

/// `user@<tracker_host>:account/project/repo.git` をパース
///
/// それ以外は `None`。外部のリポジトリはエラーではない。
pub fn parse_repository(url: &str, tracker_host: &str) -> Option<RepositoryRef> {
    let pattern = format!(
        r"^[^@\s]+@{}:([^/\s]+)/([^/\s]+)/([^/\s]+)\.git$",
        regex::escape(tracker_host)
    );
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(url.trim())?;

    Some(RepositoryRef {
        account: caps[1].to_string(),
        project: caps[2].to_string(),
        repo: caps[3].to_string(),
    })
}

/// 1回のデプロイで報告する内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRecord {
    pub repository: RepositoryRef,
    pub from: String,
    pub to: String,
    pub servers: Vec<String>,
    pub branch: String,
    pub tracker_host: String,
    pub protocol: String,
}

impl DeploymentRecord {
    /// `<account>.<tracker host>`
    pub fn account_host(&self) -> String {
        account_host(&self.repository.account, &self.tracker_host)
    }

    /// 1環境分の `cb` の引数
    pub fn cb_args(&self, environment: &Environment) -> Vec<String> {
        vec![
            "deploy".to_string(),
            self.from.clone(),
            self.to.clone(),
            "-s".to_string(),
            self.servers.join(","),
            "-b".to_string(),
            self.branch.clone(),
            "-r".to_string(),
            format!("{}:{}", self.repository.project, self.repository.repo),
            "-h".to_string(),
            self.account_host(),
            "--protocol".to_string(),
            self.protocol.clone(),
            "-e".to_string(),
            environment.to_string(),
        ]
    }
}

pub fn account_host(account: &str, tracker_host: &str) -> String {
    format!("{}.{}", account, tracker_host)
}

#[async_trait]
pub trait Tracker: Send + Sync {
    /// `account_host` 用のアクセストークンが設定されているか
    async fn has_token(&self, account_host: &str) -> bool;

    async fn record(&self, record: &DeploymentRecord, environment: &Environment) -> Result<()>;
}

/// `cb` CLI ラッパー
#[derive(Debug, Clone)]
pub struct CodebaseCli {
    program: String,
}

impl CodebaseCli {
    pub fn new() -> Self {
        Self {
            program: "cb".to_string(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for CodebaseCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tracker for CodebaseCli {
    async fn has_token(&self, account_host: &str) -> bool {
        debug!("Running: {} test {}", self.program, account_host);

        let status = Command::new(&self.program)
            .args(["test", account_host])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => status.success(),
            Err(e) => {
                debug!("{} not runnable: {}", self.program, e);
                false
            }
        }
    }

    async fn record(&self, record: &DeploymentRecord, environment: &Environment) -> Result<()> {
        let args = record.cb_args(environment);
        info!("* running: {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| DeployError::Tracker(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DeployError::Tracker(stderr.trim().to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repository() {
        let parsed = parse_repository("git@codebasehq.com:acme/shop/web.git", "codebasehq.com");
        assert_eq!(
            parsed,
            Some(RepositoryRef {
                account: "acme".to_string(),
                project: "shop".to_string(),
                repo: "web".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_repository_rejects_foreign_urls() {
        for url in [
            "git@github.com:acme/web.git",
            "git@codebasehq.com:acme/web.git",
            "https://codebasehq.com/acme/shop/web.git",
            "git@codebasehq.com:acme/shop/web",
            "git@codebasehqXcom:acme/shop/web.git",
            "",
        ] {
            assert_eq!(parse_repository(url, "codebasehq.com"), None, "{url}");
        }
    }

    #[test]
    fn test_parse_repository_custom_host() {
        let parsed = parse_repository("git@code.internal:ops/infra/tools.git", "code.internal").unwrap();
        assert_eq!(parsed.account, "ops");
        assert_eq!(parsed.repo, "tools");
    }

    #[test]
    fn test_cb_args() {
        let record = DeploymentRecord {
            repository: RepositoryRef {
                account: "acme".to_string(),
                project: "shop".to_string(),
                repo: "web".to_string(),
            },
            from: "aaa".to_string(),
            to: "bbb".to_string(),
            servers: vec!["a1".to_string(), "s1".to_string()],
            branch: "main".to_string(),
            tracker_host: "codebasehq.com".to_string(),
            protocol: "https".to_string(),
        };

        assert_eq!(
            record.cb_args(&Environment::new("staging")).join(" "),
            "deploy aaa bbb -s a1,s1 -b main -r shop:web -h acme.codebasehq.com --protocol https -e staging"
        );
    }

    #[tokio::test]
    async fn test_missing_binary_has_no_token() {
        let cli = CodebaseCli::with_program("/nonexistent/railyard-cb");
        assert!(!cli.has_token("acme.codebasehq.com").await);
    }
}
