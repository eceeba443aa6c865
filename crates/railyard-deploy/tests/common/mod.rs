#![allow(dead_code)]

use async_trait::async_trait;
use railyard_core::{ConfigOverrides, DeployConfig, Environment, Host, parse_deploy_str};
use railyard_deploy::{DeployError, DeploymentRecord, Tracker};
use railyard_remote::{CommandOutput, RemoteCommand, Transport};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

pub const REPOSITORY: &str = "git@codebasehq.com:acme/shop/web.git";

/// app [a1, a2] と storage [s1] を持つ deploy.kdl
pub fn deploy_kdl(extra: &str) -> String {
    format!(
        r#"
application "shop"
repository "{REPOSITORY}"
branch "main"
unicorn sudo=#false
role "app" {{
    server "a1" database-ops=#true
    server "a2" database-ops=#true
}}
role "storage" {{
    server "s1"
}}
{extra}
"#
    )
}

pub fn config(kdl: &str) -> DeployConfig {
    let file = parse_deploy_str(kdl).unwrap();
    DeployConfig::resolve(
        file,
        &ConfigOverrides {
            operator: Some("alice".to_string()),
            ..Default::default()
        },
    )
    .unwrap()
}

/// すべての報告を記録するトラッカー
#[derive(Default)]
pub struct RecordingTracker {
    pub missing_token: bool,
    pub failing_environment: Option<String>,
    records: Mutex<Vec<(String, DeploymentRecord)>>,
    token_checks: Mutex<Vec<String>>,
}

impl RecordingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_token() -> Self {
        Self {
            missing_token: true,
            ..Default::default()
        }
    }

    pub fn failing_for(environment: &str) -> Self {
        Self {
            failing_environment: Some(environment.to_string()),
            ..Default::default()
        }
    }

    /// 呼び出し順の `(environment, record)`
    pub fn records(&self) -> Vec<(String, DeploymentRecord)> {
        self.records.lock().unwrap().clone()
    }

    pub fn token_checks(&self) -> Vec<String> {
        self.token_checks.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tracker for RecordingTracker {
    async fn has_token(&self, account_host: &str) -> bool {
        self.token_checks
            .lock()
            .unwrap()
            .push(account_host.to_string());
        !self.missing_token
    }

    async fn record(
        &self,
        record: &DeploymentRecord,
        environment: &Environment,
    ) -> railyard_deploy::Result<()> {
        self.records
            .lock()
            .unwrap()
            .push((environment.to_string(), record.clone()));
        if self.failing_environment.as_deref() == Some(environment.as_str()) {
            return Err(DeployError::Tracker("503 Service Unavailable".to_string()));
        }
        Ok(())
    }
}

/// 1ホストのチェックアウト
#[derive(Debug, Clone, Default)]
pub struct Checkout {
    pub branches: BTreeMap<String, String>,
    pub current: String,
}

impl Checkout {
    pub fn tip(&self, branch: &str) -> Option<&String> {
        self.branches.get(branch)
    }

    pub fn head(&self) -> Option<&String> {
        self.branches.get(&self.current)
    }
}

/// ブランチマネージャーの git コマンドをインメモリの
/// チェックアウトに対して解釈するトランスポート
#[derive(Default)]
pub struct GitSim {
    remote: Mutex<BTreeMap<String, String>>,
    checkouts: Mutex<HashMap<String, Checkout>>,
}

impl GitSim {
    pub fn new() -> Self {
        Self::default()
    }

    /// origin 上のブランチを動かす
    pub fn push(&self, branch: &str, revision: &str) {
        self.remote
            .lock()
            .unwrap()
            .insert(branch.to_string(), revision.to_string());
    }

    pub fn checkout(&self, host: &str) -> Checkout {
        self.checkouts
            .lock()
            .unwrap()
            .get(host)
            .cloned()
            .unwrap_or_default()
    }

    /// setup 未実行を想定した、追跡ブランチだけの単純な clone
    pub fn clone_without_pointers(&self, host: &str, branch: &str) {
        let tip = self.remote.lock().unwrap().get(branch).cloned().unwrap();
        let mut checkout = Checkout {
            current: branch.to_string(),
            ..Default::default()
        };
        checkout.branches.insert(branch.to_string(), tip);
        self.checkouts
            .lock()
            .unwrap()
            .insert(host.to_string(), checkout);
    }

    fn step(&self, host: &str, words: &[&str]) -> Result<String, String> {
        let remote = self.remote.lock().unwrap().clone();
        let mut checkouts = self.checkouts.lock().unwrap();

        match words {
            ["cd", _] | ["rm", ..] | ["git", "fetch", "origin"] => {
                if words[0] == "rm" {
                    checkouts.remove(host);
                }
                Ok(String::new())
            }
            ["git", "clone", "-n", _, _, "--branch", branch] => {
                let tip = remote
                    .get(*branch)
                    .ok_or_else(|| format!("remote branch {branch} not found"))?;
                let mut checkout = Checkout {
                    current: branch.to_string(),
                    ..Default::default()
                };
                checkout.branches.insert(branch.to_string(), tip.clone());
                checkouts.insert(host.to_string(), checkout);
                Ok(String::new())
            }
            _ => {
                let checkout = checkouts
                    .get_mut(host)
                    .ok_or_else(|| "not a git repository".to_string())?;
                git(checkout, &remote, words)
            }
        }
    }
}

fn git(
    checkout: &mut Checkout,
    remote: &BTreeMap<String, String>,
    words: &[&str],
) -> Result<String, String> {
    match words {
        ["git", "rev-parse", "--verify", "--quiet", reference] => {
            let name = reference.trim_start_matches("refs/heads/");
            checkout
                .tip(name)
                .map(|_| String::new())
                .ok_or_else(String::new)
        }
        ["git", "branch", "-D" | "-d", name] => checkout
            .branches
            .remove(*name)
            .map(|_| String::new())
            .ok_or_else(|| format!("error: branch '{name}' not found.")),
        ["git", "branch", name] => {
            if checkout.branches.contains_key(*name) {
                return Err(format!("fatal: a branch named '{name}' already exists"));
            }
            let head = checkout.head().cloned().ok_or("no HEAD")?;
            checkout.branches.insert(name.to_string(), head);
            Ok(String::new())
        }
        ["git", "checkout", "-b", name] => {
            let head = checkout.head().cloned().ok_or("no HEAD")?;
            checkout.branches.insert(name.to_string(), head);
            checkout.current = name.to_string();
            Ok(String::new())
        }
        ["git", "reset", "--hard", target] => {
            let revision = match target.strip_prefix("origin/") {
                Some(branch) => remote.get(branch),
                None => checkout.tip(target),
            }
            .cloned()
            .ok_or_else(|| format!("unknown revision {target}"))?;
            let current = checkout.current.clone();
            checkout.branches.insert(current, revision);
            Ok(String::new())
        }
        ["git", "log", "--pretty=%H", "-n", "1"] => {
            checkout.head().map(|r| format!("{r}\n")).ok_or_else(String::new)
        }
        ["git", "log", branch, "--pretty=%H", "-n", "1"] => checkout
            .tip(branch)
            .map(|r| format!("{r}\n"))
            .ok_or_else(|| format!("unknown revision {branch}")),
        _ => Ok(String::new()),
    }
}

#[async_trait]
impl Transport for GitSim {
    async fn execute(
        &self,
        host: &Host,
        command: &RemoteCommand,
    ) -> railyard_remote::Result<CommandOutput> {
        let mut stdout = String::new();
        for step in command.steps() {
            match self.step(&host.address, &step.words()) {
                Ok(out) => stdout.push_str(&out),
                Err(stderr) => {
                    return Ok(CommandOutput {
                        status: 1,
                        stdout,
                        stderr,
                    });
                }
            }
        }
        Ok(CommandOutput::ok(stdout))
    }

    async fn upload(&self, _host: &Host, _content: &str, _path: &str) -> railyard_remote::Result<()> {
        Ok(())
    }
}
