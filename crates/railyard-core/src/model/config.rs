//! デプロイ設定
//!
//! `DeployFile` は `deploy.kdl` の生の内容で、すべての設定が省略可能。
//! `DeployConfig::resolve` が起動ごとに1回だけデフォルトとオーバーライドを適用し、
//! 以降の実行中は読み取り専用。

use crate::error::{CoreError, Result};
use crate::model::{Environment, Host, Role};
use crate::template::DEFAULT_UNICORN_TEMPLATE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_BRANCH: &str = "master";
pub const DEFAULT_ENVIRONMENT: &str = "production";
pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_DATABASE_HOST: &str = "db-a-vip.cloud.atechmedia.net";
pub const DEFAULT_UNICORN_WORKERS: u32 = 4;
pub const DEFAULT_UNICORN_TIMEOUT: u32 = 30;
pub const DEFAULT_TRACKER_HOST: &str = "codebasehq.com";
pub const DEFAULT_TRACKER_PROTOCOL: &str = "https";

/// `process_sudo` 有効時にライフサイクルコマンドを実行するアカウント
pub const SERVICE_ACCOUNT: &str = "app";

/// 生の `deploy.kdl` の内容
#[derive(Debug, Clone, Default)]
pub struct DeployFile {
    /// ファイルのディレクトリ（テンプレートの相対パス解決用）
    pub base_dir: Option<PathBuf>,
    pub application: Option<String>,
    pub repository: Option<String>,
    pub branch: Option<String>,
    pub deploy_to: Option<String>,
    pub user: Option<String>,
    pub ssh_port: Option<u16>,
    pub forward_agent: Option<bool>,
    pub environment: Option<String>,
    pub environments: Vec<String>,
    pub run_migrations: Option<bool>,
    pub database_host: Option<String>,
    pub unicorn: UnicornSettings,
    pub tracker_host: Option<String>,
    pub tracker_protocol: Option<String>,
    pub lock: Option<bool>,
    pub workers: Option<WorkersConfig>,
    pub roles: Vec<RoleDef>,
}

/// `unicorn` ノードの設定
#[derive(Debug, Clone, Default)]
pub struct UnicornSettings {
    pub workers: Option<u32>,
    pub timeout: Option<u32>,
    pub sudo: Option<bool>,
    pub skip: Option<bool>,
    pub skip_config: Option<bool>,
    pub template: Option<PathBuf>,
}

/// `role` ノード
#[derive(Debug, Clone, Default)]
pub struct RoleDef {
    pub name: String,
    pub servers: Vec<ServerDef>,
}

/// role 内の `server` ノード
#[derive(Debug, Clone, Default)]
pub struct ServerDef {
    pub address: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub database_ops: bool,
    pub no_release: bool,
}

/// コマンドラインで指定され、ファイルの上に適用される値
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub user: Option<String>,
    pub branch: Option<String>,
    pub environments: Vec<String>,
    /// 実行オペレーター。未指定ならプロセスの環境変数から取得
    pub operator: Option<String>,
}

/// 1回の実行用に解決済みの設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    pub application: String,
    pub repository: String,
    pub branch: String,
    pub deploy_to: String,
    pub user: String,
    pub ssh: SshOptions,
    pub environments: Vec<Environment>,
    pub run_migrations: bool,
    pub database_host: String,
    pub unicorn: UnicornConfig,
    pub tracker: TrackerConfig,
    /// デプロイパスのアドバイザリロックファイル
    pub lock: bool,
    pub workers: Option<WorkersConfig>,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshOptions {
    pub port: u16,
    pub forward_agent: bool,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_SSH_PORT,
            forward_agent: true,
        }
    }
}

/// プロセスマネージャー（unicorn）の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnicornConfig {
    pub workers: u32,
    pub timeout: u32,
    /// ライフサイクルコマンドを [`SERVICE_ACCOUNT`] で実行
    pub sudo: bool,
    /// プロセスマネージャーを完全にスキップ
    pub skip: bool,
    /// ライフサイクルコマンドは実行するが unicorn.rb はアップロードしない
    pub skip_config: bool,
    pub template_path: Option<PathBuf>,
    /// テンプレート本文（resolve 時に読み込み）
    #[serde(skip)]
    pub template: String,
}

impl Default for UnicornConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_UNICORN_WORKERS,
            timeout: DEFAULT_UNICORN_TIMEOUT,
            sudo: true,
            skip: false,
            skip_config: false,
            template_path: None,
            template: DEFAULT_UNICORN_TEMPLATE.to_string(),
        }
    }
}

/// 外部デプロイトラッカーの設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub host: String,
    pub protocol: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_TRACKER_HOST.to_string(),
            protocol: DEFAULT_TRACKER_PROTOCOL.to_string(),
        }
    }
}

/// バックグラウンドワーカーのコマンド（ライフサイクル操作ごとの argv）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkersConfig {
    pub start: Vec<String>,
    pub stop: Vec<String>,
    pub restart: Vec<String>,
}

impl DeployConfig {
    /// デフォルトとオーバーライドを解決して不変の設定を作る
    pub fn resolve(file: DeployFile, overrides: &ConfigOverrides) -> Result<Self> {
        let application = file
            .application
            .filter(|s| !s.is_empty())
            .ok_or(CoreError::MissingSetting("application"))?;
        let repository = file
            .repository
            .filter(|s| !s.is_empty())
            .ok_or(CoreError::MissingSetting("repository"))?;

        let branch = overrides
            .branch
            .clone()
            .or(file.branch)
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string());

        let deploy_to = file
            .deploy_to
            .unwrap_or_else(|| format!("/opt/apps/{}", application));

        let user = match overrides.user.clone().or(file.user) {
            Some(user) => user,
            None => overrides.operator.clone().unwrap_or_else(operator_name),
        };

        let environments: Vec<Environment> = if !overrides.environments.is_empty() {
            overrides.environments.iter().map(|e| Environment::new(e.as_str())).collect()
        } else if !file.environments.is_empty() {
            file.environments.iter().map(|e| Environment::new(e.as_str())).collect()
        } else {
            vec![Environment::new(
                file.environment
                    .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            )]
        };

        let ssh = SshOptions {
            port: file.ssh_port.unwrap_or(DEFAULT_SSH_PORT),
            forward_agent: file.forward_agent.unwrap_or(true),
        };

        let unicorn = resolve_unicorn(file.unicorn, file.base_dir.as_deref())?;
        let roles = resolve_roles(file.roles, &user, ssh);

        Ok(Self {
            application,
            repository,
            branch,
            deploy_to,
            user,
            ssh,
            environments,
            run_migrations: file.run_migrations.unwrap_or(false),
            database_host: file
                .database_host
                .unwrap_or_else(|| DEFAULT_DATABASE_HOST.to_string()),
            unicorn,
            tracker: TrackerConfig {
                host: file
                    .tracker_host
                    .unwrap_or_else(|| DEFAULT_TRACKER_HOST.to_string()),
                protocol: file
                    .tracker_protocol
                    .unwrap_or_else(|| DEFAULT_TRACKER_PROTOCOL.to_string()),
            },
            lock: file.lock.unwrap_or(false),
            workers: file.workers,
            roles,
        })
    }

    pub fn role(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.name == name)
    }

    /// `<deploy_to>/config/unicorn.rb`
    pub fn unicorn_config_path(&self) -> String {
        format!("{}/config/unicorn.rb", self.deploy_to)
    }

    /// `<deploy_to>/config/database.yml`
    pub fn database_config_path(&self) -> String {
        format!("{}/config/database.yml", self.deploy_to)
    }

    /// `<deploy_to>/tmp/pids/<process>.<environment>.pid`
    pub fn pid_file(&self, process: &str, environment: &Environment) -> String {
        format!("{}/tmp/pids/{}.{}.pid", self.deploy_to, process, environment)
    }

    /// `<deploy_to>/.railyard.lock`
    pub fn lock_path(&self) -> String {
        format!("{}/.railyard.lock", self.deploy_to)
    }
}

fn resolve_unicorn(
    settings: UnicornSettings,
    base_dir: Option<&std::path::Path>,
) -> Result<UnicornConfig> {
    let workers = settings.workers.unwrap_or(DEFAULT_UNICORN_WORKERS);
    if workers == 0 {
        return Err(CoreError::InvalidConfig(
            "unicorn workers must be at least 1".to_string(),
        ));
    }

    let template_path = settings.template.map(|p| match base_dir {
        Some(dir) if p.is_relative() => dir.join(p),
        _ => p,
    });

    let template = match &template_path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| CoreError::IoError {
            path: path.clone(),
            message: e.to_string(),
        })?,
        None => DEFAULT_UNICORN_TEMPLATE.to_string(),
    };

    Ok(UnicornConfig {
        workers,
        timeout: settings.timeout.unwrap_or(DEFAULT_UNICORN_TIMEOUT),
        sudo: settings.sudo.unwrap_or(true),
        skip: settings.skip.unwrap_or(false),
        skip_config: settings.skip_config.unwrap_or(false),
        template_path,
        template,
    })
}

fn resolve_roles(defs: Vec<RoleDef>, user: &str, ssh: SshOptions) -> Vec<Role> {
    let mut roles: Vec<Role> = Vec::new();

    for def in defs {
        let hosts = def.servers.into_iter().map(|server| Host {
            address: server.address,
            port: server.port.unwrap_or(ssh.port),
            user: server.user.unwrap_or_else(|| user.to_string()),
            forward_agent: ssh.forward_agent,
            database_ops: server.database_ops,
            no_release: server.no_release,
        });

        // 同名の role ノードは追記される
        match roles.iter_mut().find(|r| r.name == def.name) {
            Some(role) => role.hosts.extend(hosts),
            None => roles.push(Role {
                name: def.name,
                hosts: hosts.collect(),
            }),
        }
    }

    for name in [Role::APP, Role::STORAGE] {
        if !roles.iter().any(|r| r.name == name) {
            roles.push(Role {
                name: name.to_string(),
                hosts: Vec::new(),
            });
        }
    }

    roles
}

/// 実行オペレーター名
pub fn operator_name() -> String {
    ["USER", "LOGNAME", "USERNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "deploy".to_string())
}
