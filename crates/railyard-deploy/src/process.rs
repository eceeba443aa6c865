//! アプリケーションサーバーのライフサイクル
//!
//! Unicorn は環境ごとにデーモン化したマスターを1つ動かし、PIDは
//! `<deploy_to>/tmp/pids/unicorn.<environment>.pid` に置く。`restart` は
//! `USR2` を送り、新しい世代を fork して古い世代を接続を落とさずに退役させる。
//! stop + start にはしない。

use crate::error::Result;
use crate::workers::BackgroundWorkers;
use railyard_core::{
    DeployConfig, Environment, Host, HostFilter, Role, SERVICE_ACCOUNT, render_unicorn_config,
    resolve_targets,
};
use railyard_remote::{RemoteCommand, Transport, broadcast, upload_all};
use std::fmt;
use tracing::{info, instrument};

pub const UNICORN_PROCESS: &str = "unicorn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Start,
    Stop,
    Restart,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleAction::Start => write!(f, "start"),
            LifecycleAction::Stop => write!(f, "stop"),
            LifecycleAction::Restart => write!(f, "restart"),
        }
    }
}

/// app ホスト上の Unicorn プロセスマネージャー
pub struct Unicorn<'a> {
    config: &'a DeployConfig,
    transport: &'a dyn Transport,
}

impl<'a> Unicorn<'a> {
    pub fn new(config: &'a DeployConfig, transport: &'a dyn Transport) -> Self {
        Self { config, transport }
    }

    /// `config/unicorn.rb` を生成してアップロード
    ///
    /// `skip-config` でアップロードが無効なら `false` を返す。
    pub async fn upload_config(&self, hosts: &[Host]) -> Result<bool> {
        if self.config.unicorn.skip_config {
            info!("unicorn config upload disabled, keeping remote unicorn.rb");
            return Ok(false);
        }

        let rendered = render_unicorn_config(&self.config.unicorn)?;
        upload_all(
            self.transport,
            hosts,
            rendered.as_str(),
            &self.config.unicorn_config_path(),
        )
        .await?;
        Ok(true)
    }

    pub fn start_command(&self, environment: &Environment) -> RemoteCommand {
        RemoteCommand::new("umask")
            .arg("002")
            .then("cd")
            .arg(&self.config.deploy_to)
            .then("bundle")
            .args(["exec", "unicorn_rails", "-E", environment.as_str(), "-c"])
            .arg(self.config.unicorn_config_path())
            .arg("-D")
            .run_as_if(self.config.unicorn.sudo, SERVICE_ACCOUNT)
    }

    pub fn stop_command(&self, environment: &Environment) -> RemoteCommand {
        RemoteCommand::new("kill")
            .pid_from(self.config.pid_file(UNICORN_PROCESS, environment))
            .run_as_if(self.config.unicorn.sudo, SERVICE_ACCOUNT)
    }

    pub fn reload_command(&self, environment: &Environment) -> RemoteCommand {
        RemoteCommand::new("kill")
            .arg("-USR2")
            .pid_from(self.config.pid_file(UNICORN_PROCESS, environment))
            .run_as_if(self.config.unicorn.sudo, SERVICE_ACCOUNT)
    }

    #[instrument(skip_all)]
    pub async fn start(&self, hosts: &[Host]) -> Result<()> {
        self.upload_config(hosts).await?;
        for environment in &self.config.environments {
            info!(environment = %environment, "starting unicorn");
            broadcast(self.transport, hosts, &self.start_command(environment)).await?;
        }
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn stop(&self, hosts: &[Host]) -> Result<()> {
        for environment in &self.config.environments {
            info!(environment = %environment, "stopping unicorn");
            broadcast(self.transport, hosts, &self.stop_command(environment)).await?;
        }
        Ok(())
    }

    /// グレースフルリロード: 新しい設定を置いてから稼働中のマスターに `USR2`
    #[instrument(skip_all)]
    pub async fn restart(&self, hosts: &[Host]) -> Result<()> {
        self.upload_config(hosts).await?;
        for environment in &self.config.environments {
            info!(environment = %environment, "reloading unicorn");
            broadcast(self.transport, hosts, &self.reload_command(environment)).await?;
        }
        Ok(())
    }

    pub async fn apply(&self, action: LifecycleAction, hosts: &[Host]) -> Result<()> {
        match action {
            LifecycleAction::Start => self.start(hosts).await,
            LifecycleAction::Stop => self.stop(hosts).await,
            LifecycleAction::Restart => self.restart(hosts).await,
        }
    }
}

/// アプリケーション全体のライフサイクル: unicorn と任意のバックグラウンドワーカー
pub struct Lifecycle<'a> {
    config: &'a DeployConfig,
    transport: &'a dyn Transport,
    workers: Option<&'a dyn BackgroundWorkers>,
}

impl<'a> Lifecycle<'a> {
    pub fn new(
        config: &'a DeployConfig,
        transport: &'a dyn Transport,
        workers: Option<&'a dyn BackgroundWorkers>,
    ) -> Self {
        Self {
            config,
            transport,
            workers,
        }
    }

    /// ライフサイクルコマンドの対象となる app ホスト
    pub fn hosts(&self) -> Result<Vec<Host>> {
        Ok(resolve_targets(
            &self.config.roles,
            &[Role::APP],
            HostFilter::All,
        )?)
    }

    #[instrument(skip_all, fields(action = %action))]
    pub async fn apply(&self, action: LifecycleAction) -> Result<()> {
        let hosts = self.hosts()?;

        if self.config.unicorn.skip {
            info!("process manager disabled, skipping unicorn {}", action);
        } else {
            Unicorn::new(self.config, self.transport)
                .apply(action, &hosts)
                .await?;
        }

        if let Some(workers) = self.workers {
            workers.apply(action, &hosts).await?;
        }

        Ok(())
    }
}
