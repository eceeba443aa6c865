//! バックグラウンドワーカー
//!
//! ワーカーは任意。設定されていればアプリケーションの start/stop/restart に
//! 追従し、なければライフサイクルは unicorn だけを操作する。

use crate::error::Result;
use crate::process::LifecycleAction;
use async_trait::async_trait;
use railyard_core::{DeployConfig, Environment, Host, WorkersConfig};
use railyard_remote::{RemoteCommand, Transport, broadcast};
use std::sync::Arc;
use tracing::{debug, info};

#[async_trait]
pub trait BackgroundWorkers: Send + Sync {
    async fn apply(&self, action: LifecycleAction, hosts: &[Host]) -> Result<()>;
}

/// `workers` 設定ノードの argv リストで動かすワーカー
///
/// 各コマンドは環境ごとに1回、デプロイパスで `RAILS_ENV` を設定して
/// 実行する。
pub struct ScriptedWorkers {
    transport: Arc<dyn Transport>,
    deploy_to: String,
    environments: Vec<Environment>,
    commands: WorkersConfig,
}

impl ScriptedWorkers {
    pub fn new(
        transport: Arc<dyn Transport>,
        deploy_to: impl Into<String>,
        environments: Vec<Environment>,
        commands: WorkersConfig,
    ) -> Self {
        Self {
            transport,
            deploy_to: deploy_to.into(),
            environments,
            commands,
        }
    }

    /// 設定に `workers` ノードがなければ `None`
    pub fn from_config(config: &DeployConfig, transport: Arc<dyn Transport>) -> Option<Self> {
        config.workers.clone().map(|commands| {
            Self::new(
                transport,
                config.deploy_to.clone(),
                config.environments.clone(),
                commands,
            )
        })
    }

    fn argv(&self, action: LifecycleAction) -> &[String] {
        match action {
            LifecycleAction::Start => &self.commands.start,
            LifecycleAction::Stop => &self.commands.stop,
            LifecycleAction::Restart => &self.commands.restart,
        }
    }

    pub fn command(&self, action: LifecycleAction, environment: &Environment) -> Option<RemoteCommand> {
        let (program, args) = self.argv(action).split_first()?;
        Some(
            RemoteCommand::in_dir(&self.deploy_to)
                .then(program)
                .env("RAILS_ENV", environment.as_str())
                .args(args.iter().cloned()),
        )
    }
}

#[async_trait]
impl BackgroundWorkers for ScriptedWorkers {
    async fn apply(&self, action: LifecycleAction, hosts: &[Host]) -> Result<()> {
        for environment in &self.environments {
            let Some(command) = self.command(action, environment) else {
                debug!("no workers {} command configured", action);
                return Ok(());
            };
            info!(environment = %environment, "workers {}", action);
            broadcast(self.transport.as_ref(), hosts, &command).await?;
        }
        Ok(())
    }
}
