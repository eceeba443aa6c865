//! デプロイワークフロー
//!
//! `Idle → CodeUpdated → Finalized → (Migrated) → Restarted → LogComplete`.
//! 各ステップは対象ホストに broadcast して完了を待つ。最初の非ゼロ終了で
//! タスクはその場で止まる。自動の巻き戻しはなく、
//! 必要ならオペレーターが `rollback` を実行する。

use crate::branch::{BranchManager, Revisions};
use crate::error::Result;
use crate::lock::{DeployLock, HeldLock};
use crate::logger::{self, LogOutcome};
use crate::pending::{self, LocalRepo, PendingOutcome};
use crate::process::{Lifecycle, LifecycleAction, Unicorn};
use crate::tracker::Tracker;
use crate::workers::BackgroundWorkers;
use railyard_core::{
    DatabasePassword, DeployConfig, Host, HostFilter, Role, operator_name, render_database_config,
    resolve_targets,
};
use railyard_remote::{HostOutput, RemoteCommand, Transport, broadcast, upload_all};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument};

/// 実行がどこまで進んだか
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeployState {
    Idle,
    CodeUpdated,
    Finalized,
    Migrated,
    Restarted,
    LogComplete,
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeployState::Idle => "idle",
            DeployState::CodeUpdated => "code updated",
            DeployState::Finalized => "finalized",
            DeployState::Migrated => "migrated",
            DeployState::Restarted => "restarted",
            DeployState::LogComplete => "log complete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeployMode {
    #[default]
    Default,
    /// finalise と restart の間でデータベースをマイグレーション
    Migrations,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub state: DeployState,
    pub migrated: bool,
    pub held_locks: Vec<HeldLock>,
    pub log: LogOutcome,
}

pub struct Deployer {
    config: DeployConfig,
    transport: Arc<dyn Transport>,
    tracker: Arc<dyn Tracker>,
    workers: Option<Arc<dyn BackgroundWorkers>>,
    database_password: Option<DatabasePassword>,
    operator: String,
    state: Mutex<DeployState>,
}

impl Deployer {
    pub fn new(config: DeployConfig, transport: Arc<dyn Transport>, tracker: Arc<dyn Tracker>) -> Self {
        Self {
            config,
            transport,
            tracker,
            workers: None,
            database_password: None,
            operator: operator_name(),
            state: Mutex::new(DeployState::Idle),
        }
    }

    pub fn with_workers(mut self, workers: Arc<dyn BackgroundWorkers>) -> Self {
        self.workers = Some(workers);
        self
    }

    /// アップロード時に `DBPASS` を読まずにこのパスワードを使う
    pub fn with_database_password(mut self, password: DatabasePassword) -> Self {
        self.database_password = Some(password);
        self
    }

    /// アドバイザリロックに書き込む名前
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = operator.into();
        self
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// 最後に到達した状態。失敗後は実行が止まった位置
    pub fn state(&self) -> DeployState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enter(&self, state: DeployState) {
        info!("state: {}", state);
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    fn branches(&self) -> BranchManager<'_> {
        BranchManager::new(&self.config, self.transport())
    }

    fn lifecycle(&self) -> Lifecycle<'_> {
        Lifecycle::new(&self.config, self.transport(), self.workers.as_deref())
    }

    /// チェックアウトを持つホスト
    pub fn code_hosts(&self) -> Result<Vec<Host>> {
        Ok(resolve_targets(
            &self.config.roles,
            &[Role::APP, Role::STORAGE],
            HostFilter::All,
        )?)
    }

    fn app_hosts(&self) -> Result<Vec<Host>> {
        Ok(resolve_targets(&self.config.roles, &[Role::APP], HostFilter::All)?)
    }

    /// デプロイ全体: コード更新、finalise、必要ならマイグレーション、再起動、記録
    #[instrument(skip_all, fields(branch = %self.config.branch))]
    pub async fn deploy(&self, mode: DeployMode) -> Result<DeployReport> {
        self.enter(DeployState::Idle);
        let migrate = mode == DeployMode::Migrations || self.config.run_migrations;

        let held_locks = if self.config.lock {
            let hosts = self.code_hosts()?;
            DeployLock::new(&self.config, self.transport())
                .acquire(&hosts, &self.operator)
                .await?
        } else {
            Vec::new()
        };

        self.update_code(migrate).await?;
        self.restart().await?;

        if self.config.lock {
            let hosts = self.code_hosts()?;
            DeployLock::new(&self.config, self.transport())
                .release(&hosts)
                .await?;
        }

        let log = self.log_deployment().await?;
        self.enter(DeployState::LogComplete);

        Ok(DeployReport {
            state: self.state(),
            migrated: migrate,
            held_locks,
            log,
        })
    }

    /// ブランチをローテーションし、新しいコードを取得して finalise
    #[instrument(skip_all)]
    pub async fn update_code(&self, migrate: bool) -> Result<()> {
        let hosts = self.code_hosts()?;
        self.branches().advance(&hosts).await?;
        self.enter(DeployState::CodeUpdated);
        self.finalise(migrate).await
    }

    /// サブモジュールと gem、指定があればマイグレーション
    #[instrument(skip_all)]
    pub async fn finalise(&self, migrate: bool) -> Result<()> {
        let hosts = self.code_hosts()?;

        let submodules = RemoteCommand::in_dir(&self.config.deploy_to)
            .then("git")
            .args(["submodule", "init"])
            .then("git")
            .args(["submodule", "sync"])
            .then("git")
            .args(["submodule", "update", "--recursive"]);
        broadcast(self.transport(), &hosts, &submodules).await?;

        let bundle = RemoteCommand::in_dir(&self.config.deploy_to)
            .then("bundle")
            .args(["--deployment", "--quiet"]);
        broadcast(self.transport(), &hosts, &bundle).await?;
        self.enter(DeployState::Finalized);

        if migrate {
            self.migrate().await?;
            self.enter(DeployState::Migrated);
        } else {
            info!("migrations not requested");
        }
        Ok(())
    }

    /// DBホストで環境ごとに順番に `rake db:migrate`
    #[instrument(skip_all)]
    pub async fn migrate(&self) -> Result<()> {
        let hosts = resolve_targets(&self.config.roles, &[Role::APP], HostFilter::DatabaseOps)?;

        for environment in &self.config.environments {
            info!(environment = %environment, "migrating");
            let command = RemoteCommand::in_dir(&self.config.deploy_to)
                .then("bundle")
                .env("RAILS_ENV", environment.as_str())
                .args(["exec", "rake", "db:migrate"]);
            broadcast(self.transport(), &hosts, &command).await?;
        }
        Ok(())
    }

    /// 初回チェックアウト、DB設定、その後通常のコード更新
    #[instrument(skip_all)]
    pub async fn setup(&self) -> Result<()> {
        let hosts = self.code_hosts()?;
        self.branches().bootstrap(&hosts).await?;
        self.upload_db_config().await?;
        self.update_code(self.config.run_migrations).await
    }

    /// `config/database.yml` を生成してアップロード
    pub async fn upload_db_config(&self) -> Result<DatabasePassword> {
        let hosts = self.code_hosts()?;
        let password = self
            .database_password
            .clone()
            .unwrap_or_else(DatabasePassword::from_env);

        let rendered = render_database_config(
            &self.config.application,
            &password,
            &self.config.database_host,
        )?;
        upload_all(
            self.transport(),
            &hosts,
            rendered.as_str(),
            &self.config.database_config_path(),
        )
        .await?;
        Ok(password)
    }

    /// 前のリリースに戻す。トラッカーには報告しない
    #[instrument(skip_all)]
    pub async fn rollback(&self) -> Result<()> {
        let hosts = self.code_hosts()?;
        self.branches().revert(&hosts).await?;
        self.finalise(self.config.run_migrations).await?;
        self.restart().await
    }

    /// 全ロールの全ホストで `whoami`
    pub async fn testing(&self) -> Result<Vec<HostOutput>> {
        let names: Vec<&str> = self.config.roles.iter().map(|r| r.name.as_str()).collect();
        let hosts = resolve_targets(&self.config.roles, &names, HostFilter::All)?;
        Ok(broadcast(self.transport(), &hosts, &RemoteCommand::new("whoami")).await?)
    }

    pub async fn start(&self) -> Result<()> {
        self.lifecycle().apply(LifecycleAction::Start).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.lifecycle().apply(LifecycleAction::Stop).await
    }

    pub async fn restart(&self) -> Result<()> {
        self.lifecycle().apply(LifecycleAction::Restart).await?;
        self.enter(DeployState::Restarted);
        Ok(())
    }

    /// skip フラグやワーカーに関係なく Unicorn のみ
    pub async fn unicorn(&self, action: LifecycleAction) -> Result<()> {
        let hosts = self.app_hosts()?;
        Unicorn::new(&self.config, self.transport())
            .apply(action, &hosts)
            .await
    }

    /// アップロードが無効なら `false` を返す
    pub async fn unicorn_upload_config(&self) -> Result<bool> {
        let hosts = self.app_hosts()?;
        Unicorn::new(&self.config, self.transport())
            .upload_config(&hosts)
            .await
    }

    pub async fn log_deployment(&self) -> Result<LogOutcome> {
        logger::log_deployment(&self.config, self.transport(), self.tracker.as_ref()).await
    }

    pub async fn pending(&self, local: &dyn LocalRepo) -> Result<PendingOutcome> {
        pending::pending(&self.config, self.transport(), local).await
    }

    /// 最初のリリースホストでの `rollback` と `deploy` の先端
    pub async fn revisions(&self) -> Result<Revisions> {
        let hosts = resolve_targets(
            &self.config.roles,
            &[Role::APP, Role::STORAGE],
            HostFilter::Release,
        )?;
        self.branches().revisions(&hosts[0]).await
    }
}
