mod commands;
mod utils;

use clap::{Parser, Subcommand};
use railyard_core::{ConfigOverrides, DeployConfig};
use railyard_deploy::{CodebaseCli, Deployer, LifecycleAction, ScriptedWorkers};
use railyard_remote::{SshTransport, Transport};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn,railyard_deploy=info,railyard_remote=info";

#[derive(Parser)]
#[command(name = "yard")]
#[command(about = "SSH越しのロールベースな git デプロイ", long_about = None)]
struct Cli {
    /// deploy.kdl のパス（省略時はカレントディレクトリから探索）
    #[arg(short, long, global = true, env = "RAILYARD_CONFIG")]
    config: Option<PathBuf>,

    /// 対象環境、複数指定可（`environments` を上書き）
    #[arg(short, long = "environment", global = true)]
    environment: Vec<String>,

    /// デプロイするブランチ（`branch` を上書き）
    #[arg(long, global = true)]
    branch: Option<String>,

    /// SSHログインユーザー（`user` を上書き）
    #[arg(long, global = true)]
    user: Option<String>,

    /// すべてのリモートコマンドを表示
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// ブランチの最新リビジョンをデプロイ
    Deploy {
        /// 再起動の前にデータベースをマイグレーション
        #[arg(long)]
        migrations: bool,

        #[command(subcommand)]
        action: Option<DeployCommands>,
    },
    /// DBホストでマイグレーションを実行
    Migrate,
    /// 前回のデプロイに戻す
    Rollback,
    /// 全ホストに接続できるか確認
    Testing,
    /// アプリケーションを起動
    Start,
    /// アプリケーションを停止
    Stop,
    /// アプリケーションをグレースフルに再起動
    Restart,
    /// unicorn のみを操作
    #[command(subcommand)]
    Unicorn(UnicornCommands),
    /// デプロイトラッカー
    #[command(subcommand)]
    Log(LogCommands),
    /// 解決済みの設定を JSON で表示
    Config,
    /// バージョン情報を表示
    Version,
}

#[derive(Subcommand)]
enum DeployCommands {
    /// 初回デプロイ用にホストを準備（既存のチェックアウトは削除）
    Setup,
    /// config/database.yml をアップロード
    UploadDbConfig,
}

#[derive(Subcommand)]
enum UnicornCommands {
    Start,
    Stop,
    /// USR2 を送ってグレースフルリロード
    Restart,
    /// config/unicorn.rb を生成してアップロード
    UploadConfig,
}

#[derive(Subcommand)]
enum LogCommands {
    /// まだデプロイされていないコミットを一覧表示
    Pending,
    /// 直近のデプロイをトラッカーに報告
    Deployment,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<DeployConfig> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => railyard_config::find_deploy_file()?,
    };
    tracing::debug!(path = %path.display(), "loading deploy file");

    let file = railyard_core::parse_deploy_file(&path)?;
    let overrides = ConfigOverrides {
        user: cli.user.clone(),
        branch: cli.branch.clone(),
        environments: cli.environment.clone(),
        operator: None,
    };
    Ok(DeployConfig::resolve(file, &overrides)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // 設定不要
    if matches!(cli.command, Commands::Version) {
        println!("railyard {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = load_config(&cli)?;

    if matches!(cli.command, Commands::Config) {
        return commands::config::handle(&config);
    }

    let transport: Arc<dyn Transport> = Arc::new(SshTransport::new());
    let workers = ScriptedWorkers::from_config(&config, transport.clone());
    let mut deployer = Deployer::new(config, transport, Arc::new(CodebaseCli::new()));
    if let Some(workers) = workers {
        deployer = deployer.with_workers(Arc::new(workers));
    }

    match cli.command {
        Commands::Deploy { migrations, action } => match action {
            None => commands::deploy::handle(&deployer, migrations).await?,
            Some(DeployCommands::Setup) => commands::deploy::handle_setup(&deployer).await?,
            Some(DeployCommands::UploadDbConfig) => {
                commands::deploy::handle_upload_db_config(&deployer).await?
            }
        },
        Commands::Migrate => commands::deploy::handle_migrate(&deployer).await?,
        Commands::Rollback => commands::deploy::handle_rollback(&deployer).await?,
        Commands::Testing => commands::testing::handle(&deployer).await?,
        Commands::Start => {
            commands::process::handle(&deployer, LifecycleAction::Start).await?
        }
        Commands::Stop => commands::process::handle(&deployer, LifecycleAction::Stop).await?,
        Commands::Restart => {
            commands::process::handle(&deployer, LifecycleAction::Restart).await?
        }
        Commands::Unicorn(unicorn_cmd) => match unicorn_cmd {
            UnicornCommands::Start => {
                commands::process::handle_unicorn(&deployer, LifecycleAction::Start).await?
            }
            UnicornCommands::Stop => {
                commands::process::handle_unicorn(&deployer, LifecycleAction::Stop).await?
            }
            UnicornCommands::Restart => {
                commands::process::handle_unicorn(&deployer, LifecycleAction::Restart).await?
            }
            UnicornCommands::UploadConfig => {
                commands::process::handle_upload_config(&deployer).await?
            }
        },
        Commands::Log(log_cmd) => match log_cmd {
            LogCommands::Pending => commands::log::handle_pending(&deployer).await?,
            LogCommands::Deployment => commands::log::handle_deployment(&deployer).await?,
        },
        Commands::Config => {
            unreachable!("Config is handled before connecting");
        }
        Commands::Version => {
            unreachable!("Version is handled before config loading");
        }
    }

    Ok(())
}
