use colored::Colorize;
use railyard_core::DeployConfig;
use railyard_deploy::{DeployError, DeployState, Deployer};

/// ステップの見出し
pub fn print_step(title: &str) {
    println!("{} {}", "==>".blue().bold(), title.bold());
}

pub fn print_success(message: &str) {
    println!("{}", format!("✓ {}", message).green().bold());
}

pub fn print_warning(message: &str) {
    println!("{}", format!("⚠ {}", message).yellow());
}

/// 実行がどこまで進んだかを表示（エラー自体は `main` が出力）
pub fn report_failure(deployer: &Deployer, error: DeployError) -> anyhow::Error {
    let state = deployer.state();
    eprintln!();
    eprintln!(
        "{} {}",
        "✗ stopped at:".red().bold(),
        state.to_string().yellow()
    );
    if error.is_precondition() {
        eprintln!("  {}", "nothing was changed on the hosts".dimmed());
    } else if state >= DeployState::CodeUpdated {
        eprintln!(
            "  {} run `yard rollback` to return to the previous release",
            "hint:".cyan()
        );
    }
    error.into()
}

/// 対象の簡単なサマリー
pub fn print_target(config: &DeployConfig) {
    let environments = config
        .environments
        .iter()
        .map(|e| e.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    println!(
        "  {} {}  {} {}  {} {}",
        "application:".dimmed(),
        config.application.cyan(),
        "branch:".dimmed(),
        config.branch.cyan(),
        "environments:".dimmed(),
        environments.cyan()
    );
}
