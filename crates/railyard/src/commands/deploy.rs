use crate::commands::log::print_log_outcome;
use crate::utils::{print_step, print_success, print_target, print_warning, report_failure};
use colored::Colorize;
use railyard_deploy::{DeployMode, Deployer};

pub async fn handle(deployer: &Deployer, migrations: bool) -> anyhow::Result<()> {
    let mode = if migrations {
        DeployMode::Migrations
    } else {
        DeployMode::Default
    };

    print_step("Deploying");
    print_target(deployer.config());

    let report = deployer
        .deploy(mode)
        .await
        .map_err(|e| report_failure(deployer, e))?;

    for held in &report.held_locks {
        print_warning(&format!(
            "{} was locked by {} (possible concurrent deploy)",
            held.host, held.owner
        ));
    }
    if report.migrated {
        println!("  {}", "database migrated".dimmed());
    }
    print_log_outcome(&report.log);

    println!();
    print_success("Deployment complete");
    Ok(())
}

pub async fn handle_setup(deployer: &Deployer) -> anyhow::Result<()> {
    print_step("Setting up hosts");
    print_target(deployer.config());
    print_warning(&format!(
        "{} is removed and cloned again on every host",
        deployer.config().deploy_to
    ));

    deployer
        .setup()
        .await
        .map_err(|e| report_failure(deployer, e))?;

    println!();
    print_success("Hosts are ready; run `yard deploy` or `yard start`");
    Ok(())
}

pub async fn handle_upload_db_config(deployer: &Deployer) -> anyhow::Result<()> {
    print_step("Uploading database.yml");

    let password = deployer
        .upload_db_config()
        .await
        .map_err(|e| report_failure(deployer, e))?;

    if password.is_default() {
        print_warning("DBPASS is not set; database.yml contains the placeholder password");
    }
    print_success("database.yml uploaded");
    Ok(())
}

pub async fn handle_migrate(deployer: &Deployer) -> anyhow::Result<()> {
    print_step("Migrating");
    deployer
        .migrate()
        .await
        .map_err(|e| report_failure(deployer, e))?;
    print_success("Migrations complete");
    Ok(())
}

pub async fn handle_rollback(deployer: &Deployer) -> anyhow::Result<()> {
    print_step("Rolling back");
    print_target(deployer.config());

    deployer
        .rollback()
        .await
        .map_err(|e| report_failure(deployer, e))?;

    println!();
    print_success("Rolled back to the previous release");
    println!(
        "  {}",
        "the tracker is not updated; run `yard log deployment` after the next deploy".dimmed()
    );
    Ok(())
}
