use crate::utils::{print_step, print_success, print_warning, report_failure};
use colored::Colorize;
use railyard_deploy::{Deployer, LocalGit, LogOutcome, PendingOutcome};

pub fn print_log_outcome(outcome: &LogOutcome) {
    match outcome {
        LogOutcome::Skipped(reason) => print_warning(&format!("not logged: {}", reason)),
        LogOutcome::Logged {
            record,
            environments,
        } => {
            for result in environments {
                match &result.error {
                    None => println!(
                        "  {} logged {}..{} to {} ({})",
                        "✓".green(),
                        short(&record.from),
                        short(&record.to),
                        record.account_host().cyan(),
                        result.environment
                    ),
                    Some(error) => print_warning(&format!(
                        "tracker rejected {}: {}",
                        result.environment, error
                    )),
                }
            }
        }
    }
}

fn short(revision: &str) -> &str {
    revision.get(..8).unwrap_or(revision)
}

pub async fn handle_deployment(deployer: &Deployer) -> anyhow::Result<()> {
    print_step("Logging deployment");
    let outcome = deployer
        .log_deployment()
        .await
        .map_err(|e| report_failure(deployer, e))?;
    print_log_outcome(&outcome);
    Ok(())
}

pub async fn handle_pending(deployer: &Deployer) -> anyhow::Result<()> {
    let local = LocalGit::new(std::env::current_dir()?);
    let outcome = deployer
        .pending(&local)
        .await
        .map_err(|e| report_failure(deployer, e))?;

    match outcome {
        PendingOutcome::UpToDate(revision) => {
            print_success(&format!("nothing pending, hosts run {}", short(&revision)));
        }
        PendingOutcome::Pending { from, to, log } => {
            println!(
                "{} {}..{}",
                "pending:".bold(),
                short(&from).yellow(),
                short(&to).yellow()
            );
            println!();
            print!("{}", log);
        }
    }
    Ok(())
}
