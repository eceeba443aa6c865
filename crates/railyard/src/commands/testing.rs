use crate::utils::{print_step, print_success, report_failure};
use colored::Colorize;
use railyard_deploy::Deployer;

pub async fn handle(deployer: &Deployer) -> anyhow::Result<()> {
    print_step("Testing connections");

    let outputs = deployer
        .testing()
        .await
        .map_err(|e| report_failure(deployer, e))?;

    for output in &outputs {
        println!(
            "  {} {} as {}",
            "✓".green(),
            output.host.to_string().cyan(),
            output.output.stdout.trim()
        );
    }
    print_success(&format!("{} hosts reachable", outputs.len()));
    Ok(())
}
