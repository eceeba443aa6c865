use crate::utils::{print_step, print_success, print_warning, report_failure};
use railyard_deploy::{Deployer, LifecycleAction};

fn verb(action: LifecycleAction) -> &'static str {
    match action {
        LifecycleAction::Start => "Starting",
        LifecycleAction::Stop => "Stopping",
        LifecycleAction::Restart => "Restarting",
    }
}

/// Unicorn（スキップ時を除く）とバックグラウンドワーカー
pub async fn handle(deployer: &Deployer, action: LifecycleAction) -> anyhow::Result<()> {
    print_step(&format!("{} application", verb(action)));
    if deployer.config().unicorn.skip {
        print_warning("process manager is disabled (skip-unicorn)");
    }

    let result = match action {
        LifecycleAction::Start => deployer.start().await,
        LifecycleAction::Stop => deployer.stop().await,
        LifecycleAction::Restart => deployer.restart().await,
    };
    result.map_err(|e| report_failure(deployer, e))?;

    print_success(&format!("application {}", action));
    Ok(())
}

pub async fn handle_unicorn(deployer: &Deployer, action: LifecycleAction) -> anyhow::Result<()> {
    print_step(&format!("{} unicorn", verb(action)));
    deployer
        .unicorn(action)
        .await
        .map_err(|e| report_failure(deployer, e))?;
    print_success(&format!("unicorn {}", action));
    Ok(())
}

pub async fn handle_upload_config(deployer: &Deployer) -> anyhow::Result<()> {
    print_step("Uploading unicorn.rb");
    let uploaded = deployer
        .unicorn_upload_config()
        .await
        .map_err(|e| report_failure(deployer, e))?;

    if uploaded {
        print_success("unicorn.rb uploaded");
    } else {
        print_warning("unicorn config upload is disabled (skip-unicorn-config)");
    }
    Ok(())
}
