use railyard_core::DeployConfig;

pub fn handle(config: &DeployConfig) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
