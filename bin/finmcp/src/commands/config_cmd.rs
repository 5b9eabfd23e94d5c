use std::path::Path;

use finmcp_core::Config;

/// Print the effective configuration.
pub async fn show(config_path: Option<&Path>) -> anyhow::Result<()> {
    let path = super::config_file(config_path);
    let config = super::load_config(config_path)?;

    println!();
    println!("Current configuration");
    if path.exists() {
        println!("  File: {}", path.display());
    } else {
        println!("  File: {} (not found, showing defaults)", path.display());
    }
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Write the default configuration.
pub async fn init(config_path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = super::config_file(config_path);
    if path.exists() && !force {
        anyhow::bail!("{} already exists. Use --force to overwrite.", path.display());
    }
    Config::default().save(&path)?;
    println!("✓ Wrote {}", path.display());
    Ok(())
}
