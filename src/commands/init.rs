use anyhow::{Context, Result};
use h2o::config::{Config, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;

pub async fn init_config(path: PathBuf, force: bool) -> Result<()> {
    let config_path = path.join(DEFAULT_CONFIG_FILE);
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    std::fs::create_dir_all(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    std::fs::write(&config_path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("Created configuration file: {}", config_path.display());
    println!("Set HASHNODE_API_KEY (or add it to .env) to resolve tag names.");

    Ok(())
}
