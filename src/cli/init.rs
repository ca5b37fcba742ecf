//! Write a default configuration file

use std::path::Path;

use anyhow::{bail, Result};

use aerie::config::Settings;

pub fn init_command(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    Settings::default().save(path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
