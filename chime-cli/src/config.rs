use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use chime_core::{Capability, ReminderSettings};

use crate::state::ensure_chime_home;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub reminders: ReminderSettings,
    #[serde(default)]
    pub notify: NotifySection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifySection {
    /// Persisted authorization answer; `not_determined` until the user has
    /// been asked once.
    pub permission: Capability,
}

impl Default for NotifySection {
    fn default() -> Self {
        Self {
            permission: Capability::NotDetermined,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reminders: ReminderSettings::default(),
            notify: NotifySection::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_chime_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    Ok(toml::from_str(&s).context("parse config.toml")?)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    let cfg = Config::default();
    save_config(&cfg)?;
    println!("Wrote {}", p.display());
    Ok(())
}
