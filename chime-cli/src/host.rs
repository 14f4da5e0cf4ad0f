//! Desktop notification backends behind the engine's host trait.

use anyhow::{Context, Result, bail};
use log::warn;
use std::io::{self, Write};

use chime_core::{Alert, Capability, NotifyHost};

use crate::config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    OsaScript,
    NotifySend,
}

impl Backend {
    fn label(self) -> &'static str {
        match self {
            Backend::OsaScript => "osascript",
            Backend::NotifySend => "notify-send",
        }
    }
}

fn detect_backend() -> Option<Backend> {
    if cfg!(target_os = "macos") && which::which("osascript").is_ok() {
        return Some(Backend::OsaScript);
    }
    if which::which("notify-send").is_ok() {
        return Some(Backend::NotifySend);
    }
    None
}

/// Desktop notifier: `osascript` on macOS, `notify-send` elsewhere,
/// unsupported when neither binary is around. The authorization answer
/// lives in config.toml; the terminal prompt writes it back.
pub struct DesktopNotifier {
    backend: Option<Backend>,
    permission: Capability,
}

impl DesktopNotifier {
    pub fn detect(cfg: &config::Config) -> Self {
        let backend = detect_backend();
        let permission = match backend {
            None => Capability::Unsupported,
            Some(_) => cfg.notify.permission,
        };
        Self {
            backend,
            permission,
        }
    }

    pub fn backend_label(&self) -> &'static str {
        self.backend.map(Backend::label).unwrap_or("none")
    }
}

impl NotifyHost for DesktopNotifier {
    fn query_permission(&self) -> Capability {
        self.permission
    }

    fn request_permission(&mut self) -> Capability {
        let allow =
            prompt_yes_no("Allow chime to show desktop notifications?").unwrap_or(false);
        self.permission = if allow {
            Capability::Granted
        } else {
            Capability::Denied
        };
        if let Err(e) = persist_permission(self.permission) {
            warn!("could not persist notification permission: {e:#}");
        }
        self.permission
    }

    fn show(&mut self, alert: &Alert) -> Result<()> {
        match self.backend {
            Some(Backend::OsaScript) => show_osascript(alert),
            Some(Backend::NotifySend) => show_notify_send(alert),
            None => bail!("no notification backend available"),
        }
    }
}

fn prompt_yes_no(label: &str) -> Result<bool> {
    print!("{} [y/N]: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn persist_permission(cap: Capability) -> Result<()> {
    let mut cfg = config::load_config()?;
    cfg.notify.permission = cap;
    config::save_config(&cfg)
}

fn show_osascript(alert: &Alert) -> Result<()> {
    let title = escape_applescript(&alert.title);
    let body = escape_applescript(&alert.body);
    let script = format!(r#"display notification "{body}" with title "{title}""#);

    let output = std::process::Command::new("osascript")
        .arg("-e")
        .arg(&script)
        .output()
        .context("running osascript")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("osascript failed: {stderr}");
    }
    Ok(())
}

fn show_notify_send(alert: &Alert) -> Result<()> {
    let output = std::process::Command::new("notify-send")
        .arg("--app-name=chime")
        .arg(&alert.title)
        .arg(&alert.body)
        .output()
        .context("running notify-send")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("notify-send failed: {stderr}");
    }
    Ok(())
}

fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Terminal fallback: always granted, prints the alert block. Useful on
/// machines without a desktop notifier and for demos.
#[derive(Debug, Default)]
pub struct StdoutNotifier;

impl NotifyHost for StdoutNotifier {
    fn query_permission(&self) -> Capability {
        Capability::Granted
    }

    fn request_permission(&mut self) -> Capability {
        Capability::Granted
    }

    fn show(&mut self, alert: &Alert) -> Result<()> {
        println!("* {}", alert.title);
        println!("  {}", alert.body);
        println!("  tag={} meta={}", alert.tag, serde_json::to_string(&alert.meta)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applescript_escaping_covers_quotes_and_newlines() {
        assert_eq!(escape_applescript(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_applescript("a\\b"), "a\\\\b");
        assert_eq!(escape_applescript("line1\nline2"), "line1\\nline2");
        assert_eq!(escape_applescript("cr\rhere"), "cr\\rhere");
    }

    #[test]
    fn stdout_notifier_is_always_granted() {
        let host = StdoutNotifier;
        assert!(host.query_permission().is_granted());
    }
}
