use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use log::warn;

use chime_core::{
    Alert, AlertKind, AlertMeta, Capability, NotifyHost, PermissionGate, ReminderEngine,
    ReminderSettings, deliver, poll, upcoming_events,
};

mod config;
mod host;
mod state;

#[derive(Parser, Debug)]
#[command(name = "chime", version, about = "Deadline and course reminders from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// One-time setup: write default config and sample snapshots to ~/.chime
    Init,

    /// Watch the snapshots and deliver reminders until Ctrl-C
    Watch {
        /// Poll interval in seconds (default: 60)
        #[arg(long, default_value_t = 60)]
        interval_secs: u64,

        /// Print alerts to the terminal instead of the desktop notifier
        #[arg(long)]
        stdout: bool,
    },

    /// Run a single evaluation pass now
    Check {
        /// Print alerts to the terminal instead of the desktop notifier
        #[arg(long)]
        stdout: bool,
    },

    /// List deadlines and course slots inside their reminder windows
    Upcoming {
        /// Maximum rows to print (default: 20)
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Show or change reminder leads
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },

    /// Notification permission and delivery checks
    Notify {
        #[command(subcommand)]
        command: NotifyCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print current leads and the permission state
    Show,

    /// Set lead minutes for one category (no values clears it)
    Set {
        /// course | homework | exam | lecture | meeting | default
        category: String,

        /// Lead minutes; `exam` accepts several ordered stage leads
        #[arg(num_args = 0..)]
        minutes: Vec<u32>,
    },
}

#[derive(Subcommand, Debug)]
enum NotifyCommand {
    /// Report the delivery backend and authorization state
    Status,

    /// Ask for authorization and persist the answer
    Request,

    /// Send a sample alert through the real delivery path
    Test {
        /// Use the terminal notifier
        #[arg(long)]
        stdout: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Init => run_init()?,

        Command::Watch {
            interval_secs,
            stdout,
        } => {
            let every = Duration::from_secs(interval_secs.max(1));
            if stdout {
                run_watch(ReminderEngine::new(host::StdoutNotifier), every).await?;
            } else {
                let cfg = config::load_config()?;
                run_watch(ReminderEngine::new(host::DesktopNotifier::detect(&cfg)), every)
                    .await?;
            }
        }

        Command::Check { stdout } => {
            if stdout {
                run_check(ReminderEngine::new(host::StdoutNotifier))?;
            } else {
                let cfg = config::load_config()?;
                run_check(ReminderEngine::new(host::DesktopNotifier::detect(&cfg)))?;
            }
        }

        Command::Upcoming { limit } => run_upcoming(limit)?,

        Command::Settings { command } => match command {
            SettingsCommand::Show => show_settings()?,
            SettingsCommand::Set { category, minutes } => set_settings(&category, &minutes)?,
        },

        Command::Notify { command } => match command {
            NotifyCommand::Status => notify_status()?,
            NotifyCommand::Request => notify_request()?,
            NotifyCommand::Test { stdout } => notify_test(stdout)?,
        },
    }

    Ok(())
}

fn run_init() -> Result<()> {
    config::init_config()?;
    state::seed_samples()?;

    println!("\nNext steps:");
    println!("- put your tasks in {}", state::tasks_path()?.display());
    println!("- chime notify request");
    println!("- chime watch");
    Ok(())
}

async fn run_watch<H>(mut engine: ReminderEngine<H>, every: Duration) -> Result<()>
where
    H: NotifyHost + Send + 'static,
{
    if engine.capability() == Capability::NotDetermined {
        engine.request_authorization();
    }
    if !engine.capability().is_granted() {
        bail!(
            "notifications are {:?}; grant with `chime notify request` or pass --stdout",
            engine.capability()
        );
    }

    let mut handle = poll::start(
        engine,
        || {
            state::read_tasks().unwrap_or_else(|e| {
                warn!("tasks snapshot unreadable, using empty: {e:#}");
                vec![]
            })
        },
        || {
            state::read_courses().unwrap_or_else(|e| {
                warn!("courses snapshot unreadable, using empty: {e:#}");
                vec![]
            })
        },
        || {
            config::load_config()
                .map(|c| c.reminders)
                .unwrap_or_else(|e| {
                    warn!("config unreadable, using defaults: {e:#}");
                    ReminderSettings::default()
                })
        },
        every,
    )?;

    println!("Watching every {}s; Ctrl-C to stop.", every.as_secs());
    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    let _ = handle.stop().await;
    println!("Stopped.");
    Ok(())
}

fn run_check<H: NotifyHost>(mut engine: ReminderEngine<H>) -> Result<()> {
    let now = Local::now().naive_local();
    let tasks = state::read_tasks()?;
    let courses = state::read_courses()?;
    let settings = config::load_config()?.reminders;

    let summary = engine.run_tick(now, &tasks, &courses, &settings);
    println!(
        "Evaluated {} entities: {} delivered, {} suppressed, {} deduped, {} failed, {} skipped",
        summary.evaluated,
        summary.fired.len(),
        summary.suppressed,
        summary.deduped,
        summary.failed,
        summary.skipped
    );
    for alert in &summary.fired {
        println!("- {}", alert.title);
    }
    Ok(())
}

fn run_upcoming(limit: usize) -> Result<()> {
    let now = Local::now().naive_local();
    let tasks = state::read_tasks()?;
    let courses = state::read_courses()?;
    let settings = config::load_config()?.reminders;

    let events = upcoming_events(now, &tasks, &courses, &settings);
    if events.is_empty() {
        println!("Nothing inside its reminder window right now.");
        return Ok(());
    }

    for e in events.iter().take(limit) {
        println!(
            "{}  {:<8} {} (in {} min)",
            e.target.format("%Y-%m-%d %H:%M"),
            format!("[{:?}]", e.kind).to_lowercase(),
            e.title,
            e.minutes_left
        );
    }
    Ok(())
}

fn show_settings() -> Result<()> {
    let cfg = config::load_config()?;
    let lead =
        |v: Option<u32>| v.map(|m| format!("{m} min")).unwrap_or_else(|| "unset".to_string());

    let exam = if cfg.reminders.exam.is_empty() {
        "unset".to_string()
    } else {
        let stages: Vec<String> = cfg.reminders.exam.iter().map(|m| m.to_string()).collect();
        format!("{} min", stages.join(", "))
    };

    println!("Config: {}", config::config_path()?.display());
    println!("course   = {}", lead(cfg.reminders.course));
    println!("homework = {}", lead(cfg.reminders.homework));
    println!("exam     = {exam}");
    println!("lecture  = {}", lead(cfg.reminders.lecture));
    println!("meeting  = {}", lead(cfg.reminders.meeting));
    println!("default  = {}", lead(cfg.reminders.default));
    println!("notify.permission = {:?}", cfg.notify.permission);
    Ok(())
}

fn set_settings(category: &str, minutes: &[u32]) -> Result<()> {
    let mut cfg = config::load_config()?;
    set_leads(&mut cfg, category, minutes)?;
    config::save_config(&cfg)?;
    println!("Saved {}", config::config_path()?.display());
    Ok(())
}

fn set_leads(cfg: &mut config::Config, category: &str, minutes: &[u32]) -> Result<()> {
    fn single(category: &str, minutes: &[u32]) -> Result<Option<u32>> {
        match minutes {
            [] => Ok(None),
            [one] => Ok(Some(*one)),
            _ => bail!("'{category}' takes one lead; only 'exam' is multi-stage"),
        }
    }

    match category {
        "course" => cfg.reminders.course = single(category, minutes)?,
        "homework" => cfg.reminders.homework = single(category, minutes)?,
        "lecture" => cfg.reminders.lecture = single(category, minutes)?,
        "meeting" => cfg.reminders.meeting = single(category, minutes)?,
        "default" => cfg.reminders.default = single(category, minutes)?,
        "exam" => cfg.reminders.exam = minutes.to_vec(),
        other => bail!("unknown category '{other}' (course|homework|exam|lecture|meeting|default)"),
    }
    Ok(())
}

fn notify_status() -> Result<()> {
    let cfg = config::load_config()?;
    let notifier = host::DesktopNotifier::detect(&cfg);
    println!("Backend:    {}", notifier.backend_label());
    println!("Permission: {:?}", notifier.query_permission());
    Ok(())
}

fn notify_request() -> Result<()> {
    let cfg = config::load_config()?;
    let mut engine = ReminderEngine::new(host::DesktopNotifier::detect(&cfg));
    if engine.request_authorization() {
        println!("Notifications granted.");
    } else {
        println!("Not granted (state: {:?}).", engine.capability());
    }
    Ok(())
}

fn notify_test(stdout: bool) -> Result<()> {
    let alert = Alert {
        title: "Chime test".to_string(),
        body: format!(
            "It is {}",
            Local::now().naive_local().format("%Y-%m-%d %H:%M")
        ),
        tag: "chime-test".to_string(),
        meta: AlertMeta {
            kind: AlertKind::Task,
            id: "test".to_string(),
        },
    };

    let outcome = if stdout {
        let mut notifier = host::StdoutNotifier;
        let gate = PermissionGate::from_host(&notifier);
        deliver(&mut notifier, &gate, &alert)
    } else {
        let cfg = config::load_config()?;
        let mut notifier = host::DesktopNotifier::detect(&cfg);
        let gate = PermissionGate::from_host(&notifier);
        deliver(&mut notifier, &gate, &alert)
    };

    println!("Delivery: {outcome:?}");
    Ok(())
}
