//! Delivery surface: alert payloads, the host trait, and the gated
//! dispatcher.

use anyhow::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::permission::{Capability, PermissionGate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Task,
    Exam,
    Course,
}

/// Click-routing payload. Carried as plain data so hosts can attach it to
/// whatever their notification API supports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertMeta {
    pub kind: AlertKind,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub title: String,
    pub body: String,
    /// Stable per-entity tag; hosts that coalesce by tag replace rather
    /// than stack repeated alerts for the same entity.
    pub tag: String,
    pub meta: AlertMeta,
}

/// Host notification facility. The engine talks to exactly one of these;
/// everything else about the host stays behind it.
pub trait NotifyHost {
    /// Current authorization state without prompting.
    fn query_permission(&self) -> Capability;

    /// Ask the user for authorization; may block on UI. Returns the
    /// resulting state.
    fn request_permission(&mut self) -> Capability;

    /// Present one alert.
    fn show(&mut self, alert: &Alert) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Suppressed,
    Failed,
}

/// Deliver one alert, gated on authorization.
///
/// Without a grant the host is never touched. Host errors are logged and
/// contained here; callers never see an `Err` from delivery.
pub fn deliver<H: NotifyHost>(host: &mut H, gate: &PermissionGate, alert: &Alert) -> Delivery {
    if gate.capability() != Capability::Granted {
        debug!(
            "suppressed '{}' (permission {:?})",
            alert.tag,
            gate.capability()
        );
        return Delivery::Suppressed;
    }

    match host.show(alert) {
        Ok(()) => {
            debug!("delivered '{}'", alert.tag);
            Delivery::Delivered
        }
        Err(e) => {
            warn!("delivery failed for '{}': {e:#}", alert.tag);
            Delivery::Failed
        }
    }
}
