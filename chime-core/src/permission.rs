//! Authorization state machine for the host notification facility.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::dispatch::NotifyHost;

/// Host authorization state. `NotDetermined` means the facility exists but
/// the user has never been asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Unsupported,
    NotDetermined,
    Denied,
    Granted,
}

impl Capability {
    pub fn is_granted(self) -> bool {
        self == Capability::Granted
    }
}

/// Cached authorization state. This is the single source of truth: no
/// other component queries or mutates host permission state.
#[derive(Debug, Clone)]
pub struct PermissionGate {
    cached: Capability,
}

impl PermissionGate {
    pub fn new(cap: Capability) -> Self {
        Self { cached: cap }
    }

    pub fn from_host(host: &impl NotifyHost) -> Self {
        Self::new(host.query_permission())
    }

    /// Last known state, never prompts.
    pub fn capability(&self) -> Capability {
        self.cached
    }

    /// Prompt-at-most-once authorization flow. Returns true iff the state
    /// ends up granted. A cached denial is final for this process; an
    /// unsupported host logs and declines instead of erroring.
    pub fn request_authorization(&mut self, host: &mut impl NotifyHost) -> bool {
        match self.cached {
            Capability::Unsupported => {
                warn!("host has no notification facility; cannot request authorization");
                false
            }
            Capability::Granted => true,
            Capability::Denied => false,
            Capability::NotDetermined => {
                let got = host.request_permission();
                self.cached = got;
                got.is_granted()
            }
        }
    }
}
