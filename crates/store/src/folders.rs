//! Lifecycle folders. The containing folder name encodes coarse play status;
//! `temp` doubles as the staging area for OTO plays awaiting their trigger.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayFolder {
    New,
    PendingOpening,
    Open,
    PendingClosing,
    Closed,
    Expired,
    Temp,
}

impl PlayFolder {
    /// Every lifecycle folder, in sweep order.
    pub const ALL: [Self; 7] = [
        Self::New,
        Self::PendingOpening,
        Self::Open,
        Self::PendingClosing,
        Self::Closed,
        Self::Expired,
        Self::Temp,
    ];

    /// Folders holding plays the orchestrator still acts on.
    pub const ACTIVE: [Self; 4] = [
        Self::New,
        Self::PendingOpening,
        Self::Open,
        Self::PendingClosing,
    ];

    /// On-disk directory name under the store root.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::PendingOpening => "pending-opening",
            Self::Open => "open",
            Self::PendingClosing => "pending-closing",
            Self::Closed => "closed",
            Self::Expired => "expired",
            Self::Temp => "temp",
        }
    }
}

impl std::fmt::Display for PlayFolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}
