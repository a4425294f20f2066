//! Policy recommendations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What a policy wants done with the play's effective exit date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GtdAction {
    Hold,
    Shorten,
    Extend,
    CloseNow,
}

/// One policy's recommendation for one cycle.
///
/// `priority` (lower = stronger) breaks ties between results with the SAME
/// action only — it never promotes an EXTEND over a SHORTEN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtdResult {
    pub action: GtdAction,
    /// Required for Shorten/Extend; ignored otherwise.
    pub recommended_date: Option<NaiveDate>,
    pub reason: String,
    pub priority: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl GtdResult {
    /// No opinion this cycle.
    #[must_use]
    pub fn hold(reason: impl Into<String>) -> Self {
        Self {
            action: GtdAction::Hold,
            recommended_date: None,
            reason: reason.into(),
            priority: 100,
            metadata: None,
        }
    }

    /// Close the play immediately; no further date arithmetic.
    #[must_use]
    pub fn close_now(reason: impl Into<String>, priority: u8) -> Self {
        Self {
            action: GtdAction::CloseNow,
            recommended_date: None,
            reason: reason.into(),
            priority,
            metadata: None,
        }
    }

    /// Pull the effective date earlier.
    #[must_use]
    pub fn shorten(date: NaiveDate, reason: impl Into<String>, priority: u8) -> Self {
        Self {
            action: GtdAction::Shorten,
            recommended_date: Some(date),
            reason: reason.into(),
            priority,
            metadata: None,
        }
    }

    /// Push the effective date later (clamped to the backstop at
    /// resolution time).
    #[must_use]
    pub fn extend(date: NaiveDate, reason: impl Into<String>, priority: u8) -> Self {
        Self {
            action: GtdAction::Extend,
            recommended_date: Some(date),
            reason: reason.into(),
            priority,
            metadata: None,
        }
    }

    /// Attaches free-form metadata for the per-policy results log.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
