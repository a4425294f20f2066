//! Lifecycle state machine.
//!
//! NEW -> OPEN -> {CLOSED, EXPIRED}; the terminal states never transition
//! again. Conditional relationships fire exactly once, on the NEW -> OPEN
//! edge: the OCO sibling is canceled and removed, the OTO sibling is
//! promoted out of the staging folder. Every transition moves the play's
//! document into the folder matching its new status.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use play_engine_core::play::{CloseType, Play, PlayStatus};
use play_engine_store::{PlayFolder, PlayStore, StoreError};

#[derive(Error, Debug)]
pub enum TransitionError {
    /// The record was auto-repaired and has not been vouched for; no
    /// lifecycle transition may touch it until a human clears the flag.
    #[error("play {0} failed the integrity check — repair/review required before transitions")]
    IntegrityBlocked(String),

    #[error("play {play} cannot transition out of {from:?}")]
    InvalidState { play: String, from: PlayStatus },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Broker fill confirmation, supplied by the external execution collaborator.
#[derive(Debug, Clone)]
pub struct FillInfo {
    pub order_id: String,
    pub filled_at: DateTime<Utc>,
}

fn integrity_guard(play: &Play) -> Result<(), TransitionError> {
    if !play.integrity {
        warn!(
            play = %play.play_name,
            "Transition rejected: record flagged by repair — queued for review"
        );
        return Err(TransitionError::IntegrityBlocked(play.play_name.clone()));
    }
    Ok(())
}

/// Fields embedded in the broker contract identifier are frozen once the
/// play leaves NEW.
#[must_use]
pub fn static_fields_editable(play: &Play) -> bool {
    play.status.play_status == PlayStatus::New
}

/// NEW -> OPEN on a confirmed fill. Cancels the OCO sibling and promotes
/// the OTO sibling out of staging, then refiles the document under `open`.
///
/// # Errors
///
/// Rejected on integrity failure or when the play is not NEW; store errors
/// propagate.
pub fn mark_open(store: &PlayStore, play: &mut Play, fill: &FillInfo) -> Result<(), TransitionError> {
    integrity_guard(play)?;
    if play.status.play_status != PlayStatus::New {
        return Err(TransitionError::InvalidState {
            play: play.play_name.clone(),
            from: play.status.play_status,
        });
    }

    play.status.play_status = PlayStatus::Open;
    play.status.order_id = Some(fill.order_id.clone());
    play.status.order_status = Some("filled".to_string());
    play.status.position_exists = true;
    play.status.opened_at = Some(fill.filled_at);

    if let Some(conditionals) = play.conditional_plays.clone() {
        // OCO: the sibling must be canceled, never independently closed.
        if let Some(oco) = &conditionals.oco_trigger {
            match store.remove(PlayFolder::New, oco) {
                Ok(()) => info!(play = %play.play_name, sibling = %oco, "OCO sibling canceled"),
                Err(StoreError::NotFound(_)) => {
                    warn!(play = %play.play_name, sibling = %oco, "OCO sibling already gone");
                }
                Err(e) => return Err(e.into()),
            }
        }
        // OTO: the staged sibling becomes a live NEW play.
        if let Some(oto) = &conditionals.oto_trigger {
            match store.move_play(oto, PlayFolder::Temp, PlayFolder::New) {
                Ok(()) => {
                    info!(play = %play.play_name, sibling = %oto, "OTO sibling promoted to NEW");
                }
                Err(StoreError::NotFound(_)) => {
                    warn!(play = %play.play_name, sibling = %oto, "OTO sibling missing from staging");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    refile(store, play, PlayFolder::Open)?;
    info!(play = %play.play_name, order_id = %fill.order_id, "Play opened");
    Ok(())
}

/// OPEN -> CLOSED with the reason recorded.
///
/// # Errors
///
/// Rejected on integrity failure or when the play is not OPEN.
pub fn mark_closed(
    store: &PlayStore,
    play: &mut Play,
    close_type: CloseType,
    now: DateTime<Utc>,
) -> Result<(), TransitionError> {
    integrity_guard(play)?;
    if play.status.play_status != PlayStatus::Open {
        return Err(TransitionError::InvalidState {
            play: play.play_name.clone(),
            from: play.status.play_status,
        });
    }

    play.status.play_status = PlayStatus::Closed;
    play.status.close_type = Some(close_type);
    play.status.closed_at = Some(now);
    play.status.position_exists = false;
    play.status.closing_order_status = Some("filed".to_string());

    refile(store, play, PlayFolder::Closed)?;
    info!(play = %play.play_name, close_type = %close_type, "Play closed");
    Ok(())
}

/// {NEW, OPEN} -> EXPIRED once the contract expiration backstop has passed
/// with the play unfilled or unclosed.
///
/// # Errors
///
/// Rejected on integrity failure or from a terminal state.
pub fn mark_expired(
    store: &PlayStore,
    play: &mut Play,
    now: DateTime<Utc>,
) -> Result<(), TransitionError> {
    integrity_guard(play)?;
    if play.status.play_status.is_terminal() {
        return Err(TransitionError::InvalidState {
            play: play.play_name.clone(),
            from: play.status.play_status,
        });
    }

    play.status.play_status = PlayStatus::Expired;
    play.status.position_exists = false;
    play.status.closed_at = Some(now);

    refile(store, play, PlayFolder::Expired)?;
    info!(
        play = %play.play_name,
        expiration = %play.contract_expiration_date,
        "Play expired at the contract backstop"
    );
    Ok(())
}

/// Moves the document to the folder for its new status and persists it.
fn refile(store: &PlayStore, play: &Play, to: PlayFolder) -> Result<(), TransitionError> {
    if let Some(from) = store.find(&play.play_name) {
        if from != to {
            store.move_play(&play.play_name, from, to)?;
        }
    }
    store.save(play, to)?;
    Ok(())
}
