//! Orchestration sweep loop.
//!
//! Single-threaded and cooperative: one full pass over the active plays
//! runs to completion, then the loop sleeps for the configured interval.
//! Per-play failures are logged and never abort the sweep; only a fatal
//! initialization error (an unreachable store) is allowed to kill the
//! process.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use play_engine_core::config::AppConfig;
use play_engine_core::market::{CalendarEvent, OptionQuote};
use play_engine_core::play::{CloseType, Play, PlayStatus};
use play_engine_core::traits::{EventCalendar, MarketDataProvider};
use play_engine_gtd::{evaluate_play, GtdContext, PolicyRegistry};
use play_engine_store::{
    repair_document, PlayFolder, PlayStore, RepairOutcome, RepairTemplate, StoreError,
};

use crate::exits::check_exit_conditions;
use crate::liveness::Heartbeat;
use crate::trailing::update_trailing_levels;
use crate::transitions;

/// The play monitor service. One instance owns the whole sweep.
pub struct PlayMonitor {
    store: PlayStore,
    market: Arc<dyn MarketDataProvider>,
    calendar: Option<Arc<dyn EventCalendar>>,
    registry: PolicyRegistry,
    config: AppConfig,
    heartbeat: Heartbeat,
}

impl PlayMonitor {
    #[must_use]
    pub fn new(
        store: PlayStore,
        market: Arc<dyn MarketDataProvider>,
        calendar: Option<Arc<dyn EventCalendar>>,
        registry: PolicyRegistry,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            market,
            calendar,
            registry,
            config,
            heartbeat: Heartbeat::new(),
        }
    }

    /// Handle to the heartbeat this loop refreshes; give it to the
    /// [`LivenessMonitor`](crate::liveness::LivenessMonitor).
    #[must_use]
    pub fn heartbeat(&self) -> Heartbeat {
        self.heartbeat.clone()
    }

    /// Runs the polling loop forever.
    ///
    /// # Errors
    ///
    /// Never returns in normal operation; the `Result` exists for the
    /// caller's signature only.
    pub async fn run(mut self) -> Result<()> {
        info!(
            poll_secs = self.config.monitor.poll_interval_secs,
            trailing = self.config.trailing.enabled,
            gtd = self.config.gtd.enabled,
            policies = self.registry.len(),
            "Play monitor started"
        );

        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.monitor.poll_interval_secs));
        loop {
            interval.tick().await;
            self.sweep().await;
        }
    }

    /// One full pass over the active plays.
    pub async fn sweep(&mut self) {
        self.heartbeat.beat();
        let now = Utc::now();
        let events = self.fetch_events().await;

        for folder in [PlayFolder::New, PlayFolder::Open] {
            let names = match self.store.list(folder) {
                Ok(names) => names,
                Err(e) => {
                    error!(folder = %folder, error = %e, "Failed to list plays");
                    continue;
                }
            };
            for name in names {
                if let Err(e) = self.process_play(folder, &name, now, &events).await {
                    error!(play = %name, folder = %folder, error = %e, "Play cycle failed");
                }
            }
        }
    }

    async fn fetch_events(&self) -> Vec<CalendarEvent> {
        let Some(calendar) = &self.calendar else {
            return Vec::new();
        };
        match calendar.upcoming_events().await {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "Calendar unavailable this cycle");
                Vec::new()
            }
        }
    }

    async fn process_play(
        &self,
        folder: PlayFolder,
        name: &str,
        now: DateTime<Utc>,
        events: &[CalendarEvent],
    ) -> Result<()> {
        let mut play = match self.store.load(folder, name) {
            Ok(play) => play,
            Err(StoreError::Corrupt { path, kind }) => {
                warn!(play = %name, kind = %kind, "Corrupt record — routing to repair");
                self.repair_one(&path, name)?;
                match self.store.load(folder, name) {
                    Ok(play) => play,
                    Err(e) => {
                        warn!(play = %name, error = %e, "Record still unusable after repair");
                        return Ok(());
                    }
                }
            }
            Err(e) => return Err(e.into()),
        };

        // Repaired records wait for human review; no transitions, no
        // evaluation against placeholder values.
        if !play.integrity {
            warn!(play = %name, "Record flagged by repair — skipped until reviewed");
            return Ok(());
        }

        // Hard backstop: past the contract expiration nothing else matters.
        if now.date_naive() > play.contract_expiration_date
            && !play.status.play_status.is_terminal()
        {
            transitions::mark_expired(&self.store, &mut play, now)?;
            return Ok(());
        }

        if play.status.play_status != PlayStatus::Open {
            // NEW plays wait on the external execution tool for their fill.
            return Ok(());
        }

        let price = self.stock_price(&play).await;
        let quote = self.option_quote(&play).await;

        self.apply_gtd_defaults(&mut play);
        let ctx = GtdContext::build(&play, now, price, quote.as_ref(), events.to_vec());
        let evaluation = evaluate_play(&mut play, &ctx, &self.registry);

        let trailing_changed = match price {
            Some(p) => update_trailing_levels(&mut play, p, now, self.config.trailing.enabled),
            None => false,
        };

        if evaluation.should_close {
            info!(
                play = %name,
                reason = evaluation.close_reason.as_deref().unwrap_or("unspecified"),
                "GTD decision closes play"
            );
            transitions::mark_closed(&self.store, &mut play, CloseType::Gtd, now)?;
            return Ok(());
        }

        if let Some(close_type) =
            price.and_then(|p| check_exit_conditions(&play, p, ctx.current_premium))
        {
            transitions::mark_closed(&self.store, &mut play, close_type, now)?;
            return Ok(());
        }

        // Unchanged cycles must not touch the record.
        if evaluation.requires_write() || trailing_changed {
            self.store.save(&play, folder)?;
        }

        Ok(())
    }

    /// Structural repair for one document, in place.
    fn repair_one(&self, path: &std::path::Path, name: &str) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        let template = RepairTemplate::from_store(&self.store);
        match repair_document(&content, name, &template) {
            RepairOutcome::Fixed(fixed) => {
                self.store.write_atomic(path, &fixed)?;
                info!(play = %name, "Record repaired");
            }
            RepairOutcome::Unrepairable(kind) => {
                warn!(play = %name, kind = %kind, "Record unrepairable — left for human review");
            }
            RepairOutcome::Clean => {}
        }
        Ok(())
    }

    /// Plays that enable GTD without their own policy list inherit the
    /// globally configured defaults.
    fn apply_gtd_defaults(&self, play: &mut Play) {
        if self.config.gtd.enabled
            && play.dynamic_gtd.enabled
            && play.dynamic_gtd.policies.is_empty()
        {
            play.dynamic_gtd.policies = self.config.gtd.policies.clone();
        }
    }

    async fn stock_price(&self, play: &Play) -> Option<Decimal> {
        match self.market.stock_price(&play.symbol).await {
            Ok(price) => price,
            Err(e) => {
                warn!(symbol = %play.symbol, error = %e, "Stock price unavailable");
                None
            }
        }
    }

    async fn option_quote(&self, play: &Play) -> Option<OptionQuote> {
        match self.market.option_quote(&play.occ_symbol()).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!(contract = %play.occ_symbol(), error = %e, "Option quote unavailable");
                None
            }
        }
    }
}
