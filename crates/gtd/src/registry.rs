//! Policy registry.
//!
//! An explicitly constructed table mapping policy name to constructor — no
//! hidden global state, no runtime module scanning. Callers hold the
//! registry and pass it by reference into the evaluator.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::policies;
use crate::policy::{GtdPolicy, ParamSpec};

/// Constructor for one policy instance.
pub type PolicyCtor = fn() -> Box<dyn GtdPolicy>;

/// The compile-time table of bundled policies.
const BUILTIN_POLICIES: [(&str, PolicyCtor); 10] = [
    ("max_hold_days", policies::max_hold::new),
    ("dte_close", policies::dte_close::new),
    ("half_life", policies::half_life::new),
    ("profit_time_stop", policies::profit_time_stop::new),
    ("loss_shorten", policies::loss_shorten::new),
    ("profit_extend", policies::profit_extend::new),
    ("rolling_extension", policies::rolling_extension::new),
    ("theta_decay", policies::theta_decay::new),
    ("weekend_theta", policies::weekend_theta::new),
    ("event_calendar", policies::event_calendar::new),
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// Same name, different implementation — a configuration bug, not a
    /// benign re-registration.
    #[error("policy `{0}` already registered with a different implementation")]
    Duplicate(String),
}

/// Name-indexed policy factory table.
#[derive(Default)]
pub struct PolicyRegistry {
    factories: BTreeMap<&'static str, PolicyCtor>,
}

impl PolicyRegistry {
    /// Empty registry; register policies explicitly.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with every bundled policy.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, ctor) in BUILTIN_POLICIES {
            registry.factories.insert(name, ctor);
        }
        registry
    }

    /// Registers a policy constructor under a name. Re-registering the
    /// identical constructor is idempotent; a different implementation
    /// under an existing name is rejected.
    ///
    /// # Errors
    ///
    /// `RegistryError::Duplicate` on a name collision.
    pub fn register(&mut self, name: &'static str, ctor: PolicyCtor) -> Result<(), RegistryError> {
        if let Some(existing) = self.factories.get(name) {
            if *existing == ctor {
                return Ok(());
            }
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.factories.insert(name, ctor);
        Ok(())
    }

    /// Instantiates a fresh policy by name.
    #[must_use]
    pub fn create(&self, name: &str) -> Option<Box<dyn GtdPolicy>> {
        self.factories.get(name).map(|ctor| ctor())
    }

    /// Registered policy names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Parameter schemas for every registered policy, keyed by name — the
    /// payload external configuration surfaces consume.
    #[must_use]
    pub fn schemas(&self) -> BTreeMap<&'static str, BTreeMap<&'static str, ParamSpec>> {
        self.factories
            .iter()
            .map(|(name, ctor)| (*name, ctor().param_schema()))
            .collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
