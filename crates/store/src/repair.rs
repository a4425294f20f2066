//! Conservative structural repair for damaged play documents.
//!
//! Repair restores document *structure* only — closing delimiters, brace
//! balance, placeholder slots for fields the truncation destroyed. It never
//! invents business values: placeholders are visually recognizable (`"0.0"`
//! strikes, a 2099 expiration) and every repaired record is stamped
//! `integrity = false` so downstream consumers treat it as suspect until a
//! human clears it. Records no strategy can fix are left untouched.

use std::fs;

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use play_engine_core::play::Play;

use crate::corruption::{detect_corruption, CorruptionKind};
use crate::error::StoreError;
use crate::folders::PlayFolder;
use crate::store::PlayStore;

/// Top-level keys a play document is expected to carry. Loaded from a closed
/// play when one exists — used ONLY for key names, never for values.
#[derive(Debug, Clone)]
pub struct RepairTemplate {
    keys: Vec<String>,
}

const BUILTIN_KEYS: [&str; 15] = [
    "play_name",
    "symbol",
    "trade_type",
    "strike_price",
    "contract_expiration_date",
    "creation_date",
    "entry",
    "take_profit",
    "stop_loss",
    "contracts",
    "play_class",
    "conditional_plays",
    "status",
    "dynamic_gtd",
    "integrity",
];

impl RepairTemplate {
    /// Built-in key list matching the current document shape.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            keys: BUILTIN_KEYS.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Derives the key list from the first parseable closed play, falling
    /// back to the built-in list when none exists.
    #[must_use]
    pub fn from_store(store: &PlayStore) -> Self {
        let Ok(names) = store.list(PlayFolder::Closed) else {
            return Self::builtin();
        };
        for name in names {
            let path = store.path_for(PlayFolder::Closed, &name);
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&content) {
                return Self {
                    keys: map.keys().cloned().collect(),
                };
            }
        }
        Self::builtin()
    }

    fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}

/// Result of one repair attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    /// Document was already structurally sound.
    Clean,
    /// Document was repaired; the new content is returned.
    Fixed(String),
    /// No strategy produced a loadable document; the file must be left
    /// untouched and flagged for human intervention.
    Unrepairable(CorruptionKind),
}

/// Attempts to repair one document. `name` is the filename stem, used to
/// restore the structural `play_name` identity when the truncation ate it.
#[must_use]
pub fn repair_document(content: &str, name: &str, template: &RepairTemplate) -> RepairOutcome {
    let Some(kind) = detect_corruption(content) else {
        return RepairOutcome::Clean;
    };

    let trimmed = content.trim();

    // Strategy (a): cut mid-attribute — substitute null, close the braces.
    if kind == CorruptionKind::CutMidAttribute {
        let patched = format!("{trimmed} null");
        let candidate = append_missing_braces(&patched);
        if let Some(fixed) = finalize(&candidate, name, template) {
            return RepairOutcome::Fixed(fixed);
        }
    }

    // Strategy (b): the known entry-premium truncation — keep the valid
    // prefix, backfill structural placeholders for what the cut destroyed.
    if kind == CorruptionKind::EntryPremiumCut {
        if let Some(candidate) = rebuild_from_premium_cut(trimmed) {
            if let Some(fixed) = finalize(&candidate, name, template) {
                return RepairOutcome::Fixed(fixed);
            }
        }
    }

    // Strategy (c): surplus trailing close braces (the known small overshoot).
    if let Some(candidate) = strip_surplus_braces(trimmed) {
        if let Some(fixed) = finalize(&candidate, name, template) {
            return RepairOutcome::Fixed(fixed);
        }
    }

    // Strategy (d): last resort — balance braces either direction.
    let candidate = if brace_deficit(trimmed) > 0 {
        append_missing_braces(trimmed)
    } else {
        trim_trailing_braces(trimmed)
    };
    if let Some(fixed) = finalize(&candidate, name, template) {
        return RepairOutcome::Fixed(fixed);
    }

    RepairOutcome::Unrepairable(kind)
}

/// Sweeps every lifecycle folder, repairing what it can. Returns the number
/// of documents fixed; a second pass over the same store fixes zero.
///
/// # Errors
///
/// Only unrecoverable I/O errors (unreadable folders) surface; individual
/// unrepairable documents are logged and skipped, never discarded.
pub fn check_and_fix_all_plays(store: &PlayStore) -> Result<usize, StoreError> {
    let template = RepairTemplate::from_store(store);
    let mut fixed = 0;

    for folder in PlayFolder::ALL {
        for name in store.list(folder)? {
            let path = store.path_for(folder, &name);
            let content = fs::read_to_string(&path)?;
            match repair_document(&content, &name, &template) {
                RepairOutcome::Clean => {}
                RepairOutcome::Fixed(new_content) => {
                    store.write_atomic(&path, &new_content)?;
                    fixed += 1;
                    info!(play = %name, folder = %folder, "Repaired corrupt play document");
                }
                RepairOutcome::Unrepairable(kind) => {
                    warn!(
                        play = %name,
                        folder = %folder,
                        kind = %kind,
                        "Unrepairable play document left untouched — needs human review"
                    );
                }
            }
        }
    }

    Ok(fixed)
}

fn brace_deficit(content: &str) -> i64 {
    let mut open = 0i64;
    let mut close = 0i64;
    let mut in_string = false;
    let mut escaped = false;
    for c in content.chars() {
        if in_string {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => {
                    in_string = false;
                    escaped = false;
                }
                _ => escaped = false,
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => open += 1,
            '}' => close += 1,
            _ => {}
        }
    }
    open - close
}

fn append_missing_braces(content: &str) -> String {
    let deficit = brace_deficit(content).max(0) as usize;
    let mut out = content.to_string();
    // A dangling quote from a cut string value has to be closed first.
    if quote_open(&out) {
        out.push('"');
    }
    out.extend(std::iter::repeat('}').take(deficit));
    out
}

fn quote_open(content: &str) -> bool {
    let mut in_string = false;
    let mut escaped = false;
    for c in content.chars() {
        if in_string {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => {
                    in_string = false;
                    escaped = false;
                }
                _ => escaped = false,
            }
        } else if c == '"' {
            in_string = true;
        }
    }
    in_string
}

/// Known overshoot pattern: more `}` than `{`, all of the surplus trailing.
fn strip_surplus_braces(content: &str) -> Option<String> {
    let surplus = (-brace_deficit(content)).max(0) as usize;
    if surplus == 0 || surplus > 3 {
        return None;
    }
    let stripped = content.trim_end_matches('}');
    if content.len() - stripped.len() < surplus {
        return None;
    }
    let keep = content.len() - stripped.len() - surplus;
    let mut out = stripped.to_string();
    out.extend(std::iter::repeat('}').take(keep));
    Some(out)
}

/// Drops the partial premium attribute, closes the braces. The caller's
/// finalize step backfills the placeholder slots.
fn rebuild_from_premium_cut(content: &str) -> Option<String> {
    let idx = content.rfind("\"premium\"")?;
    let mut prefix = content[..idx].trim_end();
    prefix = prefix.strip_suffix(',').unwrap_or(prefix).trim_end();
    Some(append_missing_braces(prefix))
}

fn trim_trailing_braces(content: &str) -> String {
    let mut out = content.to_string();
    while brace_deficit(&out) < 0 && out.trim_end().ends_with('}') {
        let trimmed = out.trim_end().to_string();
        out = trimmed[..trimmed.len() - 1].to_string();
    }
    out
}

/// Parses a candidate, restores structural identity, backfills placeholder
/// slots for destroyed required fields, stamps `integrity = false`, and
/// verifies the result loads as a play. Returns pretty JSON on success.
fn finalize(candidate: &str, name: &str, template: &RepairTemplate) -> Option<String> {
    let Ok(Value::Object(mut map)) = serde_json::from_str::<Value>(candidate) else {
        return None;
    };

    // Null left by strategy (a) on a defaultable block: drop the key so
    // serde defaults apply instead of failing on null.
    map.retain(|_, v| !v.is_null());

    if !map.contains_key("play_name") {
        map.insert("play_name".to_string(), json!(name));
    }
    backfill_placeholders(&mut map, template);
    map.insert("integrity".to_string(), json!(false));

    let value = Value::Object(map);
    // Structural success means the document loads again as a play.
    serde_json::from_value::<Play>(value.clone()).ok()?;
    serde_json::to_string_pretty(&value).ok()
}

/// Inserts visually-recognizable placeholders for required fields the
/// truncation destroyed. Keys come from the template; values are fixed
/// placeholders, never sourced from other records.
fn backfill_placeholders(map: &mut Map<String, Value>, template: &RepairTemplate) {
    for key in template.keys() {
        if map.contains_key(key) {
            continue;
        }
        let placeholder = match key {
            "status" => json!({}),
            "strike_price" => json!("0.0"),
            "contract_expiration_date" | "creation_date" => json!("2099-12-31"),
            "contracts" => json!(0),
            "entry" => json!({ "stock_price": "0.0", "premium": "0.0" }),
            _ => continue,
        };
        map.insert(key.to_string(), placeholder);
    }

    // The premium cut leaves the entry object without its last attribute.
    if let Some(Value::Object(entry)) = map.get_mut("entry") {
        entry
            .entry("stock_price".to_string())
            .or_insert_with(|| json!("0.0"));
        entry
            .entry("premium".to_string())
            .or_insert_with(|| json!("0.0"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use play_engine_core::play::{EntryPoint, OrderKind, Play, PlayClass, TradeType};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn make_play(name: &str) -> Play {
        Play {
            play_name: name.to_string(),
            symbol: "AMD".to_string(),
            trade_type: TradeType::Put,
            strike_price: dec!(110),
            contract_expiration_date: NaiveDate::from_ymd_opt(2026, 2, 20).unwrap(),
            creation_date: NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
            entry: EntryPoint {
                stock_price: dec!(112.40),
                premium: dec!(3.10),
                order_type: OrderKind::Market,
            },
            take_profit: Default::default(),
            stop_loss: Default::default(),
            contracts: 1,
            play_class: PlayClass::Simple,
            conditional_plays: None,
            status: Default::default(),
            dynamic_gtd: Default::default(),
            integrity: true,
        }
    }

    fn temp_store() -> (TempDir, PlayStore) {
        let dir = TempDir::new().unwrap();
        let store = PlayStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn clean_document_is_untouched() {
        let content = serde_json::to_string_pretty(&make_play("fine")).unwrap();
        let outcome = repair_document(&content, "fine", &RepairTemplate::builtin());
        assert_eq!(outcome, RepairOutcome::Clean);
    }

    #[test]
    fn mid_attribute_cut_on_optional_field_repairs() {
        // Full document truncated right after an optional key's colon.
        let full = serde_json::to_string(&make_play("cut")).unwrap();
        let idx = full.find("\"conditional_plays\":").unwrap() + "\"conditional_plays\":".len();
        let cut = &full[..idx];

        let outcome = repair_document(cut, "cut", &RepairTemplate::builtin());
        let RepairOutcome::Fixed(fixed) = outcome else {
            panic!("expected repair, got {outcome:?}");
        };

        let play: Play = serde_json::from_str(&fixed).unwrap();
        assert!(!play.integrity);
        assert_eq!(play.symbol, "AMD");
    }

    #[test]
    fn entry_premium_cut_backfills_placeholders() {
        let content = r#"{
            "play_name": "prem_cut",
            "symbol": "TSLA",
            "trade_type": "CALL",
            "entry": {"stock_price": "250.10", "premium": "8.4"#;

        let outcome = repair_document(content, "prem_cut", &RepairTemplate::builtin());
        let RepairOutcome::Fixed(fixed) = outcome else {
            panic!("expected repair, got {outcome:?}");
        };

        let play: Play = serde_json::from_str(&fixed).unwrap();
        assert!(!play.integrity);
        // Real data from the prefix survives.
        assert_eq!(play.symbol, "TSLA");
        assert_eq!(play.entry.stock_price, dec!(250.10));
        // Destroyed fields carry placeholders, not trade data.
        assert_eq!(play.entry.premium, dec!(0.0));
        assert_eq!(play.strike_price, dec!(0.0));
        assert_eq!(
            play.contract_expiration_date,
            NaiveDate::from_ymd_opt(2099, 12, 31).unwrap()
        );
        assert_eq!(play.contracts, 0);
    }

    #[test]
    fn surplus_close_braces_are_stripped() {
        let content = format!("{}}}", serde_json::to_string(&make_play("extra")).unwrap());
        let outcome = repair_document(&content, "extra", &RepairTemplate::builtin());
        let RepairOutcome::Fixed(fixed) = outcome else {
            panic!("expected repair, got {outcome:?}");
        };
        let play: Play = serde_json::from_str(&fixed).unwrap();
        assert!(!play.integrity);
        assert_eq!(play.play_name, "extra");
    }

    #[test]
    fn unterminated_document_gets_braces_appended() {
        let full = serde_json::to_string(&make_play("open_end")).unwrap();
        // Drop the document's closing delimiter.
        let cut = full.trim_end_matches('}');

        let outcome = repair_document(cut, "open_end", &RepairTemplate::builtin());
        assert!(matches!(outcome, RepairOutcome::Fixed(_)));
    }

    #[test]
    fn empty_document_is_unrepairable() {
        let outcome = repair_document("", "void", &RepairTemplate::builtin());
        assert_eq!(
            outcome,
            RepairOutcome::Unrepairable(CorruptionKind::Empty)
        );
    }

    #[test]
    fn fix_all_counts_and_is_idempotent() {
        let (_dir, store) = temp_store();

        // One healthy play, one truncated, one empty (unrepairable).
        store.save(&make_play("healthy"), PlayFolder::Open).unwrap();
        let full = serde_json::to_string(&make_play("torn")).unwrap();
        std::fs::write(
            store.path_for(PlayFolder::New, "torn"),
            full.trim_end_matches('}'),
        )
        .unwrap();
        std::fs::write(store.path_for(PlayFolder::New, "void"), "").unwrap();

        let first = check_and_fix_all_plays(&store).unwrap();
        assert_eq!(first, 1);

        // Second pass finds nothing left to fix.
        let second = check_and_fix_all_plays(&store).unwrap();
        assert_eq!(second, 0);

        // The unrepairable file is left exactly as it was.
        let void = std::fs::read_to_string(store.path_for(PlayFolder::New, "void")).unwrap();
        assert!(void.is_empty());

        // The repaired record loads and is flagged.
        let torn = store.load(PlayFolder::New, "torn").unwrap();
        assert!(!torn.integrity);
    }

    #[test]
    fn template_uses_closed_play_keys_only() {
        let (_dir, store) = temp_store();
        store.save(&make_play("done"), PlayFolder::Closed).unwrap();

        let template = RepairTemplate::from_store(&store);
        let keys: Vec<&str> = template.keys().collect();
        assert!(keys.contains(&"strike_price"));
        assert!(keys.contains(&"status"));
    }
}
