//! # Ledger Configuration
//!
//! Branch-level settings for checkout, reporting and the staff view.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Override Order                                       │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_STORE_ID=branch-001                                          │
//! │     TALLY_PAYMENT_TYPES=cash,card,upi,voucher                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/pos/ledger.toml (Linux)                                  │
//! │     ~/Library/Application Support/com.tally.pos/ledger.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [store]
//! id = "branch-001"
//! name = "Harbour Street"
//!
//! [payments]
//! accepted = ["cash", "card", "upi"]
//!
//! [reporting]
//! top_products = 5
//! utc_offset_minutes = 330
//!
//! [staff]
//! inactive_after_days = 7
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use tally_core::report::{AggregateOptions, DEFAULT_TOP_PRODUCTS};
use tally_core::shift::{StaffPolicy, DEFAULT_INACTIVE_AFTER_DAYS};
use tally_core::PaymentTypeSet;

use crate::error::{LedgerError, LedgerResult};

/// Largest offset `chrono::FixedOffset` accepts, in minutes.
const MAX_UTC_OFFSET_MINUTES: i32 = 24 * 60 - 1;

// =============================================================================
// Sections
// =============================================================================

/// The branch this ledger serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub id: String,

    #[serde(default)]
    pub name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            id: "default-store".to_string(),
            name: "Default Store".to_string(),
        }
    }
}

/// Payment codes accepted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSettings {
    #[serde(default = "default_accepted")]
    pub accepted: Vec<String>,
}

fn default_accepted() -> Vec<String> {
    PaymentTypeSet::default().codes().to_vec()
}

impl Default for PaymentSettings {
    fn default() -> Self {
        PaymentSettings {
            accepted: default_accepted(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingSettings {
    /// Length of the top products list.
    #[serde(default = "default_top_products")]
    pub top_products: usize,

    /// Offset of the branch's local day from UTC.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

fn default_top_products() -> usize {
    DEFAULT_TOP_PRODUCTS
}

impl Default for ReportingSettings {
    fn default() -> Self {
        ReportingSettings {
            top_products: default_top_products(),
            utc_offset_minutes: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffSettings {
    /// Days without a session before a cashier shows as inactive.
    #[serde(default = "default_inactive_after_days")]
    pub inactive_after_days: i64,
}

fn default_inactive_after_days() -> i64 {
    DEFAULT_INACTIVE_AFTER_DAYS
}

impl Default for StaffSettings {
    fn default() -> Self {
        StaffSettings {
            inactive_after_days: default_inactive_after_days(),
        }
    }
}

// =============================================================================
// Main Ledger Configuration
// =============================================================================

/// Complete ledger configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub payments: PaymentSettings,

    #[serde(default)]
    pub reporting: ReportingSettings,

    #[serde(default)]
    pub staff: StaffSettings,
}

impl LedgerConfig {
    /// Defaults, then `ledger.toml` if one exists, then `TALLY_*` variables.
    /// The merged result must pass [`LedgerConfig::validate`].
    pub fn load(config_path: Option<PathBuf>) -> LedgerResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Like [`LedgerConfig::load`], but a bad file or env value logs a warning
    /// and yields the defaults.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load ledger config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Writes pretty TOML, creating the parent directory.
    pub fn save(&self, config_path: Option<PathBuf>) -> LedgerResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| LedgerError::InvalidConfig("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Ledger config saved");
        Ok(())
    }

    /// Rejects settings the engine cannot honor (blank store id, no payment
    /// types, zero top products, out-of-range offset).
    pub fn validate(&self) -> LedgerResult<()> {
        if self.store.id.trim().is_empty() {
            return Err(LedgerError::InvalidConfig("store.id must not be empty".into()));
        }

        if self.accepted_payments().is_empty() {
            return Err(LedgerError::InvalidConfig(
                "payments.accepted must list at least one payment type".into(),
            ));
        }

        if self.reporting.top_products == 0 {
            return Err(LedgerError::InvalidConfig(
                "reporting.top_products must be greater than 0".into(),
            ));
        }

        if self.reporting.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(LedgerError::InvalidConfig(format!(
                "reporting.utc_offset_minutes must be within ±{}, got {}",
                MAX_UTC_OFFSET_MINUTES, self.reporting.utc_offset_minutes
            )));
        }

        if self.staff.inactive_after_days < 0 {
            return Err(LedgerError::InvalidConfig(
                "staff.inactive_after_days cannot be negative".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup; unparsable values are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup("TALLY_STORE_ID") {
            debug!(store_id = %id, "Overriding store ID from environment");
            self.store.id = id;
        }

        if let Some(list) = lookup("TALLY_PAYMENT_TYPES") {
            let accepted: Vec<String> = list
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(String::from)
                .collect();
            debug!(?accepted, "Overriding accepted payment types from environment");
            self.payments.accepted = accepted;
        }

        if let Some(value) = lookup("TALLY_TOP_PRODUCTS") {
            match value.parse::<usize>() {
                Ok(n) => self.reporting.top_products = n,
                Err(_) => warn!(value = %value, "Ignoring invalid TALLY_TOP_PRODUCTS"),
            }
        }

        if let Some(value) = lookup("TALLY_UTC_OFFSET_MINUTES") {
            match value.parse::<i32>() {
                Ok(m) => self.reporting.utc_offset_minutes = m,
                Err(_) => warn!(value = %value, "Ignoring invalid TALLY_UTC_OFFSET_MINUTES"),
            }
        }

        if let Some(value) = lookup("TALLY_INACTIVE_AFTER_DAYS") {
            match value.parse::<i64>() {
                Ok(d) => self.staff.inactive_after_days = d,
                Err(_) => warn!(value = %value, "Ignoring invalid TALLY_INACTIVE_AFTER_DAYS"),
            }
        }
    }

    /// `ledger.toml` under the platform config dir for `com.tally.pos`.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "pos")
            .map(|dirs| dirs.config_dir().join("ledger.toml"))
    }

    // =========================================================================
    // Engine Inputs
    // =========================================================================

    pub fn store_id(&self) -> &str {
        &self.store.id
    }

    pub fn accepted_payments(&self) -> PaymentTypeSet {
        PaymentTypeSet::new(self.payments.accepted.iter().cloned())
    }

    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions::default()
            .with_top_n(self.reporting.top_products)
            .with_utc_offset_minutes(self.reporting.utc_offset_minutes)
    }

    pub fn staff_policy(&self) -> StaffPolicy {
        StaffPolicy {
            inactive_after_days: self.staff.inactive_after_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tally_core::PaymentType;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reporting.top_products, 5);
        assert_eq!(config.staff.inactive_after_days, 7);
        assert!(config.accepted_payments().accepts(&PaymentType::upi()));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: LedgerConfig = toml::from_str(
            r#"
            [store]
            id = "branch-9"

            [reporting]
            utc_offset_minutes = 330
            "#,
        )
        .unwrap();
        assert_eq!(config.store.id, "branch-9");
        assert_eq!(config.reporting.top_products, 5);
        assert_eq!(config.payments.accepted, vec!["cash", "card", "upi"]);
        assert_eq!(
            config.aggregate_options().utc_offset.local_minus_utc(),
            330 * 60
        );
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("TALLY_STORE_ID", "branch-42"),
            ("TALLY_PAYMENT_TYPES", "cash, voucher ,,"),
            ("TALLY_TOP_PRODUCTS", "not-a-number"),
            ("TALLY_INACTIVE_AFTER_DAYS", "14"),
        ]
        .into_iter()
        .collect();

        let mut config = LedgerConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.store_id(), "branch-42");
        assert_eq!(config.payments.accepted, vec!["cash", "voucher"]);
        assert_eq!(config.reporting.top_products, 5);
        assert_eq!(config.staff_policy().inactive_after_days, 14);
    }

    #[test]
    fn test_config_validation() {
        let mut config = LedgerConfig::default();

        config.payments.accepted = vec!["  ".into()];
        assert!(config.validate().is_err());

        config = LedgerConfig::default();
        config.reporting.top_products = 0;
        assert!(config.validate().is_err());

        config = LedgerConfig::default();
        config.reporting.utc_offset_minutes = 24 * 60;
        assert!(config.validate().is_err());

        config = LedgerConfig::default();
        config.store.id = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = std::env::temp_dir()
            .join(format!("tally-ledger-{}", uuid::Uuid::new_v4()))
            .join("ledger.toml");

        let mut config = LedgerConfig::default();
        config.store.id = "branch-file".into();
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[store]"));
        assert!(contents.contains("[reporting]"));

        let loaded: LedgerConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded, config);

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_load_or_default_falls_back_on_bad_file() {
        let dir = std::env::temp_dir().join(format!("tally-ledger-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ledger.toml");
        std::fs::write(&path, "[reporting]\ntop_products = \"many\"\n").unwrap();

        assert!(matches!(
            LedgerConfig::load(Some(path.clone())),
            Err(LedgerError::TomlParse(_))
        ));
        let config = LedgerConfig::load_or_default(Some(path));
        assert_eq!(config.reporting.top_products, 5);

        let _ = std::fs::remove_dir_all(dir);
    }
}
