//! Target catalog: the instruments to track, organized into report groups.
//!
//! Stored as TOML. Each group is processed as one scheduler batch:
//!
//! ```toml
//! [[groups]]
//! name = "Global indices"
//!
//! [[groups.instruments]]
//! name = "S&P 500"
//! asset_type = "index_us"
//! symbols = { yahoo = "^GSPC", fmp = "^GSPC" }
//! ```
//!
//! Optional per-instrument `start`/`end` (quoted ISO dates) override the
//! run's fetch window.

use chrono::NaiveDate;
use radar_core::domain::{AssetType, DateWindow, Instrument, ProviderId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("duplicate instrument '{name}' in group '{group}'")]
    DuplicateName { group: String, name: String },

    #[error("instrument '{name}': start {start} is after end {end}")]
    InvertedWindow {
        name: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub asset_type: AssetType,
    /// Provider name to symbol. Providers without a symbol are skipped for
    /// this instrument.
    #[serde(default)]
    pub symbols: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl CatalogEntry {
    /// Symbols keyed by provider. A provider name nobody knows is dropped,
    /// exactly like a missing symbol.
    pub fn provider_symbols(&self) -> BTreeMap<ProviderId, String> {
        self.symbols
            .iter()
            .filter_map(|(provider, symbol)| match provider.parse::<ProviderId>() {
                Ok(id) => Some((id, symbol.clone())),
                Err(_) => {
                    warn!(instrument = %self.name, provider = %provider, "ignoring unknown provider");
                    None
                }
            })
            .collect()
    }

    /// Resolve against the run's default fetch window.
    pub fn to_instrument(&self, default_window: DateWindow) -> Instrument {
        let window = DateWindow::new(
            self.start.unwrap_or(default_window.start),
            self.end.unwrap_or(default_window.end),
        );
        let mut instrument = Instrument::new(&self.name, self.asset_type, window);
        instrument.symbols = self.provider_symbols();
        instrument
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogGroup {
    pub name: String,
    #[serde(default)]
    pub instruments: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetCatalog {
    #[serde(default)]
    pub groups: Vec<CatalogGroup>,
}

impl TargetCatalog {
    /// Load a catalog from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a catalog from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, CatalogError> {
        let catalog: TargetCatalog = toml::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Names must be unique within a group; status rows are keyed by name.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for group in &self.groups {
            let mut seen = BTreeSet::new();
            for entry in &group.instruments {
                if !seen.insert(entry.name.as_str()) {
                    return Err(CatalogError::DuplicateName {
                        group: group.name.clone(),
                        name: entry.name.clone(),
                    });
                }
                if let (Some(start), Some(end)) = (entry.start, entry.end) {
                    if start > end {
                        return Err(CatalogError::InvertedWindow {
                            name: entry.name.clone(),
                            start,
                            end,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Instruments of `group` resolved against `default_window`, in catalog order.
    pub fn instruments(group: &CatalogGroup, default_window: DateWindow) -> Vec<Instrument> {
        group
            .instruments
            .iter()
            .map(|e| e.to_instrument(default_window))
            .collect()
    }

    /// Total number of instruments across groups.
    pub fn instrument_count(&self) -> usize {
        self.groups.iter().map(|g| g.instruments.len()).sum()
    }

    /// Give every instrument a synthetic symbol (its name) so an offline
    /// run can serve the whole catalog.
    pub fn with_synthetic_symbols(mut self) -> Self {
        for entry in self.groups.iter_mut().flat_map(|g| g.instruments.iter_mut()) {
            let name = entry.name.clone();
            entry
                .symbols
                .entry(ProviderId::Synthetic.as_str().to_string())
                .or_insert(name);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [[groups]]
        name = "Global indices"

        [[groups.instruments]]
        name = "S&P 500"
        asset_type = "index_us"
        symbols = { yahoo = "^GSPC", fmp = "^GSPC" }

        [[groups.instruments]]
        name = "Hang Seng"
        asset_type = "index_hk"
        symbols = { eastmoney = "HSI", yahoo = "^HSI" }

        [[groups]]
        name = "Funds"

        [[groups.instruments]]
        name = "Nasdaq 100 QDII"
        asset_type = "fund_open"
        symbols = { eastmoney = "017641" }
        start = "2024-01-01"
    "#;

    fn window() -> DateWindow {
        DateWindow::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
        )
    }

    #[test]
    fn parses_groups_in_order() {
        let catalog = TargetCatalog::from_toml(SAMPLE).unwrap();
        let names: Vec<&str> = catalog.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Global indices", "Funds"]);
        assert_eq!(catalog.instrument_count(), 3);
    }

    #[test]
    fn entry_resolves_symbols_and_window() {
        let catalog = TargetCatalog::from_toml(SAMPLE).unwrap();
        let spx = catalog.groups[0].instruments[0].to_instrument(window());
        assert_eq!(spx.symbol_for(ProviderId::Yahoo), Some("^GSPC"));
        assert_eq!(spx.symbol_for(ProviderId::Eastmoney), None);
        assert_eq!(spx.window, window());

        let fund = catalog.groups[1].instruments[0].to_instrument(window());
        assert_eq!(fund.asset_type, AssetType::FundOpen);
        assert_eq!(fund.window.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(fund.window.end, window().end);
    }

    #[test]
    fn duplicate_names_rejected() {
        let toml = r#"
            [[groups]]
            name = "G"
            [[groups.instruments]]
            name = "A"
            asset_type = "stock_us"
            [[groups.instruments]]
            name = "A"
            asset_type = "stock_hk"
        "#;
        assert!(matches!(
            TargetCatalog::from_toml(toml),
            Err(CatalogError::DuplicateName { .. })
        ));
    }

    #[test]
    fn unknown_asset_type_is_parse_error() {
        let toml = r#"
            [[groups]]
            name = "G"
            [[groups.instruments]]
            name = "A"
            asset_type = "crypto"
        "#;
        assert!(matches!(TargetCatalog::from_toml(toml), Err(CatalogError::Parse(_))));
    }

    #[test]
    fn unknown_provider_key_is_dropped() {
        let toml = r#"
            [[groups]]
            name = "G"
            [[groups.instruments]]
            name = "A"
            asset_type = "stock_us"
            symbols = { yahoo = "AAPL" }
            [[groups.instruments]]
            name = "B"
            asset_type = "stock_us"
            symbols = { yahoo = "MSFT", investing = "msft" }
        "#;
        let catalog = TargetCatalog::from_toml(toml).unwrap();
        let instruments = TargetCatalog::instruments(&catalog.groups[0], window());
        assert_eq!(instruments.len(), 2);
        assert_eq!(instruments[1].symbol_for(ProviderId::Yahoo), Some("MSFT"));
        assert_eq!(instruments[1].symbols.len(), 1);
    }

    #[test]
    fn group_instruments_keep_catalog_order() {
        let catalog = TargetCatalog::from_toml(SAMPLE).unwrap();
        let names: Vec<String> = TargetCatalog::instruments(&catalog.groups[0], window())
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["S&P 500", "Hang Seng"]);
    }

    #[test]
    fn synthetic_symbols_fill_gaps_only() {
        let catalog = TargetCatalog::from_toml(SAMPLE).unwrap().with_synthetic_symbols();
        let entry = &catalog.groups[0].instruments[0];
        let symbols = entry.provider_symbols();
        assert_eq!(symbols.get(&ProviderId::Synthetic).map(String::as_str), Some("S&P 500"));
        assert_eq!(symbols.len(), 3);
    }
}
