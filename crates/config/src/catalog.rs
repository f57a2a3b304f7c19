// Store / delivery partner catalog
// Loaded from ~/.config/conciliador/catalog.toml, falling back to the built-in copy

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use conciliador_recon::query::QueryFilter;
use conciliador_recon::AdapterSpec;
use serde::Deserialize;

use crate::error::ConfigError;

const BUILTIN: &str = include_str!("../catalog.default.toml");

/// A store (`ID_Empresa`) and the partners it may reconcile.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Store {
    pub id: u32,
    pub name: String,
    pub partners: Vec<u32>,
}

/// A delivery partner and the rules selecting its orders in the system.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Partner {
    pub id: u32,
    pub name: String,
    /// Adapter used to read this partner's export.
    pub adapter: String,
    /// System client ids (`ID_Cliente`) booked for this partner.
    pub client_ids: Vec<u32>,
    /// System payment method ids (`ID_Forma`).
    pub payment_methods: Vec<u32>,
    /// Adapter for system-side spreadsheet exports of this partner.
    #[serde(default)]
    pub system_adapter: Option<String>,
}

impl Partner {
    /// System query filter for this partner at `store`.
    pub fn filter(&self, store: &Store, start: NaiveDate, end: NaiveDate) -> QueryFilter {
        QueryFilter::new(start, end, store.id)
            .with_clients(self.client_ids.iter().copied())
            .with_payment_methods(self.payment_methods.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub stores: Vec<Store>,
    #[serde(default)]
    pub partners: Vec<Partner>,
    #[serde(default)]
    pub adapters: Vec<AdapterSpec>,
}

impl Catalog {
    /// The catalog shipped with the binary.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml(BUILTIN, "built-in catalog")
    }

    /// Parse and validate. `source` names the origin in error messages.
    pub fn from_toml(s: &str, source: &str) -> Result<Self, ConfigError> {
        let catalog: Self = toml::from_str(s).map_err(|e| ConfigError::Parse {
            source: source.to_string(),
            message: e.to_string(),
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&contents, &path.display().to_string())
    }

    /// Get the user catalog path
    pub fn user_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("conciliador")
            .join("catalog.toml")
    }

    /// Explicit path if given, else the user catalog if present, else built-in.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            log::debug!("catalog: {}", path.display());
            return Self::from_path(path);
        }

        let user = Self::user_path();
        if user.exists() {
            log::debug!("catalog: {}", user.display());
            return Self::from_path(&user);
        }

        log::debug!("catalog: built-in");
        Self::builtin()
    }

    /// Write the built-in catalog to `path` as a starting point for edits.
    pub fn write_default(path: &Path) -> Result<(), ConfigError> {
        let io_err = |e: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, BUILTIN).map_err(io_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut adapter_names = HashSet::new();
        for adapter in &self.adapters {
            adapter
                .validate()
                .map_err(|e| ConfigError::Validation(e.to_string()))?;
            if !adapter_names.insert(adapter.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "adapter '{}' defined twice",
                    adapter.name
                )));
            }
        }

        let mut partner_ids = HashSet::new();
        for partner in &self.partners {
            if !partner_ids.insert(partner.id) {
                return Err(ConfigError::Validation(format!(
                    "partner {} defined twice",
                    partner.id
                )));
            }
            let referenced = std::iter::once(&partner.adapter).chain(partner.system_adapter.as_ref());
            for name in referenced {
                if !adapter_names.contains(name.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "partner {} ({}): adapter '{name}' is not defined",
                        partner.id, partner.name
                    )));
                }
            }
        }

        let mut store_ids = HashSet::new();
        for store in &self.stores {
            if !store_ids.insert(store.id) {
                return Err(ConfigError::Validation(format!(
                    "store {} defined twice",
                    store.id
                )));
            }
            if let Some(missing) = store.partners.iter().find(|p| !partner_ids.contains(p)) {
                return Err(ConfigError::Validation(format!(
                    "store {} ({}): partner {missing} is not defined",
                    store.id, store.name
                )));
            }
        }

        Ok(())
    }

    pub fn store(&self, id: u32) -> Result<&Store, ConfigError> {
        self.stores
            .iter()
            .find(|s| s.id == id)
            .ok_or(ConfigError::UnknownStore(id))
    }

    pub fn partner(&self, id: u32) -> Result<&Partner, ConfigError> {
        self.partners
            .iter()
            .find(|p| p.id == id)
            .ok_or(ConfigError::UnknownPartner(id))
    }

    pub fn adapter(&self, name: &str) -> Result<&AdapterSpec, ConfigError> {
        self.adapters
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| ConfigError::UnknownAdapter(name.to_string()))
    }

    /// Partners enabled for a store, in the store's declared order.
    pub fn partners_for_store(&self, store_id: u32) -> Result<Vec<&Partner>, ConfigError> {
        let store = self.store(store_id)?;
        store.partners.iter().map(|id| self.partner(*id)).collect()
    }

    /// Resolve a (store, partner) selection, rejecting partners the store
    /// does not use.
    pub fn ensure_allowed(&self, store_id: u32, partner_id: u32) -> Result<(&Store, &Partner), ConfigError> {
        let store = self.store(store_id)?;
        let partner = self.partner(partner_id)?;
        if !store.partners.contains(&partner_id) {
            return Err(ConfigError::PartnerNotAllowed {
                store: store_id,
                partner: partner_id,
            });
        }
        Ok((store, partner))
    }
}
