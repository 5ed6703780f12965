//! Serializable view of the entry point registry.
//!
//! Addresses are process-specific and left out; everything exported here is
//! stable across builds of the same catalog.

use std::collections::BTreeMap;

use abiprobe_abi::catalog::{Component, EntryPoint, InterfaceEntry, Registry, registry};
use serde::{Deserialize, Serialize};

use crate::structured_log::sha256_hex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRow {
    pub symbol: String,
    pub component: String,
    pub rule: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRow {
    pub name: String,
    pub iid: String,
    pub parent: Option<String>,
    /// Every slot in table order, inherited slots first.
    pub slots: Vec<String>,
    pub vtable_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogExport {
    pub entry_points: Vec<EntryRow>,
    pub interfaces: Vec<InterfaceRow>,
    /// Entry point count per component.
    pub components: BTreeMap<String, usize>,
    /// SHA-256 over the serialized entry points and interfaces.
    pub digest: String,
}

fn entry_row(entry: &EntryPoint) -> EntryRow {
    EntryRow {
        symbol: entry.symbol.to_string(),
        component: entry.component.as_str().to_string(),
        rule: entry.rule.as_str().to_string(),
    }
}

fn interface_row(registry: &Registry, entry: &InterfaceEntry) -> InterfaceRow {
    InterfaceRow {
        name: entry.name.to_string(),
        iid: entry.iid.to_string(),
        parent: entry.parent.map(str::to_string),
        slots: registry.slots(entry.name).into_iter().map(str::to_string).collect(),
        vtable_size: entry.vtable_size,
    }
}

impl CatalogExport {
    #[must_use]
    pub fn build() -> Self {
        Self::from_registry(registry())
    }

    #[must_use]
    pub fn from_registry(registry: &Registry) -> Self {
        let entry_points: Vec<EntryRow> = registry.entries().iter().map(entry_row).collect();
        let interfaces: Vec<InterfaceRow> = registry
            .interfaces()
            .iter()
            .map(|entry| interface_row(registry, entry))
            .collect();
        let components = [
            Component::Functions,
            Component::Shapes,
            Component::Interfaces,
            Component::Callback,
            Component::Diagnostics,
        ]
        .into_iter()
        .map(|c| (c.as_str().to_string(), registry.by_component(c).len()))
        .collect();
        let digest_input = serde_json::to_string(&(&entry_points, &interfaces)).unwrap_or_default();
        Self {
            digest: sha256_hex(digest_input.as_bytes()),
            entry_points,
            interfaces,
            components,
        }
    }

    #[must_use]
    pub fn entry(&self, symbol: &str) -> Option<&EntryRow> {
        self.entry_points.iter().find(|row| row.symbol == symbol)
    }

    #[must_use]
    pub fn interface(&self, name: &str) -> Option<&InterfaceRow> {
        self.interfaces.iter().find(|row| row.name == name)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
