// src/work.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// A ticket in the external work tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Item {
    pub fn unresolved(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: String::new(),
            state: None,
            url: None,
        }
    }
}

/// Resolves work item identifiers into full records.
///
/// Implementations may leave out identifiers they do not know about.
pub trait ItemServer: Send + Sync {
    fn items(&self, ids: &[String]) -> Result<Vec<Item>>;
}

impl<T: ItemServer + ?Sized> ItemServer for Box<T> {
    fn items(&self, ids: &[String]) -> Result<Vec<Item>> {
        (**self).items(ids)
    }
}

/// Looks up `ids`, skipping the backend entirely when there is nothing to ask for.
pub fn resolve_items<S: ItemServer + ?Sized>(server: &S, ids: &[String]) -> Result<Vec<Item>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    server.items(ids)
}

/// Item tracker backed by a JSON array of items on disk
#[derive(Debug, Default)]
pub struct ItemCatalog {
    items: HashMap<String, Item>,
}

impl ItemCatalog {
    pub fn new(items: impl IntoIterator<Item = Item>) -> Self {
        Self {
            items: items.into_iter().map(|i| (i.id.clone(), i)).collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read item catalog {:?}", path))?;
        let items: Vec<Item> = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse item catalog {:?}", path))?;
        debug!("Loaded {} work items from {:?}", items.len(), path);
        Ok(Self::new(items))
    }
}

impl ItemServer for ItemCatalog {
    fn items(&self, ids: &[String]) -> Result<Vec<Item>> {
        Ok(ids.iter().filter_map(|id| self.items.get(id).cloned()).collect())
    }
}

/// Fallback used when no tracker is configured: every id comes back bare.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnresolvedItems;

impl ItemServer for UnresolvedItems {
    fn items(&self, ids: &[String]) -> Result<Vec<Item>> {
        Ok(ids.iter().map(|id| Item::unresolved(id)).collect())
    }
}
