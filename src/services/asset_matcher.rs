//! Resolves a plan target descriptor to at most one held asset.
//!
//! Resolution order, first hit wins:
//! 1. explicit asset reference, compared as normalized id strings
//! 2. ticker against `asset.ticker`, then the same string against `asset.name`
//!    (labels typed into the ticker field)
//! 3. alias as a case-insensitive substring of the asset name, either direction
//!
//! Assets with a blank name never match by alias. The empty string is a
//! substring of every alias, so such an asset would otherwise claim whatever
//! alias target came first.
//!
//! A descriptor that resolves to nothing is not an error; callers report it
//! as unmatched.

use crate::models::{AllocationGroupItem, Asset, PlanAllocation};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetDescriptor {
    pub asset_ref: Option<String>,
    pub ticker: Option<String>,
    pub alias: Option<String>,
}

impl AssetDescriptor {
    pub fn new(asset_ref: Option<String>, ticker: Option<String>, alias: Option<String>) -> Self {
        Self {
            asset_ref: present(asset_ref),
            ticker: present(ticker),
            alias: present(alias),
        }
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<&PlanAllocation> for AssetDescriptor {
    fn from(allocation: &PlanAllocation) -> Self {
        Self::new(
            allocation.asset_id.map(|id| id.to_string()),
            allocation.ticker.clone(),
            allocation.alias.clone(),
        )
    }
}

impl From<&AllocationGroupItem> for AssetDescriptor {
    fn from(item: &AllocationGroupItem) -> Self {
        Self::new(item.asset_id.map(|id| id.to_string()), item.ticker.clone(), item.alias.clone())
    }
}

/// Identifiers from storage and from requests may differ in case or padding.
pub fn normalize_id(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

pub fn match_asset<'a>(descriptor: &AssetDescriptor, assets: &'a [Asset]) -> Option<&'a Asset> {
    if let Some(asset_ref) = &descriptor.asset_ref {
        let wanted = normalize_id(asset_ref);
        if let Some(asset) = assets.iter().find(|a| normalize_id(&a.id.to_string()) == wanted) {
            return Some(asset);
        }
    }

    if let Some(ticker) = &descriptor.ticker {
        let ticker = ticker.trim();
        if let Some(asset) = assets.iter().find(|a| a.ticker() == Some(ticker)) {
            return Some(asset);
        }
        if let Some(asset) = assets.iter().find(|a| a.name.trim() == ticker) {
            return Some(asset);
        }
    }

    if let Some(alias) = &descriptor.alias {
        let alias = alias.trim().to_lowercase();
        return assets.iter().find(|a| {
            let name = a.name.trim().to_lowercase();
            !name.is_empty() && (name.contains(&alias) || alias.contains(&name))
        });
    }

    None
}
