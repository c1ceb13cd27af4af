//! The addon manifest.
//!
//! The manifest is built once from operator input and never mutated in
//! place. Per-request variants are produced by cloning: every sequence field
//! is an owned `Vec`, so a clone shares nothing with its source, and `None`
//! stays `None` (an omitted key and `[]` mean different things to clients).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Describes the capabilities of the addon.
///
/// See <https://github.com/Stremio/stremio-addon-sdk/blob/master/docs/api/responses/manifest.md>.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,

    #[serde(rename = "resources", default, skip_serializing_if = "Option::is_none")]
    pub resource_items: Option<Vec<ResourceItem>>,

    /// Clients support "movie", "series", "channel" and "tv".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
    /// Clients expect this key; use `Some(vec![])` for an addon without catalogs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalogs: Option<Vec<CatalogItem>>,

    #[serde(rename = "idPrefixes", default, skip_serializing_if = "Option::is_none")]
    pub id_prefixes: Option<Vec<String>>,
    /// URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub behavior_hints: BehaviorHints,
}

impl Manifest {
    /// Reject manifests that lack any of the required scalar fields.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty()
            || self.name.is_empty()
            || self.description.is_empty()
            || self.version.is_empty()
        {
            return Err(Error::EmptyManifest);
        }
        Ok(())
    }

    /// The variant served at the user-data-bearing manifest URL.
    ///
    /// Clients only offer installation when `configurationRequired` is false.
    pub fn configured(&self) -> Manifest {
        let mut manifest = self.clone();
        manifest.behavior_hints.configuration_required = false;
        manifest
    }

    /// Whether requests without user data must be rejected.
    pub fn requires_configuration(&self) -> bool {
        self.behavior_hints.configuration_required
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,

    #[serde(rename = "idPrefixes", default, skip_serializing_if = "Option::is_none")]
    pub id_prefixes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorHints {
    #[serde(default, skip_serializing_if = "is_false")]
    pub adult: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub p2p: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub configurable: bool,
    /// True at "/manifest.json", but always false at "/{userData}/manifest.json",
    /// otherwise clients won't show the "Install" button.
    #[serde(default, skip_serializing_if = "is_false")]
    pub configuration_required: bool,
}

/// A catalog offered by the addon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Vec<ExtraItem>>,
}

/// An extra query parameter a catalog accepts (search, genre, skip, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraItem {
    pub name: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_limit: Option<u32>,
}

fn is_false(b: &bool) -> bool {
    !*b
}
