//! Structured primary/secondary view over the flat DBServers key space
//!
//! Physical layout: one key per primary, value = secondary name or the
//! sentinel `"none"`. A server is a secondary iff its name appears as some
//! key's value; every other key names a primary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agency::Snapshot;
use crate::common::utils::child_name;
use crate::common::{Error, Result};

/// Value stored for a primary without a secondary.
pub const NO_SECONDARY: &str = "none";

/// Role of one data server in the target topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ServerEntry {
    Primary {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        secondary: Option<String>,
    },
    Secondary {
        primary: String,
    },
}

impl ServerEntry {
    pub fn is_primary(&self) -> bool {
        matches!(self, ServerEntry::Primary { .. })
    }

    pub fn is_secondary(&self) -> bool {
        matches!(self, ServerEntry::Secondary { .. })
    }

    /// The other half of the pair, if any.
    pub fn paired_with(&self) -> Option<&str> {
        match self {
            ServerEntry::Primary { secondary } => secondary.as_deref(),
            ServerEntry::Secondary { primary } => Some(primary),
        }
    }

    /// Secondary of a primary; always `None` for a secondary.
    pub fn secondary(&self) -> Option<&str> {
        match self {
            ServerEntry::Primary { secondary } => secondary.as_deref(),
            ServerEntry::Secondary { .. } => None,
        }
    }
}

/// Something in the stored pairing that breaks the one-to-one invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inconsistency {
    /// Several primaries claim the same secondary.
    SecondaryOfSeveralPrimaries {
        secondary: String,
        primaries: Vec<String>,
    },
    /// A name is both a primary key and another primary's secondary.
    /// Typically left behind by a removal whose delete step failed.
    SecondaryAlsoPrimary { server: String, primary: String },
    /// A primary names itself as its secondary.
    SelfPaired { server: String },
}

/// Both directions of the pairing, computed in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    primaries: BTreeMap<String, Option<String>>,
    secondaries: BTreeMap<String, String>,
    claims: BTreeMap<String, Vec<String>>,
}

impl Topology {
    /// Derive the topology from the raw keys below `prefix`.
    ///
    /// Keys outside `prefix` or nested deeper than one level are ignored.
    /// A value that is not a string is reported as corruption.
    pub fn from_snapshot(prefix: &str, snapshot: &Snapshot) -> Result<Self> {
        let mut topo = Topology::default();

        for (key, value) in snapshot {
            let Some(primary) = child_name(prefix, key) else {
                continue;
            };
            let secondary = match value {
                Value::String(s) if s == NO_SECONDARY => None,
                Value::String(s) => Some(s.clone()),
                other => {
                    return Err(Error::Corrupted(format!(
                        "{} holds {} instead of a server name",
                        key, other
                    )))
                }
            };

            if let Some(sec) = &secondary {
                topo.claims
                    .entry(sec.clone())
                    .or_default()
                    .push(primary.to_string());
                topo.secondaries
                    .entry(sec.clone())
                    .or_insert_with(|| primary.to_string());
            }
            topo.primaries.insert(primary.to_string(), secondary);
        }

        Ok(topo)
    }

    /// Role descriptor for every known server.
    pub fn entries(&self) -> BTreeMap<String, ServerEntry> {
        let mut out = BTreeMap::new();
        for (name, secondary) in &self.primaries {
            if self.secondaries.contains_key(name) {
                continue;
            }
            out.insert(
                name.clone(),
                ServerEntry::Primary {
                    secondary: secondary.clone(),
                },
            );
        }
        for (name, primary) in &self.secondaries {
            out.insert(
                name.clone(),
                ServerEntry::Secondary {
                    primary: primary.clone(),
                },
            );
        }
        out
    }

    /// Role of a single server, following the same rules as [`entries`].
    ///
    /// [`entries`]: Topology::entries
    pub fn role_of(&self, name: &str) -> Option<ServerEntry> {
        if let Some(primary) = self.secondaries.get(name) {
            return Some(ServerEntry::Secondary {
                primary: primary.clone(),
            });
        }
        self.primaries
            .get(name)
            .map(|secondary| ServerEntry::Primary {
                secondary: secondary.clone(),
            })
    }

    /// Every primary whose key names `secondary`, in key order.
    ///
    /// More than one entry only when the stored pairing is inconsistent.
    pub fn primaries_of(&self, secondary: &str) -> &[String] {
        self.claims
            .get(secondary)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Raw value stored under `primary`'s key, if that key exists.
    pub fn stored_value(&self, primary: &str) -> Option<Value> {
        self.primaries.get(primary).map(|secondary| {
            Value::String(
                secondary
                    .clone()
                    .unwrap_or_else(|| NO_SECONDARY.to_string()),
            )
        })
    }

    pub fn is_empty(&self) -> bool {
        self.primaries.is_empty()
    }

    /// Pairing problems present in the stored state.
    pub fn audit(&self) -> Vec<Inconsistency> {
        let mut found = Vec::new();

        for (secondary, primaries) in &self.claims {
            if primaries.len() > 1 {
                found.push(Inconsistency::SecondaryOfSeveralPrimaries {
                    secondary: secondary.clone(),
                    primaries: primaries.clone(),
                });
            }
        }
        for (name, secondary) in &self.primaries {
            if secondary.as_deref() == Some(name.as_str()) {
                found.push(Inconsistency::SelfPaired {
                    server: name.clone(),
                });
            } else if let Some(primary) = self.secondaries.get(name) {
                found.push(Inconsistency::SecondaryAlsoPrimary {
                    server: name.clone(),
                    primary: primary.clone(),
                });
            }
        }

        found
    }
}
