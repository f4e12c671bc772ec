//! Primary/secondary pairing registry
//!
//! Mutations keep the pairing one-to-one:
//! - removing a paired primary promotes its secondary (write, then delete)
//! - removing a secondary demotes its primary back to unpaired
//!
//! Multi-step changes are not atomic. When a later step fails the earlier
//! ones stay applied and the caller gets [`Error::PartiallyApplied`];
//! [`TargetDbServers::audit`] finds what such failures leave behind.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::agency::{AgencyClient, AgencyPaths};
use crate::common::utils::validate_name;
use crate::common::{Error, Result};
use crate::target::topology::{Inconsistency, ServerEntry, Topology, NO_SECONDARY};
use crate::target::WriteMode;

/// What `remove_server` did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Removal {
    /// An unpaired primary was deleted.
    PrimaryRemoved,
    /// A paired primary was deleted and its secondary took over.
    SecondaryPromoted { secondary: String },
    /// A secondary was detached; its primaries are unpaired now.
    ///
    /// Holds one primary unless several claimed the same secondary.
    SecondaryRemoved { primaries: Vec<String> },
    /// The name is neither a primary nor a secondary. Nothing was written.
    NotFound,
}

impl Removal {
    pub fn is_applied(&self) -> bool {
        !matches!(self, Removal::NotFound)
    }
}

pub struct TargetDbServers<'a, A> {
    agency: &'a A,
    paths: &'a AgencyPaths,
    mode: WriteMode,
}

impl<'a, A: AgencyClient> TargetDbServers<'a, A> {
    pub fn new(agency: &'a A, paths: &'a AgencyPaths, mode: WriteMode) -> Self {
        Self {
            agency,
            paths,
            mode,
        }
    }

    /// Current pairing state, read fresh from the agency.
    pub async fn topology(&self) -> Result<Topology> {
        let prefix = self.paths.db_servers();
        let snapshot = self.agency.get(&prefix, true).await?;
        Topology::from_snapshot(&prefix, &snapshot)
    }

    /// Role descriptor for every server.
    pub async fn get_list(&self) -> Result<BTreeMap<String, ServerEntry>> {
        Ok(self.topology().await?.entries())
    }

    /// Pairing problems in the stored state.
    pub async fn audit(&self) -> Result<Vec<Inconsistency>> {
        let findings = self.topology().await?.audit();
        for finding in &findings {
            tracing::warn!("topology inconsistency: {:?}", finding);
        }
        Ok(findings)
    }

    /// Register an unpaired primary.
    pub async fn add_primary(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        self.set(name, Value::String(NO_SECONDARY.to_string()))
            .await?;
        tracing::info!("primary {} added", name);
        Ok(())
    }

    /// Pair `secondary` with `primary`, replacing any previous secondary.
    ///
    /// `primary` is not checked for existence; the key is written either way.
    pub async fn add_secondary(&self, secondary: &str, primary: &str) -> Result<()> {
        validate_pair(primary, secondary)?;
        self.set(primary, Value::String(secondary.to_string()))
            .await?;
        tracing::info!("secondary {} paired with primary {}", secondary, primary);
        Ok(())
    }

    /// Create a primary together with its secondary in one write.
    pub async fn add_pair(&self, primary: &str, secondary: &str) -> Result<()> {
        validate_pair(primary, secondary)?;
        self.set(primary, Value::String(secondary.to_string()))
            .await?;
        tracing::info!("pair {}/{} added", primary, secondary);
        Ok(())
    }

    /// Remove a server, keeping its partner in the topology.
    pub async fn remove_server(&self, name: &str) -> Result<Removal> {
        validate_name(name)?;
        let topo = self.topology().await?;

        let Some(entry) = topo.role_of(name) else {
            tracing::info!("server {} is not part of the target topology", name);
            return Ok(Removal::NotFound);
        };

        match entry {
            ServerEntry::Primary {
                secondary: Some(secondary),
            } => {
                // Promote first so the secondary always has an identity.
                self.write(
                    &secondary,
                    topo.stored_value(&secondary),
                    Value::String(NO_SECONDARY.to_string()),
                )
                .await?;

                if let Err(e) = self.delete(name, topo.stored_value(name)).await {
                    tracing::warn!(
                        "promoted {} but failed to delete primary {}: {}",
                        secondary,
                        name,
                        e
                    );
                    return Err(Error::PartiallyApplied {
                        applied: format!("promote {}", self.paths.db_server(&secondary)),
                        failed: Box::new(e),
                    });
                }

                tracing::info!("primary {} removed, {} promoted", name, secondary);
                Ok(Removal::SecondaryPromoted { secondary })
            }
            ServerEntry::Primary { secondary: None } => {
                self.delete(name, topo.stored_value(name)).await?;
                tracing::info!("primary {} removed", name);
                Ok(Removal::PrimaryRemoved)
            }
            ServerEntry::Secondary { .. } => {
                // Detach from every claimant so the name leaves the topology.
                let primaries = topo.primaries_of(name).to_vec();
                for (i, primary) in primaries.iter().enumerate() {
                    let result = self
                        .write(
                            primary,
                            Some(Value::String(name.to_string())),
                            Value::String(NO_SECONDARY.to_string()),
                        )
                        .await;
                    if let Err(e) = result {
                        if i == 0 {
                            return Err(e);
                        }
                        tracing::warn!(
                            "detached {} from {:?} but failed on {}: {}",
                            name,
                            &primaries[..i],
                            primary,
                            e
                        );
                        return Err(Error::PartiallyApplied {
                            applied: format!("detach {} from {}", name, primaries[..i].join(", ")),
                            failed: Box::new(e),
                        });
                    }
                }
                tracing::info!("secondary {} detached from {}", name, primaries.join(", "));
                Ok(Removal::SecondaryRemoved { primaries })
            }
        }
    }

    /// Unconditional write of a server key.
    async fn set(&self, server: &str, value: Value) -> Result<()> {
        let path = self.paths.db_server(server);
        if !self.agency.set(&path, value).await? {
            return Err(Error::WriteRejected(path));
        }
        Ok(())
    }

    /// Write honouring the configured [`WriteMode`].
    async fn write(&self, server: &str, expected: Option<Value>, value: Value) -> Result<()> {
        let path = self.paths.db_server(server);
        let applied = match self.mode {
            WriteMode::Plain => self.agency.set(&path, value).await?,
            WriteMode::Guarded => {
                self.agency
                    .compare_and_swap(&path, expected, Some(value))
                    .await?
            }
        };
        self.check(applied, path)
    }

    /// Delete honouring the configured [`WriteMode`].
    async fn delete(&self, server: &str, expected: Option<Value>) -> Result<()> {
        let path = self.paths.db_server(server);
        let applied = match self.mode {
            WriteMode::Plain => self.agency.remove(&path).await?,
            WriteMode::Guarded => self.agency.compare_and_swap(&path, expected, None).await?,
        };
        self.check(applied, path)
    }

    fn check(&self, applied: bool, path: String) -> Result<()> {
        match (applied, self.mode) {
            (true, _) => Ok(()),
            (false, WriteMode::Plain) => Err(Error::WriteRejected(path)),
            (false, WriteMode::Guarded) => Err(Error::Conflict(path)),
        }
    }
}

fn validate_pair(primary: &str, secondary: &str) -> Result<()> {
    validate_name(primary)?;
    validate_name(secondary)?;
    if secondary == NO_SECONDARY {
        return Err(Error::InvalidName(secondary.to_string()));
    }
    if primary == secondary {
        return Err(Error::InvalidRequest(format!(
            "{} cannot be its own secondary",
            primary
        )));
    }
    Ok(())
}
