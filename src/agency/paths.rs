//! Key namespace of the target topology
//!
//! ```text
//! <root>/DBServers/<primary>     value: secondary name, or "none"
//! <root>/Coordinators/<name>     presence marks an active coordinator
//! <root>/Databases/<name>        one child per logical database
//! ```

use crate::common::utils::join_path;

/// Default root of the target topology.
pub const TARGET_ROOT: &str = "Target";

const DB_SERVERS: &str = "DBServers";
const COORDINATORS: &str = "Coordinators";
const DATABASES: &str = "Databases";

/// Builds agency paths under a configurable root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgencyPaths {
    root: String,
}

impl AgencyPaths {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into().trim_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn db_servers(&self) -> String {
        join_path(&[&self.root, DB_SERVERS])
    }

    pub fn db_server(&self, name: &str) -> String {
        join_path(&[&self.root, DB_SERVERS, name])
    }

    pub fn coordinators(&self) -> String {
        join_path(&[&self.root, COORDINATORS])
    }

    pub fn coordinator(&self, name: &str) -> String {
        join_path(&[&self.root, COORDINATORS, name])
    }

    pub fn databases(&self) -> String {
        join_path(&[&self.root, DATABASES])
    }
}

impl Default for AgencyPaths {
    fn default() -> Self {
        Self::new(TARGET_ROOT)
    }
}
