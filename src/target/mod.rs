//! Target topology: the desired role assignment of the cluster
//!
//! Every view re-reads the agency on each query; nothing is cached between
//! calls. Mutations are sequences of single-key agency operations, awaited
//! one after the other.

pub mod coordinators;
pub mod databases;
pub mod dbservers;
pub mod topology;

pub use coordinators::TargetCoordinators;
pub use databases::TargetDatabases;
pub use dbservers::{Removal, TargetDbServers};
pub use topology::{Inconsistency, ServerEntry, Topology, NO_SECONDARY};

use crate::agency::{AgencyClient, AgencyPaths};

/// How multi-step pairing changes reach the agency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Unconditional `set` / `remove`.
    #[default]
    Plain,
    /// `compare_and_swap` against the state the change was planned from.
    Guarded,
}

/// Accessor for the views under the target root.
pub struct Target<'a, A> {
    agency: &'a A,
    paths: &'a AgencyPaths,
    mode: WriteMode,
}

impl<'a, A: AgencyClient> Target<'a, A> {
    pub(crate) fn new(agency: &'a A, paths: &'a AgencyPaths, mode: WriteMode) -> Self {
        Self {
            agency,
            paths,
            mode,
        }
    }

    pub fn db_servers(&self) -> TargetDbServers<'a, A> {
        TargetDbServers::new(self.agency, self.paths, self.mode)
    }

    pub fn coordinators(&self) -> TargetCoordinators<'a, A> {
        TargetCoordinators::new(self.agency, self.paths)
    }

    pub fn databases(&self) -> TargetDatabases<'a, A> {
        TargetDatabases::new(self.agency, self.paths)
    }
}
