//! Composition root binding one agency client to the topology views

use crate::agency::{AgencyClient, AgencyPaths};
use crate::common::config::AgencyConfig;
use crate::target::{Target, WriteMode};

/// Entry point for reading and changing the target topology.
///
/// Holds the agency client for its whole lifetime. The accessors only
/// build views; all agency I/O happens in the views' methods.
pub struct Communication<A> {
    agency: A,
    paths: AgencyPaths,
    mode: WriteMode,
}

impl<A: AgencyClient> Communication<A> {
    pub fn new(agency: A) -> Self {
        Self {
            agency,
            paths: AgencyPaths::default(),
            mode: WriteMode::default(),
        }
    }

    pub fn from_config(agency: A, config: &AgencyConfig) -> Self {
        Self::new(agency)
            .with_paths(AgencyPaths::new(config.root.as_str()))
            .with_write_mode(config.write_mode())
    }

    pub fn with_paths(mut self, paths: AgencyPaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn target(&self) -> Target<'_, A> {
        Target::new(&self.agency, &self.paths, self.mode)
    }

    pub fn agency(&self) -> &A {
        &self.agency
    }

    pub fn paths(&self) -> &AgencyPaths {
        &self.paths
    }

    pub fn write_mode(&self) -> WriteMode {
        self.mode
    }
}
