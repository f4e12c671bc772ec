//! # agency-topology
//!
//! Structured view of a sharded cluster's *target* topology, kept in a
//! hierarchical key-value coordination store (the agency):
//! - primary data servers and their standby secondaries
//! - coordinator membership
//! - logical databases
//!
//! ## Layout
//!
//! ```text
//! Target/
//! ├── DBServers/<primary>      "<secondary>" | "none"
//! ├── Coordinators/<name>      any marker value
//! └── Databases/<name>
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use agency_topology::{Communication, HttpAgency, Config};
//!
//! # async fn run() -> agency_topology::Result<()> {
//! let config = Config::load(None)?;
//! let comm = Communication::from_config(HttpAgency::new(&config.agency)?, &config.agency);
//!
//! let servers = comm.target().db_servers();
//! servers.add_pair("pavel", "sandro").await?;
//! servers.remove_server("pavel").await?; // sandro is promoted
//!
//! let coordinators = comm.target().coordinators().get_list().await?;
//! # let _ = coordinators;
//! # Ok(())
//! # }
//! ```
//!
//! ### CLI
//! ```bash
//! agency-topo --agency http://localhost:4001 servers list
//! agency-topo servers add-pair pavel sandro
//! agency-topo servers remove pavel
//! agency-topo coordinators add cindy
//! agency-topo databases list
//! ```

pub mod agency;
pub mod common;
pub mod communication;
pub mod target;

// Re-export commonly used types
pub use agency::{AgencyClient, AgencyPaths, HttpAgency, MemAgency};
pub use common::{Config, Error, Result};
pub use communication::Communication;
pub use target::{Removal, ServerEntry, WriteMode};
