//! Agency access layer
//!
//! The agency is the cluster's hierarchical key-value coordination store.
//! This module defines the minimal contract the topology views consume
//! ([`AgencyClient`]) and ships two implementations:
//! - [`MemAgency`]: in-process store, used for tests and embedding
//! - [`HttpAgency`]: client for an etcd-v2-style `/v2/keys` REST endpoint

pub mod client;
pub mod http;
pub mod mem;
pub mod paths;

pub use client::{AgencyClient, Snapshot};
pub use http::HttpAgency;
pub use mem::MemAgency;
pub use paths::AgencyPaths;
