//! Common utilities and types shared across agency-topology

pub mod config;
pub mod error;
pub mod utils;

pub use config::{AgencyConfig, Config};
pub use error::{Error, Result};
pub use utils::{child_name, encode_path, join_path, last_segment, validate_name};
