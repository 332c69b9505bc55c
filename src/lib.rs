//! Resource handlers for the ASA access-management API
//!
//! Translates declarative resource configuration for projects, sudo
//! entitlements and sudo entitlement assignments into ASA REST calls.

pub mod asa;
pub mod config;
pub mod error;
pub mod resource;

pub use error::{AsaError, Result};

/// Version injected at compile time via ASA_PROVIDER_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("ASA_PROVIDER_VERSION") {
    Some(v) => v,
    None => "dev",
};
