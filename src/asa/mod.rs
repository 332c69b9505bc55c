//! ASA API interaction module
//!
//! This module provides the plumbing for talking to the ASA REST API:
//! authentication, the HTTP transport and the team-scoped client handed
//! to every resource handler.
//!
//! # Module Structure
//!
//! - [`auth`] - Bearer tokens, static or exchanged from a service user key
//! - [`client`] - Team-scoped client used by the resource handlers
//! - [`http`] - Transport trait and its reqwest implementation
//!
//! # Example
//!
//! ```ignore
//! use asa_provider::asa::{auth::AsaCredentials, client::AsaClient};
//!
//! async fn example() -> asa_provider::Result<()> {
//!     let credentials = AsaCredentials::service_user("key-id", "key-secret");
//!     let client = AsaClient::new("my-team", credentials, "https://app.scaleft.com/v1")?;
//!     let response = client.get("/projects/web").await?;
//!     println!("{}", response.status);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;

#[cfg(test)]
pub(crate) mod testing;
