//! Resource handlers
//!
//! Each ASA resource kind gets a handler implementing [`Resource`]: the
//! create/read/update/delete/import hooks a reconciliation engine calls
//! after it has diffed configuration against state. Handlers only map local
//! state to requests and responses back to local state; they never diff.
//!
//! # Architecture
//!
//! - [`project`] - ASA projects, identified by name
//! - [`sudo_entitlement`] - Sudo entitlements, identified by a server id
//! - [`assign_sudo_entitlement`] - Entitlement assignments to a project group
//! - [`soft_delete`] - Detects records that are deleted but still returned
//! - [`dispatch`] - Runs an operation by resource type name over JSON state
//!
//! # Example
//!
//! ```ignore
//! use asa_provider::resource::{project::{ProjectAttrs, ProjectResource}, Resource, ResourceData};
//!
//! async fn create_web(client: &AsaClient) -> asa_provider::Result<()> {
//!     let mut data = ResourceData::new(ProjectAttrs {
//!         project_name: "web".to_string(),
//!         ..Default::default()
//!     });
//!     ProjectResource.create(client, &mut data).await?;
//!     assert_eq!(data.id, "web");
//!     Ok(())
//! }
//! ```

pub mod assign_sudo_entitlement;
pub mod dispatch;
pub mod project;
pub mod soft_delete;
pub mod sudo_entitlement;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::asa::client::AsaClient;
use crate::asa::http::Transport;
use crate::error::{AsaError, Result};

pub use assign_sudo_entitlement::AssignSudoEntitlementResource;
pub use dispatch::{dispatch, Operation, ResourceKind};
pub use project::ProjectResource;
pub use sudo_entitlement::SudoEntitlementResource;

/// Local state of one resource: its remote identity plus typed attributes
///
/// An empty `id` means the resource does not exist remotely, and the caller
/// should schedule it for creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceData<A> {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub attrs: A,
}

impl<A: Default> ResourceData<A> {
    pub fn new(attrs: A) -> Self {
        Self {
            id: String::new(),
            attrs,
        }
    }

    pub fn with_id(id: &str) -> Self {
        Self {
            id: id.to_string(),
            attrs: A::default(),
        }
    }
}

impl<A> ResourceData<A> {
    pub fn exists(&self) -> bool {
        !self.id.is_empty()
    }

    /// Mark the resource as gone remotely
    pub fn clear_id(&mut self) {
        self.id.clear();
    }
}

/// Lifecycle hooks of one resource kind
#[allow(async_fn_in_trait)]
pub trait Resource {
    type Attrs: Default + Clone + Serialize + DeserializeOwned;

    /// Type name used in configuration (`oktaasa_project`, ...)
    const TYPE_NAME: &'static str;

    async fn create<T: Transport>(
        &self,
        client: &AsaClient<T>,
        data: &mut ResourceData<Self::Attrs>,
    ) -> Result<()>;

    async fn read<T: Transport>(
        &self,
        client: &AsaClient<T>,
        data: &mut ResourceData<Self::Attrs>,
    ) -> Result<()>;

    async fn update<T: Transport>(
        &self,
        client: &AsaClient<T>,
        data: &mut ResourceData<Self::Attrs>,
    ) -> Result<()>;

    async fn delete<T: Transport>(
        &self,
        client: &AsaClient<T>,
        data: &ResourceData<Self::Attrs>,
    ) -> Result<()>;

    /// Adopt an existing remote resource by id
    async fn import<T: Transport>(
        &self,
        client: &AsaClient<T>,
        id: &str,
    ) -> Result<ResourceData<Self::Attrs>> {
        let mut data = ResourceData::with_id(id);
        self.read(client, &mut data).await?;
        if !data.exists() {
            return Err(AsaError::NotFound(format!("{} with id {}", Self::TYPE_NAME, id)));
        }
        Ok(data)
    }
}

/// Treat an explicit JSON `null` like a missing field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn is_zero(value: &u32) -> bool {
    *value == 0
}
