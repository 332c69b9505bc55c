//! Resource Dispatch
//!
//! Maps resource type names and lifecycle operations to the typed handlers.
//! State crosses this boundary as JSON and is validated into the handler's
//! attribute struct before any request is made.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use super::{
    AssignSudoEntitlementResource, ProjectResource, Resource, ResourceData,
    SudoEntitlementResource,
};
use crate::asa::client::AsaClient;
use crate::asa::http::Transport;
use crate::error::{AsaError, Result};

/// Resource kinds served by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Project,
    SudoEntitlement,
    AssignSudoEntitlement,
}

impl ResourceKind {
    pub fn all() -> &'static [ResourceKind] {
        &[
            ResourceKind::Project,
            ResourceKind::SudoEntitlement,
            ResourceKind::AssignSudoEntitlement,
        ]
    }

    pub fn type_name(self) -> &'static str {
        match self {
            ResourceKind::Project => ProjectResource::TYPE_NAME,
            ResourceKind::SudoEntitlement => SudoEntitlementResource::TYPE_NAME,
            ResourceKind::AssignSudoEntitlement => AssignSudoEntitlementResource::TYPE_NAME,
        }
    }

    /// Look up a kind by type name; the `oktaasa_` prefix is optional
    pub fn from_type_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::all().iter().copied().find(|kind| {
            let full = kind.type_name();
            full == name || full.strip_prefix("oktaasa_") == Some(name)
        })
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for ResourceKind {
    type Err = AsaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_type_name(s)
            .ok_or_else(|| AsaError::Validation(format!("unknown resource type: {s}")))
    }
}

/// Lifecycle operation requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
}

/// Run one operation against a resource kind
///
/// `state` is the flat JSON state (`id` plus attributes). The returned value
/// is the state after the operation; an empty `id` means the resource does
/// not exist remotely. For [`Operation::Import`] only `id` is read from
/// `state`.
pub async fn dispatch<T: Transport>(
    client: &AsaClient<T>,
    kind: ResourceKind,
    operation: Operation,
    state: Value,
) -> Result<Value> {
    tracing::info!("dispatch: resource={}, operation={:?}", kind, operation);

    match kind {
        ResourceKind::Project => run(&ProjectResource, client, operation, state).await,
        ResourceKind::SudoEntitlement => {
            run(&SudoEntitlementResource, client, operation, state).await
        }
        ResourceKind::AssignSudoEntitlement => {
            run(&AssignSudoEntitlementResource, client, operation, state).await
        }
    }
}

async fn run<R: Resource, T: Transport>(
    resource: &R,
    client: &AsaClient<T>,
    operation: Operation,
    state: Value,
) -> Result<Value> {
    let mut data: ResourceData<R::Attrs> = serde_json::from_value(state)
        .map_err(|e| AsaError::Validation(format!("invalid {} state: {e}", R::TYPE_NAME)))?;

    match operation {
        Operation::Create => resource.create(client, &mut data).await?,
        Operation::Read => resource.read(client, &mut data).await?,
        Operation::Update => resource.update(client, &mut data).await?,
        Operation::Delete => {
            resource.delete(client, &data).await?;
            data.clear_id();
        }
        Operation::Import => {
            if !data.exists() {
                return Err(AsaError::Validation(format!(
                    "import of {} needs an id",
                    R::TYPE_NAME
                )));
            }
            let id = std::mem::take(&mut data.id);
            data = resource.import(client, &id).await?;
        }
    }

    serde_json::to_value(&data).map_err(|e| AsaError::decode(format!("{} state", R::TYPE_NAME), e))
}
