//! Sudo Entitlement Assignments
//!
//! Links a sudo entitlement to a project group. The API has no endpoint for
//! a single assignment: reads fetch every assignment of the project group
//! and scan for the entitlement. Assignments cannot be updated in place.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{null_as_default, Resource, ResourceData};
use crate::asa::client::{path_segment, AsaClient};
use crate::asa::http::{sanitize_for_log, Transport};
use crate::error::{AsaError, Result};

/// Assignment attributes as configured
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignSudoEntitlementAttrs {
    pub project_name: String,
    pub group_name: String,
    pub sudo_entitlement_id: String,
    /// Evaluation priority; 0 leaves the order to the server
    pub order: u32,
}

/// Assignment payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedSudoEntitlement {
    pub sudo_id: String,
    pub order: u32,
}

/// One entry of the project group's assignment list
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AssignmentEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sudo_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sudo_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub project_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub group_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub order: u32,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl AssignmentEntry {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub list: Vec<AssignmentEntry>,
}

/// `null` and `""` both mean "not set"
fn optional_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
    }
}

/// Resource id of an assignment: `project/group/sudo_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentId {
    pub project_name: String,
    pub group_name: String,
    pub sudo_id: String,
}

impl AssignmentId {
    /// Split an id into its three segments
    pub fn parse(id: &str) -> Result<Self> {
        let parts: Vec<&str> = id.split('/').collect();
        match parts.as_slice() {
            [project, group, sudo_id]
                if !project.is_empty() && !group.is_empty() && !sudo_id.is_empty() =>
            {
                Ok(Self {
                    project_name: project.to_string(),
                    group_name: group.to_string(),
                    sudo_id: sudo_id.to_string(),
                })
            }
            _ => Err(AsaError::Validation(format!(
                "assignment id {id:?} is not of the form project/group/sudo_id"
            ))),
        }
    }
}

impl fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.project_name, self.group_name, self.sudo_id)
    }
}

/// Create succeeds on any status up to 204
///
/// Kept equivalent to the API owner's `-200 < status <= 204` check, which
/// for unsigned HTTP statuses is a plain upper bound. Informational statuses
/// are therefore accepted as well.
pub fn is_assignment_created(status: u16) -> bool {
    status <= 204
}

fn assignments_path(project: &str, group: &str) -> String {
    format!(
        "/projects/{}/groups/{}/entitlements/sudo",
        path_segment(project),
        path_segment(group)
    )
}

/// Handler for `oktaasa_assign_sudo_entitlement`
#[derive(Debug, Clone, Copy, Default)]
pub struct AssignSudoEntitlementResource;

impl Resource for AssignSudoEntitlementResource {
    type Attrs = AssignSudoEntitlementAttrs;

    const TYPE_NAME: &'static str = "oktaasa_assign_sudo_entitlement";

    async fn create<T: Transport>(
        &self,
        client: &AsaClient<T>,
        data: &mut ResourceData<AssignSudoEntitlementAttrs>,
    ) -> Result<()> {
        let attrs = &data.attrs;
        if attrs.project_name.is_empty()
            || attrs.group_name.is_empty()
            || attrs.sudo_entitlement_id.is_empty()
        {
            return Err(AsaError::Validation(
                "project_name, group_name and sudo_entitlement_id must not be empty".to_string(),
            ));
        }

        let assignment = AssignedSudoEntitlement {
            sudo_id: attrs.sudo_entitlement_id.clone(),
            order: attrs.order,
        };
        let path = assignments_path(&attrs.project_name, &attrs.group_name);
        tracing::debug!("Assigning sudo entitlement {} via {}", assignment.sudo_id, path);

        let response = client.post(&path, &assignment).await?;
        tracing::debug!(
            "Assigned sudo entitlement, status {}, response: {}",
            response.status,
            sanitize_for_log(&response.body)
        );

        if !is_assignment_created(response.status) {
            return Err(AsaError::remote(
                format!("assign sudo entitlement {}", assignment.sudo_id),
                response.status,
                &response.body,
            ));
        }

        data.id = AssignmentId {
            project_name: attrs.project_name.clone(),
            group_name: attrs.group_name.clone(),
            sudo_id: assignment.sudo_id,
        }
        .to_string();

        Ok(())
    }

    async fn read<T: Transport>(
        &self,
        client: &AsaClient<T>,
        data: &mut ResourceData<AssignSudoEntitlementAttrs>,
    ) -> Result<()> {
        if !data.exists() {
            return Ok(());
        }

        let sudo_id = match data.id.split('/').nth(2) {
            Some(sudo_id) => sudo_id.to_string(),
            None => {
                return Err(AsaError::Validation(format!(
                    "assignment id {:?} is not of the form project/group/sudo_id",
                    data.id
                )))
            }
        };

        // State that only carries the id still locates its project group
        if data.attrs.project_name.is_empty() || data.attrs.group_name.is_empty() {
            let parsed = AssignmentId::parse(&data.id)?;
            data.attrs.project_name = parsed.project_name;
            data.attrs.group_name = parsed.group_name;
        }

        let path = format!(
            "{}/",
            assignments_path(&data.attrs.project_name, &data.attrs.group_name)
        );
        tracing::debug!("Fetching all sudo entitlement assignments from {}", path);
        let response = client.get(&path).await?;

        let assignments: AssignmentList = match response.status {
            200 => response.json("sudo entitlement assignments")?,
            404 => {
                tracing::debug!(
                    "No sudo entitlement assignments in {}/{}",
                    data.attrs.project_name,
                    data.attrs.group_name
                );
                data.clear_id();
                return Ok(());
            }
            status => {
                return Err(AsaError::remote(
                    format!(
                        "list sudo entitlement assignments of {}/{}",
                        data.attrs.project_name, data.attrs.group_name
                    ),
                    status,
                    &response.body,
                ))
            }
        };

        // Re-assigning leaves deleted entries for the same entitlement behind
        for entry in assignments.list.iter().filter(|e| e.sudo_id == sudo_id) {
            if entry.is_deleted() {
                tracing::debug!("Assignment of {} found, but it was deleted {:?}", sudo_id, entry.deleted_at);
                continue;
            }

            data.attrs.sudo_entitlement_id = entry.sudo_id.clone();
            if data.attrs.order == 0 {
                data.attrs.order = entry.order;
            }
            return Ok(());
        }

        data.clear_id();
        Ok(())
    }

    /// Assignments have no update verb; changes go through delete and create
    async fn update<T: Transport>(
        &self,
        _client: &AsaClient<T>,
        _data: &mut ResourceData<AssignSudoEntitlementAttrs>,
    ) -> Result<()> {
        Ok(())
    }

    async fn delete<T: Transport>(
        &self,
        client: &AsaClient<T>,
        data: &ResourceData<AssignSudoEntitlementAttrs>,
    ) -> Result<()> {
        // TODO: confirm with the API owner whether this should target the
        // project group path; the composite id is sent as is for now.
        let path = format!("/entitlements/sudo/{}", data.id);
        let response = client.delete(&path).await?;

        if response.status < 300 || response.status == 404 {
            tracing::info!("Sudo entitlement assignment {} was successfully deleted", data.id);
            Ok(())
        } else {
            Err(AsaError::remote(
                format!("delete sudo entitlement assignment {}", data.id),
                response.status,
                &response.body,
            ))
        }
    }

    async fn import<T: Transport>(
        &self,
        client: &AsaClient<T>,
        id: &str,
    ) -> Result<ResourceData<AssignSudoEntitlementAttrs>> {
        let parsed = AssignmentId::parse(id)?;
        let mut data = ResourceData {
            id: id.to_string(),
            attrs: AssignSudoEntitlementAttrs {
                project_name: parsed.project_name,
                group_name: parsed.group_name,
                sudo_entitlement_id: parsed.sudo_id,
                order: 0,
            },
        };

        self.read(client, &mut data).await?;
        if !data.exists() {
            return Err(AsaError::NotFound(format!("{} with id {}", Self::TYPE_NAME, id)));
        }
        Ok(data)
    }
}
