//! ASA Projects
//!
//! A project is identified by its name, which doubles as the resource id.

use serde::{Deserialize, Serialize};

use super::soft_delete::check_soft_delete;
use super::{is_zero, null_as_default, Resource, ResourceData};
use crate::asa::client::{path_segment, AsaClient};
use crate::asa::http::{sanitize_for_log, Transport};
use crate::error::{AsaError, Result};

/// Project attributes as configured
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectAttrs {
    pub project_name: String,
    /// 0 means the server picks and the local value is never refreshed
    pub next_unix_uid: u32,
    /// 0 means the server picks and the local value is never refreshed
    pub next_unix_gid: u32,
    pub create_server_users: bool,
    pub force_shared_ssh_users: bool,
    pub forward_traffic: bool,
    pub rdp_session_recording: bool,
    pub require_preauthorization: bool,
    pub shared_admin_user_name: String,
    pub shared_standard_user_name: String,
    pub ssh_session_recording: bool,
}

/// Project as sent to and returned by the API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    #[serde(default)]
    pub create_server_users: bool,
    #[serde(default)]
    pub force_shared_ssh_users: bool,
    #[serde(default)]
    pub forward_traffic: bool,
    #[serde(default, skip_serializing_if = "is_zero", deserialize_with = "null_as_default")]
    pub next_unix_uid: u32,
    #[serde(default, skip_serializing_if = "is_zero", deserialize_with = "null_as_default")]
    pub next_unix_gid: u32,
    #[serde(default)]
    pub rdp_session_recording: bool,
    #[serde(rename = "require_preauth_for_creds", default)]
    pub require_preauth: bool,
    #[serde(
        default,
        skip_serializing_if = "String::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub shared_admin_user_name: String,
    #[serde(
        default,
        skip_serializing_if = "String::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub shared_standard_user_name: String,
    #[serde(default)]
    pub ssh_session_recording: bool,
}

impl ProjectAttrs {
    /// Build the request payload, enforcing the shared user invariant
    pub fn to_project(&self) -> Result<Project> {
        if self.project_name.is_empty() {
            return Err(AsaError::Validation("project_name must not be empty".to_string()));
        }

        if self.force_shared_ssh_users
            && (self.shared_standard_user_name.is_empty() || self.shared_admin_user_name.is_empty())
        {
            return Err(AsaError::Validation(
                "shared_standard_user_name and shared_admin_user_name must be provided if force_shared_ssh_users is true"
                    .to_string(),
            ));
        }

        Ok(Project {
            name: self.project_name.clone(),
            deleted_at: None,
            create_server_users: self.create_server_users,
            force_shared_ssh_users: self.force_shared_ssh_users,
            forward_traffic: self.forward_traffic,
            next_unix_uid: self.next_unix_uid,
            next_unix_gid: self.next_unix_gid,
            rdp_session_recording: self.rdp_session_recording,
            require_preauth: self.require_preauthorization,
            shared_admin_user_name: self.shared_admin_user_name.clone(),
            shared_standard_user_name: self.shared_standard_user_name.clone(),
            ssh_session_recording: self.ssh_session_recording,
        })
    }

    fn apply(&mut self, project: Project) {
        if !project.name.is_empty() {
            self.project_name = project.name;
        }
        self.create_server_users = project.create_server_users;
        self.force_shared_ssh_users = project.force_shared_ssh_users;
        self.forward_traffic = project.forward_traffic;
        if self.next_unix_uid != 0 {
            self.next_unix_uid = project.next_unix_uid;
        }
        if self.next_unix_gid != 0 {
            self.next_unix_gid = project.next_unix_gid;
        }
        self.rdp_session_recording = project.rdp_session_recording;
        self.require_preauthorization = project.require_preauth;
        self.shared_admin_user_name = project.shared_admin_user_name;
        self.shared_standard_user_name = project.shared_standard_user_name;
        self.ssh_session_recording = project.ssh_session_recording;
    }
}

fn project_path(name: &str) -> String {
    format!("/projects/{}", path_segment(name))
}

/// Handler for `oktaasa_project`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectResource;

impl Resource for ProjectResource {
    type Attrs = ProjectAttrs;

    const TYPE_NAME: &'static str = "oktaasa_project";

    async fn create<T: Transport>(
        &self,
        client: &AsaClient<T>,
        data: &mut ResourceData<ProjectAttrs>,
    ) -> Result<()> {
        let project = data.attrs.to_project()?;
        data.id = project.name.clone();

        let response = client.post("/projects", &project).await?;

        // Any other status falls through to the read, which clears the id
        // when the project did not come into existence.
        if response.status == 201 {
            tracing::info!("Project {} was successfully created", project.name);
        } else {
            tracing::error!(
                "Something went wrong while creating project {}: {} - {}",
                project.name,
                response.status,
                sanitize_for_log(&response.body)
            );
        }

        self.read(client, data).await
    }

    async fn read<T: Transport>(
        &self,
        client: &AsaClient<T>,
        data: &mut ResourceData<ProjectAttrs>,
    ) -> Result<()> {
        let response = client.get(&project_path(&data.id)).await?;

        match response.status {
            200 => {
                if check_soft_delete(&response.body)? {
                    tracing::info!("Project {} was removed", data.id);
                    data.clear_id();
                    return Ok(());
                }

                let project: Project = response.json("project")?;
                tracing::info!("Project {} exists", data.id);
                if !project.name.is_empty() {
                    data.id = project.name.clone();
                }
                data.attrs.apply(project);
                Ok(())
            }
            404 => {
                tracing::info!("Project {} does not exist", data.id);
                data.clear_id();
                Ok(())
            }
            status => Err(AsaError::remote(
                format!("read project {}", data.id),
                status,
                &response.body,
            )),
        }
    }

    async fn update<T: Transport>(
        &self,
        client: &AsaClient<T>,
        data: &mut ResourceData<ProjectAttrs>,
    ) -> Result<()> {
        let project = data.attrs.to_project()?;
        data.id = project.name.clone();

        let response = client.put(&project_path(&project.name), &project).await?;
        if response.status != 204 {
            return Err(AsaError::remote(
                format!("update project {}", project.name),
                response.status,
                &response.body,
            ));
        }
        tracing::info!("Project {} was successfully updated", project.name);

        self.read(client, data).await
    }

    async fn delete<T: Transport>(
        &self,
        client: &AsaClient<T>,
        data: &ResourceData<ProjectAttrs>,
    ) -> Result<()> {
        let name = &data.attrs.project_name;
        let response = client.delete(&project_path(name)).await?;

        // 400 comes back for projects that are already gone
        if response.status < 300 || response.status == 400 {
            tracing::info!("Project {} was successfully deleted", name);
        } else {
            tracing::error!(
                "Something went wrong while deleting project {}: {} - {}",
                name,
                response.status,
                sanitize_for_log(&response.body)
            );
        }

        Ok(())
    }
}
