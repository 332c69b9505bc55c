//! Sudo Entitlements
//!
//! An entitlement is a named bundle of sudo rules. Its id is assigned by the
//! server on creation, and the server may re-create the entitlement under a
//! new id when it is updated.

use serde::{Deserialize, Serialize};

use super::{null_as_default, Resource, ResourceData};
use crate::asa::client::{path_segment, AsaClient};
use crate::asa::http::{sanitize_for_log, Transport};
use crate::error::{AsaError, Result};

const ENTITLEMENTS_PATH: &str = "/entitlements/sudo";

/// One command rule; the optional type tags drive templated arguments
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StructuredCommand {
    pub command: String,
    #[serde(
        default,
        skip_serializing_if = "String::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub command_type: String,
    #[serde(
        default,
        skip_serializing_if = "String::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub args: String,
    #[serde(
        default,
        skip_serializing_if = "String::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub args_type: String,
}

/// Sudo entitlement attributes as configured
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SudoEntitlementAttrs {
    pub name: String,
    pub description: String,
    pub run_as: String,
    pub no_exec: bool,
    pub no_passwd: bool,
    pub set_env: bool,
    /// Unordered in configuration
    #[serde(alias = "command")]
    pub commands: Vec<StructuredCommand>,
    pub sub_env: Vec<String>,
    pub add_env: Vec<String>,
}

/// Sudo entitlement as sent to and returned by the API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SudoEntitlement {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(rename = "opt_no_exec", default)]
    pub no_exec: bool,
    #[serde(rename = "opt_no_passwd", default)]
    pub no_passwd: bool,
    #[serde(
        rename = "opt_run_as",
        default,
        skip_serializing_if = "String::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub run_as: String,
    #[serde(rename = "opt_set_env", default)]
    pub set_env: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub structured_commands: Vec<StructuredCommand>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub sub_env: Vec<String>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub add_env: Vec<String>,
    /// Legacy field; the API rejects payloads without it, so it is always sent
    #[serde(default, deserialize_with = "null_as_default")]
    pub commands: Vec<String>,
}

/// Entitlement names may only contain alphanumerics, hyphens, underscores and periods
pub fn is_valid_entitlement_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

impl SudoEntitlementAttrs {
    /// Build the request payload for the entitlement with the given id
    ///
    /// `id` is empty for a create. Commands are deduplicated and sorted so
    /// the payload does not depend on configuration order.
    pub fn to_entitlement(&self, id: &str) -> Result<SudoEntitlement> {
        if !is_valid_entitlement_name(&self.name) {
            return Err(AsaError::Validation(format!(
                "Sudo entitlement name \"{}\" is invalid, name may only contain alphanumeric characters (a-Z, 0-9), hyphens (-), underscores (_), and periods (.)",
                self.name
            )));
        }

        if self.commands.iter().any(|c| c.command.is_empty()) {
            return Err(AsaError::Validation(format!(
                "every command of sudo entitlement {} needs a non-empty command",
                self.name
            )));
        }

        let mut structured_commands = self.commands.clone();
        structured_commands.sort();
        structured_commands.dedup();

        Ok(SudoEntitlement {
            id: id.to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            no_exec: self.no_exec,
            no_passwd: self.no_passwd,
            run_as: self.run_as.clone(),
            set_env: self.set_env,
            structured_commands,
            sub_env: self.sub_env.clone(),
            add_env: self.add_env.clone(),
            commands: Vec::new(),
        })
    }

    fn apply(&mut self, entitlement: SudoEntitlement) {
        self.name = entitlement.name;
        self.description = entitlement.description;
        self.run_as = entitlement.run_as;
        self.no_exec = entitlement.no_exec;
        self.no_passwd = entitlement.no_passwd;
        self.set_env = entitlement.set_env;
        self.sub_env = entitlement.sub_env;
        self.add_env = entitlement.add_env;
        if !entitlement.structured_commands.is_empty() {
            self.commands = entitlement.structured_commands;
        }
    }
}

fn entitlement_path(id: &str) -> String {
    format!("{}/{}", ENTITLEMENTS_PATH, path_segment(id))
}

/// Handler for `oktaasa_sudo_entitlement`
#[derive(Debug, Clone, Copy, Default)]
pub struct SudoEntitlementResource;

impl Resource for SudoEntitlementResource {
    type Attrs = SudoEntitlementAttrs;

    const TYPE_NAME: &'static str = "oktaasa_sudo_entitlement";

    async fn create<T: Transport>(
        &self,
        client: &AsaClient<T>,
        data: &mut ResourceData<SudoEntitlementAttrs>,
    ) -> Result<()> {
        let entitlement = data.attrs.to_entitlement("")?;

        let response = client.post(ENTITLEMENTS_PATH, &entitlement).await?;
        if response.status >= 400 {
            return Err(AsaError::remote(
                format!("create sudo entitlement {}", entitlement.name),
                response.status,
                &response.body,
            ));
        }

        match response.json::<SudoEntitlement>("created sudo entitlement") {
            Ok(created) => data.id = created.id,
            Err(e) => {
                tracing::warn!("Error storing sudo entitlement {}: {}", entitlement.name, e);
                data.clear_id();
            }
        }

        if !data.exists() {
            tracing::warn!(
                "No id returned for sudo entitlement {}: {}",
                entitlement.name,
                sanitize_for_log(&response.body)
            );
            return Ok(());
        }

        tracing::info!("Sudo entitlement {} created with id {}", entitlement.name, data.id);
        self.read(client, data).await
    }

    async fn read<T: Transport>(
        &self,
        client: &AsaClient<T>,
        data: &mut ResourceData<SudoEntitlementAttrs>,
    ) -> Result<()> {
        if !data.exists() {
            return Ok(());
        }

        let response = client.get(&entitlement_path(&data.id)).await?;

        match response.status {
            200 => {
                tracing::debug!(
                    "Sudo entitlement {} exists: {}",
                    data.id,
                    sanitize_for_log(&response.body)
                );
                let entitlement: SudoEntitlement = response.json("sudo entitlement")?;
                data.attrs.apply(entitlement);
                Ok(())
            }
            404 => {
                tracing::debug!("No sudo entitlement {}", data.id);
                data.clear_id();
                Ok(())
            }
            status => Err(AsaError::remote(
                format!("read sudo entitlement {}", data.id),
                status,
                &response.body,
            )),
        }
    }

    async fn update<T: Transport>(
        &self,
        client: &AsaClient<T>,
        data: &mut ResourceData<SudoEntitlementAttrs>,
    ) -> Result<()> {
        let entitlement = data.attrs.to_entitlement(&data.id)?;

        let response = client.put(&entitlement_path(&data.id), &entitlement).await?;
        if response.status >= 400 {
            return Err(AsaError::remote(
                format!("update sudo entitlement {}", data.id),
                response.status,
                &response.body,
            ));
        }

        if response.status == 204 {
            tracing::debug!("Sudo entitlement {} updated in place", data.id);
        } else {
            // The server re-created the entitlement; follow it to its new id
            let previous = std::mem::take(&mut data.id);
            match response.json::<SudoEntitlement>("updated sudo entitlement") {
                Ok(updated) => data.id = updated.id,
                Err(e) => tracing::warn!("Error storing sudo entitlement {}: {}", previous, e),
            }
            tracing::debug!(
                "Sudo entitlement {} answered update with status {}, new id {:?}",
                previous,
                response.status,
                data.id
            );
        }

        self.read(client, data).await
    }

    async fn delete<T: Transport>(
        &self,
        client: &AsaClient<T>,
        data: &ResourceData<SudoEntitlementAttrs>,
    ) -> Result<()> {
        let response = client.delete(&entitlement_path(&data.id)).await?;

        if response.status < 300 || response.status == 404 {
            tracing::info!("Sudo entitlement {} was successfully deleted", data.id);
            Ok(())
        } else {
            Err(AsaError::remote(
                format!("delete sudo entitlement {}", data.id),
                response.status,
                &response.body,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asa::testing::fake_client;
    use reqwest::Method;
    use serde_json::json;

    fn command(command: &str, command_type: &str) -> StructuredCommand {
        StructuredCommand {
            command: command.to_string(),
            command_type: command_type.to_string(),
            ..Default::default()
        }
    }

    fn deploy_attrs() -> SudoEntitlementAttrs {
        SudoEntitlementAttrs {
            name: "deploy-sudo".to_string(),
            description: "deploys".to_string(),
            run_as: "root".to_string(),
            commands: vec![command("systemctl", "raw")],
            ..Default::default()
        }
    }

    fn entitlement_body(id: &str) -> String {
        json!({
            "id": id,
            "name": "deploy-sudo",
            "description": "deploys",
            "opt_no_exec": false,
            "opt_no_passwd": false,
            "opt_run_as": "root",
            "opt_set_env": false,
            "structured_commands": [{"command": "systemctl", "command_type": "raw"}],
            "sub_env": null,
            "add_env": null,
            "commands": null
        })
        .to_string()
    }

    #[test]
    fn test_name_pattern() {
        assert!(is_valid_entitlement_name("deploy-sudo_v1.2"));
        assert!(!is_valid_entitlement_name("deploy sudo"));
        assert!(!is_valid_entitlement_name("deploy/sudo"));
        assert!(!is_valid_entitlement_name(""));
    }

    #[test]
    fn test_payload_always_carries_commands() {
        let attrs = SudoEntitlementAttrs {
            name: "empty".to_string(),
            ..Default::default()
        };
        let payload = serde_json::to_value(attrs.to_entitlement("").unwrap()).unwrap();

        assert_eq!(payload["commands"], json!([]));
        assert_eq!(payload["structured_commands"], json!([]));
        assert!(payload.get("opt_run_as").is_none());
        assert!(payload.get("sub_env").is_none());
    }

    #[test]
    fn test_commands_are_sorted_and_deduplicated() {
        let attrs = SudoEntitlementAttrs {
            name: "ops".to_string(),
            commands: vec![
                command("systemctl", "raw"),
                command("journalctl", ""),
                command("systemctl", "raw"),
            ],
            ..Default::default()
        };

        let entitlement = attrs.to_entitlement("").unwrap();

        let names: Vec<_> = entitlement
            .structured_commands
            .iter()
            .map(|c| c.command.as_str())
            .collect();
        assert_eq!(names, ["journalctl", "systemctl"]);
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let attrs = SudoEntitlementAttrs {
            name: "ops".to_string(),
            commands: vec![command("", "raw")],
            ..Default::default()
        };
        assert!(matches!(attrs.to_entitlement(""), Err(AsaError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_adopts_server_id() {
        let client = fake_client();
        client.transport.respond(201, &entitlement_body("abc-123"));
        client.transport.respond(200, &entitlement_body("abc-123"));
        let mut data = ResourceData::new(deploy_attrs());

        SudoEntitlementResource.create(&client, &mut data).await.unwrap();

        assert_eq!(data.id, "abc-123");
        let requests = client.transport.requests();
        assert_eq!(requests[0].path, "/teams/acme/entitlements/sudo");
        let sent = requests[0].json_body();
        assert_eq!(sent["id"], "");
        assert_eq!(sent["opt_run_as"], "root");
        assert_eq!(sent["commands"], json!([]));
        assert_eq!(requests[1].path, "/teams/acme/entitlements/sudo/abc-123");
    }

    #[tokio::test]
    async fn test_create_invalid_name_sends_nothing() {
        let client = fake_client();
        let mut data = ResourceData::new(SudoEntitlementAttrs {
            name: "deploy sudo!".to_string(),
            ..Default::default()
        });

        let err = SudoEntitlementResource.create(&client, &mut data).await.unwrap_err();

        assert!(matches!(err, AsaError::Validation(_)));
        assert!(client.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejected() {
        let client = fake_client();
        client.transport.respond(400, r#"{"error":"bad"}"#);
        let mut data = ResourceData::new(deploy_attrs());

        let err = SudoEntitlementResource.create(&client, &mut data).await.unwrap_err();

        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn test_create_undecodable_response_leaves_id_empty() {
        let client = fake_client();
        client.transport.respond(201, "created");
        let mut data = ResourceData::new(deploy_attrs());

        SudoEntitlementResource.create(&client, &mut data).await.unwrap();

        assert!(!data.exists());
        assert_eq!(client.transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_create_adopts_id_from_minimal_response() {
        let client = fake_client();
        client.transport.respond(201, r#"{"id":"abc-123"}"#);
        client.transport.respond(200, &entitlement_body("abc-123"));
        let mut data = ResourceData::new(deploy_attrs());

        SudoEntitlementResource.create(&client, &mut data).await.unwrap();

        assert_eq!(data.id, "abc-123");
        let requests = client.transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].path, "/teams/acme/entitlements/sudo/abc-123");
    }

    #[tokio::test]
    async fn test_create_adopts_id_when_name_is_null() {
        let client = fake_client();
        client.transport.respond(201, r#"{"id":"abc-123","name":null}"#);
        client.transport.respond(200, &entitlement_body("abc-123"));
        let mut data = ResourceData::new(deploy_attrs());

        SudoEntitlementResource.create(&client, &mut data).await.unwrap();

        assert_eq!(data.id, "abc-123");
    }

    #[tokio::test]
    async fn test_read_populates_attrs() {
        let client = fake_client();
        client.transport.respond(200, &entitlement_body("abc-123"));
        let mut data: ResourceData<SudoEntitlementAttrs> = ResourceData::with_id("abc-123");

        SudoEntitlementResource.read(&client, &mut data).await.unwrap();

        assert_eq!(data.attrs, deploy_attrs());
    }

    #[tokio::test]
    async fn test_read_404_clears_id() {
        let client = fake_client();
        client.transport.respond(404, "");
        let mut data: ResourceData<SudoEntitlementAttrs> = ResourceData::with_id("abc-123");

        SudoEntitlementResource.read(&client, &mut data).await.unwrap();

        assert!(!data.exists());
    }

    #[tokio::test]
    async fn test_read_other_status_is_error() {
        let client = fake_client();
        client.transport.respond(500, "boom");
        let mut data: ResourceData<SudoEntitlementAttrs> = ResourceData::with_id("abc-123");

        let err = SudoEntitlementResource.read(&client, &mut data).await.unwrap_err();

        assert!(matches!(err, AsaError::Remote { status: 500, .. }));
        assert_eq!(data.id, "abc-123");
    }

    #[tokio::test]
    async fn test_update_unchanged_is_idempotent() {
        let client = fake_client();
        client.transport.respond(204, "");
        client.transport.respond(200, &entitlement_body("abc-123"));
        let before = ResourceData {
            id: "abc-123".to_string(),
            attrs: deploy_attrs(),
        };
        let mut data = before.clone();

        SudoEntitlementResource.update(&client, &mut data).await.unwrap();

        assert_eq!(data, before);
        let requests = client.transport.requests();
        assert_eq!(requests[0].method, Method::PUT);
        assert_eq!(requests[0].json_body()["id"], "abc-123");
    }

    #[tokio::test]
    async fn test_update_follows_recreated_id() {
        let client = fake_client();
        client.transport.respond(201, &entitlement_body("def-456"));
        client.transport.respond(200, &entitlement_body("def-456"));
        let mut data = ResourceData {
            id: "abc-123".to_string(),
            attrs: deploy_attrs(),
        };

        SudoEntitlementResource.update(&client, &mut data).await.unwrap();

        assert_eq!(data.id, "def-456");
        assert_eq!(
            client.transport.requests()[1].path,
            "/teams/acme/entitlements/sudo/def-456"
        );
    }

    #[tokio::test]
    async fn test_update_follows_id_from_minimal_response() {
        let client = fake_client();
        client.transport.respond(200, r#"{"id":"def-456"}"#);
        client.transport.respond(200, &entitlement_body("def-456"));
        let mut data = ResourceData {
            id: "abc-123".to_string(),
            attrs: deploy_attrs(),
        };

        SudoEntitlementResource.update(&client, &mut data).await.unwrap();

        assert_eq!(data.id, "def-456");
        assert_eq!(data.attrs, deploy_attrs());
    }

    #[tokio::test]
    async fn test_delete_statuses() {
        for (status, ok) in [(204, true), (404, true), (409, false)] {
            let client = fake_client();
            client.transport.respond(status, "");
            let data = ResourceData {
                id: "abc-123".to_string(),
                attrs: deploy_attrs(),
            };

            let result = SudoEntitlementResource.delete(&client, &data).await;

            assert_eq!(result.is_ok(), ok, "status {status}");
        }
    }
}
