//! OpenStack REST client
//!
//! Authenticates once against Keystone v3 and resolves the compute and
//! network endpoints for the configured region from the service catalog.

use burster_core::OpenstackCredentials;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{OpenstackError, Result};
use crate::models::*;

#[derive(Debug)]
struct Session {
    token: String,
    compute_url: String,
    network_url: String,
}

pub struct OpenstackClient {
    http: reqwest::Client,
    credentials: OpenstackCredentials,
    session: OnceCell<Session>,
}

impl OpenstackClient {
    pub fn new(credentials: OpenstackCredentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            session: OnceCell::new(),
        }
    }

    fn token_url(&self) -> String {
        let base = self.credentials.identity_endpoint.trim_end_matches('/');
        if base.ends_with("/v3") {
            format!("{base}/auth/tokens")
        } else {
            format!("{base}/v3/auth/tokens")
        }
    }

    fn auth_body(&self) -> serde_json::Value {
        let c = &self.credentials;
        let domain_id = if c.domain_id.is_empty() {
            "default"
        } else {
            c.domain_id.as_str()
        };
        let project = if c.tenant_id.is_empty() {
            json!({ "name": c.tenant_name, "domain": { "id": domain_id } })
        } else {
            json!({ "id": c.tenant_id })
        };

        json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": c.user,
                            "domain": { "id": domain_id },
                            "password": c.password,
                        }
                    }
                },
                "scope": { "project": project }
            }
        })
    }

    async fn authenticate(&self) -> Result<Session> {
        let url = self.token_url();
        debug!(url = %url, user = %self.credentials.user, "Authenticating");

        let response = self.http.post(&url).json(&self.auth_body()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(OpenstackError::Auth(format!("{status}: {text}")));
        }

        let token = response
            .headers()
            .get("X-Subject-Token")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| OpenstackError::Auth("missing X-Subject-Token header".to_string()))?;
        let body: TokenResponse = response.json().await?;

        let compute_url = self.endpoint(&body.token.catalog, "compute")?;
        let network_url = network_base(&self.endpoint(&body.token.catalog, "network")?);
        info!(region = %self.credentials.region, "Authenticated");

        Ok(Session {
            token,
            compute_url,
            network_url,
        })
    }

    fn endpoint(&self, catalog: &[CatalogEntry], service: &str) -> Result<String> {
        let region = &self.credentials.region;
        catalog
            .iter()
            .filter(|entry| entry.service_type == service)
            .flat_map(|entry| entry.endpoints.iter())
            .find(|ep| ep.interface == "public" && (region.is_empty() || &ep.region == region))
            .map(|ep| ep.url.trim_end_matches('/').to_string())
            .ok_or_else(|| OpenstackError::EndpointNotFound {
                service: service.to_string(),
                region: region.clone(),
            })
    }

    async fn session(&self) -> Result<&Session> {
        self.session.get_or_try_init(|| self.authenticate()).await
    }

    async fn get<T: DeserializeOwned>(&self, url: String, query: &[(&str, &str)]) -> Result<T> {
        let session = self.session().await?;
        debug!(url = %url, "GET request");
        let response = self
            .http
            .get(&url)
            .header("X-Auth-Token", &session.token)
            .query(query)
            .send()
            .await?;
        handle_response(response).await
    }

    async fn post<T, B>(&self, url: String, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: serde::Serialize,
    {
        let session = self.session().await?;
        debug!(url = %url, "POST request");
        let response = self
            .http
            .post(&url)
            .header("X-Auth-Token", &session.token)
            .json(body)
            .send()
            .await?;
        handle_response(response).await
    }

    /// DELETE that treats an already missing resource as success.
    async fn delete(&self, url: String) -> Result<()> {
        let session = self.session().await?;
        debug!(url = %url, "DELETE request");
        let response = self
            .http
            .delete(&url)
            .header("X-Auth-Token", &session.token)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(OpenstackError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    async fn compute_url(&self, path: &str) -> Result<String> {
        Ok(format!("{}{}", self.session().await?.compute_url, path))
    }

    async fn network_url(&self, path: &str) -> Result<String> {
        Ok(format!("{}{}", self.session().await?.network_url, path))
    }

    pub async fn find_image_id(&self, name: &str) -> Result<String> {
        let url = self.compute_url("/images/detail").await?;
        let list: ImageList = self.get(url, &[("name", name)]).await?;
        find_named(list.images, "image", name)
    }

    pub async fn find_flavor_id(&self, name: &str) -> Result<String> {
        let url = self.compute_url("/flavors/detail").await?;
        let list: FlavorList = self.get(url, &[]).await?;
        find_named(list.flavors, "flavor", name)
    }

    pub async fn find_network_id(&self, name: &str) -> Result<String> {
        let url = self.network_url("/networks").await?;
        let list: NetworkList = self.get(url, &[("name", name)]).await?;
        find_named(list.networks, "network", name)
    }

    pub async fn find_subnet_id(&self, network_id: &str, cidr: &str) -> Result<String> {
        let url = self.network_url("/subnets").await?;
        let list: SubnetList = self
            .get(url, &[("network_id", network_id), ("cidr", cidr)])
            .await?;
        list.subnets
            .into_iter()
            .find(|s| s.cidr == cidr)
            .map(|s| s.id)
            .ok_or_else(|| OpenstackError::NotFound {
                kind: "subnet",
                name: cidr.to_string(),
            })
    }

    /// Creates a port holding `ip`, without security groups.
    pub async fn create_port(
        &self,
        network_id: &str,
        subnet_id: &str,
        ip: &str,
    ) -> Result<String> {
        let url = self.network_url("/ports").await?;
        let request = CreatePortRequest {
            port: CreatePort {
                network_id: network_id.to_string(),
                admin_state_up: true,
                security_groups: Vec::new(),
                port_security_enabled: false,
                fixed_ips: vec![FixedIp {
                    ip_address: ip.to_string(),
                    subnet_id: subnet_id.to_string(),
                }],
            },
        };
        let created: PortEnvelope = self.post(url, &request).await?;
        debug!(port = %created.port.id, ip, "Created port");
        Ok(created.port.id)
    }

    pub async fn find_port_by_device(&self, device_id: &str) -> Result<String> {
        let url = self.network_url("/ports").await?;
        let list: PortList = self.get(url, &[("device_id", device_id)]).await?;
        list.ports
            .into_iter()
            .find(|p| p.device_id == device_id)
            .map(|p| p.id)
            .ok_or_else(|| OpenstackError::NotFound {
                kind: "port",
                name: format!("device {device_id}"),
            })
    }

    pub async fn delete_port(&self, port_id: &str) -> Result<()> {
        warn!(port = %port_id, "Deleting port");
        let url = self.network_url(&format!("/ports/{port_id}")).await?;
        self.delete(url).await
    }

    pub async fn create_server(&self, server: CreateServer) -> Result<String> {
        let url = self.compute_url("/servers").await?;
        let created: CreatedServerEnvelope =
            self.post(url, &CreateServerRequest { server }).await?;
        Ok(created.server.id)
    }

    pub async fn get_server(&self, server_id: &str) -> Result<Server> {
        let url = self.compute_url(&format!("/servers/{server_id}")).await?;
        let envelope: ServerEnvelope = self.get(url, &[]).await.map_err(|e| match e {
            OpenstackError::Api { status: 404, .. } => OpenstackError::NotFound {
                kind: "server",
                name: server_id.to_string(),
            },
            other => other,
        })?;
        Ok(envelope.server)
    }

    /// Finds a server by exact name.
    pub async fn find_server(&self, name: &str) -> Result<Server> {
        let url = self.compute_url("/servers/detail").await?;
        let pattern = format!("^{name}$");
        let list: ServerList = self.get(url, &[("name", pattern.as_str())]).await?;
        list.servers
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| OpenstackError::NotFound {
                kind: "server",
                name: name.to_string(),
            })
    }

    pub async fn delete_server(&self, server_id: &str) -> Result<()> {
        let url = self.compute_url(&format!("/servers/{server_id}")).await?;
        self.delete(url).await
    }
}

/// Neutron catalog entries usually omit the API version.
fn network_base(url: &str) -> String {
    if url.ends_with("/v2.0") {
        url.to_string()
    } else {
        format!("{url}/v2.0")
    }
}

fn find_named(items: Vec<NamedResource>, kind: &'static str, name: &str) -> Result<String> {
    items
        .into_iter()
        .find(|item| item.name == name)
        .map(|item| item.id)
        .ok_or_else(|| OpenstackError::NotFound {
            kind,
            name: name.to_string(),
        })
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        serde_json::from_str(&text).map_err(|e| {
            warn!(error = %e, body = %text, "Failed to parse response");
            OpenstackError::Json(e)
        })
    } else {
        Err(OpenstackError::Api {
            status: status.as_u16(),
            message: text,
        })
    }
}
