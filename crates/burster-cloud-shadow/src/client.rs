//! Shadow REST client
//!
//! Every endpoint is a POST with a JSON body and HTTP basic auth.

use burster_core::ShadowCredentials;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Result, ShadowError};
use crate::models::*;

pub const DEFAULT_BASE_URL: &str = "https://api.shdw-ws.fr/api";

pub struct ShadowClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl ShadowClient {
    pub fn new(credentials: &ShadowCredentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn send<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "POST request");
        Ok(self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(body)
            .send()
            .await?)
    }

    async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let response = self.send(path, body).await?;
        handle_response(response).await
    }

    /// POST whose response body is ignored; 404 means the target is gone.
    async fn post_action<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let response = self.send(path, body).await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(ShadowError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    pub async fn request_block_device(&self, zone: &str, size_gib: u32) -> Result<String> {
        let request = BlockDeviceRequest {
            dry_run: false,
            block_device: NewBlockDevice {
                datacenter_label: zone.to_string(),
                size_gib,
            },
        };
        let created: BlockDeviceResponse = self.post("/block_device/request", &request).await?;
        Ok(created.block_device.uuid)
    }

    pub async fn request_vm(&self, vm: NewVm) -> Result<String> {
        let request = VmRequest { dry_run: false, vm };
        let created: VmResponse = self.post("/vm/request", &request).await?;
        Ok(created.vm.uuid)
    }

    pub async fn list_vms(&self, filters: VmFilters) -> Result<Vec<Vm>> {
        let list: VmListResponse = self.post("/vm/list", &VmListRequest { filters }).await?;
        Ok(list.vms)
    }

    pub async fn get_vm(&self, uuid: &str) -> Result<Vm> {
        let filters = VmFilters {
            uuid: Some(uuid.to_string()),
        };
        self.list_vms(filters)
            .await?
            .into_iter()
            .find(|vm| vm.uuid == uuid)
            .ok_or_else(|| ShadowError::NotFound {
                kind: "vm",
                name: uuid.to_string(),
            })
    }

    /// Finds the VM carrying `hostname`, preferring one not being killed.
    pub async fn find_vm_by_hostname(&self, hostname: &str) -> Result<Vm> {
        let mut matching: Vec<Vm> = self
            .list_vms(VmFilters::default())
            .await?
            .into_iter()
            .filter(|vm| vm.hostname() == Some(hostname))
            .collect();
        if matching.len() > 1 {
            warn!(hostname, count = matching.len(), "Several VMs carry this hostname");
        }
        matching.sort_by_key(Vm::is_killed);
        matching
            .into_iter()
            .next()
            .ok_or_else(|| ShadowError::NotFound {
                kind: "vm",
                name: hostname.to_string(),
            })
    }

    pub async fn kill_vm(&self, uuid: &str) -> Result<()> {
        let action = VmAction {
            dry_run: false,
            vm: UuidRef::new(uuid),
        };
        self.post_action("/vm/kill", &action).await
    }

    pub async fn release_block_device(&self, uuid: &str) -> Result<()> {
        let action = BlockDeviceAction {
            dry_run: false,
            block_device: UuidRef::new(uuid),
        };
        self.post_action("/block_device/release", &action).await
    }
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        serde_json::from_str(&text).map_err(|e| {
            warn!(error = %e, body = %text, "Failed to parse response");
            ShadowError::Json(e)
        })
    } else {
        Err(ShadowError::Api {
            status: status.as_u16(),
            message: text,
        })
    }
}
