use serde::Deserialize;

use super::{Cloud, CloudSpec};
use crate::error::Result;

/// The only configuration schema version understood.
pub const API_VERSION: &str = "cloud-burster.squarefactory.io/v1alpha1";

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/cloud-burster/config.yaml";

/// Root of the configuration document, as written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub suffix_search: Vec<String>,
    #[serde(default)]
    pub clouds: Vec<CloudSpec>,
}

/// Typed configuration: every cloud has a known backend type.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_version: String,
    /// Suffixes tried, in order, when resolving a short hostname.
    pub suffix_search: Vec<String>,
    pub clouds: Vec<Cloud>,
}

impl TryFrom<ConfigFile> for Config {
    type Error = crate::error::BurstError;

    fn try_from(file: ConfigFile) -> Result<Self> {
        let clouds = file
            .clouds
            .into_iter()
            .map(Cloud::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(Config {
            api_version: file.api_version,
            suffix_search: file.suffix_search,
            clouds,
        })
    }
}
