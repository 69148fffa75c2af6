//! First-boot user data rendering
//!
//! Providers keep their own templates; this module supplies the shared
//! context (keys, DNS, post-script repository), the custom-config tail and
//! the YAML check applied to `#cloud-config` documents.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use burster_core::{Cloud, Host};
use tera::{Context, Tera};
use tracing::error;

use crate::error::{CloudError, Result};

/// Template context common to every provider.
///
/// Variables: `hostname`, `authorized_keys`, `dns`, `search`, `git_key`,
/// `git_url`, `git_ref`, `custom_config`.
pub fn base_context(host: &Host, cloud: &Cloud) -> Result<Context> {
    let git = &cloud.post_scripts.git;
    let mut context = Context::new();
    context.insert("hostname", &host.name);
    context.insert("authorized_keys", &cloud.authorized_keys);
    context.insert("dns", &cloud.network.dns);
    context.insert("search", &cloud.network.search.clone().unwrap_or_default());
    context.insert("git_key", &git.key);
    context.insert("git_url", &git.url);
    context.insert("git_ref", &git.git_ref);
    context.insert("custom_config", &custom_config(cloud)?);
    Ok(context)
}

/// The cloud's extra cloud-init keys as a YAML fragment, empty when unset.
pub fn custom_config(cloud: &Cloud) -> Result<String> {
    match &cloud.custom_config {
        Some(mapping) if !mapping.is_empty() => serde_yaml::to_string(mapping)
            .map_err(|e| CloudError::CloudInit(format!("customConfig: {e}"))),
        _ => Ok(String::new()),
    }
}

/// Renders a template without HTML escaping.
pub fn render(template: &str, context: &Context) -> Result<String> {
    Tera::one_off(template, context, false).map_err(|e| CloudError::CloudInit(e.to_string()))
}

/// Renders a `#cloud-config` template and checks that the output parses as
/// a YAML mapping.
pub fn render_cloud_config(template: &str, context: &Context) -> Result<String> {
    let rendered = render(template, context)?;
    match serde_yaml::from_str::<serde_yaml::Mapping>(&rendered) {
        Ok(_) => Ok(rendered),
        Err(e) => {
            error!(error = %e, cloud_config = %rendered, "Cloud config validation failed");
            Err(CloudError::CloudInit(format!("invalid cloud config: {e}")))
        }
    }
}

/// Decodes a base64 value (such as a deploy key) into text.
pub fn decode_base64(value: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(value.trim())
        .map_err(|e| CloudError::CloudInit(format!("invalid base64: {e}")))?;
    String::from_utf8(bytes).map_err(|e| CloudError::CloudInit(format!("invalid UTF-8: {e}")))
}
