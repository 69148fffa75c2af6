//! Configuration file loading.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::{BurstError, Result};
use crate::model::{Config, ConfigFile};

/// Parses a configuration document.
///
/// The result is typed but not validated; call [`Config::validate`] before
/// acting on it.
pub fn from_yaml_str(content: &str) -> Result<Config> {
    let file: ConfigFile = serde_yaml::from_str(content)?;
    Config::try_from(file)
}

/// Reads and parses the configuration file at `path`.
///
/// The file holds provider credentials, so it is refused when group or
/// others have any access to it.
#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_file(path: &Path) -> Result<Config> {
    check_permissions(path)?;

    let content = std::fs::read_to_string(path).map_err(|source| BurstError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(bytes = content.len(), "Read config file");

    let config = from_yaml_str(&content)?;
    info!(clouds = config.clouds.len(), "Config loaded");
    Ok(config)
}

#[cfg(unix)]
fn check_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path).map_err(|source| BurstError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mode = metadata.permissions().mode() & 0o777;
    if mode & 0o077 != 0 {
        return Err(BurstError::InsecurePermissions {
            path: path.to_path_buf(),
            mode,
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
apiVersion: cloud-burster.squarefactory.io/v1alpha1
clouds:
  - type: shadow
    network:
      name: none
      subnetCIDR: 10.0.0.0/24
      dns: 1.1.1.1
      gateway: 10.0.0.1
    shadow:
      username: burst
      password: secret
      zone: fr
      sshkey: a2V5
"#;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_from_yaml_str() {
        let config = from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.clouds.len(), 1);
        assert_eq!(config.clouds[0].label(), "shadow/fr");
        assert!(config.suffix_search.is_empty());
    }

    #[test]
    fn test_from_yaml_str_unknown_type() {
        let yaml = MINIMAL.replace("type: shadow", "type: gcp");
        let err = from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, BurstError::UnknownCloudType(t) if t == "gcp"));
    }

    #[test]
    fn test_from_yaml_str_syntax_error() {
        let err = from_yaml_str("clouds: [").unwrap_err();
        assert!(matches!(err, BurstError::Yaml(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_load_file_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let file = write_config(MINIMAL);
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600)).unwrap();
        let config = load_file(file.path()).unwrap();
        assert_eq!(config.clouds.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_load_file_rejects_group_readable() {
        use std::os::unix::fs::PermissionsExt;

        let file = write_config(MINIMAL);
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o640)).unwrap();
        let err = load_file(file.path()).unwrap_err();
        assert!(matches!(err, BurstError::InsecurePermissions { mode: 0o640, .. }));
    }

    #[test]
    fn test_load_file_missing() {
        let err = load_file(Path::new("/nonexistent/cloud-burster.yaml")).unwrap_err();
        assert!(matches!(err, BurstError::Read { .. }));
    }
}
