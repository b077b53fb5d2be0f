use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RemoteError, RemoteResult};

/// Replication role of a cluster member.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Primary,
    Standby,
    Detected,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Primary => "primary",
            Self::Standby => "standby",
            Self::Detected => "detected",
        })
    }
}

/// A peer this member replicates to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandbyRemote {
    pub name: String,
    /// URL with a `{database}` placeholder.
    pub remote_url_template: String,
}

impl StandbyRemote {
    /// The remote URL for one database.
    pub fn url_for(&self, database: &str) -> String {
        self.remote_url_template.replace("{database}", database)
    }
}

/// The `remotesapi` section: the replication endpoint this member serves and
/// the trust settings for outbound connections to peers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemotesApiConfig {
    pub address: Option<String>,
    pub port: u16,
    pub tls_key: Option<PathBuf>,
    pub tls_cert: Option<PathBuf>,
    /// PEM bundle of trusted roots for outbound connections. When unset,
    /// default TLS handling applies.
    pub tls_ca: Option<PathBuf>,
    /// If non-empty, the peer leaf must carry one of these URI SANs.
    pub server_name_urls: Vec<String>,
    /// If non-empty, the peer leaf must carry one of these DNS SANs.
    pub server_name_dns: Vec<String>,
}

impl Default for RemotesApiConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: 50051,
            tls_key: None,
            tls_cert: None,
            tls_ca: None,
            server_name_urls: Vec::new(),
            server_name_dns: Vec::new(),
        }
    }
}

/// Cluster replication settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub standby_remotes: Vec<StandbyRemote>,
    pub bootstrap_role: Role,
    pub bootstrap_epoch: u64,
    pub remotesapi: RemotesApiConfig,
}

impl ClusterConfig {
    pub fn from_toml_str(s: &str) -> RemoteResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> RemoteResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| RemoteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ClusterConfig::default();
        assert!(c.standby_remotes.is_empty());
        assert_eq!(c.bootstrap_role, Role::Primary);
        assert_eq!(c.remotesapi.port, 50051);
        assert!(c.remotesapi.tls_ca.is_none());
    }

    #[test]
    fn parse_full_config() {
        let c = ClusterConfig::from_toml_str(
            r#"
            bootstrap_role = "standby"
            bootstrap_epoch = 4

            [[standby_remotes]]
            name = "west"
            remote_url_template = "https://west.example:50051/{database}"

            [remotesapi]
            port = 6000
            tls_ca = "/etc/tessera/ca.pem"
            server_name_dns = ["west.example"]
            "#,
        )
        .unwrap();
        assert_eq!(c.bootstrap_role, Role::Standby);
        assert_eq!(c.bootstrap_epoch, 4);
        assert_eq!(c.remotesapi.port, 6000);
        assert_eq!(c.remotesapi.tls_ca, Some(PathBuf::from("/etc/tessera/ca.pem")));
        assert_eq!(c.remotesapi.server_name_dns, vec!["west.example".to_string()]);
        assert!(c.remotesapi.server_name_urls.is_empty());
        assert_eq!(c.standby_remotes[0].url_for("db1"), "https://west.example:50051/db1");
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = ClusterConfig::from_toml_str("bootstrap_role = \"leader\"").unwrap_err();
        assert!(matches!(err, RemoteError::Config(_)));
    }

    #[test]
    fn load_missing_file() {
        let err = ClusterConfig::load(Path::new("/nonexistent/cluster.toml")).unwrap_err();
        assert!(matches!(err, RemoteError::Io { .. }));
    }

    #[test]
    fn role_display() {
        assert_eq!(Role::Standby.to_string(), "standby");
    }
}
