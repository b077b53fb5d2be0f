//! Dial parameters for replica connections.
//!
//! A [`DialProvider`] turns an endpoint description into the parameters a
//! transport needs to open a connection. [`ReplicaDialProvider`] wraps the
//! environment's provider for standby replication: it pins TLS trust to the
//! cluster CA, turns off credentials taken from the environment, tags every
//! request with this member's replication role, and uses the replica backoff
//! schedule.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::backoff::ConnectParams;
use crate::config::{ClusterConfig, Role};
use crate::error::{RemoteError, RemoteResult};
use crate::tls::{ChainValidator, TlsTrust};

/// Request metadata key carrying the sender's replication role.
pub const ROLE_HEADER: &str = "x-tessera-cluster-role";
/// Request metadata key carrying the sender's role epoch.
pub const EPOCH_HEADER: &str = "x-tessera-cluster-role-epoch";
/// Environment variable read for bearer credentials when allowed.
pub const TOKEN_ENV: &str = "TESSERA_REMOTE_TOKEN";

/// Per-request credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(..)")
    }
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    /// The `authorization` metadata value.
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Adds metadata to every outbound request.
pub trait ClientInterceptor: Send + Sync + fmt::Debug {
    fn metadata(&self) -> Vec<(String, String)>;
}

/// What to dial.
#[derive(Clone, Debug, Default)]
pub struct DialConfig {
    /// `host:port` of the remote.
    pub endpoint: String,
    /// Custom trust; `None` uses default TLS handling.
    pub tls: Option<TlsTrust>,
    /// Credentials attached to every request.
    pub creds: Option<Credentials>,
    /// Whether the provider may look for credentials in the environment.
    pub with_env_creds: bool,
    /// Force plaintext, for local testing.
    pub insecure: bool,
}

/// Everything a transport needs to open a connection.
#[derive(Clone, Debug)]
pub struct DialParams {
    /// Full URL of the endpoint.
    pub url: String,
    pub tls: Option<TlsTrust>,
    pub creds: Option<Credentials>,
    pub interceptors: Vec<Arc<dyn ClientInterceptor>>,
    pub connect: ConnectParams,
}

impl DialParams {
    /// Metadata for one request: credentials first, then every interceptor
    /// in order.
    pub fn request_metadata(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Some(creds) = &self.creds {
            out.push(("authorization".to_string(), creds.header_value()));
        }
        for interceptor in &self.interceptors {
            out.extend(interceptor.metadata());
        }
        out
    }
}

/// Produces dial parameters for an endpoint.
pub trait DialProvider: Send + Sync {
    fn dial_params(&self, config: DialConfig) -> RemoteResult<DialParams>;
}

/// The provider used outside replication: scheme from the TLS settings,
/// credentials from the config or, when allowed, from the environment.
#[derive(Clone, Debug, Default)]
pub struct EnvDialProvider;

impl DialProvider for EnvDialProvider {
    fn dial_params(&self, config: DialConfig) -> RemoteResult<DialParams> {
        if config.endpoint.is_empty() {
            return Err(RemoteError::Dial("empty endpoint".into()));
        }
        let scheme = if config.insecure { "http" } else { "https" };
        let creds = match config.creds {
            Some(creds) => Some(creds),
            None if config.with_env_creds => std::env::var(TOKEN_ENV).ok().map(Credentials::bearer),
            None => None,
        };
        Ok(DialParams {
            url: format!("{scheme}://{}", config.endpoint),
            tls: config.tls,
            creds,
            interceptors: Vec::new(),
            connect: ConnectParams::default(),
        })
    }
}

/// Shared, updatable replication role of this member.
#[derive(Debug)]
pub struct RoleInterceptor {
    state: RwLock<(Role, u64)>,
}

impl RoleInterceptor {
    pub fn new(role: Role, epoch: u64) -> Self {
        Self {
            state: RwLock::new((role, epoch)),
        }
    }

    pub fn set_role(&self, role: Role, epoch: u64) {
        *self.state.write().expect("lock poisoned") = (role, epoch);
    }

    pub fn role(&self) -> (Role, u64) {
        *self.state.read().expect("lock poisoned")
    }
}

impl ClientInterceptor for RoleInterceptor {
    fn metadata(&self) -> Vec<(String, String)> {
        let (role, epoch) = self.role();
        vec![
            (ROLE_HEADER.to_string(), role.to_string()),
            (EPOCH_HEADER.to_string(), epoch.to_string()),
        ]
    }
}

/// Dial provider for connections between cluster members.
pub struct ReplicaDialProvider {
    inner: Arc<dyn DialProvider>,
    cluster: ClusterConfig,
    role: Arc<RoleInterceptor>,
    creds: Option<Credentials>,
    validator: Arc<dyn ChainValidator>,
}

impl ReplicaDialProvider {
    pub fn new(
        inner: Arc<dyn DialProvider>,
        cluster: ClusterConfig,
        role: Arc<RoleInterceptor>,
        validator: Arc<dyn ChainValidator>,
    ) -> Self {
        Self {
            inner,
            cluster,
            role,
            creds: None,
            validator,
        }
    }

    pub fn with_credentials(mut self, creds: Credentials) -> Self {
        self.creds = Some(creds);
        self
    }
}

impl DialProvider for ReplicaDialProvider {
    fn dial_params(&self, mut config: DialConfig) -> RemoteResult<DialParams> {
        if let Some(trust) = TlsTrust::from_config(&self.cluster.remotesapi, Arc::clone(&self.validator))? {
            config.tls = Some(trust);
        }
        config.creds = self.creds.clone();
        config.with_env_creds = false;

        let endpoint = config.endpoint.clone();
        let mut params = self.inner.dial_params(config)?;
        params
            .interceptors
            .push(Arc::clone(&self.role) as Arc<dyn ClientInterceptor>);
        params.connect = ConnectParams::default();
        debug!(%endpoint, tls = params.tls.is_some(), "replica dial params");
        Ok(params)
    }
}

/// Run `attempt` until it succeeds or `max_attempts` is used up.
///
/// Each attempt gets [`ConnectParams::attempt_timeout`]; failures are
/// followed by the jittered backoff delay.
pub async fn connect_with_backoff<T, F, Fut>(
    endpoint: &str,
    params: &ConnectParams,
    max_attempts: u32,
    mut attempt: F,
) -> RemoteResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RemoteResult<T>>,
{
    let mut last_err = None;
    for retries in 0..max_attempts {
        if retries > 0 {
            let delay = params.backoff.delay_for(retries, &mut rand::thread_rng());
            tokio::time::sleep(delay).await;
        }

        match tokio::time::timeout(params.attempt_timeout(retries), attempt()).await {
            Ok(Ok(conn)) => {
                debug!(endpoint, attempts = retries + 1, "connected");
                return Ok(conn);
            }
            Ok(Err(e)) => {
                warn!(endpoint, attempt = retries + 1, error = %e, "connect attempt failed");
                last_err = Some(e);
            }
            Err(_) => {
                warn!(endpoint, attempt = retries + 1, "connect attempt timed out");
            }
        }
    }

    Err(last_err.unwrap_or_else(|| RemoteError::ConnectTimeout {
        endpoint: endpoint.to_string(),
        attempts: max_attempts,
    }))
}
