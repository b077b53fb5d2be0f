//! # tessera-remote
//!
//! Outbound connection setup for replication between cluster members.
//!
//! - [`ClusterConfig`] / [`RemotesApiConfig`]: TOML cluster settings.
//! - [`TlsTrust`]: CA bundle trust with optional subject-name allow lists,
//!   validated by [`WebPkiValidator`].
//! - [`ConnectParams`]: replica backoff schedule and connect timeouts.
//! - [`ReplicaDialProvider`]: wraps another [`DialProvider`] for replica
//!   traffic.
//!
//! This crate is independent of the storage core; it only prepares the
//! parameters a transport dials with.

pub mod backoff;
pub mod config;
pub mod dial;
pub mod error;
pub mod tls;

pub use backoff::{BackoffConfig, ConnectParams};
pub use config::{ClusterConfig, RemotesApiConfig, Role, StandbyRemote};
pub use dial::{
    connect_with_backoff, ClientInterceptor, Credentials, DialConfig, DialParams, DialProvider,
    EnvDialProvider, ReplicaDialProvider, RoleInterceptor,
};
pub use error::{RemoteError, RemoteResult};
pub use tls::{
    CaRoots, ChainValidator, KeyUsage, PeerCertificate, TlsTrust, WebPkiValidator, ALPN_PROTOCOLS,
};
