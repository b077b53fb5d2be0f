//! Trust settings for outbound replica connections.
//!
//! When `tls_ca` is configured, every certificate in that PEM bundle is a
//! trusted root and nothing else is. The peer chain must validate to one of
//! those roots with server-auth extended key usage; the host name the
//! connection was dialed with is deliberately not checked. Instead, the
//! optional `server_name_urls` / `server_name_dns` lists restrict which leaf
//! subject alternative names are acceptable.
//!
//! Signature and validity checks go through a [`ChainValidator`].
//! [`WebPkiValidator`] is the standard one.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls_pki_types::{CertificateDer, TrustAnchor, UnixTime};
use tracing::debug;

use crate::config::RemotesApiConfig;
use crate::error::{RemoteError, RemoteResult};

/// ALPN protocols offered on replica connections.
pub const ALPN_PROTOCOLS: &[&str] = &["h2"];

/// Trusted root certificates loaded from a PEM bundle.
#[derive(Clone, Debug)]
pub struct CaRoots {
    source: PathBuf,
    certificates: Vec<CertificateDer<'static>>,
    anchors: Vec<TrustAnchor<'static>>,
}

impl CaRoots {
    /// Read and parse the bundle at `path`.
    pub fn load(path: &Path) -> RemoteResult<Self> {
        let pem = std::fs::read_to_string(path).map_err(|source| RemoteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_pem(path, &pem)
    }

    /// Parse a bundle already in memory. Text outside certificate blocks is
    /// ignored; a bundle without any certificate is an error, and so is a
    /// block that is not a well-formed X.509 certificate.
    pub fn from_pem(source: &Path, pem: &str) -> RemoteResult<Self> {
        let invalid = |reason: String| RemoteError::InvalidRoots {
            path: source.to_path_buf(),
            reason,
        };

        let certificates = rustls_pemfile::certs(&mut pem.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| invalid(e.to_string()))?;
        if certificates.is_empty() {
            return Err(RemoteError::NoRoots(source.to_path_buf()));
        }

        let anchors = certificates
            .iter()
            .enumerate()
            .map(|(i, der)| {
                webpki::anchor_from_trusted_cert(der)
                    .map(|anchor| anchor.to_owned())
                    .map_err(|e| invalid(format!("certificate {i}: {e:?}")))
            })
            .collect::<RemoteResult<Vec<_>>>()?;

        debug!(path = %source.display(), roots = anchors.len(), "loaded ca roots");
        Ok(Self {
            source: source.to_path_buf(),
            certificates,
            anchors,
        })
    }

    /// Where the bundle was read from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// The DER encoding of each root.
    pub fn certificates(&self) -> &[CertificateDer<'static>] {
        &self.certificates
    }

    /// Subject and public key of each root.
    pub fn trust_anchors(&self) -> &[TrustAnchor<'static>] {
        &self.anchors
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// Extended key usage a chain must be valid for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyUsage {
    ServerAuth,
}

/// A certificate presented by the peer, with the subject alternative names
/// the transport extracted from it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerCertificate {
    pub der: Vec<u8>,
    pub uris: Vec<String>,
    pub dns_names: Vec<String>,
}

/// Cryptographic chain validation: signatures, validity windows, CA flags,
/// and extended key usage. `chain[0]` is the leaf; the rest are
/// intermediates.
pub trait ChainValidator: Send + Sync {
    fn validate(&self, roots: &CaRoots, chain: &[PeerCertificate], usage: KeyUsage) -> Result<(), String>;
}

/// Path validation with webpki against the current time.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebPkiValidator;

impl WebPkiValidator {
    /// Validate `chain` as of `time`.
    pub fn validate_at(
        &self,
        roots: &CaRoots,
        chain: &[PeerCertificate],
        usage: KeyUsage,
        time: UnixTime,
    ) -> Result<(), String> {
        let (leaf, rest) = chain.split_first().ok_or("peer presented no certificates")?;
        let leaf_der = CertificateDer::from(leaf.der.as_slice());
        let cert = webpki::EndEntityCert::try_from(&leaf_der)
            .map_err(|e| format!("invalid leaf certificate: {e:?}"))?;
        let intermediates: Vec<CertificateDer<'_>> = rest
            .iter()
            .map(|c| CertificateDer::from(c.der.as_slice()))
            .collect();
        let usage = match usage {
            KeyUsage::ServerAuth => webpki::KeyUsage::server_auth(),
        };

        cert.verify_for_usage(
            webpki::ALL_VERIFICATION_ALGS,
            roots.trust_anchors(),
            &intermediates,
            time,
            usage,
            None,
            None,
        )
        .map(|_| ())
        .map_err(|e| format!("{e:?}"))
    }
}

impl ChainValidator for WebPkiValidator {
    fn validate(&self, roots: &CaRoots, chain: &[PeerCertificate], usage: KeyUsage) -> Result<(), String> {
        self.validate_at(roots, chain, usage, UnixTime::now())
    }
}

/// Resolved trust settings for one dial.
#[derive(Clone)]
pub struct TlsTrust {
    roots: Arc<CaRoots>,
    server_name_urls: Vec<String>,
    server_name_dns: Vec<String>,
    validator: Arc<dyn ChainValidator>,
}

impl fmt::Debug for TlsTrust {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsTrust")
            .field("roots", &self.roots.source())
            .field("server_name_urls", &self.server_name_urls)
            .field("server_name_dns", &self.server_name_dns)
            .finish_non_exhaustive()
    }
}

impl TlsTrust {
    pub fn new(roots: CaRoots, validator: Arc<dyn ChainValidator>) -> Self {
        Self {
            roots: Arc::new(roots),
            server_name_urls: Vec::new(),
            server_name_dns: Vec::new(),
            validator,
        }
    }

    pub fn with_server_name_urls(mut self, urls: Vec<String>) -> Self {
        self.server_name_urls = urls;
        self
    }

    pub fn with_server_name_dns(mut self, names: Vec<String>) -> Self {
        self.server_name_dns = names;
        self
    }

    /// Trust settings for `config`, or `None` when no `tls_ca` is set and
    /// default TLS handling applies.
    pub fn from_config(config: &RemotesApiConfig, validator: Arc<dyn ChainValidator>) -> RemoteResult<Option<Self>> {
        let Some(path) = &config.tls_ca else {
            return Ok(None);
        };
        let roots = CaRoots::load(path)?;
        Ok(Some(
            Self::new(roots, validator)
                .with_server_name_urls(config.server_name_urls.clone())
                .with_server_name_dns(config.server_name_dns.clone()),
        ))
    }

    pub fn roots(&self) -> &CaRoots {
        &self.roots
    }

    /// ALPN protocols to offer.
    pub fn alpn_protocols(&self) -> Vec<String> {
        ALPN_PROTOCOLS.iter().map(|p| p.to_string()).collect()
    }

    /// Host-name verification is replaced by [`verify_peer`](Self::verify_peer).
    pub fn verifies_host_name(&self) -> bool {
        false
    }

    /// Check the chain a peer presented.
    pub fn verify_peer(&self, chain: &[PeerCertificate]) -> RemoteResult<()> {
        let leaf = chain.first().ok_or(RemoteError::EmptyChain)?;
        self.validator
            .validate(&self.roots, chain, KeyUsage::ServerAuth)
            .map_err(RemoteError::ChainRejected)?;

        if !matches_any(&self.server_name_urls, &leaf.uris) {
            return Err(RemoteError::UrlMismatch);
        }
        if !matches_any(&self.server_name_dns, &leaf.dns_names) {
            return Err(RemoteError::DnsMismatch);
        }
        Ok(())
    }
}

/// An empty allow-list accepts anything; otherwise some candidate must be on
/// the list.
fn matches_any(allowed: &[String], candidates: &[String]) -> bool {
    allowed.is_empty() || candidates.iter().any(|c| allowed.contains(c))
}
