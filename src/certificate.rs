//! Certificate material for mutual TLS and request signing
//!
//! The core never touches raw key material: PKCS12 extraction happens
//! upstream and this entity receives ready PEM blocks. It offers the three
//! narrow operations the bank services need: a detached SHA-256 RSA
//! signature, an RS256 encoding key for JWT assertions, and a client
//! identity / temp-file materialization for transport-level TLS.

use std::io::Write;
use std::path::Path;

use jsonwebtoken::{Algorithm, EncodingKey};
use tempfile::NamedTempFile;

use crate::{Error, Result};

/// PKCS12-derived key pair and certificate chain, held as PEM
#[derive(Clone)]
pub struct Certificate {
    private_key_pem: String,
    certificate_pem: String,
    chain_pem: Vec<String>,
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // key material stays out of logs
        f.debug_struct("Certificate")
            .field("chain_len", &self.chain_pem.len())
            .finish()
    }
}

impl Certificate {
    /// Build from an extracted private key and leaf certificate
    pub fn from_pem(
        private_key_pem: impl Into<String>,
        certificate_pem: impl Into<String>,
    ) -> Self {
        Certificate {
            private_key_pem: private_key_pem.into(),
            certificate_pem: certificate_pem.into(),
            chain_pem: Vec::new(),
        }
    }

    /// Attach intermediate certificates
    pub fn with_chain(mut self, chain: Vec<String>) -> Self {
        self.chain_pem = chain;
        self
    }

    /// Private key + leaf + intermediates, concatenated for transports that
    /// take one PEM blob
    pub fn pem_bundle(&self) -> String {
        let mut bundle = String::with_capacity(
            self.private_key_pem.len() + self.certificate_pem.len() + 64 * self.chain_pem.len(),
        );
        bundle.push_str(self.private_key_pem.trim_end());
        bundle.push('\n');
        bundle.push_str(self.certificate_pem.trim_end());
        for extra in &self.chain_pem {
            bundle.push('\n');
            bundle.push_str(extra.trim_end());
        }
        bundle.push('\n');
        bundle
    }

    /// RS256 encoding key for JWT assertions
    pub fn encoding_key(&self) -> Result<EncodingKey> {
        EncodingKey::from_rsa_pem(self.private_key_pem.as_bytes())
            .map_err(|e| Error::Certificate(format!("Invalid RSA private key: {e}")))
    }

    /// Detached RSA SHA-256 signature of `payload`, base64url without padding
    pub fn sign_sha256(&self, payload: &[u8]) -> Result<String> {
        let key = self.encoding_key()?;
        jsonwebtoken::crypto::sign(payload, &key, Algorithm::RS256)
            .map_err(|e| Error::Certificate(format!("Signature failed: {e}")))
    }

    /// Client identity for mutual TLS
    pub fn identity(&self) -> Result<reqwest::Identity> {
        reqwest::Identity::from_pem(self.pem_bundle().as_bytes())
            .map_err(|e| Error::Certificate(format!("Invalid client identity: {e}")))
    }

    /// Write the PEM bundle to a scoped temporary file.
    ///
    /// The file is removed when the returned handle drops, on every exit
    /// path; nothing outlives the operation that needed it.
    pub fn materialize_pem(&self) -> Result<PemFile> {
        let mut file = NamedTempFile::new()?;
        file.write_all(self.pem_bundle().as_bytes())?;
        file.flush()?;
        Ok(PemFile { file })
    }
}

/// Scoped on-disk PEM bundle; deleted on drop
pub struct PemFile {
    file: NamedTempFile,
}

impl PemFile {
    /// Path to hand to a transport expecting a client-certificate file
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
