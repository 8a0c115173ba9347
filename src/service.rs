//! Per-bank service interface

use std::time::Duration;

use async_trait::async_trait;

use crate::config::HttpConfig;
use crate::{Error, Result};

/// Supported institutions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bank {
    /// Bradesco (237)
    Bradesco,
    /// Banco do Brasil (001)
    BancoBrasil,
    /// Caixa Econômica Federal (104)
    Caixa,
    /// Santander (033)
    Santander,
    /// CrediSIS (097)
    Credisis,
}

impl std::fmt::Display for Bank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bank::Bradesco => write!(f, "bradesco"),
            Bank::BancoBrasil => write!(f, "banco-do-brasil"),
            Bank::Caixa => write!(f, "caixa"),
            Bank::Santander => write!(f, "santander"),
            Bank::Credisis => write!(f, "credisis"),
        }
    }
}

/// One boleto operation against one institution.
///
/// A service instance carries the entities for a single boleto: configure
/// it, call exactly one operation, read the populated outputs, discard it.
#[async_trait]
pub trait BoletoService: Send {
    /// Which institution this service talks to
    fn bank(&self) -> Bank;

    /// Register the boleto. On success the digitable line, barcode and
    /// (when requested) PIX payload become readable on the instance.
    async fn register(&mut self) -> Result<()>;

    /// Write off / cancel a previously registered boleto
    async fn settle(&mut self) -> Result<()>;

    /// Fetch the current state of a registered boleto and repopulate the
    /// instance outputs. Not every institution offers this.
    async fn query(&mut self) -> Result<()> {
        Err(Error::Unsupported("query"))
    }
}

/// HTTP client honoring the shared transport knobs
pub(crate) fn build_client(http: &HttpConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(http.timeout_seconds))
        .connect_timeout(Duration::from_secs(http.connect_timeout_seconds));
    if http.accept_invalid_certs {
        builder = builder.danger_accept_invalid_certs(true);
    }
    Ok(builder.build()?)
}

/// HTTP client that also presents a client certificate (mutual TLS)
pub(crate) fn build_client_with_identity(
    http: &HttpConfig,
    identity: reqwest::Identity,
) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(http.timeout_seconds))
        .connect_timeout(Duration::from_secs(http.connect_timeout_seconds))
        .identity(identity);
    if http.accept_invalid_certs {
        builder = builder.danger_accept_invalid_certs(true);
    }
    Ok(builder.build()?)
}
