//! Programmatic per-bank configuration
//!
//! Endpoints and timeouts ship with production defaults; tests and callers
//! override them field-by-field. No environment variables are read.

use serde::{Deserialize, Serialize};

/// Transport knobs shared by every bank client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout (seconds)
    pub timeout_seconds: u64,

    /// Connect timeout (seconds)
    pub connect_timeout_seconds: u64,

    /// Skip server-certificate verification (homologation environments
    /// with broken chains only)
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: crate::DEFAULT_REQUEST_TIMEOUT_SECONDS,
            connect_timeout_seconds: crate::DEFAULT_CONNECT_TIMEOUT_SECONDS,
            accept_invalid_certs: false,
        }
    }
}

/// Bradesco Open API endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BradescoConfig {
    /// Production base URL
    pub production_url: String,

    /// Homologation proxy base URL
    pub sandbox_url: String,

    /// Token endpoint path in production
    pub production_auth_path: String,

    /// Token endpoint path in homologation
    pub sandbox_auth_path: String,

    /// Hybrid boleto registration path
    pub register_path: String,

    /// Transport knobs
    pub http: HttpConfig,
}

impl Default for BradescoConfig {
    fn default() -> Self {
        Self {
            production_url: "https://openapi.bradesco.com.br".to_string(),
            sandbox_url: "https://proxy.api.prebanco.com.br".to_string(),
            production_auth_path: "/auth/server/v1.1/token".to_string(),
            sandbox_auth_path: "/auth/server/v1.2/token".to_string(),
            register_path: "/v1/boleto-hibrido/registrar-boleto".to_string(),
            http: HttpConfig::default(),
        }
    }
}

impl BradescoConfig {
    /// Base URL for the selected environment
    pub fn base_url(&self, sandbox: bool) -> &str {
        if sandbox {
            &self.sandbox_url
        } else {
            &self.production_url
        }
    }

    /// Token endpoint path for the selected environment
    pub fn auth_path(&self, sandbox: bool) -> &str {
        if sandbox {
            &self.sandbox_auth_path
        } else {
            &self.production_auth_path
        }
    }
}

/// Banco do Brasil endpoints (API and OAuth hosts differ)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BancoBrasilConfig {
    /// Production API base URL
    pub production_url: String,

    /// Homologation API base URL
    pub sandbox_url: String,

    /// Production OAuth token URL
    pub production_auth_url: String,

    /// Homologation OAuth token URL
    pub sandbox_auth_url: String,

    /// Transport knobs
    pub http: HttpConfig,
}

impl Default for BancoBrasilConfig {
    fn default() -> Self {
        Self {
            production_url: "https://api.bb.com.br".to_string(),
            sandbox_url: "https://api.hm.bb.com.br".to_string(),
            production_auth_url: "https://oauth.bb.com.br/oauth/token".to_string(),
            sandbox_auth_url: "https://oauth.hm.bb.com.br/oauth/token".to_string(),
            http: HttpConfig::default(),
        }
    }
}

impl BancoBrasilConfig {
    /// API base URL for the selected environment
    pub fn base_url(&self, sandbox: bool) -> &str {
        if sandbox {
            &self.sandbox_url
        } else {
            &self.production_url
        }
    }

    /// OAuth token URL for the selected environment
    pub fn auth_url(&self, sandbox: bool) -> &str {
        if sandbox {
            &self.sandbox_auth_url
        } else {
            &self.production_auth_url
        }
    }
}

/// Caixa SIBAR barramento endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaixaConfig {
    /// SOAP service URL
    pub url: String,

    /// Transport knobs
    pub http: HttpConfig,
}

impl Default for CaixaConfig {
    fn default() -> Self {
        Self {
            url: "https://barramento.caixa.gov.br/sibar/ManutencaoCobrancaBancaria/Boleto/Externo"
                .to_string(),
            http: HttpConfig::default(),
        }
    }
}

/// Santander collection-management endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SantanderConfig {
    /// Production base URL
    pub production_url: String,

    /// Homologation base URL
    pub sandbox_url: String,

    /// OAuth token path (same host, mutual TLS)
    pub auth_path: String,

    /// Transport knobs
    pub http: HttpConfig,
}

impl Default for SantanderConfig {
    fn default() -> Self {
        Self {
            production_url: "https://trust-open.api.santander.com.br".to_string(),
            sandbox_url: "https://trust-open-h.api.santander.com.br".to_string(),
            auth_path: "/auth/oauth/v2/token".to_string(),
            http: HttpConfig::default(),
        }
    }
}

impl SantanderConfig {
    /// Base URL for the selected environment
    pub fn base_url(&self, sandbox: bool) -> &str {
        if sandbox {
            &self.sandbox_url
        } else {
            &self.production_url
        }
    }
}

/// CrediSIS cooperative SOAP endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredisisConfig {
    /// SOAP service URL
    pub url: String,

    /// Transport knobs
    pub http: HttpConfig,
}

impl Default for CredisisConfig {
    fn default() -> Self {
        Self {
            url: "https://credisiscobranca.com.br/v2/ws".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_selection() {
        let cfg = BradescoConfig::default();
        assert!(cfg.base_url(false).contains("openapi.bradesco"));
        assert!(cfg.base_url(true).contains("prebanco"));
        assert_eq!(cfg.auth_path(true), "/auth/server/v1.2/token");

        let bb = BancoBrasilConfig::default();
        assert!(bb.auth_url(false).contains("oauth.bb.com.br"));
        assert!(bb.auth_url(true).contains("oauth.hm.bb.com.br"));
    }
}
