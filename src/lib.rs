//! # Boleto Adapters
//!
//! Bank connectivity layer for boleto (Brazilian bank slip) issuance with:
//! - Registration, write-off (baixa) and query across five institutions
//! - Typed per-bank request/response schemas (REST+JSON and SOAP+XML)
//! - Canonical error-code resolution with fuzzy matching + checksum fallback
//! - Bearer-token caching keyed per (bank, covenant, beneficiary)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │            BoletoService (per-bank trait)           │
//! └────────────┬────────────────────────────────────────┘
//!              │
//!     ┌────────┼───────────┬───────────┬────────────┐
//!     │        │           │           │            │
//! ┌───▼────┐ ┌─▼──────┐ ┌──▼─────┐ ┌──▼──────┐ ┌───▼─────┐
//! │Bradesco│ │ Banco  │ │ Caixa  │ │Santander│ │CrediSIS │
//! │  REST  │ │ Brasil │ │  SOAP  │ │REST+mTLS│ │  SOAP   │
//! │ signed │ │  REST  │ │ hashed │ │         │ │ header  │
//! └───┬────┘ └─┬──────┘ └──┬─────┘ └──┬──────┘ └───┬─────┘
//!     │        │           │          │            │
//!     └────────┴───────────┴──────────┴────────────┘
//!              │
//! ┌────────────▼─────────────────────────────────────┐
//! │   Entities + Helpers + Resolver + TokenCache     │
//! └──────────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod banks;
pub mod boleto;
pub mod certificate;
pub mod config;
pub mod entity;
pub mod error;
pub mod helper;
pub mod resolver;
pub mod service;
pub mod soap;
pub mod token_cache;

pub use error::{Error, Result};
pub use service::{Bank, BoletoService};
pub use token_cache::{InMemoryTokenCache, TokenCache};

/// Default request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Default connect timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 5;

/// Maximum number of discount tiers a bank accepts
pub const MAX_DISCOUNT_TIERS: usize = 3;
