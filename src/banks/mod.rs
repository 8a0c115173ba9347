//! Per-institution service implementations
//!
//! Each bank gets its own module owning the wire schema, the auth strategy
//! and the error normalization for that institution. Nothing here is
//! interchangeable across banks: field widths, date formats and enum codes
//! are part of each wire contract.

pub mod banco_brasil;
pub mod bradesco;
pub mod caixa;
pub mod credisis;
pub mod santander;

pub use banco_brasil::{BancoBrasilService, ClientMode};
pub use bradesco::BradescoService;
pub use caixa::CaixaService;
pub use credisis::CredisisService;
pub use santander::SantanderService;
