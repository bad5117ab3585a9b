//! CLI command implementations.

pub mod account;
pub mod invoices;
pub mod mappings;
pub mod process;
