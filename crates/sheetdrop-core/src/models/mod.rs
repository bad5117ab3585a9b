//! Data models for invoice records, vendor mappings, and user accounts.

pub mod invoice;
pub mod mapping;
pub mod user;
