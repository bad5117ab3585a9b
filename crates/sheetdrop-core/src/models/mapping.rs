//! Vendor mappings: per-sender extraction rules, learned or manually
//! configured.
//!
//! Mappings are scoped per (user, sender) for tenant isolation. They are
//! never hard-deleted in normal operation; `is_active` retires them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a mapping came into existence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingSource {
    /// Synthesized by the auto-learning heuristic.
    #[default]
    Auto,
    /// Supplied by a caller through the mapping-management operations.
    Manual,
}

/// Regex extraction rules. Each pattern is expected to contain exactly one
/// capture group; group 1 becomes the field value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<String>,
}

/// Column/position hints for tabular sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMappings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<String>,
}

/// Learned or manually configured extraction rules for one sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorMapping {
    /// Sender the mapping applies to.
    pub sender_email: String,

    /// Owning user.
    pub user_id: String,

    /// Optional display label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,

    /// Column hints for tabular sources.
    #[serde(default)]
    pub field_mappings: FieldMappings,

    /// Regex rules applied before the generic fallback patterns.
    #[serde(default)]
    pub extraction_rules: ExtractionRules,

    pub mapping_source: MappingSource,

    /// Inactive mappings are ignored by the extraction engine.
    pub is_active: bool,

    /// Incremented on every rule update.
    pub version: u32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a new mapping. The store sets `version = 1`,
/// `is_active = true`, and the timestamps.
#[derive(Debug, Clone)]
pub struct NewMapping {
    pub sender_email: String,
    pub user_id: String,
    pub vendor_name: Option<String>,
    pub field_mappings: FieldMappings,
    pub extraction_rules: ExtractionRules,
    pub mapping_source: MappingSource,
}

/// Caller-supplied revision for a manual create-or-update. Absent fields
/// leave the existing values alone; a revision bumps `version`.
#[derive(Debug, Clone)]
pub struct MappingUpdate {
    pub sender_email: String,
    pub user_id: String,
    pub vendor_name: Option<String>,
    pub field_mappings: Option<FieldMappings>,
    pub extraction_rules: Option<ExtractionRules>,
}
