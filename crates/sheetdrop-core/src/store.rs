//! Persistence store abstraction and an in-memory implementation.
//!
//! The store exclusively owns invoice records and vendor mappings; the
//! pipeline never caches them beyond one request. The per-user upload counter
//! is also owned here and committed per persisted record, so the single
//! source of truth lives in the persistence layer rather than request-scoped
//! memory.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::models::invoice::{InvoiceRecord, NewInvoice, ProcessingStatus};
use crate::models::mapping::{MappingSource, MappingUpdate, NewMapping, VendorMapping};
use crate::models::user::UserAccount;

/// Filter for invoice listings.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub status: Option<ProcessingStatus>,
    pub sender_email: Option<String>,
}

/// CRUD surface the pipeline needs from the persistence layer.
pub trait Store {
    /// Look up an invoice by (user, invoice number).
    fn find_invoice(
        &self,
        user_id: &str,
        invoice_number: &str,
    ) -> Result<Option<InvoiceRecord>, StoreError>;

    /// Insert a record. Enforces the sparse unique (user, invoice number)
    /// constraint: non-empty numbers must not collide, empty numbers may
    /// repeat freely.
    fn insert_invoice(&self, invoice: NewInvoice) -> Result<InvoiceRecord, StoreError>;

    /// List a user's records, newest first.
    fn list_invoices(
        &self,
        user_id: &str,
        filter: &InvoiceFilter,
    ) -> Result<Vec<InvoiceRecord>, StoreError>;

    /// Active mapping for (user, sender), if any.
    fn find_active_mapping(
        &self,
        user_id: &str,
        sender_email: &str,
    ) -> Result<Option<VendorMapping>, StoreError>;

    /// Insert a mapping unless one already exists for (user, sender).
    /// Returns `false` when a concurrent writer got there first.
    fn create_mapping_if_absent(&self, mapping: NewMapping) -> Result<bool, StoreError>;

    /// Create or revise a mapping. Revisions merge the supplied fields and
    /// bump `version`; creations start at version 1 with source `MANUAL`.
    fn upsert_mapping(&self, update: MappingUpdate) -> Result<VendorMapping, StoreError>;

    /// Retire a mapping without deleting it.
    fn deactivate_mapping(&self, user_id: &str, sender_email: &str) -> Result<(), StoreError>;

    /// All mappings owned by a user, active or not.
    fn list_mappings(&self, user_id: &str) -> Result<Vec<VendorMapping>, StoreError>;

    /// Transactionally bump the user's uploaded-invoice counter, returning
    /// the new value. Called once per persisted record.
    fn increment_invoices_uploaded(&self, user_id: &str) -> Result<u32, StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MemoryInner {
    next_id: u64,
    invoices: Vec<InvoiceRecord>,
    mappings: Vec<VendorMapping>,
    users: HashMap<String, UserAccount>,
}

/// In-memory store used by tests and the CLI's JSON-file persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate a store from a JSON snapshot.
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        let inner: MemoryInner = serde_json::from_str(data)?;
        Ok(Self {
            inner: Mutex::new(inner),
        })
    }

    /// Serialize the full store state to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&*self.lock())
    }

    /// Register or replace a user aggregate. The stored copy backs the
    /// upload counter.
    pub fn put_user(&self, user: &UserAccount) {
        self.lock().users.insert(user.id.clone(), user.clone());
    }

    /// Stored user aggregate, if registered.
    pub fn get_user(&self, user_id: &str) -> Option<UserAccount> {
        self.lock().users.get(user_id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        // A poisoned lock means a panic mid-mutation; tests should see it.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Store for MemoryStore {
    fn find_invoice(
        &self,
        user_id: &str,
        invoice_number: &str,
    ) -> Result<Option<InvoiceRecord>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .invoices
            .iter()
            .find(|r| r.user_id == user_id && r.invoice_number == invoice_number)
            .cloned())
    }

    fn insert_invoice(&self, invoice: NewInvoice) -> Result<InvoiceRecord, StoreError> {
        let mut inner = self.lock();

        if !invoice.invoice_number.is_empty()
            && inner
                .invoices
                .iter()
                .any(|r| r.user_id == invoice.user_id && r.invoice_number == invoice.invoice_number)
        {
            return Err(StoreError::DuplicateInvoice {
                user_id: invoice.user_id,
                invoice_number: invoice.invoice_number,
            });
        }

        inner.next_id += 1;
        let now = Utc::now();
        let record = InvoiceRecord {
            id: inner.next_id,
            user_id: invoice.user_id,
            sender_email: invoice.sender_email,
            file_name: invoice.file_name,
            extracted_text: invoice.extracted_text,
            invoice_number: invoice.invoice_number,
            invoice_date: invoice.invoice_date,
            total_amount: invoice.total_amount,
            confidence_score: invoice.confidence_score,
            status: invoice.status,
            spreadsheet_id: invoice.spreadsheet_id,
            created_at: now,
            updated_at: now,
        };
        inner.invoices.push(record.clone());
        debug!(
            "stored invoice {} ({}) for user {}",
            record.id, record.invoice_number, record.user_id
        );
        Ok(record)
    }

    fn list_invoices(
        &self,
        user_id: &str,
        filter: &InvoiceFilter,
    ) -> Result<Vec<InvoiceRecord>, StoreError> {
        let inner = self.lock();
        let mut records: Vec<InvoiceRecord> = inner
            .invoices
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| {
                filter
                    .sender_email
                    .as_deref()
                    .is_none_or(|sender| r.sender_email == sender)
            })
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    fn find_active_mapping(
        &self,
        user_id: &str,
        sender_email: &str,
    ) -> Result<Option<VendorMapping>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .mappings
            .iter()
            .find(|m| m.user_id == user_id && m.sender_email == sender_email && m.is_active)
            .cloned())
    }

    fn create_mapping_if_absent(&self, mapping: NewMapping) -> Result<bool, StoreError> {
        let mut inner = self.lock();

        let exists = inner
            .mappings
            .iter()
            .any(|m| m.user_id == mapping.user_id && m.sender_email == mapping.sender_email);
        if exists {
            return Ok(false);
        }

        let now = Utc::now();
        inner.mappings.push(VendorMapping {
            sender_email: mapping.sender_email,
            user_id: mapping.user_id,
            vendor_name: mapping.vendor_name,
            field_mappings: mapping.field_mappings,
            extraction_rules: mapping.extraction_rules,
            mapping_source: mapping.mapping_source,
            is_active: true,
            version: 1,
            created_at: now,
            updated_at: now,
        });
        Ok(true)
    }

    fn upsert_mapping(&self, update: MappingUpdate) -> Result<VendorMapping, StoreError> {
        let mut inner = self.lock();

        if let Some(existing) = inner
            .mappings
            .iter_mut()
            .find(|m| m.user_id == update.user_id && m.sender_email == update.sender_email)
        {
            if let Some(vendor_name) = update.vendor_name {
                existing.vendor_name = Some(vendor_name);
            }
            if let Some(field_mappings) = update.field_mappings {
                existing.field_mappings = field_mappings;
            }
            if let Some(extraction_rules) = update.extraction_rules {
                existing.extraction_rules = extraction_rules;
            }
            existing.version += 1;
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let mapping = VendorMapping {
            sender_email: update.sender_email,
            user_id: update.user_id,
            vendor_name: update.vendor_name,
            field_mappings: update.field_mappings.unwrap_or_default(),
            extraction_rules: update.extraction_rules.unwrap_or_default(),
            mapping_source: MappingSource::Manual,
            is_active: true,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        inner.mappings.push(mapping.clone());
        Ok(mapping)
    }

    fn deactivate_mapping(&self, user_id: &str, sender_email: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(mapping) = inner
            .mappings
            .iter_mut()
            .find(|m| m.user_id == user_id && m.sender_email == sender_email)
        {
            mapping.is_active = false;
            mapping.updated_at = Utc::now();
        }
        Ok(())
    }

    fn list_mappings(&self, user_id: &str) -> Result<Vec<VendorMapping>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .mappings
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    fn increment_invoices_uploaded(&self, user_id: &str) -> Result<u32, StoreError> {
        let mut inner = self.lock();
        let user = inner
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::UnknownUser(user_id.to_string()))?;
        user.subscription.invoices_uploaded += 1;
        Ok(user.subscription.invoices_uploaded)
    }
}
