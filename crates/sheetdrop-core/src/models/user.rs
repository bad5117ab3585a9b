//! The user account aggregate consumed by the pipeline.
//!
//! The aggregate is loaded once per request, mutated in memory during batch
//! processing, and committed back by the caller. The uploaded-invoice counter
//! itself is owned by the store; the in-memory value mirrors it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AccountError;

/// Subscription tier governing the invoice-count and spreadsheet ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Free,
    Basic,
    Pro,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => f.write_str("Free"),
            Self::Basic => f.write_str("Basic"),
            Self::Pro => f.write_str("Pro"),
        }
    }
}

/// How the target spreadsheet is chosen for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Always the first connected spreadsheet.
    FirstConnected,
    /// The caller selects one of the connected spreadsheets.
    CallerSelected,
}

/// Tier-specific knobs consumed by the generic pipeline. Extraction logic is
/// identical across tiers; only these values differ.
#[derive(Debug, Clone, Copy)]
pub struct TierPolicy {
    /// Invoice-count ceiling; `None` means unlimited.
    pub invoice_ceiling: Option<u32>,
    /// Connected-spreadsheet ceiling; `None` means unlimited.
    pub spreadsheet_limit: Option<u32>,
    /// Spreadsheet selection rule.
    pub selection: SelectionPolicy,
}

impl Tier {
    /// Policy table keyed by subscription tier.
    pub fn policy(self) -> TierPolicy {
        match self {
            Tier::Free => TierPolicy {
                invoice_ceiling: Some(20),
                spreadsheet_limit: Some(1),
                selection: SelectionPolicy::FirstConnected,
            },
            Tier::Basic => TierPolicy {
                invoice_ceiling: Some(200),
                spreadsheet_limit: Some(3),
                selection: SelectionPolicy::CallerSelected,
            },
            Tier::Pro => TierPolicy {
                invoice_ceiling: None,
                spreadsheet_limit: None,
                selection: SelectionPolicy::CallerSelected,
            },
        }
    }
}

/// A connected spreadsheet entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadsheetRef {
    pub spreadsheet_id: String,
    pub spreadsheet_name: String,
    pub connected_at: DateTime<Utc>,
}

/// Subscription state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub tier: Tier,
    /// Running count of processed invoices, mirrored from the store.
    pub invoices_uploaded: u32,
    /// Connected-spreadsheet ceiling; `None` means unlimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spreadsheet_limit: Option<u32>,
}

impl Subscription {
    /// Fresh subscription for a tier, ceilings from the policy table.
    pub fn for_tier(tier: Tier) -> Self {
        Self {
            tier,
            invoices_uploaded: 0,
            spreadsheet_limit: tier.policy().spreadsheet_limit,
        }
    }
}

/// A user account with its connected spreadsheets and subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: String,
    pub email: String,
    pub spreadsheets: Vec<SpreadsheetRef>,
    pub subscription: Subscription,
}

impl UserAccount {
    /// New account on the given tier with no spreadsheets connected.
    pub fn new(id: impl Into<String>, email: impl Into<String>, tier: Tier) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            spreadsheets: Vec::new(),
            subscription: Subscription::for_tier(tier),
        }
    }

    /// First connected spreadsheet, the Free-tier sink target.
    pub fn first_spreadsheet(&self) -> Option<&SpreadsheetRef> {
        self.spreadsheets.first()
    }

    /// Connected spreadsheet with the given id, if any.
    pub fn find_spreadsheet(&self, spreadsheet_id: &str) -> Option<&SpreadsheetRef> {
        self.spreadsheets
            .iter()
            .find(|s| s.spreadsheet_id == spreadsheet_id)
    }

    /// Connect a spreadsheet, enforcing the tier ceiling and uniqueness by id
    /// and by case-insensitive name.
    pub fn connect_spreadsheet(
        &mut self,
        spreadsheet_id: impl Into<String>,
        spreadsheet_name: impl Into<String>,
    ) -> Result<(), AccountError> {
        let spreadsheet_id = spreadsheet_id.into();
        let spreadsheet_name = spreadsheet_name.into();

        if let Some(limit) = self.subscription.spreadsheet_limit {
            if self.spreadsheets.len() as u32 >= limit {
                return Err(AccountError::SpreadsheetLimitReached {
                    tier: self.subscription.tier,
                });
            }
        }
        if self.find_spreadsheet(&spreadsheet_id).is_some() {
            return Err(AccountError::DuplicateSpreadsheetId(spreadsheet_id));
        }
        if self
            .spreadsheets
            .iter()
            .any(|s| s.spreadsheet_name.eq_ignore_ascii_case(&spreadsheet_name))
        {
            return Err(AccountError::DuplicateSpreadsheetName(spreadsheet_name));
        }

        self.spreadsheets.push(SpreadsheetRef {
            spreadsheet_id,
            spreadsheet_name,
            connected_at: Utc::now(),
        });
        Ok(())
    }

    /// Move the account to a new tier and refresh the spreadsheet ceiling
    /// from the policy table. The upload counter carries over.
    pub fn upgrade_tier(&mut self, tier: Tier) {
        self.subscription.tier = tier;
        self.subscription.spreadsheet_limit = tier.policy().spreadsheet_limit;
    }
}
