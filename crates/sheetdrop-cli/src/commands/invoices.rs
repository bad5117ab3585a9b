//! Invoices command - list a user's extraction records.

use std::path::Path;

use clap::Args;
use console::style;

use sheetdrop_core::store::{InvoiceFilter, Store};
use sheetdrop_core::ProcessingStatus;

use crate::state;

/// Arguments for the invoices command.
#[derive(Args)]
pub struct InvoicesArgs {
    /// User id to list records for
    #[arg(short, long)]
    user: String,

    /// Only records with this status
    #[arg(long, value_enum)]
    status: Option<StatusArg>,

    /// Only records from this sender
    #[arg(long)]
    sender: Option<String>,

    /// Print records as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum StatusArg {
    NeedsReview,
    Failed,
    AutoProcessed,
    ManualReview,
}

impl StatusArg {
    fn status(self) -> ProcessingStatus {
        match self {
            Self::NeedsReview => ProcessingStatus::NeedsReview,
            Self::Failed => ProcessingStatus::Failed,
            Self::AutoProcessed => ProcessingStatus::AutoProcessed,
            Self::ManualReview => ProcessingStatus::ManualReview,
        }
    }
}

pub fn run(args: InvoicesArgs, state_path: &Path) -> anyhow::Result<()> {
    let store = state::load(state_path)?;

    let filter = InvoiceFilter {
        status: args.status.map(StatusArg::status),
        sender_email: args.sender.clone(),
    };
    let records = store.list_invoices(&args.user, &filter)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{} No matching records", style("ℹ").blue());
        return Ok(());
    }

    for record in &records {
        let number = if record.invoice_number.is_empty() {
            "(no number)"
        } else {
            &record.invoice_number
        };
        println!(
            "{:<20} {:<12} {:>12}  {:<16} {:.2}  {} ({})",
            number,
            record.invoice_date,
            record.total_amount,
            record.status,
            record.confidence_score,
            record.sender_email,
            record.file_name,
        );
    }
    println!();
    println!("{} {} record(s)", style("ℹ").blue(), records.len());
    Ok(())
}
