//! Mappings command - inspect and revise per-sender vendor mappings.

use std::path::Path;

use clap::{Args, Subcommand};
use console::style;

use sheetdrop_core::models::mapping::{ExtractionRules, MappingUpdate};
use sheetdrop_core::store::Store;

use crate::state;

/// Arguments for the mappings command.
#[derive(Args)]
pub struct MappingsArgs {
    #[command(subcommand)]
    command: MappingsCommand,
}

#[derive(Subcommand)]
enum MappingsCommand {
    /// List a user's vendor mappings
    List {
        /// User id
        #[arg(short, long)]
        user: String,

        /// Print mappings as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create or revise the mapping for a sender
    Set {
        /// User id
        #[arg(short, long)]
        user: String,

        /// Sender email the mapping applies to
        #[arg(long)]
        sender: String,

        /// Vendor display name
        #[arg(long)]
        vendor: Option<String>,

        /// Extraction rule for the invoice number (regex, capture group 1)
        #[arg(long)]
        number_rule: Option<String>,

        /// Extraction rule for the invoice date (regex, capture group 1)
        #[arg(long)]
        date_rule: Option<String>,

        /// Extraction rule for the total amount (regex, capture group 1)
        #[arg(long)]
        amount_rule: Option<String>,
    },

    /// Retire the mapping for a sender without deleting it
    Deactivate {
        /// User id
        #[arg(short, long)]
        user: String,

        /// Sender email the mapping applies to
        #[arg(long)]
        sender: String,
    },
}

pub fn run(args: MappingsArgs, state_path: &Path) -> anyhow::Result<()> {
    let store = state::load(state_path)?;

    match args.command {
        MappingsCommand::List { user, json } => {
            let mappings = store.list_mappings(&user)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&mappings)?);
                return Ok(());
            }
            if mappings.is_empty() {
                println!("{} No mappings", style("ℹ").blue());
                return Ok(());
            }
            for mapping in &mappings {
                let state = if mapping.is_active { "active" } else { "inactive" };
                println!(
                    "{:<32} {:<8} v{:<3} {:?} {}",
                    mapping.sender_email,
                    state,
                    mapping.version,
                    mapping.mapping_source,
                    mapping.vendor_name.as_deref().unwrap_or("-"),
                );
            }
        }
        MappingsCommand::Set {
            user,
            sender,
            vendor,
            number_rule,
            date_rule,
            amount_rule,
        } => {
            let has_rules = number_rule.is_some() || date_rule.is_some() || amount_rule.is_some();
            let extraction_rules = has_rules.then_some(ExtractionRules {
                invoice_number: number_rule,
                invoice_date: date_rule,
                total_amount: amount_rule,
            });

            let mapping = store.upsert_mapping(MappingUpdate {
                sender_email: sender,
                user_id: user,
                vendor_name: vendor,
                field_mappings: None,
                extraction_rules,
            })?;
            state::save(&store, state_path)?;
            println!(
                "{} Mapping for {} at version {}",
                style("✓").green(),
                mapping.sender_email,
                mapping.version
            );
        }
        MappingsCommand::Deactivate { user, sender } => {
            store.deactivate_mapping(&user, &sender)?;
            state::save(&store, state_path)?;
            println!("{} Mapping for {} deactivated", style("✓").green(), sender);
        }
    }
    Ok(())
}
