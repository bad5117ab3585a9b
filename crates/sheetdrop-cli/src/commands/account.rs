//! Account command - user accounts, spreadsheets, and tier changes.

use std::path::Path;

use anyhow::Context;
use clap::{Args, Subcommand};
use console::style;

use sheetdrop_core::models::user::{Tier, UserAccount};

use crate::state;

/// Arguments for the account command.
#[derive(Args)]
pub struct AccountArgs {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum TierArg {
    Free,
    Basic,
    Pro,
}

impl TierArg {
    fn tier(self) -> Tier {
        match self {
            Self::Free => Tier::Free,
            Self::Basic => Tier::Basic,
            Self::Pro => Tier::Pro,
        }
    }
}

#[derive(Subcommand)]
enum AccountCommand {
    /// Create a new user account
    Create {
        /// User id
        #[arg(short, long)]
        user: String,

        /// User email
        #[arg(long)]
        email: String,

        /// Subscription tier
        #[arg(long, value_enum, default_value = "free")]
        tier: TierArg,
    },

    /// Connect a spreadsheet to an account
    Connect {
        /// User id
        #[arg(short, long)]
        user: String,

        /// Spreadsheet id
        #[arg(long)]
        id: String,

        /// Spreadsheet display name
        #[arg(long)]
        name: String,
    },

    /// Move an account to a different tier
    Upgrade {
        /// User id
        #[arg(short, long)]
        user: String,

        /// Target tier
        #[arg(long, value_enum)]
        tier: TierArg,
    },

    /// Show an account's subscription and spreadsheets
    Show {
        /// User id
        #[arg(short, long)]
        user: String,
    },
}

pub fn run(args: AccountArgs, state_path: &Path) -> anyhow::Result<()> {
    let store = state::load(state_path)?;

    match args.command {
        AccountCommand::Create { user, email, tier } => {
            if store.get_user(&user).is_some() {
                anyhow::bail!("user {} already exists", user);
            }
            let account = UserAccount::new(user, email, tier.tier());
            store.put_user(&account);
            state::save(&store, state_path)?;
            println!(
                "{} Created {} on the {} tier",
                style("✓").green(),
                account.id,
                account.subscription.tier
            );
        }
        AccountCommand::Connect { user, id, name } => {
            let mut account = store
                .get_user(&user)
                .with_context(|| format!("unknown user: {user}"))?;
            account.connect_spreadsheet(id.clone(), name)?;
            store.put_user(&account);
            state::save(&store, state_path)?;
            println!("{} Connected spreadsheet {}", style("✓").green(), id);
        }
        AccountCommand::Upgrade { user, tier } => {
            let mut account = store
                .get_user(&user)
                .with_context(|| format!("unknown user: {user}"))?;
            account.upgrade_tier(tier.tier());
            store.put_user(&account);
            state::save(&store, state_path)?;
            println!(
                "{} {} is now on the {} tier",
                style("✓").green(),
                account.id,
                account.subscription.tier
            );
        }
        AccountCommand::Show { user } => {
            let account = store
                .get_user(&user)
                .with_context(|| format!("unknown user: {user}"))?;
            println!("{} <{}>", account.id, account.email);
            println!(
                "  tier: {}, invoices uploaded: {}",
                account.subscription.tier, account.subscription.invoices_uploaded
            );
            if account.spreadsheets.is_empty() {
                println!("  no spreadsheets connected");
            }
            for sheet in &account.spreadsheets {
                println!(
                    "  spreadsheet {} ({}) connected {}",
                    sheet.spreadsheet_id,
                    sheet.spreadsheet_name,
                    sheet.connected_at.format("%Y-%m-%d")
                );
            }
        }
    }
    Ok(())
}
