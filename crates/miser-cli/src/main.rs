//! miser
//!
//! Command-line front end for the ledger: a thin `clap` wrapper that wires
//! the five journal-backed registries to `miser_ledger::Ledger` and drives
//! them from a data directory on disk.
//!
//! Usage:
//!   miser open-account --name <name> --type <Asset|Liability|Equity|Income|Expense> --currency <code> [--description <text>] [--opened-at <rfc3339>] [--initial-balance <amount>]
//!   miser post --source <id> --dest <id> --amount <amount> [--instant <rfc3339>] [--memo <text>]
//!   miser balance --account <id>
//!   miser accounts
//!   miser transactions [--account <id>]
//!   miser trial-balance
//!   miser demo

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use miser_core::Id;
use miser_crypto::Cipher;
use miser_journal::{AccountType, ACCOUNTS_FILE, BALANCES_FILE, TAGS_FILE, TAG_BINDINGS_FILE, TRANSACTIONS_FILE};
use miser_ledger::Ledger;
use miser_registry::{AccountRegistry, BalanceRegistry, TagBindingRegistry, TagRegistry, TransactionRegistry};

// ── CLI definition ────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "miser", version, about = "Personal double-entry ledger")]
struct Args {
    /// Directory holding the journal files.
    #[arg(long, global = true, default_value = "~/.miser")]
    data_dir: PathBuf,

    /// 64 hex chars (32 bytes) AES-256-GCM key. Defaults to a fixed,
    /// clearly-insecure demo key — pass a real one for anything that
    /// matters.
    #[arg(long, global = true)]
    key_hex: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open a new account.
    OpenAccount {
        #[arg(long)]
        name: String,
        #[arg(long = "type")]
        account_type: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        currency: String,
        /// RFC3339 instant; defaults to now.
        #[arg(long)]
        opened_at: Option<String>,
        #[arg(long, default_value_t = 0.0)]
        initial_balance: f64,
    },

    /// Post a transaction between two accounts.
    Post {
        #[arg(long)]
        source: String,
        #[arg(long)]
        dest: String,
        #[arg(long)]
        amount: f64,
        /// RFC3339 instant; defaults to now.
        #[arg(long)]
        instant: Option<String>,
        #[arg(long, default_value = "")]
        memo: String,
    },

    /// Print an account's current balance.
    Balance {
        #[arg(long)]
        account: String,
    },

    /// List every open account.
    Accounts,

    /// List transactions, optionally restricted to one account.
    Transactions {
        #[arg(long)]
        account: Option<String>,
    },

    /// Print the net of every account's current balance (zero if
    /// consistent).
    TrialBalance,

    /// Open two demo accounts, post one transaction between them, print
    /// balances, and flush everything to disk.
    Demo,
}

// ── Main ──────────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn,miser=info")
        .init();

    let args = Args::parse();
    let data_dir = expand_tilde(&args.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;
    let cipher = Cipher::new(parse_key(args.key_hex.as_deref())?);

    let accounts = Arc::new(AccountRegistry::new());
    let transactions = Arc::new(TransactionRegistry::new());
    let balances = Arc::new(BalanceRegistry::new());
    let tags = Arc::new(TagRegistry::new());
    let tag_bindings = Arc::new(TagBindingRegistry::new());

    let n = accounts.load(&data_dir.join(ACCOUNTS_FILE), &cipher)?;
    info!(n, "accounts loaded");
    let n = transactions.load(&data_dir.join(TRANSACTIONS_FILE), &cipher)?;
    info!(n, "transactions loaded");
    let n = balances.load(&data_dir.join(BALANCES_FILE), &cipher)?;
    info!(n, "balances loaded");
    let n = tags.load(&data_dir.join(TAGS_FILE), &cipher)?;
    info!(n, "tags loaded");
    let n = tag_bindings.load(&data_dir.join(TAG_BINDINGS_FILE), &cipher)?;
    info!(n, "tag bindings loaded");

    let ledger = Ledger::new(
        accounts.clone(),
        transactions.clone(),
        balances.clone(),
        tags.clone(),
        tag_bindings.clone(),
    );

    match args.command {
        Command::OpenAccount { name, account_type, description, currency, opened_at, initial_balance } => {
            let account_type: AccountType = account_type.parse()?;
            let opened_at = parse_instant(opened_at.as_deref())?;
            let account = ledger.open_account(&name, account_type, &description, &currency, opened_at, initial_balance)?;
            println!("Opened account {} ({})", account.id, account.name.as_str());
        }

        Command::Post { source, dest, amount, instant, memo } => {
            let instant = parse_instant(instant.as_deref())?;
            let tx = ledger.post_transaction(&Id::from(source), &Id::from(dest), instant, amount, &memo)?;
            println!("Posted transaction {}", tx.id);
        }

        Command::Balance { account } => {
            let id = Id::from(account);
            println!("{:.2}", ledger.amount(&id)?);
        }

        Command::Accounts => {
            for account in accounts.list() {
                println!(
                    "{}  {:<10}  {:<20}  {}",
                    account.id,
                    account.account_type()?,
                    account.name.as_str(),
                    account.currency_code.as_str()
                );
            }
        }

        Command::Transactions { account } => {
            let filter = account.map(Id::from);
            for tx in transactions_for(&transactions, &accounts, filter.as_ref()) {
                println!(
                    "{}  {} -> {}  {:.2}  {}",
                    tx.id,
                    tx.source,
                    tx.dest,
                    miser_core::to_decimal(tx.value),
                    tx.memo.as_str()
                );
            }
        }

        Command::TrialBalance => {
            println!("{:.2}", ledger.trial_balance()?);
        }

        Command::Demo => run_demo(&ledger)?,
    }

    let n = accounts.save(&data_dir.join(ACCOUNTS_FILE), &cipher)?;
    info!(n, "accounts saved");
    let n = transactions.save(&data_dir.join(TRANSACTIONS_FILE), &cipher)?;
    info!(n, "transactions saved");
    let n = balances.save(&data_dir.join(BALANCES_FILE), &cipher)?;
    info!(n, "balances saved");
    let n = tags.save(&data_dir.join(TAGS_FILE), &cipher)?;
    info!(n, "tags saved");
    let n = tag_bindings.save(&data_dir.join(TAG_BINDINGS_FILE), &cipher)?;
    info!(n, "tag bindings saved");

    Ok(())
}

// ── Demo walkthrough ────────────────────────────────────────────────────────

/// Opens a checking account and a grocery expense account, posts one
/// purchase between them, and prints the resulting balances. Recovered
/// from the original implementation's `cmd/miser/main.go` walkthrough.
fn run_demo(ledger: &Ledger) -> anyhow::Result<()> {
    let now = Utc::now();
    let checking = ledger.open_account("SMBC Trust Bank", AccountType::Asset, "Salary account", "JPY", now, 1555.13)?;
    let grocer = ledger.open_account("AEON Supermarket", AccountType::Expense, "work bank account", "JPY", now, 0.0)?;

    println!("Balance of {} before transaction: {:.2}", checking.name.as_str(), ledger.amount(&checking.id)?);

    let tx = ledger.post_transaction(
        &checking.id,
        &grocer.id,
        now,
        112.56,
        "私は店に行き、卵2kgと小麦粉を買いました。",
    )?;
    println!("Posted transaction {}", tx.id);

    println!("Balance of {} after transaction: {:.2}", checking.name.as_str(), ledger.amount(&checking.id)?);
    println!("Balance of {}: {:.2}", grocer.name.as_str(), ledger.amount(&grocer.id)?);
    println!("Trial balance: {:.2}", ledger.trial_balance()?);
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────

fn transactions_for(
    transactions: &TransactionRegistry,
    accounts: &AccountRegistry,
    filter: Option<&Id>,
) -> Vec<miser_journal::Transaction> {
    match filter {
        Some(account) => transactions.touching(account),
        None => accounts
            .list()
            .into_iter()
            .flat_map(|a| transactions.touching(&a.id))
            .collect(),
    }
}

fn parse_instant(s: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
    match s {
        None => Ok(Utc::now()),
        Some(s) => Ok(DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("parsing instant {s:?} as RFC3339"))?
            .with_timezone(&Utc)),
    }
}

fn parse_key(key_hex: Option<&str>) -> anyhow::Result<[u8; 32]> {
    // Hex encoding of the ASCII string "0123" repeated 8 times, mirroring
    // the original implementation's hardcoded demo key.
    const DEMO_KEY_HEX: &str = "3031323330313233303132333031323330313233303132333031323330313233";

    let hex_str = match key_hex {
        Some(s) => s,
        None => {
            tracing::warn!("no --key-hex given, using the fixed demo key — do not use this for real data");
            DEMO_KEY_HEX
        }
    };
    let bytes = hex::decode(hex_str).context("decoding --key-hex")?;
    if bytes.len() != 32 {
        bail!("key must be exactly 32 bytes (64 hex chars), got {}", bytes.len());
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_key_is_32_bytes() {
        assert_eq!(parse_key(None).unwrap().len(), 32);
    }

    #[test]
    fn wrong_length_key_is_rejected() {
        assert!(parse_key(Some("ab")).is_err());
    }

    #[test]
    fn expand_tilde_substitutes_home() {
        std::env::set_var("HOME", "/home/demo");
        assert_eq!(expand_tilde(Path::new("~/.miser")), PathBuf::from("/home/demo/.miser"));
    }

    #[test]
    fn instant_defaults_to_now() {
        assert!(parse_instant(None).is_ok());
    }
}
