//! Ledger inspection command implementation.

use crate::cli::{LedgerAction, LedgerArgs};
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use modelcat_domain::traits::LedgerStore;
use modelcat_domain::SourceKey;
use modelcat_store::SqliteLedger;

/// Execute a ledger command.
pub async fn execute_ledger(args: LedgerArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let ledger = SqliteLedger::new(&config.storage.database_path)?;

    let output = match args.action {
        LedgerAction::Recent { limit } => formatter.format_records(&ledger.recent(limit)?)?,
        LedgerAction::Show { key } => {
            let history = ledger.history(&SourceKey::new(key)).await?;
            formatter.format_records(&history)?
        }
        LedgerAction::Counts => formatter.format_counts(&ledger.counts()?)?,
    };
    println!("{}", output);

    Ok(())
}
