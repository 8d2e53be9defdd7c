//! Submit command implementation.

use super::{build_backend, build_pipeline};
use crate::cli::SubmitArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use modelcat_domain::traits::{CreateOutcome, RecordStore};
use modelcat_domain::EntityKind;
use modelcat_store::SqliteRecordStore;
use std::fs;
use std::io::{self, Read};

/// Execute the submit command.
pub async fn execute_submit(
    args: SubmitArgs,
    config: &Config,
    api_key: Option<&str>,
    formatter: &Formatter,
) -> Result<()> {
    let text = read_text(&args)?;
    let kind: EntityKind = args.kind.map(Into::into).unwrap_or(config.ingest.default_kind);

    let pipeline = build_pipeline(config, build_backend(config, api_key)?)?;
    let entity = pipeline.submit_as(kind, &text).await?;

    println!("{}", formatter.format_entity(&entity)?);

    if args.save {
        let path = &config.storage.database_path;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let store = SqliteRecordStore::new(path)?;
        match store.create(&entity).await? {
            CreateOutcome::Created(id) => {
                eprintln!("{}", formatter.success(&format!("Saved {} as {}", entity.draft.natural_key(), id)));
            }
            CreateOutcome::Conflict(detail) => {
                eprintln!("{}", formatter.warning(&format!("Not saved, record exists: {}", detail)));
            }
        }
    }

    Ok(())
}

fn read_text(args: &SubmitArgs) -> Result<String> {
    let text = if args.stdin {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else if let Some(path) = &args.file {
        fs::read_to_string(path)?
    } else if let Some(text) = &args.text {
        text.clone()
    } else {
        return Err(CliError::InvalidInput(
            "Provide text, --file or --stdin".to_string(),
        ));
    };
    Ok(text)
}
