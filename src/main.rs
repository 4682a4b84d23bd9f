use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use uuid::Uuid;

use donor_import::error::StoreError;
use donor_import::import::{
    ConstituentImporter, ContactImporter, GiftImporter, ImportOptions, ImportResult,
};
use donor_import::mapping::{self, FieldMapping, SuggestOptions};
use donor_import::models::{EntityKind, RawRow};
use donor_import::parse::{self, ParseOptions};
use donor_import::store::{MemStore, PgStore, RecordStore, postgres};

#[derive(Parser, Debug)]
#[command(
    name = "donor-import",
    about = "Import a delimited CRM export into the canonical donor store"
)]
struct Args {
    /// Path to the delimited export file.
    file: PathBuf,

    /// Entity kind contained in the file: `constituents`, `gifts` or
    /// `contacts`.
    #[arg(long)]
    entity: String,

    /// Tenant whose store the records belong to.
    #[arg(long)]
    tenant: Uuid,

    /// Field delimiter; auto-detected when omitted.
    #[arg(long)]
    delimiter: Option<char>,

    /// Confirmed mapping as a JSON file (`{"column": "canonicalField",
    /// "other": null}`). Inferred from the headers when omitted.
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// Print the inferred mapping with confidences and exit.
    #[arg(long)]
    suggest_only: bool,

    /// Run the full pipeline against an in-memory store instead of Postgres.
    #[arg(long)]
    dry_run: bool,

    /// Rows per persistence batch.
    #[arg(long, default_value_t = donor_import::import::DEFAULT_BATCH_SIZE)]
    batch_size: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    donor_import::init_logger();
    let args = Args::parse();

    let kind = match args.entity.trim().to_lowercase().as_str() {
        "constituents" | "constituent" => EntityKind::Constituent,
        "gifts" | "gift" => EntityKind::Gift,
        "contacts" | "contact" => EntityKind::Contact,
        other => {
            writeln!(
                io::stderr(),
                "error: unsupported entity '{other}'. Use 'constituents', 'gifts' or 'contacts'."
            )?;
            std::process::exit(1);
        }
    };

    let text = std::fs::read_to_string(&args.file)?;
    let options = ParseOptions {
        delimiter: args.delimiter.map(|c| c as u8),
        ..ParseOptions::default()
    };
    let outcome = parse::parse(&text, &options)?;
    for issue in &outcome.issues {
        log::warn!("row {}: {}", issue.row, issue.message);
    }
    log::info!(
        "parsed {} rows with {} columns from {}",
        outcome.rows.len(),
        outcome.headers.len(),
        args.file.display()
    );

    let mapping = match &args.mapping {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            let confirmed: BTreeMap<String, Option<String>> = serde_json::from_str(&raw)?;
            confirmed
        }
        None => {
            let suggestion = mapping::suggest(&outcome.headers, kind, &SuggestOptions::default());
            for (column, confidence) in &suggestion.confidence {
                let target = suggestion.mapping[column].as_deref().unwrap_or("-");
                log::info!("mapping: {column} -> {target} (confidence {confidence:.2})");
            }
            for column in &suggestion.unmapped_columns {
                log::warn!("mapping: column `{column}` left unmapped");
            }
            if args.suggest_only {
                println!("{}", serde_json::to_string_pretty(&suggestion)?);
                return Ok(());
            }
            suggestion.mapping
        }
    };

    let report = mapping::validate(&mapping, kind);
    for warning in &report.warnings {
        log::warn!("mapping: {}", warning.message);
    }
    if !report.is_valid() {
        for error in &report.errors {
            writeln!(io::stderr(), "error: {}", error.message)?;
        }
        std::process::exit(1);
    }
    if args.suggest_only {
        println!("{}", serde_json::to_string_pretty(&mapping)?);
        return Ok(());
    }

    let import_options = ImportOptions {
        batch_size: args.batch_size,
        ..ImportOptions::default()
    };

    let result = if args.dry_run {
        let store = MemStore::new();
        run_import(&store, kind, args.tenant, &outcome.rows, &mapping, import_options).await?
    } else {
        let database_url = std::env::var("DATABASE_URL")?;
        let store = PgStore::connect(&database_url).await?;
        postgres::run_migrations(store.pool()).await?;
        run_import(&store, kind, args.tenant, &outcome.rows, &mapping, import_options).await?
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn run_import<S: RecordStore>(
    store: &S,
    kind: EntityKind,
    tenant: Uuid,
    rows: &[RawRow],
    mapping: &FieldMapping,
    options: ImportOptions,
) -> Result<ImportResult, StoreError> {
    let total = rows.len();
    let mut report_progress = |processed: usize, _total: usize| {
        log::info!("progress: {processed}/{total} rows");
    };

    match kind {
        EntityKind::Constituent => {
            ConstituentImporter::with_options(store, tenant, options)
                .process(rows, mapping, Some(&mut report_progress))
                .await
        }
        EntityKind::Gift => {
            GiftImporter::with_options(store, tenant, options)
                .process(rows, mapping, Some(&mut report_progress))
                .await
        }
        EntityKind::Contact => {
            ContactImporter::with_options(store, tenant, options)
                .process(rows, mapping, Some(&mut report_progress))
                .await
        }
    }
}
