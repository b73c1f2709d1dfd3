use std::{io, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reference::ReferenceTable;
use sheets::{ServiceAccountAuth, ServiceAccountKey, SheetsClient, SheetsLedger, DEFAULT_SPREADSHEET_ID};
use shared::domain::{LEDGER_HEADERS, LEDGER_WORKSHEET};
use storage::SqliteLedger;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dotacao-tools", about = "Operator commands for the allocation ledger")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the organizations of the reference table.
    Organizations {
        #[arg(long, default_value = "DOTACOES.csv")]
        reference: PathBuf,
    },
    /// List the allocation codes of one organization.
    Allocations {
        #[arg(long, default_value = "DOTACOES.csv")]
        reference: PathBuf,
        organization: String,
    },
    /// List the sequence numbers of one allocation.
    Sequences {
        #[arg(long, default_value = "DOTACOES.csv")]
        reference: PathBuf,
        organization: String,
        allocation: String,
    },
    /// Dump the local SQLite ledger as CSV.
    Records {
        #[arg(long, default_value = "sqlite://./data/ledger.db")]
        database_url: String,
    },
    /// Connect to the spreadsheet and make sure the worksheet header is complete.
    CheckSheet {
        #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
        credentials: PathBuf,
        #[arg(long, default_value = DEFAULT_SPREADSHEET_ID)]
        spreadsheet_id: String,
        #[arg(long, default_value = LEDGER_WORKSHEET)]
        worksheet: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Organizations { reference } => {
            let table = ReferenceTable::from_path(&reference)?;
            print_lines(table.organizations());
        }
        Command::Allocations {
            reference,
            organization,
        } => {
            let table = ReferenceTable::from_path(&reference)?;
            print_lines(table.allocations(&organization));
        }
        Command::Sequences {
            reference,
            organization,
            allocation,
        } => {
            let table = ReferenceTable::from_path(&reference)?;
            print_lines(table.sequences(&organization, &allocation));
        }
        Command::Records { database_url } => {
            let ledger = SqliteLedger::new(&database_url).await?;
            let mut out = csv::Writer::from_writer(io::stdout().lock());
            out.write_record(LEDGER_HEADERS)?;
            for stored in ledger.list_records().await? {
                out.write_record(stored.record.to_row())?;
            }
            out.flush()?;
        }
        Command::CheckSheet {
            credentials,
            spreadsheet_id,
            worksheet,
        } => {
            let key = ServiceAccountKey::from_path(&credentials)?;
            let auth = ServiceAccountAuth::for_spreadsheets(key)?;
            let client = SheetsClient::new(spreadsheet_id, Arc::new(auth))?;
            let (_, setup) = SheetsLedger::connect(client, worksheet.clone())
                .await
                .with_context(|| format!("worksheet '{worksheet}' is not reachable"))?;
            println!("{worksheet}: {setup:?}");
        }
    }

    Ok(())
}

fn print_lines(values: Vec<String>) {
    for value in values {
        println!("{value}");
    }
}
