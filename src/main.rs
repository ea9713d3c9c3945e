use anyhow::{bail, Context, Result};
use std::env;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use contract_ledger::{
    load_portfolio_json, project, tabular, write_portfolio_json, DateFilter, Portfolio, Settings,
    SnapshotStore, SqliteStore, Table,
};

const USAGE: &str = "\
Usage: contract-ledger [--config <path>] <command> [options]

Commands:
  import <portfolio.json>          Replace the stored portfolio with a JSON snapshot
  export-json <out.json>           Write the stored portfolio as JSON
  summary [--year Y] [--month M]   Portfolio and per-client totals
  years                            Contract years available for filtering
  table <kind> [--year Y] [--month M] [--contract ID] [--out file.csv]
        kind: contracts | commitments | invoices | clients | items (needs --contract)";

fn main() -> Result<()> {
    let mut args: Vec<String> = env::args().skip(1).collect();

    let config_path = take_option(&mut args, "--config").map(PathBuf::from);
    let settings = Settings::load(config_path.as_deref())?;
    settings.init_tracing();

    let Some(command) = args.first().cloned() else {
        println!("{}", USAGE);
        return Ok(());
    };
    let mut rest = args.split_off(1);

    match command.as_str() {
        "import" => run_import(&settings, &rest),
        "export-json" => run_export_json(&settings, &rest),
        "summary" => run_summary(&settings, &mut rest),
        "years" => run_years(&settings),
        "table" => run_table(&settings, &mut rest),
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    }
}

fn run_import(settings: &Settings, args: &[String]) -> Result<()> {
    let Some(input) = args.first() else {
        bail!("import needs a JSON file\n\n{}", USAGE);
    };

    println!("📂 Loading {}...", input);
    let portfolio = load_portfolio_json(Path::new(input))?;
    println!(
        "✓ {} clients, {} contracts",
        portfolio.clients.len(),
        portfolio.contract_count()
    );

    let store = open_store(settings)?;
    if store.save(&settings.record_id, &portfolio)? {
        println!("✓ Snapshot '{}' saved to {}", settings.record_id, settings.database_path.display());
    } else {
        println!("✓ Snapshot '{}' already up to date", settings.record_id);
    }

    Ok(())
}

fn run_export_json(settings: &Settings, args: &[String]) -> Result<()> {
    let Some(output) = args.first() else {
        bail!("export-json needs an output path\n\n{}", USAGE);
    };

    let portfolio = load_stored(settings)?;
    write_portfolio_json(Path::new(output), &portfolio)?;
    println!("✓ Wrote {} clients to {}", portfolio.clients.len(), output);
    Ok(())
}

fn run_summary(settings: &Settings, args: &mut Vec<String>) -> Result<()> {
    let filter = take_filter(args);
    let portfolio = load_stored(settings)?;
    let dashboard = project(&portfolio.clients, &filter);
    let totals = dashboard.totals();

    println!("📊 Portfolio summary ({})", describe_filter(&filter));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Contracts:            {}", totals.contract_count);
    println!(
        "Commitments:          {} ({} pending)",
        totals.commitment_count, totals.pending_commitments
    );
    println!(
        "Invoices:             {} ({} unpaid)",
        totals.invoice_count, totals.unpaid_invoices
    );
    println!("Bid value:            {}", money(totals.total_bid_value));
    println!("Committed value:      {}", money(totals.total_committed_value));
    println!("Supplied value:       {}", money(totals.total_supplied_value));
    println!("Paid value:           {}", money(totals.total_paid_value));
    println!("Balance to supply:    {}", money(totals.balance_to_supply_value));
    println!("To receive:           {}", money(totals.total_to_receive_value));

    let clients = dashboard.client_totals();
    if !clients.is_empty() {
        println!("\nBy client:");
        for client in &clients {
            println!(
                "  {} ({} contracts): committed {}, supplied {}, to receive {}",
                client.client_name,
                client.contract_count,
                money(client.totals.total_committed_value),
                money(client.totals.total_supplied_value),
                money(client.totals.total_to_receive_value),
            );
        }
    }

    Ok(())
}

fn run_years(settings: &Settings) -> Result<()> {
    let portfolio = load_stored(settings)?;
    let years = contract_ledger::available_years(&portfolio.clients);

    if years.is_empty() {
        println!("No contracts yet");
    }
    for year in years {
        println!("{}", year);
    }
    Ok(())
}

fn run_table(settings: &Settings, args: &mut Vec<String>) -> Result<()> {
    let filter = take_filter(args);
    let contract_id = take_option(args, "--contract");
    let out = take_option(args, "--out");

    let Some(kind) = args.first().cloned() else {
        bail!("table needs a kind\n\n{}", USAGE);
    };

    let portfolio = load_stored(settings)?;
    let dashboard = project(&portfolio.clients, &filter);

    let table: Table = match kind.as_str() {
        "contracts" => tabular::contracts_table(&dashboard.contracts),
        "commitments" => tabular::commitments_table(&dashboard.commitments),
        "invoices" => tabular::invoices_table(&dashboard.invoices),
        "clients" => tabular::clients_table(&dashboard.client_totals()),
        "items" => {
            let Some(contract_id) = contract_id else {
                bail!("table items needs --contract <id>");
            };
            let (_, contract) = portfolio
                .find_contract(&contract_id)
                .with_context(|| format!("Contract not found: {}", contract_id))?;
            tabular::items_table(contract)
        }
        other => bail!("Unknown table kind '{}'\n\n{}", other, USAGE),
    };

    let delimiter = settings.csv_delimiter_byte();
    match out {
        Some(path) => {
            let file = File::create(&path).with_context(|| format!("Failed to create {}", path))?;
            table.write_csv(file, delimiter)?;
            println!("✓ Wrote {} rows to {}", table.rows.len(), path);
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            table.write_csv(&mut handle, delimiter)?;
            handle.flush()?;
        }
    }

    Ok(())
}

fn open_store(settings: &Settings) -> Result<SqliteStore> {
    SqliteStore::open(&settings.database_path)
}

fn load_stored(settings: &Settings) -> Result<Portfolio> {
    let store = open_store(settings)?;
    match store.load(&settings.record_id)? {
        Some(portfolio) => Ok(portfolio),
        None => {
            eprintln!("❌ No snapshot '{}' in {}", settings.record_id, settings.database_path.display());
            eprintln!("   Run: contract-ledger import <portfolio.json>");
            Ok(Portfolio::default())
        }
    }
}

/// Remove `--name value` from the argument list and return the value
fn take_option(args: &mut Vec<String>, name: &str) -> Option<String> {
    let position = args.iter().position(|a| a == name)?;
    if position + 1 >= args.len() {
        args.remove(position);
        return None;
    }
    let value = args.remove(position + 1);
    args.remove(position);
    Some(value)
}

fn take_filter(args: &mut Vec<String>) -> DateFilter {
    let year = take_option(args, "--year").unwrap_or_else(|| "all".to_string());
    let month = take_option(args, "--month").unwrap_or_else(|| "all".to_string());
    DateFilter::parse(&year, &month)
}

fn describe_filter(filter: &DateFilter) -> String {
    use contract_ledger::{MonthFilter, YearFilter};

    match (filter.year, filter.month) {
        (YearFilter::All, MonthFilter::All) => "all periods".to_string(),
        (YearFilter::Year(y), MonthFilter::All) => format!("{}", y),
        (YearFilter::All, MonthFilter::Month(m)) => format!("month {:02} of every year", m),
        (YearFilter::Year(y), MonthFilter::Month(m)) => format!("{}-{:02}", y, m),
    }
}

fn money(value: f64) -> String {
    format!("R$ {:.2}", value)
}
