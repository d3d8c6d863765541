use clap::Parser;
use decoder::{DecodeError, DecodeOptions, Decoded, Mt940Decoder, Statement, format_minor_units};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(
    name = "cli_viewer",
    version,
    about = "Декодирует вставленную MT940-выписку и показывает её таблицей.",
    long_about = None,
)]
struct Args {
    /// Входной файл; если не задан, текст читается из stdin
    #[arg(long)]
    input: Option<PathBuf>,

    /// Подставлять legacy-заглушки вместо "неизвестно" для нечитаемых полей
    #[arg(long)]
    lenient: bool,

    /// Подбирать строки-продолжения, пришедшие до первого :86:
    #[arg(long)]
    adopt_continuations: bool,

    /// Печатать результат в JSON вместо таблицы
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), DecodeError> {
    let args = Args::parse();

    let decoder = Mt940Decoder::with_options(DecodeOptions {
        lenient_fields: args.lenient,
        adopt_bare_continuations: args.adopt_continuations,
    });

    let decoded = match &args.input {
        Some(path) => {
            if !path.exists() {
                eprintln!("input file does not exist: {}", path.display());
                process::exit(1)
            }

            let file = File::open(path).unwrap_or_else(|err| {
                eprintln!("failed to open input file {}: {err}", path.display());
                process::exit(1);
            });

            decoder.decode_reader(io::BufReader::new(file))?
        }
        None => decoder.decode_reader(io::stdin().lock())?,
    };

    for diag in &decoded.diagnostics {
        eprintln!("warning: {diag}");
    }

    if args.json {
        print_json(&decoded);
    } else {
        print_table(&decoded.statement);
    }

    Ok(())
}

fn print_json(decoded: &Decoded) {
    let value = serde_json::json!({
        "statement": decoded.statement,
        "diagnostics": decoded
            .diagnostics
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>(),
    });

    println!(
        "{}",
        serde_json::to_string_pretty(&value).expect("statement is always serializable")
    );
}

fn print_table(statement: &Statement) {
    if let Some(reference) = &statement.transaction_reference {
        println!("Reference: {reference}");
    }
    if let Some(account) = &statement.account_id {
        println!("Account:   {account}");
    }
    if let Some(number) = &statement.statement_number {
        println!("Statement: {number}");
    }
    if let Some(balance) = &statement.opening_balance {
        println!("Opening:   {balance}");
    }
    if let Some(balance) = &statement.closing_balance {
        println!("Closing:   {balance}");
    }

    if !statement.transactions.is_empty() {
        println!();
        println!(
            "{:<10} {:<6} {:>15} {}",
            "Date", "Side", "Amount", "Description"
        );
        for tx in &statement.transactions {
            println!("{tx}");
        }
    }

    println!();
    println!(
        "Total credits: {}",
        format_minor_units(statement.total_credits(), ',')
    );
    println!(
        "Total debits:  {}",
        format_minor_units(statement.total_debits(), ',')
    );

    let net = statement.net_movement();
    let sign = if net < 0 { "-" } else { "" };
    println!("Net movement:  {sign}{}", format_minor_units(net, ','));
}
