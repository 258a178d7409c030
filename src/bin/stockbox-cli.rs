// src/bin/stockbox-cli.rs

use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use stockbox::{
    client::{CachedStockBoxClient, ClientError, StockBoxClient},
    common::coerce::Coerce,
    models::stock_movement::{MovementDraft, MovementListQuery, MovementType, SortOrder},
    presentation,
};

/// Terminal do StockBox: movimentações e estoque atual.
#[derive(Debug, Parser)]
#[command(name = "stockbox-cli", version, about)]
struct Cli {
    /// Endereço do servidor da API
    #[arg(long, env = "STOCKBOX_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    #[arg(long, env = "STOCKBOX_API_VERSION", default_value = "v1")]
    api_version: String,

    /// Token JWT enviado como `Authorization: Bearer`
    #[arg(long, env = "STOCKBOX_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Movimentações de estoque
    #[command(subcommand)]
    Movements(MovementsCommand),

    /// Estoque atual (todos os produtos ou um só)
    Stock {
        #[arg(long)]
        product: Option<i64>,
    },
}

#[derive(Debug, Subcommand)]
enum MovementsCommand {
    /// Lista com filtros e paginação
    List(ListArgs),
    /// Mostra uma movimentação
    Show { id: i64 },
    /// Registra uma nova movimentação
    Create(CreateArgs),
}

#[derive(Debug, Args)]
struct ListArgs {
    #[arg(long)]
    product: Option<i64>,
    #[arg(long = "type", value_parser = parse_movement_type)]
    movement_type: Option<MovementType>,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long)]
    user: Option<i64>,
    #[arg(long)]
    reference: Option<String>,
    #[arg(long, value_parser = parse_sort_order)]
    order_by: Option<SortOrder>,
    #[arg(long)]
    page: Option<i64>,
    #[arg(long)]
    page_size: Option<i64>,
}

#[derive(Debug, Args)]
struct CreateArgs {
    #[arg(long)]
    product: i64,
    #[arg(long = "type", value_parser = parse_movement_type)]
    movement_type: MovementType,
    #[arg(long, allow_negative_numbers = true)]
    quantity: Decimal,
    #[arg(long)]
    reason: Option<String>,
    #[arg(long)]
    reference: Option<String>,
    #[arg(long)]
    batch: Option<String>,
    #[arg(long)]
    expiration: Option<NaiveDate>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    unit_cost: Option<Decimal>,
}

fn parse_movement_type(raw: &str) -> Result<MovementType, String> {
    let value = Value::String(raw.to_string());
    MovementType::coerce(&value).ok_or_else(|| MovementType::invalid_message(&value))
}

fn parse_sort_order(raw: &str) -> Result<SortOrder, String> {
    let value = Value::String(raw.to_string());
    SortOrder::coerce(&value).ok_or_else(|| SortOrder::invalid_message(&value))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, ClientError> {
    let mut client = StockBoxClient::new(&cli.api_url, &cli.api_version)?;
    if let Some(token) = cli.token {
        client = client.with_token(token);
    }
    let client = CachedStockBoxClient::new(client);

    match cli.command {
        Command::Movements(MovementsCommand::List(args)) => {
            let filters = MovementListQuery {
                id_product: args.product,
                movement_type: args.movement_type,
                start_date: args.from,
                end_date: args.to,
                id_user: args.user,
                reference_document: args.reference,
                order_by: args.order_by,
                page: args.page,
                page_size: args.page_size,
            };
            let page = client.movements(&filters).await?;
            println!("{}", presentation::movements_table(&page.movements));
            println!("{}", presentation::pagination_line(&page.pagination));
        }
        Command::Movements(MovementsCommand::Show { id }) => match client.movement(id).await? {
            Some(movement) => println!("{}", presentation::movement_details(&movement)),
            None => {
                eprintln!("Movimentação #{id} não encontrada");
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Movements(MovementsCommand::Create(args)) => {
            let draft = MovementDraft {
                id_product: args.product,
                movement_type: args.movement_type,
                quantity: args.quantity,
                reason: args.reason,
                reference_document: args.reference,
                batch_number: args.batch,
                expiration_date: args.expiration,
                location: args.location,
                unit_cost: args.unit_cost,
            };

            if let Err(errors) = presentation::validate_draft(&draft) {
                for (field, field_errors) in errors.field_errors() {
                    for error in field_errors.iter() {
                        let message = error.message.as_deref().unwrap_or(error.code.as_ref());
                        eprintln!("{field}: {message}");
                    }
                }
                return Ok(ExitCode::from(2));
            }
            for warning in presentation::draft_warnings(&draft) {
                eprintln!("Aviso: {warning}");
            }

            let created = client.create(&draft).await?;
            println!("Movimentação #{} registrada", created.id_stock_movement);

            // O cache foi invalidado: o saldo abaixo já inclui a movimentação.
            let stock = client.current_stock(Some(draft.id_product)).await?;
            println!("{}", presentation::current_stock_table(&stock));
        }
        Command::Stock { product } => {
            let stock = client.current_stock(product).await?;
            println!("{}", presentation::current_stock_table(&stock));
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn report(error: &ClientError) {
    eprintln!("Erro: {error}");
    if let ClientError::Api {
        details: Some(Value::Array(details)),
        ..
    } = error
    {
        for detail in details {
            let field = detail["field"].as_str().unwrap_or("?");
            let message = detail["message"].as_str().unwrap_or("");
            eprintln!("  {field}: {message}");
        }
    }
}
