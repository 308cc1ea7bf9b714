use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{OrderBoard, OrderClient, RealtimeSession};
use shared::{
    domain::{Order, OrderId, OrderStatus},
    protocol::{CreateOrderRequest, ServerEvent},
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Waiter and kitchen terminal for the order server.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long, env = "ORDER_SERVER_URL", default_value = "http://localhost:3006")]
    server_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the restaurant's tables.
    Tables,
    /// Print every current order.
    Orders,
    /// Place a new order.
    Order {
        #[arg(long)]
        table: String,
        #[arg(long = "item", required = true)]
        items: Vec<String>,
        #[arg(long)]
        waiter: Option<String>,
    },
    /// Move an order to the next kitchen stage.
    Advance { order_id: i64 },
    /// Set an order's status explicitly.
    SetStatus {
        order_id: i64,
        #[arg(value_parser = parse_status)]
        status: OrderStatus,
    },
    /// Follow the live board until the server goes away.
    Watch,
}

fn parse_status(raw: &str) -> Result<OrderStatus, String> {
    raw.parse().map_err(|err: shared::domain::UnknownStatus| err.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();
    let client = OrderClient::new(&args.server_url)?;

    match args.command {
        Command::Tables => {
            for table in client.list_tables().await? {
                println!(
                    "table {:>3}  seats {:>2}  {:<9}  {}",
                    table.table_number,
                    table.capacity,
                    format!("{:?}", table.occupancy_state).to_lowercase(),
                    table.customer_name
                );
            }
        }
        Command::Orders => {
            for order in client.list_orders().await? {
                println!("{}", describe(&order));
            }
        }
        Command::Order {
            table,
            items,
            waiter,
        } => {
            let request = CreateOrderRequest {
                table,
                items,
                waiter_name: waiter,
            };
            let mut session = client.connect().await?;
            session.create_order(request.clone()).await?;
            let order = await_outcome(&mut session, |event| match event {
                ServerEvent::OrderCreated(order) if is_our_order(order, &request) => {
                    Some(order.clone())
                }
                _ => None,
            })
            .await?;
            println!("created {}", describe(&order));
        }
        Command::Advance { order_id } => {
            let order_id = OrderId(order_id);
            let order = client
                .get_order(order_id)
                .await?
                .with_context(|| format!("order {order_id} does not exist"))?;
            let Some(next) = order.status.next() else {
                bail!("order {order_id} is already {}", order.status);
            };
            set_status(&client, order_id, next).await?;
        }
        Command::SetStatus { order_id, status } => {
            set_status(&client, OrderId(order_id), status).await?;
        }
        Command::Watch => watch(&client).await?,
    }
    Ok(())
}

async fn set_status(client: &OrderClient, order_id: OrderId, status: OrderStatus) -> Result<()> {
    let mut session = client.connect().await?;
    session.change_status(order_id, status).await?;
    let order = await_outcome(&mut session, |event| match event {
        ServerEvent::StatusUpdated(update) if update.order_id == order_id => {
            Some(update.order.clone())
        }
        _ => None,
    })
    .await?;
    println!("updated {}", describe(&order));
    Ok(())
}

/// Reads events until `matches` picks the one caused by our own request, or
/// the server answers with an error. Other clients' broadcasts are skipped.
async fn await_outcome<T>(
    session: &mut RealtimeSession,
    matches: impl Fn(&ServerEvent) -> Option<T>,
) -> Result<T> {
    while let Some(event) = session.next_event().await? {
        if let ServerEvent::Error(err) = &event {
            match &err.details {
                Some(details) if !details.is_empty() => {
                    let fields: Vec<String> = details
                        .iter()
                        .map(|d| format!("{}: {}", d.field, d.message))
                        .collect();
                    bail!("{} ({})", err.message, fields.join("; "));
                }
                _ => bail!("{}", err.message),
            }
        }
        if let Some(found) = matches(&event) {
            return Ok(found);
        }
        debug!(?event, "skipping unrelated event");
    }
    bail!("server closed the connection before answering")
}

async fn watch(client: &OrderClient) -> Result<()> {
    let mut session = client.connect().await?;
    let mut board = OrderBoard::new();
    while let Some(event) = session.next_event().await? {
        if let ServerEvent::Error(err) = &event {
            eprintln!("server error for {}: {}", err.event, err.message);
            continue;
        }
        if board.apply(&event) {
            print_board(&board);
        }
    }
    println!("server closed the connection");
    Ok(())
}

/// Other waiters may create orders at the same moment, so the broadcast
/// answering ours is picked out by its contents.
fn is_our_order(order: &Order, request: &CreateOrderRequest) -> bool {
    order.table == request.table
        && order.items == request.items
        && request
            .waiter_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .map_or(true, |name| order.waiter_name == name)
}

fn print_board(board: &OrderBoard) {
    println!("---- {} order(s) ----", board.len());
    for status in OrderStatus::ALL {
        println!("{status}:");
        for order in board.by_status(status) {
            println!("  {}", describe(order));
        }
    }
}

fn describe(order: &Order) -> String {
    format!(
        "#{} table {} [{}] {} for {} by {} at {}",
        order.id,
        order.table,
        order.status,
        order.items.join(", "),
        order.customer_name,
        order.waiter_name,
        order.created_at.format("%H:%M:%S")
    )
}
