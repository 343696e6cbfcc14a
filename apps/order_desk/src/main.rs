use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    ConfirmPrompt, ControllerError, ControllerEvent, FixedConfirm, HttpOrderBackend,
    OrderRowController,
};
use shared::{
    domain::{ContainerSize, DelicacyType, OrderId, OrderStatus, SortKey},
    protocol::OrderFields,
};
use tokio::sync::broadcast;
use tracing::warn;

mod config;
mod prompt;
mod render;

use config::{load_settings, normalize_server_url, DEFAULT_CONFIG_FILE};
use prompt::StdinConfirm;
use render::render_table;

#[derive(Parser, Debug)]
#[command(name = "order_desk", about = "Manage kakanin orders from the terminal")]
struct Cli {
    #[arg(long, global = true)]
    server_url: Option<String>,
    /// Answer yes to every confirmation.
    #[arg(long, global = true)]
    yes: bool,
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List {
        #[arg(long)]
        sort: Option<SortKey>,
    },
    Create(OrderChanges),
    Edit {
        order_id: i64,
        #[command(flatten)]
        changes: OrderChanges,
        #[arg(long)]
        status: Option<OrderStatus>,
    },
    /// Hide the order from the view; the server keeps it as removed.
    Remove { order_id: i64 },
    /// Permanently delete the order.
    Delete { order_id: i64 },
    /// Show the order's current status.
    Status { order_id: i64 },
}

#[derive(Args, Debug, Default, Clone)]
struct OrderChanges {
    #[arg(long)]
    customer_name: Option<String>,
    #[arg(long)]
    contact_number: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    pickup_place: Option<String>,
    #[arg(long)]
    pickup_date: Option<String>,
    #[arg(long)]
    delicacy: Option<String>,
    #[arg(long)]
    quantity: Option<String>,
    #[arg(long)]
    container: Option<String>,
    #[arg(long)]
    special_request: Option<String>,
}

impl OrderChanges {
    fn apply(self, fields: &mut OrderFields) {
        let targets = [
            (self.customer_name, &mut fields.customer_name),
            (self.contact_number, &mut fields.contact_number),
            (self.address, &mut fields.address),
            (self.pickup_place, &mut fields.pickup_place),
            (self.pickup_date, &mut fields.pickup_date),
            (self.delicacy, &mut fields.delicacy),
            (self.quantity, &mut fields.quantity),
            (self.container, &mut fields.container),
            (self.special_request, &mut fields.special_request),
        ];
        for (value, target) in targets {
            if let Some(value) = value {
                *target = value;
            }
        }
    }
}

fn warn_on_unknown_catalog_values(fields: &OrderFields) {
    if !fields.delicacy.is_empty() && DelicacyType::parse_loose(&fields.delicacy).is_none() {
        warn!(delicacy = %fields.delicacy, "delicacy is not in the catalog");
    }
    if !fields.container.is_empty() && ContainerSize::parse_loose(&fields.container).is_none() {
        warn!(container = %fields.container, "container is not in the catalog");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(&cli.config);
    if let Some(server_url) = &cli.server_url {
        settings.server_url = normalize_server_url(server_url);
    }
    settings.assume_yes |= cli.yes;

    let backend = HttpOrderBackend::with_timeout(
        &settings.server_url,
        Duration::from_secs(settings.request_timeout_secs),
    )
    .with_context(|| format!("invalid server url {}", settings.server_url))?;
    let prompt: Arc<dyn ConfirmPrompt> = if settings.assume_yes {
        Arc::new(FixedConfirm(true))
    } else {
        Arc::new(StdinConfirm)
    };
    let controller = OrderRowController::new(Arc::new(backend), prompt);
    let mut events = controller.subscribe_events();

    let outcome = run(&controller, cli.command, settings.default_sort).await;
    print_alerts(&mut events);

    match outcome {
        Err(ControllerError::Cancelled) => {
            println!("cancelled");
            Ok(())
        }
        other => other.context("order desk command failed"),
    }
}

async fn run(
    controller: &OrderRowController,
    command: Command,
    default_sort: SortKey,
) -> Result<(), ControllerError> {
    match command {
        Command::List { sort } => {
            controller.refresh_table(sort.unwrap_or(default_sort)).await?;
            print!("{}", render_table(&controller.table_snapshot().await));
        }
        Command::Create(changes) => {
            controller.open_creator().await;
            controller
                .edit_form(move |form| {
                    changes.apply(&mut form.fields);
                    warn_on_unknown_catalog_values(&form.fields);
                })
                .await;
            controller.create_order().await?;
            print!("{}", render_table(&controller.table_snapshot().await));
        }
        Command::Edit {
            order_id,
            changes,
            status,
        } => {
            let order_id = OrderId(order_id);
            controller.refresh_table(default_sort).await?;
            controller.open_editor(order_id).await?;
            controller
                .edit_form(move |form| {
                    changes.apply(&mut form.fields);
                    warn_on_unknown_catalog_values(&form.fields);
                    if let Some(status) = status {
                        form.status.select(status);
                    }
                })
                .await;
            controller.submit_edit().await?;
            print!("{}", render_table(&controller.table_snapshot().await));
        }
        Command::Remove { order_id } => {
            controller.refresh_table(default_sort).await?;
            controller.soft_remove_order(OrderId(order_id)).await?;
            println!("order {order_id} removed from the view");
        }
        Command::Delete { order_id } => {
            controller.refresh_table(default_sort).await?;
            controller.hard_delete_order(OrderId(order_id)).await?;
            println!("order {order_id} deleted");
        }
        Command::Status { order_id } => {
            controller.refresh_table(default_sort).await?;
            controller.change_order_status_only(OrderId(order_id)).await?;
        }
    }
    Ok(())
}

fn print_alerts(events: &mut broadcast::Receiver<ControllerEvent>) {
    while let Ok(event) = events.try_recv() {
        if let ControllerEvent::Alert(message) = event {
            eprintln!("{message}");
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
