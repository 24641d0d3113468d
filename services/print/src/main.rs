use std::sync::Arc;

use anyhow::Result;
use api::ApiClient;
use clap::{Parser, Subcommand};
use common::config::LabTracConfig;
use common::{StoreHandle, keys, open_store};
use print::{BrowserPrintProvider, LabelItem, PrintDispatcher};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Print LabTrac inventory labels through the local print agent
#[derive(Debug, Parser)]
#[command(name = "labtrac-print", version)]
struct Args {
    /// Bearer token to use instead of the one in the session store
    #[arg(long, env = "LABTRAC_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List printers that can be chosen as default
    Printers,
    /// Query the status of a printer (the default printer if omitted)
    Test { uid: Option<String> },
    /// Save the default printer on the backend
    SetDefault { uid: String },
    /// Print the label of one inventory item
    Label {
        id: i64,
        inventory_item_id: String,
        name: String,
        location: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = LabTracConfig::from_env()?;

    let tab = StoreHandle::new(open_store(&config).await?);
    if let Some(token) = args.token.as_deref() {
        tab.set(keys::TOKEN, token).await?;
    }

    let api = ApiClient::new(config.api_base_url.clone(), tab);
    let provider = Arc::new(BrowserPrintProvider::new(config.browser_print_url.clone()));
    let dispatcher = PrintDispatcher::new(api, provider);

    match args.command {
        Command::Printers => {
            for printer in dispatcher.available_printers().await? {
                println!("{}\t{}\t{}", printer.uid, printer.connection, printer.name);
            }
        }
        Command::Test { uid } => {
            let uid = match uid {
                Some(uid) => uid,
                None => dispatcher.default_printer_uid().await?,
            };
            let reply = dispatcher.test_connectivity(&uid).await?;
            info!("Printer {} connection succeeded", uid);
            println!("{}", reply.trim());
        }
        Command::SetDefault { uid } => {
            dispatcher.save_default_printer(&uid).await?;
        }
        Command::Label {
            id,
            inventory_item_id,
            name,
            location,
        } => {
            let item = LabelItem::new(id, inventory_item_id, name, location);
            dispatcher.print_label(&item).await?;
        }
    }

    Ok(())
}
