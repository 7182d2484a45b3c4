use anyhow::Result;
use clap::Parser;
use console::style;
use platinium::project::ProjectStore;
use platinium::{ToolCollection, cli, client, config, ui};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();
    let mut config = config::load_or_create()?;
    cli.apply_overrides(&mut config);

    let model = client::initialize_chat_model(&config)?;
    let services = client::initialize_services(&config)?;
    let tools = Arc::new(ToolCollection::standard());
    let store = ProjectStore::open(&cli.project)?;

    println!("Backend: {:?}", config.backend);
    println!("Model: {}", config.model);
    println!(
        "Project: {} {}",
        store.meta().title,
        style(format!("({})", store.root().display())).dim()
    );

    let mut app = ui::App::new(config, model, tools, services, store);
    app.run(&cli.prompt.clone().unwrap_or_default(), cli.attachments.clone())
        .await?;

    Ok(())
}
