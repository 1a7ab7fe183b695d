//! CLI entry point for Role Chat.
//!
//! This binary provides the `rolechat` command with subcommands for serving
//! the HTTP API, planning and running requests from the terminal, and
//! probing the automation backend.

mod cli;
mod config;
mod helpers;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use rolechat_automation::Automation;
use rolechat_web::WebServer;
use rolechat_workflow::format_workflow_display;

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::helpers::{
    build_automation, build_chat_service, build_executor, build_planner, init_tracing, pretty,
};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    init_tracing(&config.logging.level, cli.json);

    match cli.command {
        Commands::Serve { bind, port } => cmd_serve(config, bind, port).await,
        Commands::Plan { text } => cmd_plan(&text),
        Commands::Run { text } => cmd_run(&config, &text).await,
        Commands::TestConnection => cmd_test_connection(&config).await,
        Commands::Health => cmd_health(&config).await,
    }
}

// ---------------------------------------------------------------------------
// Subcommand: serve
// ---------------------------------------------------------------------------

async fn cmd_serve(mut config: AppConfig, bind: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let client = build_automation(&config)?;
    let connect_src = vec![client.endpoint_origin()];
    let chat = build_chat_service(&config, Arc::new(client)).await?;
    info!(
        storage = chat.store().backend(),
        responder = chat.responder_name().unwrap_or("fallback"),
        "chat service ready"
    );

    WebServer::new(config.web_config(connect_src), chat)
        .start()
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommands: plan / run
// ---------------------------------------------------------------------------

fn cmd_plan(text: &str) -> Result<()> {
    let plan = build_planner()?.plan(text);
    println!("{}", pretty(&plan)?);
    Ok(())
}

async fn cmd_run(config: &AppConfig, text: &str) -> Result<()> {
    let automation: Arc<dyn Automation> = Arc::new(build_automation(config)?);
    let plan = build_planner()?.plan(text);
    let executed = build_executor(config, automation).execute(&plan).await;
    println!("{}", format_workflow_display(&executed));
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommands: test-connection / health
// ---------------------------------------------------------------------------

async fn cmd_test_connection(config: &AppConfig) -> Result<()> {
    let result = build_automation(config)?.check_connection().await;
    println!("{}", result.user_message());
    Ok(())
}

async fn cmd_health(config: &AppConfig) -> Result<()> {
    let result = build_automation(config)?.health_check().await;
    println!("{}", pretty(&result)?);
    Ok(())
}
