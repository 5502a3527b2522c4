//! # Catalog API Main Entry Point
//!
//! Serves the Catalog API and exposes operator subcommands for migrations,
//! demo data, token minting and a text dashboard.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use catalog::{
    auth,
    config::{AppConfig, ConfigLoader},
    dashboard::{self, CatalogClient, ProductFilter, ProductListState, Selection},
    db, seeds,
    server::run_server,
    telemetry,
};

#[derive(Debug, Parser)]
#[command(
    name = "catalog",
    about = "Multi-tenant product catalog service",
    version,
    after_help = "Examples:\n  catalog serve\n  catalog issue-token --user <uuid> --organization <uuid>\n  catalog dashboard --token <jwt> --category Food"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run the HTTP API (default)")]
    Serve,
    #[command(about = "Apply pending database migrations")]
    Migrate,
    #[command(about = "Create the demo organization, superadmin and sample products")]
    Seed,
    #[command(about = "Mint a bearer token for a user in an organization")]
    IssueToken {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        organization: Uuid,
        #[arg(long, default_value_t = 3600)]
        ttl_seconds: u64,
    },
    #[command(about = "Print the product list and summary counts from a running API")]
    Dashboard {
        #[arg(long, default_value = "http://localhost:3002")]
        base_url: String,
        #[arg(long)]
        token: String,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "All")]
        category: String,
        #[arg(long, default_value = "All")]
        status: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Migrate => migrate().await,
        Command::Seed => seed().await,
        Command::IssueToken {
            user,
            organization,
            ttl_seconds,
        } => issue_token(user, organization, ttl_seconds),
        Command::Dashboard {
            base_url,
            token,
            search,
            category,
            status,
        } => {
            let filter = ProductFilter {
                search,
                category: category.parse::<Selection<String>>()?,
                status: status
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!(e))
                    .context("invalid --status")?,
            };
            show_dashboard(&base_url, token, filter).await
        }
    }
}

fn load_config() -> Result<AppConfig> {
    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    telemetry::init_tracing(&config)?;

    if let Ok(redacted_json) = config.redacted_json() {
        tracing::info!(profile = %config.profile, config = %redacted_json, "Loaded configuration");
    }

    Ok(config)
}

async fn serve() -> Result<()> {
    let config = load_config()?;

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;

    if config.run_migrations {
        db::run_migrations(&db).await?;
    }
    if config.seed_demo_data {
        seeds::seed_demo_data(&db).await?;
    }

    let result = run_server(config, db.clone()).await;
    db::close_pool(db).await?;
    result
}

async fn migrate() -> Result<()> {
    let config = load_config()?;
    let db = db::init_pool(&config).await?;
    db::run_migrations(&db).await?;
    db::close_pool(db).await
}

async fn seed() -> Result<()> {
    let config = load_config()?;
    let db = db::init_pool(&config).await?;
    db::run_migrations(&db).await?;
    let seeded = seeds::seed_demo_data(&db).await?;
    println!(
        "Demo organization: {}\nSuperadmin user:   {}\nProducts created:  {}",
        seeded.organization_id, seeded.admin_user_id, seeded.products_created
    );
    db::close_pool(db).await
}

fn issue_token(user: Uuid, organization: Uuid, ttl_seconds: u64) -> Result<()> {
    let config = load_config()?;
    let secret = config.jwt_secret.as_deref().unwrap_or_default();
    let token = auth::issue_token(secret, user, organization, ttl_seconds)?;
    println!("{}", token);
    Ok(())
}

async fn show_dashboard(base_url: &str, token: String, filter: ProductFilter) -> Result<()> {
    let config = AppConfig {
        log_level: "warn".to_string(),
        log_format: "pretty".to_string(),
        ..Default::default()
    };
    telemetry::init_tracing(&config)?;

    let client = CatalogClient::new(base_url)?.with_token(token);
    let mut state = ProductListState::new(client);
    state.filter = filter;
    state.load().await.context("loading dashboard")?;

    print!("{}", dashboard::render_list(&state));
    Ok(())
}
