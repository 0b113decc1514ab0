use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use release_drift::config::{Config, ConfigOverrides};
use release_drift::drift::{report_from_source, ApplicationDrift, TieBreak};
use release_drift::output::csv::{drift_to_csv, releases_to_csv};
use release_drift::output::json::render_json;
use release_drift::output::table::{render_drift_table, render_releases_table};
use release_drift::server::run_server;
use release_drift::store::ReleaseStore;
use release_drift::types::{NewRelease, Release};
use release_drift::validation::{CreateReleaseRequest, ListReleasesQuery, Page};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "release-drift",
    about = "Track releases and detect version drift against staging"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long, env = "RELEASE_DRIFT_DB")]
    db: Option<String>,
    #[arg(long = "jwt-secret-file", env = "JWT_SECRET_FILE")]
    jwt_secret_file: Option<String>,
    #[arg(long = "tie-break")]
    tie_break: Option<TieBreak>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[arg(long = "log-json")]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Drift,
    Releases {
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
    },
    Release {
        #[arg(long)]
        name: String,
        #[arg(long)]
        version: String,
        #[arg(long)]
        account: String,
        #[arg(long)]
        region: String,
    },
    AddUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        db_path: cli.db.clone(),
        secret_file: cli.jwt_secret_file.clone(),
        tie_break: cli.tie_break,
    });

    match &cli.command {
        Commands::Config { init, show } => {
            return handle_config_command(*init, *show, &config, &config_path);
        }
        Commands::Serve { host, port } => {
            let host = host.clone().unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let bind = format!("{host}:{port}");
            let addr: SocketAddr = bind
                .parse()
                .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
            return run_server(config, addr).await;
        }
        _ => {}
    }

    let db_path = config.resolved_db_path();
    let store = ReleaseStore::open(&db_path)?;

    match &cli.command {
        Commands::Drift => {
            let report = report_from_source(&store, &config.drift_options())?;
            print_drift(&report, cli.output)?;
        }
        Commands::Releases { limit, offset } => {
            let page = Page::try_from(ListReleasesQuery {
                limit: *limit,
                offset: *offset,
            })?;
            let releases = store.list_releases(page.limit, page.offset)?;
            print_releases(&releases, cli.output)?;
        }
        Commands::Release {
            name,
            version,
            account,
            region,
        } => {
            let release = NewRelease::try_from(CreateReleaseRequest {
                name: Some(name.clone()),
                version: Some(version.clone()),
                account: Some(account.clone()),
                region: Some(region.clone()),
            })?;
            let id = store.insert_release(&release)?;
            info!(release_id = id, name = %release.name, "release created");
            println!("{}", render_json(&serde_json::json!({ "releaseId": id }))?);
        }
        Commands::AddUser { username, password } => {
            let id = store.insert_user(username, password)?;
            info!(user_id = id, username = %username, "user created");
        }
        Commands::Config { .. } | Commands::Serve { .. } => {}
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn handle_config_command(
    init: bool,
    show: bool,
    config: &Config,
    config_path: &PathBuf,
) -> Result<()> {
    if init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

fn print_drift(report: &[ApplicationDrift], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_drift_table(report)),
        OutputFormat::Json => println!("{}", render_json(report)?),
        OutputFormat::Csv => print!("{}", drift_to_csv(report)?),
    }
    Ok(())
}

fn print_releases(releases: &[Release], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_releases_table(releases)),
        OutputFormat::Json => println!("{}", render_json(releases)?),
        OutputFormat::Csv => print!("{}", releases_to_csv(releases)?),
    }
    Ok(())
}
