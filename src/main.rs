use clap::{Parser, Subcommand};
use go_appeals::{
    config::AppConfig, render::RenderOutcome, render_appeal_density, server, world, AppealType,
    GoClient,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml", global = true)]
    config: PathBuf,

    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the latest appeals
    Appeals {
        #[arg(short = 't', long = "type", value_enum)]
        appeal_type: Option<AppealType>,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the latest surge alerts
    SurgeAlerts {
        #[arg(long)]
        json: bool,
    },
    /// Render the appeals-per-country map to a PNG
    Map {
        #[arg(short = 't', long = "type", value_enum)]
        appeal_type: Option<AppealType>,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Render the map and serve it over HTTP
    Serve {
        #[arg(short = 't', long = "type", value_enum)]
        appeal_type: Option<AppealType>,
    },
    /// Download the Natural Earth country boundaries the map is drawn from
    DownloadWorld {
        /// Defaults to `map.world` from the config
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let app_config = AppConfig::load_or_default(&cli.config)?;
    let client = GoClient::new(&app_config.api)?;

    match cli.command {
        Commands::Appeals { appeal_type, json } => {
            let appeals = client.fetch_appeals(appeal_type).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&appeals)?);
            } else {
                for appeal in &appeals {
                    println!("{}", appeal);
                }
            }
        }
        Commands::SurgeAlerts { json } => {
            let alerts = client.fetch_surge_alerts().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&alerts)?);
            } else {
                for alert in &alerts {
                    println!("{}", alert);
                }
            }
        }
        Commands::Map {
            appeal_type,
            output,
        } => {
            let appeals = client.fetch_appeals(appeal_type).await?;

            match render_appeal_density(&appeals, &app_config.map, &app_config.exclusions)? {
                RenderOutcome::NoData => {}
                RenderOutcome::Rendered(map) => {
                    let path = output.unwrap_or_else(|| app_config.map.output.clone());
                    map.save(&path)?;
                    println!("Map written to {:?}", path);
                }
            }
        }
        Commands::Serve { appeal_type } => {
            let appeals = client.fetch_appeals(appeal_type).await?;

            match render_appeal_density(&appeals, &app_config.map, &app_config.exclusions)? {
                RenderOutcome::NoData => {}
                RenderOutcome::Rendered(map) => {
                    server::start_server(&app_config.server, map).await?;
                }
            }
        }
        Commands::DownloadWorld { output } => {
            let path = output.unwrap_or_else(|| app_config.map.world.clone());
            let written =
                world::download_world(&reqwest::Client::new(), &app_config.map.world_url, &path)
                    .await?;
            println!("Saved {} bytes to {:?}", written, path);
        }
    }

    Ok(())
}
