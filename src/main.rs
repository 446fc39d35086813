use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use neighbourhood_map::api;
use neighbourhood_map::config::Config;
use neighbourhood_map::context::AppContext;
use neighbourhood_map::enrich;
use neighbourhood_map::input::load_place_list;
use neighbourhood_map::map::{InMemoryMap, MapSurface};
use neighbourhood_map::render;
use neighbourhood_map::view_model::SharedViewModel;

const DEFAULT_PLACES: &str = "places.json";

#[derive(Parser)]
#[command(name = "nbmap")]
#[command(about = "Browse places on a map, enriched with lookup and encyclopedia data")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the map view-model over HTTP
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Place list file or http(s) URL
        #[arg(long, default_value = DEFAULT_PLACES)]
        places: String,
    },
    /// Enrich the place list and print it
    Show {
        /// Place list file or http(s) URL
        #[arg(long, default_value = DEFAULT_PLACES)]
        places: String,

        /// Only list places whose name contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },
}

/// Initialize tracing with output to stderr so `show` output stays clean.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "neighbourhood_map=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load the list and start enrichment. A list that can't be loaded is fatal:
/// there is nothing to show without it.
async fn start(
    config: &Config,
    map: Arc<InMemoryMap>,
    source: &str,
) -> anyhow::Result<(SharedViewModel, Vec<tokio::task::JoinHandle<()>>)> {
    let list = load_place_list(source).await.inspect_err(|e| {
        tracing::error!("Could not load places: {:#}", e);
    })?;

    map.init(list.view());
    let ctx = AppContext::from_config(config, map);
    let vm = ctx.view_model();
    vm.lock()
        .expect("view model lock poisoned")
        .load(list.seeds());

    let handles = enrich::spawn_enrichment(&ctx, &vm);
    Ok((vm, handles))
}

async fn serve(config: Config, port: u16, places: &str) -> anyhow::Result<()> {
    let map = Arc::new(InMemoryMap::new());
    let (vm, _enrichment) = start(&config, map.clone(), places).await?;

    let app = api::create_router(vm, map);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Map server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn show(config: Config, places: &str, filter: Option<String>) -> anyhow::Result<()> {
    let map = Arc::new(InMemoryMap::new());
    let (vm, enrichment) = start(&config, map, places).await?;

    for handle in enrichment {
        handle.await?;
    }

    let mut vm = vm.lock().expect("view model lock poisoned");
    if let Some(filter) = filter {
        vm.set_filter(filter);
    }
    print!("{}", render::render_list(&vm.views(), vm.filter()));
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::load();

    match cli.command {
        Some(Commands::Serve { port, places }) => serve(config, port, &places).await?,
        Some(Commands::Show { places, filter }) => show(config, &places, filter).await?,
        None => serve(config, 3000, DEFAULT_PLACES).await?,
    }

    Ok(())
}
