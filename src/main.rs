use clap::Parser;
use pointserver::server::run_server;
use pointserver::{Config, Dataset, DatasetWatcher, FeatureSource, GeoJsonFiles, LoadPolicy};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// GeoJSON files or directories to serve
    #[arg(required = true)]
    sources: Vec<PathBuf>,

    /// TOML configuration file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Maximum number of points per index leaf
    #[arg(long)]
    leaf_size: Option<usize>,

    /// Skip unreadable source files instead of failing the whole load
    #[arg(long)]
    skip_invalid: bool,

    /// Do not reload when source files change
    #[arg(long)]
    no_watch: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<(Config, Vec<PathBuf>)> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(leaf_size) = self.leaf_size {
            config = config.with_leaf_size(leaf_size);
        }
        if self.skip_invalid {
            config = config.with_load_policy(LoadPolicy::SkipInvalid);
        }
        if self.no_watch {
            config = config.with_watch(false);
        }

        config.validate()?;
        Ok((config, self.sources))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pointserver=info,info".into()),
        )
        .init();

    let (config, sources) = Args::parse().into_config()?;

    let source = GeoJsonFiles::new(sources).with_config(&config);
    info!("Loading features from {}", source.describe());
    let dataset = Arc::new(Dataset::open(source, &config)?);
    info!("Serving {} features", dataset.snapshot().len());

    let watcher = if config.watch {
        match DatasetWatcher::spawn(Arc::clone(&dataset), config.debounce()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("Automatic reload disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    let addr: SocketAddr = config.server.address().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    run_server(listener, dataset, shutdown).await?;

    if let Some(watcher) = watcher {
        watcher.stop();
    }

    Ok(())
}
