//! The archive node binary: catalog, tiered storage, background
//! migration and the DIMSE server, wired from command line flags.
use clap::Parser;
use pacs_catalog::Catalog;
use pacs_hsm::{
    FileSystemBackend, HsmConfig, HsmStorage, MigrationConfig, MigrationService, StorageTier,
    TierBackend, TierPolicy,
};
use pacs_services::{DicomServer, MoveDestinations, PacsContext, ServerConfig, WorklistStore};
use snafu::{ResultExt, Snafu};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};

/// DICOM archive node: C-STORE, C-FIND, C-MOVE and MWL SCP
/// over a hot/warm/cold object store.
#[derive(Debug, Parser)]
#[command(version)]
struct App {
    /// this node's AE title
    #[arg(long, default_value = "PACS-SCP")]
    ae_title: String,
    /// address to listen on
    #[arg(long, default_value = "0.0.0.0:11112")]
    listen: String,
    /// the maximum PDU length
    #[arg(
        long = "max-pdu-length",
        default_value = "16384",
        value_parser(clap::value_parser!(u32).range(4096..=131_072))
    )]
    max_pdu_length: u32,
    /// accept any called AE title
    #[arg(long)]
    promiscuous: bool,

    /// catalog database file
    #[arg(long, default_value = "pacs-catalog.db")]
    database: PathBuf,
    /// hot tier directory
    #[arg(long, default_value = "storage/hot")]
    hot: PathBuf,
    /// warm tier directory
    #[arg(long)]
    warm: Option<PathBuf>,
    /// cold tier directory
    #[arg(long)]
    cold: Option<PathBuf>,

    /// days without access before hot objects move to warm
    #[arg(long, default_value = "30")]
    hot_to_warm_days: u64,
    /// days without access before warm objects move to cold
    #[arg(long, default_value = "90")]
    warm_to_cold_days: u64,
    /// minutes between automatic migration cycles
    #[arg(long, default_value = "60")]
    migration_interval_minutes: u64,
    /// disable automatic migration cycles
    #[arg(long)]
    no_auto_migrate: bool,

    /// worklist persistence file
    #[arg(long)]
    worklist: Option<PathBuf>,
    /// a C-MOVE destination, repeated: AE_TITLE=host:port
    #[arg(long = "move-destination")]
    move_destinations: Vec<String>,

    /// verbose mode
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("Could not open catalog"))]
    OpenCatalog { source: pacs_catalog::Error },

    #[snafu(display("Could not open {:?} tier", tier))]
    OpenTier {
        tier: StorageTier,
        source: pacs_hsm::Error,
    },

    #[snafu(display("Could not open worklist store"))]
    OpenWorklist { source: pacs_services::Error },

    #[snafu(display("Invalid move destination `{}` (expected AE=host:port)", entry))]
    BadMoveDestination { entry: String },

    #[snafu(display("Server failed"))]
    Serve { source: pacs_services::Error },
}

fn main() {
    let app = App::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(if app.verbose { Level::DEBUG } else { Level::INFO })
            .finish(),
    )
    .unwrap_or_else(|e| {
        error!("{}", snafu::Report::from_error(e));
    });

    if let Err(e) = run(app) {
        error!("{}", snafu::Report::from_error(e));
        std::process::exit(-2);
    }
}

fn run(app: App) -> Result<(), Error> {
    let catalog = Catalog::open(&app.database).context(OpenCatalogSnafu)?;

    let open_tier = |tier: StorageTier, path: &PathBuf| -> Result<Box<dyn TierBackend>, Error> {
        let backend = FileSystemBackend::open(tier, path).context(OpenTierSnafu { tier })?;
        Ok(Box::new(backend))
    };
    let hot = open_tier(StorageTier::Hot, &app.hot)?;
    let warm = app
        .warm
        .as_ref()
        .map(|path| open_tier(StorageTier::Warm, path))
        .transpose()?;
    let cold = app
        .cold
        .as_ref()
        .map(|path| open_tier(StorageTier::Cold, path))
        .transpose()?;
    let hsm = Arc::new(HsmStorage::new(hot, warm, cold, HsmConfig::default()));

    let policy = TierPolicy {
        hot_to_warm_age: Duration::from_secs(app.hot_to_warm_days * 24 * 3600),
        warm_to_cold_age: Duration::from_secs(app.warm_to_cold_days * 24 * 3600),
        auto_migrate: !app.no_auto_migrate,
        ..Default::default()
    };
    let _migration = MigrationService::start(
        Arc::clone(&hsm),
        policy,
        MigrationConfig {
            cycle_interval: Duration::from_secs(app.migration_interval_minutes * 60),
            ..Default::default()
        },
    );

    let worklist = match &app.worklist {
        Some(path) => WorklistStore::open(path).context(OpenWorklistSnafu)?,
        None => WorklistStore::in_memory(),
    };

    let destinations = MoveDestinations::new();
    for entry in &app.move_destinations {
        let (ae_title, address) = entry.split_once('=').ok_or_else(|| {
            BadMoveDestinationSnafu {
                entry: entry.clone(),
            }
            .build()
        })?;
        destinations.insert(ae_title.trim(), address.trim());
        info!("move destination {} -> {}", ae_title.trim(), address.trim());
    }

    let context = Arc::new(PacsContext::new(
        catalog,
        hsm,
        Arc::new(worklist),
        Arc::new(destinations),
        app.ae_title.clone(),
    ));
    let server = DicomServer::new(
        ServerConfig {
            ae_title: app.ae_title,
            listen_addr: app.listen,
            max_pdu_length: app.max_pdu_length,
            promiscuous: app.promiscuous,
        },
        context,
    );
    server.run().context(ServeSnafu)
}
