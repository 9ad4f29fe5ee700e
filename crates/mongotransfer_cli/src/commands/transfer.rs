//! Transfer command.
//!
//! Resolves the endpoints, validates the configuration before touching the
//! network, connects both collections and runs the transfer engine.

use mongotransfer_engine::{
    CollectionRef, Endpoints, MirrorMode, ReconcileOutcome, TransferConfig, TransferEngine,
    TransferReport,
};
use mongotransfer_store::MongoStore;
use std::path::PathBuf;
use tracing::info;

/// Parsed command-line arguments of a transfer.
#[derive(Debug, Clone)]
pub struct TransferArgs {
    pub source_uri: String,
    pub source_database: String,
    pub source_collection: String,
    pub destination_uri: String,
    pub destination_database: Option<String>,
    pub destination_collection: Option<String>,
    pub batch_size: usize,
    pub mirror: MirrorMode,
    pub audit_dir: PathBuf,
}

impl TransferArgs {
    /// Builds and validates the transfer configuration.
    pub fn into_config(self) -> Result<TransferConfig, Box<dyn std::error::Error>> {
        let (source, destination) = Endpoints {
            source_uri: Some(self.source_uri),
            source_database: self.source_database,
            source_collection: self.source_collection,
            destination_uri: self.destination_uri,
            destination_database: self.destination_database,
            destination_collection: self.destination_collection,
        }
        .resolve()?;

        let config = TransferConfig::new(source, destination)
            .with_batch_size(self.batch_size)
            .with_mirror_mode(self.mirror)
            .with_audit_dir(self.audit_dir);
        config.validate()?;
        Ok(config)
    }
}

/// Run a transfer between two MongoDB collections.
pub fn run(args: TransferArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.into_config()?;

    info!("Opening source {}", config.source);
    let source = connect(&config.source)?;
    info!("Opening destination {}", config.destination);
    let destination = connect(&config.destination)?;
    print_banner(&config, &source, &destination);

    let engine = TransferEngine::new(config, source, destination);
    let report = engine.run()?;

    print_summary(&report);
    Ok(())
}

fn connect(collection: &CollectionRef) -> Result<MongoStore, Box<dyn std::error::Error>> {
    Ok(MongoStore::connect(
        &collection.uri,
        &collection.database,
        &collection.collection,
    )?)
}

fn print_banner(config: &TransferConfig, source: &MongoStore, destination: &MongoStore) {
    println!("Source:      {}", source.servers().join(", "));
    println!("  Database:   {}", config.source.database);
    println!("  Collection: {}", config.source.collection);
    println!("Destination: {}", destination.servers().join(", "));
    println!("  Database:   {}", config.destination.database);
    println!("  Collection: {}", config.destination.collection);
    println!("Mirror mode: {}", config.mirror_mode);
    println!("Batch size:  {}", config.batch_size);
    println!();
}

fn print_summary(report: &TransferReport) {
    println!();
    println!("✓ Transfer complete");
    println!("  Documents read:    {}", report.copy.documents_read);
    println!("  Documents written: {}", report.copy.documents_written);
    println!("  Batches:           {}", report.copy.batches_written);
    println!(
        "  Inserted/matched:  {} / {} ({} modified)",
        report.copy.inserted, report.copy.matched, report.copy.modified
    );
    if let Some(path) = &report.snapshot_audit {
        println!(
            "  Snapshot:          {} id(s) in {}",
            report.snapshot_size,
            path.display()
        );
    }
    match &report.reconcile {
        ReconcileOutcome::Skipped => {}
        ReconcileOutcome::AlreadyMirrored => {
            println!("  Mirror:            destination already mirrors the source");
        }
        ReconcileOutcome::Reported {
            audit_file,
            residual,
        } => {
            println!(
                "  Mirror:            {} destination-only id(s) listed in {}",
                residual,
                audit_file.display()
            );
        }
        ReconcileOutcome::Deleted {
            audit_file,
            residual,
            deleted,
        } => {
            println!(
                "  Mirror:            {} of {} destination-only document(s) deleted, listed in {}",
                deleted,
                residual,
                audit_file.display()
            );
        }
    }
    println!("  Elapsed:           {:.3?}", report.elapsed);
}
