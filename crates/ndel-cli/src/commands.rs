use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use futures_util::StreamExt;
use ndel_meta::{MetaIndex, RedbMetaIndex};
use ndel_server::{NdelServer, ServerConfig};
use ndel_store::{BlobStore, FsBlobStore};
use ndel_types::Oid;
use sha2::{Digest, Sha256};
use tokio::runtime::Runtime;
use tracing::info;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Hash(args) => cmd_hash(args),
        Command::Fsck(args) => cmd_fsck(args),
        Command::Config(args) => cmd_config(args),
    }
}

fn load_config(source: &ConfigSource) -> anyhow::Result<ServerConfig> {
    let mut config = ServerConfig::load(source.config.as_deref())?;
    if let Some(dir) = &source.data_path {
        info!(data_path = %dir.display(), "data_path set from command line");
        config.data_path = dir.clone();
    }
    Ok(config)
}

fn runtime() -> anyhow::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.source)?;
    if let Some(listen) = args.listen {
        info!(%listen, "listen set from command line");
        config.listen = listen;
    }
    let addr = config.listen_addr()?;

    runtime()?.block_on(async move {
        let server = NdelServer::open(&config)
            .await
            .with_context(|| format!("cannot open data directory {}", config.data_path.display()))?;
        println!(
            "{} ndel serving {} on {}",
            "✓".green().bold(),
            config.data_path.display(),
            addr.to_string().bold()
        );
        server.serve().await?;
        Ok::<_, anyhow::Error>(())
    })
}

fn cmd_hash(args: HashArgs) -> anyhow::Result<()> {
    for path in &args.files {
        let oid = hash_file(path)?;
        println!("{}  {}", oid.as_str().yellow(), path.display());
    }
    Ok(())
}

/// Object id of a file's content, hashed without loading it into memory.
pub(crate) fn hash_file(path: &Path) -> anyhow::Result<Oid> {
    let mut file =
        File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).with_context(|| format!("cannot read {}", path.display()))?;
    Ok(Oid::from_digest(&hasher.finalize()))
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(&args.source)?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn cmd_fsck(args: FsckArgs) -> anyhow::Result<()> {
    let config = load_config(&args.source)?;
    if !config.data_path.is_dir() {
        bail!("data directory {} does not exist", config.data_path.display());
    }

    let index = RedbMetaIndex::open(config.meta_db_path(), config.db_open_timeout())
        .with_context(|| format!("cannot open {}", config.meta_db_path().display()))?;
    let report = runtime()?.block_on(async {
        let blobs = FsBlobStore::open(config.objects_dir()).await?;
        check(&blobs, &index, !args.quick).await
    })?;

    println!("Indexed objects: {}", report.indexed.to_string().bold());
    println!("Indexed bytes:   {}", report.indexed_bytes.to_string().bold());
    for oid in &report.orphaned_blobs {
        println!("  {} {} (blob without metadata)", "orphan:".yellow(), oid);
    }
    for oid in &report.corrupt_blobs {
        println!("  {} {} (content does not hash to id)", "corrupt:".red(), oid);
    }
    for oid in &report.missing_blobs {
        println!("  {} {} (metadata without blob)", "missing:".red(), oid);
    }

    if !report.is_consistent() {
        bail!(
            "{} missing and {} corrupt blobs",
            report.missing_blobs.len(),
            report.corrupt_blobs.len()
        );
    }
    println!("{} No issues.", "✓".green().bold());
    Ok(())
}

/// Outcome of comparing the blob store against the metadata index.
#[derive(Debug, Default)]
pub(crate) struct FsckReport {
    pub indexed: usize,
    pub indexed_bytes: i64,
    /// Blobs with no metadata. Unreachable over HTTP and re-ingested by the
    /// next upload, so harmless.
    pub orphaned_blobs: Vec<Oid>,
    /// Metadata records whose blob is gone.
    pub missing_blobs: Vec<Oid>,
    /// Blobs whose bytes no longer hash to their id.
    pub corrupt_blobs: Vec<Oid>,
}

impl FsckReport {
    pub fn is_consistent(&self) -> bool {
        self.missing_blobs.is_empty() && self.corrupt_blobs.is_empty()
    }
}

pub(crate) async fn check(
    blobs: &dyn BlobStore,
    index: &dyn MetaIndex,
    verify_content: bool,
) -> anyhow::Result<FsckReport> {
    let stored: BTreeSet<Oid> = blobs.list().await?.into_iter().collect();
    let indexed: BTreeSet<Oid> = index.keys()?.into_iter().collect();
    let objects = index.objects()?;

    let mut report = FsckReport {
        indexed: indexed.len(),
        indexed_bytes: objects.iter().map(|m| m.length).sum(),
        orphaned_blobs: stored.difference(&indexed).cloned().collect(),
        missing_blobs: indexed.difference(&stored).cloned().collect(),
        corrupt_blobs: Vec::new(),
    };

    if verify_content {
        for oid in &stored {
            let mut stream = blobs.get(oid, 0).await?;
            let mut hasher = Sha256::new();
            while let Some(chunk) = stream.next().await {
                hasher.update(&chunk?);
            }
            if Oid::from_digest(&hasher.finalize()) != *oid {
                report.corrupt_blobs.push(oid.clone());
            }
        }
    }
    Ok(report)
}
