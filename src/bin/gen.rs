//! redblock-gen: CLI tool for building and inspecting block list artifacts.

use clap::{Parser, Subcommand};
use redblock::ingest::open_token_source;
use redblock::{
    AddressFamily, ArtifactMetadata, BlockList, BuildConfig, Ingestor, IntervalSet, RecordLayout,
    RecordReader, RecordWriter,
};
use std::io::BufRead;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "redblock-gen")]
#[command(version)]
#[command(about = "Generate and inspect binary IP range artifacts for redblock", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a token list (one CIDR or address per line) into an artifact
    Encode {
        /// Input token list, `-` for stdin
        input: Option<PathBuf>,

        /// Output artifact [default: /etc/nginx/redblock_ranges.bin]
        output: Option<PathBuf>,

        /// Include IPv4 ranges
        #[arg(long)]
        ipv4: bool,

        /// Include IPv6 ranges
        #[arg(long)]
        ipv6: bool,

        /// Record layout (compact or wide)
        #[arg(short, long)]
        layout: Option<RecordLayout>,

        /// Parser threads
        #[arg(short, long)]
        threads: Option<usize>,

        /// YAML build config; flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Do not write the .meta sidecar
        #[arg(long)]
        no_meta: bool,
    },

    /// Print every record of an artifact
    Dump {
        /// Artifact file
        artifact: PathBuf,

        /// Record layout (compact or wide)
        #[arg(short, long, default_value = "compact")]
        layout: RecordLayout,
    },

    /// Check whether addresses are blocked by an artifact
    Lookup {
        /// Artifact file
        artifact: PathBuf,

        /// Addresses to check
        #[arg(required = true)]
        addresses: Vec<IpAddr>,

        /// Record layout (compact or wide)
        #[arg(short, long, default_value = "compact")]
        layout: RecordLayout,
    },

    /// Validate an artifact's records, ordering and checksum
    Verify {
        /// Artifact file
        artifact: PathBuf,

        /// Record layout (compact or wide)
        #[arg(short, long, default_value = "compact")]
        layout: RecordLayout,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let result = match cli.command {
        Commands::Encode {
            input,
            output,
            ipv4,
            ipv6,
            layout,
            threads,
            config,
            no_meta,
        } => build_config(config.as_deref(), input, output, ipv4, ipv6, layout, threads, no_meta)
            .and_then(|config| encode_file(&config)),
        Commands::Dump { artifact, layout } => dump_file(&artifact, layout),
        Commands::Lookup {
            artifact,
            addresses,
            layout,
        } => lookup_addresses(&artifact, &addresses, layout),
        Commands::Verify { artifact, layout } => verify_file(&artifact, layout),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn build_config(
    config_path: Option<&Path>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    ipv4: bool,
    ipv6: bool,
    layout: Option<RecordLayout>,
    threads: Option<usize>,
    no_meta: bool,
) -> Result<BuildConfig, Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => BuildConfig::load(path)?,
        None => BuildConfig::default(),
    };

    if input.is_some() {
        config.input = input;
    }
    if let Some(output) = output {
        config.output = output;
    }
    if ipv4 || ipv6 {
        config.families.clear();
        if ipv4 {
            config.families.push(AddressFamily::V4);
        }
        if ipv6 {
            config.families.push(AddressFamily::V6);
        }
    }
    if let Some(layout) = layout {
        config.layout = layout;
    }
    if let Some(threads) = threads {
        config.threads = threads;
    }
    if no_meta {
        config.write_metadata = false;
    }

    config.validate()?;
    Ok(config)
}

fn encode_file(config: &BuildConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = config.family_filter()?;
    let input = config
        .input
        .as_deref()
        .ok_or("no input file given (argument or `input` in config)")?;

    log::debug!("Reading token list {:?}", input);

    let ingestor = Ingestor::new(filter);
    let mut set = IntervalSet::new();
    let source = open_token_source(input)?;
    let report = if config.threads > 1 {
        let lines = source.lines().collect::<std::io::Result<Vec<_>>>()?;
        ingestor.ingest_concurrent(&mut set, &lines, config.threads)
    } else {
        ingestor.ingest_reader(&mut set, source)?
    };

    log::info!(
        "Parsed {} lines: {} accepted, {} skipped, {} malformed, {} filtered by family",
        report.total(),
        report.accepted,
        report.skipped,
        report.malformed,
        report.filtered
    );

    let list = set.to_sorted_list();
    let mut writer = RecordWriter::new(config.layout);
    let data = writer.write_file(&list, &config.output)?;

    // A sidecar left over from the previous artifact would fail every verify
    let meta_path = ArtifactMetadata::path_for(&config.output);
    if config.write_metadata {
        let meta = ArtifactMetadata::describe(&data, &list, config.layout);
        if let Err(e) = meta.save(&meta_path) {
            remove_stale_sidecar(&meta_path);
            return Err(e.into());
        }
    } else {
        remove_stale_sidecar(&meta_path);
    }

    println!(
        "Wrote {} ranges ({} IPv4, {} IPv6) to {:?} ({} bytes, {} layout)",
        list.len(),
        set.v4_count(),
        set.v6_count(),
        config.output,
        data.len(),
        config.layout
    );
    Ok(())
}

fn remove_stale_sidecar(meta_path: &Path) {
    match std::fs::remove_file(meta_path) {
        Ok(()) => log::warn!("Removed stale metadata sidecar {:?}", meta_path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Could not remove stale sidecar {:?}: {}", meta_path, e),
    }
}

fn dump_file(artifact: &Path, layout: RecordLayout) -> Result<(), Box<dyn std::error::Error>> {
    let reader = RecordReader::open(artifact, layout)?;
    for record in reader.records() {
        let interval = record?;
        println!("{}\t{}", interval.family(), interval);
    }
    Ok(())
}

fn lookup_addresses(
    artifact: &Path,
    addresses: &[IpAddr],
    layout: RecordLayout,
) -> Result<(), Box<dyn std::error::Error>> {
    let block_list = BlockList::open(artifact, layout)?;
    for ip in addresses {
        match block_list.matching_interval(*ip) {
            Some(interval) => println!("{}\tBLOCKED\t{}", ip, interval),
            None => println!("{}\tALLOWED", ip),
        }
    }
    Ok(())
}

fn verify_file(artifact: &Path, layout: RecordLayout) -> Result<(), Box<dyn std::error::Error>> {
    let reader = RecordReader::open(artifact, layout)?;
    let list = reader.decode()?;

    let meta_path = ArtifactMetadata::path_for(artifact);
    match ArtifactMetadata::load(&meta_path)? {
        Some(meta) => {
            if meta.layout != layout {
                return Err(format!(
                    "metadata records {} layout, verifying as {}",
                    meta.layout, layout
                )
                .into());
            }
            meta.verify(reader.as_bytes())?;
            log::info!("Checksum matches {:?}", meta_path);
        }
        None => log::info!("No metadata sidecar at {:?}, skipping checksum", meta_path),
    }

    if !IntervalSet::is_canonical(&list) {
        return Err(format!(
            "{} records are not sorted and merged; consumers must rebuild before lookup",
            list.len()
        )
        .into());
    }

    println!("OK: {} records, {} layout", list.len(), layout);
    Ok(())
}
