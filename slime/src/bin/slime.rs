use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use config::FileFormat;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use slime::file::version_has_entities;
use slime::registry::BlockRegistry;
use slime::{Settings, SlimeCodec};

#[derive(Debug, clap::Parser)]
struct Cli {
    #[arg(long, default_value_t = false)]
    no_color: bool,
    #[arg(short, long)]
    config: Vec<String>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Print a summary of a region file
    Info { file: PathBuf },
    /// Decode, re-encode and decode again, checking the results agree
    Verify { file: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(!cli.no_color)
        .init();
    log::debug!("args: {:?}", cli);

    let mut builder = Settings::config_builder();
    for config_path in cli.config {
        builder = builder.add_source(config::File::new(config_path.as_str(), FileFormat::Toml));
    }
    let config = builder.build()?;
    let settings = Settings::from_config(&config)?;
    let codec = SlimeCodec::new(settings, BlockRegistry::vanilla());

    match &cli.command {
        Commands::Info { file } => {
            let bytes = fs::read(file)?;
            let region = codec.decode_region(&bytes)?;
            let (min_x, min_z, width, depth) = region.bounds();
            println!("version: {}", region.version());
            println!(
                "bounds: min=({}, {}) size={}x{} chunks",
                min_x, min_z, width, depth
            );
            println!(
                "chunks: {} populated of {}",
                region.chunk_count(),
                width as usize * depth as usize
            );
            println!("entity block: {}", version_has_entities(region.version()));
            let entities: usize = region.chunks().map(|c| c.entities().len()).sum();
            let tiles: usize = region.chunks().map(|c| c.tile_entities().len()).sum();
            println!("entities: {}", entities);
            println!("tile entities: {}", tiles);
        }

        Commands::Verify { file } => {
            let bytes = fs::read(file)?;
            let first = codec.decode_region(&bytes)?;
            let re_encoded = codec.encode_region(first.chunks())?;
            let second = codec.decode_region(&re_encoded)?;

            let mut ok = first.chunk_count() == second.chunk_count();
            for chunk in first.chunks() {
                let coords = chunk.coords();
                match second.proto_chunk_at(coords.x, coords.z) {
                    Some(other) => {
                        if other.section_mask() != chunk.section_mask()
                            || other.height_map() != chunk.height_map()
                            || other.biomes() != chunk.biomes()
                        {
                            log::error!("chunk {} does not survive re-encoding", coords);
                            ok = false;
                        }
                    }
                    None => {
                        log::error!("chunk {} missing after re-encoding", coords);
                        ok = false;
                    }
                }
            }
            if !ok {
                anyhow::bail!("verification failed");
            }
            println!(
                "ok: {} chunks, {} -> {} bytes",
                first.chunk_count(),
                bytes.len(),
                re_encoded.len()
            );
        }
    }

    Ok(())
}
