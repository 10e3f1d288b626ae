//! evtstore CLI
//!
//! Inspect raw and compressed files, or write a synthetic run.

use std::path::{Path, PathBuf};
use std::thread;

use clap::{Parser, Subcommand};
use evtstore::raw::{naming, BoardHeader};
use evtstore::{
    Config, Event, EventPipeline, MemoryPool, RawWriter, Result, RunDescription, RunHeader,
    TileWalker, ZStream,
};
use tracing_subscriber::{fmt, EnvFilter};

/// evtstore CLI
#[derive(Parser, Debug)]
#[command(name = "evtstore-cli")]
#[command(about = "Inspect and produce detector event files")]
#[command(version)]
struct Args {
    /// Read-ahead buffer of the decompression stream in KB
    #[arg(short, long, default_value = "4096")]
    buffer_kb: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a raw file (plain or gzip) and print its block counts
    Scan {
        /// The raw file to scan
        file: PathBuf,
    },

    /// List the tiles of a compressed table body
    Tiles {
        /// The file holding the tiles (plain or gzip)
        file: PathBuf,

        /// Only read tile headers, seeking over the payload
        #[arg(long)]
        headers_only: bool,
    },

    /// Write a synthetic run through the pool and the writer thread
    Demo {
        /// Data directory
        #[arg(short, long, default_value = "./evtstore_data")]
        dir: PathBuf,

        /// Number of events to write
        #[arg(short, long, default_value = "100")]
        events: u32,

        /// Night as YYYYMMDD
        #[arg(short, long, default_value = "20240101")]
        night: u32,

        /// Samples per channel
        #[arg(short, long, default_value = "50")]
        roi: u16,

        /// Number of producer threads
        #[arg(short, long, default_value = "2")]
        producers: u32,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,evtstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("evtstore CLI v{}", evtstore::VERSION);

    let config = Config::builder()
        .stream_buffer_size(args.buffer_kb * 1024)
        .build();

    let result = match args.command {
        Commands::Scan { file } => scan(&file),
        Commands::Tiles { file, headers_only } => tiles(&file, headers_only, &config),
        Commands::Demo {
            dir,
            events,
            night,
            roi,
            producers,
        } => demo(config, dir, events, night, roi, producers),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn scan(file: &Path) -> Result<()> {
    let summary = evtstore::raw::scan(file)?;

    println!("file:        {}", file.display());
    println!("device:      {}", summary.identifier.device_id);
    println!("run:         {}", summary.identifier.run_id);
    println!("night:       {}", summary.run.night);
    println!("boards:      {} present", summary.boards_present());
    println!("blocks:      {}", summary.blocks);
    println!("events:      {}", summary.events);
    println!("event bytes: {}", summary.event_bytes);
    if summary.skipped_blocks > 0 {
        println!("skipped:     {} unknown blocks", summary.skipped_blocks);
    }

    Ok(())
}

fn tiles(file: &Path, headers_only: bool, config: &Config) -> Result<()> {
    config.validate()?;
    let stream = ZStream::try_open_with(file, config)?;
    let mut walker = TileWalker::new(stream);

    if headers_only {
        while let Some(header) = walker.skip_tile()? {
            println!(
                "tile {:>6}: {:>8} rows {:>12} bytes",
                walker.tiles_read() - 1,
                header.num_rows,
                header.size
            );
        }
    } else {
        while let Some(tile) = walker.next_tile()? {
            println!(
                "tile {:>6}: {:>8} rows {:>12} bytes {:>4} blocks",
                walker.tiles_read() - 1,
                tile.header.num_rows,
                tile.header.size,
                tile.blocks.len()
            );
            for (column, block) in tile.blocks.iter().enumerate() {
                println!(
                    "    column {:>4}: {:>10} bytes {:?} {:?}",
                    column,
                    block.payload.len(),
                    block.descriptor.ordering(),
                    block.descriptor.processes()
                );
            }
        }
    }

    println!("{} tiles", walker.tiles_read());
    Ok(())
}

fn demo(config: Config, dir: PathBuf, events: u32, night: u32, roi: u16, producers: u32) -> Result<()> {
    let config = Config { data_dir: dir, ..config };
    config.validate()?;

    let run_id = naming::next_run_number(&config.data_dir, night)?;
    let path = naming::run_file_path(&config.data_dir, night, run_id, "bin");

    let mut run = RunHeader::new(run_id, night);
    run.roi = roi;
    for (id, board) in run.boards.iter_mut().enumerate() {
        *board = BoardHeader::present(id as u16);
    }

    let mut writer = RawWriter::new(&path);
    writer.open(&run, &RunDescription::new(config.device_id, "demo"))?;

    let pool = MemoryPool::from_config(&config)?;
    let pipeline = EventPipeline::from_config(writer, &config)?;

    let producers = producers.max(1);
    let handles: Vec<_> = (0..producers)
        .map(|p| {
            let pool = pool.clone();
            let submitter = pipeline.submitter();
            let num_pixels = run.num_pixels;
            thread::spawn(move || -> Result<()> {
                let submitter = match submitter {
                    Some(s) => s,
                    None => return Ok(()),
                };
                for n in (p..events).step_by(producers as usize) {
                    let mut event = Event::new(num_pixels, roi);
                    event.event_num = n;
                    event.trigger_num = n;
                    for (i, sample) in event.samples.iter_mut().enumerate() {
                        *sample = ((i as u32 + n) % 4096) as i16 - 2048;
                    }

                    let mut chunk = pool.acquire_blocking();
                    event.encode_record(&mut chunk)?;
                    submitter.submit(chunk)?;
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        match handle.join() {
            Ok(result) => result?,
            Err(_) => tracing::error!("Producer thread panicked"),
        }
    }

    let stats = pipeline.finish()?;
    let pool_stats = pool.stats();

    println!("wrote {} events ({} bytes) to {}", stats.events, stats.bytes, path.display());
    println!(
        "pool: {} chunks allocated, peak {} bytes in use",
        pool_stats.allocated / pool_stats.chunk_size,
        pool_stats.max_in_use
    );

    Ok(())
}
