use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::info;
use simple_scanner::tools::{dataset_iter, dataset_root_from_env, expected_payloads, load_frame, load_sequence, luma_stats};
use simple_scanner::{
    DecodeEngine, DecodeMode, JsonLinesSink, ScanConfiguration, ScannerController, ScannerSettings,
    TickOutcome,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "scantool", version, about = "Barcode/QR scanner CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode the codes in a single image
    Decode {
        #[arg(long)]
        image: PathBuf,
        /// Comma-separated symbology identifiers
        #[arg(long, value_delimiter = ',', default_value = "qr,ean13,ean8,code128,upc-a,upc-e,code-39")]
        types: Vec<String>,
    },
    /// Replay a directory of images through the scanner, printing JSON events
    Replay {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long, default_value_t = 30.0)]
        fps: f64,
        #[arg(long, value_delimiter = ',', default_value = "qr")]
        types: Vec<String>,
        #[arg(long)]
        cooldown_ms: Option<u64>,
        #[arg(long)]
        flash: bool,
        /// Decode on the worker pool instead of the ticking thread
        #[arg(long)]
        background: bool,
    },
    /// Compute the read rate on a labeled dataset
    ReadingRate {
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, value_delimiter = ',', default_value = "qr,ean13,ean8,code128,upc-a,upc-e,code-39")]
        types: Vec<String>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Decode { image, types } => decode_cmd(&image, &types),
        Command::Replay {
            dir,
            fps,
            types,
            cooldown_ms,
            flash,
            background,
        } => replay_cmd(&dir, fps, &types, cooldown_ms, flash, background),
        Command::ReadingRate { root, limit, types } => reading_rate_cmd(root, limit, &types),
    }
}

fn configuration(types: &[String], flash: bool) -> Result<ScanConfiguration> {
    let config = ScanConfiguration::from_identifiers(types, flash);
    if config.is_empty() {
        bail!("no known barcode types in {types:?}");
    }
    Ok(config)
}

fn decode_cmd(image: &Path, types: &[String]) -> Result<()> {
    let config = configuration(types, false)?;
    let frame = load_frame(image, Duration::ZERO, 0)
        .with_context(|| format!("failed to load image {}", image.display()))?;
    let stats = luma_stats(&frame);
    println!(
        "Image: {} ({}x{}), luma {}-{} avg {}",
        image.display(),
        frame.width(),
        frame.height(),
        stats.min,
        stats.max,
        stats.avg
    );

    let engine = DecodeEngine::new(&ScannerSettings::from_env());
    let start = Instant::now();
    let detections = engine.decode(&frame, config.symbologies())?;
    println!("Found {} code(s) in {:?}", detections.len(), start.elapsed());
    for (i, d) in detections.iter().enumerate() {
        match d.bounds {
            Some(b) => println!(
                "  {}: {} {:?} at ({:.0}, {:.0}) {:.0}x{:.0}",
                i, d.symbology, d.payload, b.x, b.y, b.width, b.height
            ),
            None => println!("  {}: {} {:?}", i, d.symbology, d.payload),
        }
    }
    Ok(())
}

fn replay_cmd(
    dir: &Path,
    fps: f64,
    types: &[String],
    cooldown_ms: Option<u64>,
    flash: bool,
    background: bool,
) -> Result<()> {
    if fps <= 0.0 {
        bail!("--fps must be positive");
    }
    let config = configuration(types, flash)?;
    let source = load_sequence(dir, fps);
    if source.remaining() == 0 {
        bail!("no readable images under {}", dir.display());
    }

    let mut settings = ScannerSettings::from_env();
    if let Some(ms) = cooldown_ms {
        settings = settings.with_cooldown(Duration::from_millis(ms));
    }
    if background {
        settings = settings.with_decode_mode(DecodeMode::Background);
    }

    let sink = Arc::new(JsonLinesSink::new(std::io::stdout()));
    let controller = ScannerController::with_settings(source, &sink, settings);
    controller.update_configuration(config);
    controller
        .start()
        .context("failed to start scanner")?;

    let mut ticks = 0usize;
    loop {
        match controller.tick() {
            TickOutcome::NoFrame if !controller.is_decoding() => break,
            TickOutcome::NoFrame | TickOutcome::Busy => controller.wait_for_decode(),
            _ => {}
        }
        ticks += 1;
    }
    controller.wait_for_decode();
    controller.stop();
    info!("replayed {ticks} tick(s) from {}", dir.display());
    Ok(())
}

fn reading_rate_cmd(root: Option<PathBuf>, limit: Option<usize>, types: &[String]) -> Result<()> {
    let config = configuration(types, false)?;
    let root = root.unwrap_or_else(dataset_root_from_env);
    let engine = DecodeEngine::new(&ScannerSettings::from_env());

    let mut total = 0usize;
    let mut hits = 0usize;
    let mut elapsed = Duration::ZERO;
    for path in dataset_iter(&root, limit) {
        let expected = expected_payloads(&path);
        if expected.is_empty() {
            continue;
        }
        let frame = match load_frame(&path, Duration::ZERO, 0) {
            Ok(frame) => frame,
            Err(err) => {
                eprintln!("Failed to load image {}: {}", path.display(), err);
                continue;
            }
        };
        let start = Instant::now();
        let found = engine.decode(&frame, config.symbologies())?;
        elapsed += start.elapsed();

        total += expected.len();
        let matched = expected
            .iter()
            .filter(|e| found.iter().any(|d| &d.payload == *e))
            .count();
        hits += matched;
        if matched < expected.len() {
            println!("  miss: {} ({}/{})", path.display(), matched, expected.len());
        }
    }

    if total == 0 {
        bail!("no labeled images under {}", root.display());
    }
    println!(
        "Read rate: {}/{} = {:.2}% (decode time {:?})",
        hits,
        total,
        hits as f64 / total as f64 * 100.0,
        elapsed
    );
    Ok(())
}
