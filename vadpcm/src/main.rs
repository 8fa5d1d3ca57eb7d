use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use libvadpcm::{DEFAULT_PREDICTOR_COUNT, MAX_PREDICTOR_COUNT};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use vadpcm::{batch, FileFormat};

#[derive(Parser)]
#[command(name = "vadpcm")]
#[command(version)]
#[command(about = "VADPCM audio encoder and decoder", long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG overrides this.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode an audio file as VADPCM in an AIFF-C file
    Encode {
        /// Input audio file (aiff, aifc, wav, flac, ...), must be mono
        input: PathBuf,
        /// Output AIFF-C file
        output: PathBuf,
        /// Number of predictors (1-16)
        #[arg(short, long, default_value_t = DEFAULT_PREDICTOR_COUNT as u8,
              value_parser = clap::value_parser!(u8).range(1..=MAX_PREDICTOR_COUNT as i64))]
        predictors: u8,
    },
    /// Decode a VADPCM AIFF-C file
    Decode {
        /// Input AIFF-C file
        input: PathBuf,
        /// Output file (aiff, aifc or wav)
        output: PathBuf,
    },
    /// Show information about an AIFF or AIFF-C file
    Info {
        input: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Encode files and report how much noise the codec adds
    Stats {
        /// Input audio files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Number of predictors (1-16)
        #[arg(short, long, default_value_t = DEFAULT_PREDICTOR_COUNT as u8,
              value_parser = clap::value_parser!(u8).range(1..=MAX_PREDICTOR_COUNT as i64))]
        predictors: u8,
        /// Write the table to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output as JSON instead of CSV
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Encode {
            input,
            output,
            predictors,
        } => encode(&input, &output, predictors as usize),
        Commands::Decode { input, output } => decode(&input, &output),
        Commands::Info { input, json } => show_info(&input, json),
        Commands::Stats {
            inputs,
            predictors,
            output,
            json,
        } => stats(&inputs, predictors as usize, output.as_deref(), json),
    }
}

fn encode(input: &Path, output: &Path, predictor_count: usize) -> Result<()> {
    if !matches!(
        FileFormat::from_path(output),
        FileFormat::Aiff | FileFormat::Aifc
    ) {
        bail!(
            "Cannot write VADPCM to {}, use an .aifc output file",
            output.display()
        );
    }
    if FileFormat::from_path(output) == FileFormat::Aiff {
        warn!("VADPCM needs AIFF-C, writing AIFF-C data with an .aiff extension");
    }

    info!("Reading {}", input.display());
    let audio = vadpcm::read_pcm(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    info!(
        samples = audio.sample_count,
        sample_rate = audio.sample_rate.to_f64(),
        "read input"
    );
    debug!(predictor_count, "encoding");

    let (bytes, stats) = vadpcm::encode_to_aifc(&audio, predictor_count)
        .with_context(|| format!("Failed to encode {}", input.display()))?;

    info!("Signal level: {:.2} dB", stats.signal_level_db());
    info!("Error level: {:.2} dB", stats.error_level_db());
    match stats.snr_db() {
        Some(snr) => info!("SNR: {:.2} dB", snr),
        None => info!("SNR: infinite (no error)"),
    }

    fs::write(output, &bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Wrote {} ({} bytes)", output.display(), bytes.len());
    Ok(())
}

fn decode(input: &Path, output: &Path) -> Result<()> {
    let format = FileFormat::from_path(output);
    if format == FileFormat::Other {
        bail!(
            "Unknown output format for {}, use .aiff, .aifc or .wav",
            output.display()
        );
    }

    info!("Reading {}", input.display());
    let data =
        fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let audio = vadpcm::decode_aifc(&data)
        .with_context(|| format!("Failed to decode {}", input.display()))?;
    info!(
        samples = audio.sample_count,
        sample_rate = audio.sample_rate.to_f64(),
        "decoded"
    );

    let bytes = vadpcm::write_pcm(format, &audio)?;
    fs::write(output, &bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Wrote {}", output.display());
    Ok(())
}

fn show_info(input: &Path, json: bool) -> Result<()> {
    let data =
        fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let info = vadpcm::file_info(&data)
        .with_context(|| format!("Failed to parse {}", input.display()))?;

    if json {
        let json_str = serde_json::to_string_pretty(&info).context("Failed to serialize info")?;
        println!("{}", json_str);
        return Ok(());
    }

    println!("{}", input.display());
    println!("───────────────────────────────");
    println!("  Format:      {:?}", info.kind);
    println!("  Codec:       {:?}", info.codec);
    println!("  Channels:    {}", info.channels);
    println!("  Bits:        {}", info.sample_size);
    println!("  Sample rate: {} Hz", info.sample_rate);
    println!("  Samples:     {}", info.sample_frames);
    println!("  Duration:    {:.2}s", info.duration_secs);
    println!("  Audio size:  {} bytes", info.audio_bytes);
    println!("  File size:   {} bytes", info.file_size);

    if let Some(codebook) = &info.codebook {
        println!();
        println!("Codebook");
        println!("───────────────────────────────");
        println!("  Order:       {}", codebook.order);
        println!("  Predictors:  {}", codebook.predictor_count);
        for (i, vector) in codebook.vectors.iter().enumerate() {
            let values: Vec<String> = vector.iter().map(|v| format!("{:6}", v)).collect();
            println!("  {:2}: {}", i, values.join(" "));
        }
    }

    Ok(())
}

fn stats(inputs: &[PathBuf], predictor_count: usize, output: Option<&Path>, json: bool) -> Result<()> {
    let report = batch::collect_stats(inputs, predictor_count);

    let table = if json {
        batch::to_json(&report.files)?
    } else {
        batch::to_csv(&report.files)
    };
    match output {
        Some(path) => fs::write(path, table)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{}", table),
    }

    if report.failures > 0 {
        bail!(
            "{} of {} files failed",
            report.failures,
            inputs.len()
        );
    }
    Ok(())
}
