use std::fs;

use anyhow::{anyhow, Result};
use log::info;
use structopt::StructOpt;

use dronemeta::config::ExtractionConfig;
use dronemeta::meta::MetadataFields;
use dronemeta::{assemble, iso6709, rewrite};

#[derive(StructOpt, Debug)]
#[structopt(setting = clap::AppSettings::VersionlessSubcommands)]
pub struct MainOpts {
    #[structopt(long)]
    /// Log options (like RUST_LOG; trace, debug, info etc)
    pub log: Option<String>,
    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(StructOpt, Debug)]
#[structopt(rename_all = "kebab-case")]
pub enum Command {
    #[structopt(display_order = 1)]
    /// Show header info for the video track.
    Info(InfoOpts),

    #[structopt(display_order = 2)]
    /// Extract the opaque telemetry track to a file.
    Extract(ExtractOpts),

    #[structopt(display_order = 3)]
    /// Inject mdta geolocation metadata into a copy of the file.
    Inject(InjectOpts),
}

#[derive(StructOpt, Debug)]
pub struct InfoOpts {
    #[structopt(short, long)]
    /// Output in JSON.
    pub json: bool,

    /// Input filename.
    pub input: String,
}

#[derive(StructOpt, Debug)]
pub struct ExtractOpts {
    #[structopt(short, long)]
    /// 1-based ordinal of the metadata track (default: 3).
    pub track: Option<u32>,

    /// Input filename.
    pub input: String,
    /// Output filename for the raw telemetry payload.
    pub output: String,
}

#[derive(StructOpt, Debug)]
pub struct InjectOpts {
    #[structopt(long)]
    /// Horizontal accuracy, in meters.
    pub accuracy: Option<f64>,

    #[structopt(long, allow_hyphen_values = true)]
    /// Latitude in decimal degrees.
    pub lat: f64,

    #[structopt(long, allow_hyphen_values = true)]
    /// Longitude in decimal degrees.
    pub lon: f64,

    #[structopt(long)]
    /// Altitude in meters above sea level.
    pub alt: Option<f64>,

    #[structopt(long)]
    pub make: Option<String>,
    #[structopt(long)]
    pub model: Option<String>,
    #[structopt(long)]
    pub software: Option<String>,

    #[structopt(long)]
    /// Creation date, ExifTool- or ISO-style; normalized on write.
    pub creationdate: Option<String>,

    /// Input filename.
    pub input: String,
    /// Output filename.
    pub output: String,
}

fn main() -> Result<()> {
    let opts = MainOpts::from_args();

    let mut builder = env_logger::Builder::new();
    if let Some(ref log_opts) = opts.log {
        builder.parse_filters(log_opts);
    } else if let Ok(ref log_opts) = std::env::var("RUST_LOG") {
        builder.parse_filters(log_opts);
    } else {
        builder.parse_filters("info");
    }
    builder.init();

    match opts.cmd {
        Command::Info(opts) => info(opts),
        Command::Extract(opts) => extract(opts),
        Command::Inject(opts) => inject(opts),
    }
}

fn info(opts: InfoOpts) -> Result<()> {
    let data = fs::read(&opts.input)?;
    let summary = dronemeta::header_summary(&data, &ExtractionConfig::default())?;
    if opts.json {
        println!(
            "{{\"width\":{},\"height\":{},\"duration_seconds\":{},\"frame_rate\":{}}}",
            summary.width, summary.height, summary.duration_seconds, summary.frame_rate
        );
    } else {
        println!(
            "{}x{}, {:.2}s, {:.2} fps",
            summary.width, summary.height, summary.duration_seconds, summary.frame_rate
        );
    }
    Ok(())
}

fn extract(opts: ExtractOpts) -> Result<()> {
    let data = fs::read(&opts.input)?;
    let mut config = ExtractionConfig::default();
    if let Some(track) = opts.track {
        config.metadata_trak_index = track;
    }
    let payload = dronemeta::extract_metadata_payload(&data, &config)?;
    assemble::write_payload_to_file(&payload, &opts.output)?;
    info!("wrote {} bytes of telemetry payload to {}", payload.len(), opts.output);
    Ok(())
}

fn inject(opts: InjectOpts) -> Result<()> {
    let creationdate = match opts.creationdate {
        Some(ref s) => Some(dronemeta::creationdate::normalize_str(s)?),
        None => None,
    };
    let iso6709 = iso6709::format_iso6709(opts.lat, opts.lon, opts.alt, Default::default());

    let fields = MetadataFields {
        accuracy_horizontal: opts.accuracy,
        iso6709,
        make: opts.make,
        model: opts.model,
        software: opts.software,
        creationdate,
    };

    rewrite::inject_into_file(&opts.input, &opts.output, &fields)
        .map_err(|e| anyhow!("injecting metadata into {}: {}", opts.output, e))?;
    info!("wrote geotagged copy to {}", opts.output);
    Ok(())
}
