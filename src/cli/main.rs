use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::Parser;
use std::path::PathBuf;

use exif_manager::config::Config;
use exif_manager::convert;
use exif_manager::manager::{AltitudeRef, MetadataSummary};
use exif_manager::ExifManager;

#[derive(Parser, Debug)]
#[command(
    name = "exifmgr",
    version,
    about = "Read and edit dates, GPS, camera and keyword EXIF fields of JPEG/PNG images"
)]
struct Cli {
    /// Image file to inspect or edit
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Print every metadata section as a table and exit
    #[arg(long)]
    show: bool,

    /// Output the field summary as JSON
    #[arg(long)]
    json: bool,

    /// Remove all metadata before applying the other changes. Config
    /// defaults are only written back when another field is set too
    #[arg(long)]
    clear: bool,

    /// Set DateTimeOriginal (e.g. "2022:07:14 18:03:59" or "2022-07-14T18:03:59")
    #[arg(long, value_name = "DATETIME", value_parser = parse_datetime)]
    date_original: Option<NaiveDateTime>,

    /// Set DateTimeDigitized
    #[arg(long, value_name = "DATETIME", value_parser = parse_datetime)]
    date_digitized: Option<NaiveDateTime>,

    /// Set the GPS position in decimal degrees and meters
    #[arg(long, value_name = "LAT,LON,ALT", value_parser = parse_gps, allow_hyphen_values = true)]
    gps: Option<GpsArg>,

    /// The --gps altitude is below sea level
    #[arg(long)]
    below_sea_level: bool,

    /// Set the camera maker
    #[arg(long)]
    maker: Option<String>,

    /// Set the camera model
    #[arg(long)]
    model: Option<String>,

    /// Set the artist
    #[arg(long)]
    artist: Option<String>,

    /// Set the copyright notice
    #[arg(long)]
    copyright: Option<String>,

    /// Set the image description
    #[arg(long)]
    description: Option<String>,

    /// Set the software name
    #[arg(long)]
    software: Option<String>,

    /// Set the orientation (1-8)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=8))]
    orientation: Option<u16>,

    /// Keywords to add, separated by ';'
    #[arg(long, value_name = "KEYWORDS", value_delimiter = ';')]
    keywords: Vec<String>,

    /// Replace existing keywords instead of merging
    #[arg(long)]
    replace_keywords: bool,

    /// Output file name, saved next to the source
    #[arg(short, long, value_name = "NAME")]
    output: Option<String>,

    /// Overwrite the target file instead of saving as name(n).ext
    #[arg(long)]
    overwrite: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy)]
struct GpsArg {
    latitude: f64,
    longitude: f64,
    altitude: f64,
}

fn parse_gps(s: &str) -> Result<GpsArg, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [lat, lon, alt] = parts.as_slice() else {
        return Err(format!("expected LAT,LON,ALT, got '{s}'"));
    };
    let num = |v: &str, what: &str| v.parse::<f64>().map_err(|_| format!("invalid {what} '{v}'"));

    let gps = GpsArg {
        latitude: num(lat, "latitude")?,
        longitude: num(lon, "longitude")?,
        altitude: num(alt, "altitude")?,
    };
    if !(-90.0..=90.0).contains(&gps.latitude) {
        return Err(format!("latitude {} out of range", gps.latitude));
    }
    if !(-180.0..=180.0).contains(&gps.longitude) {
        return Err(format!("longitude {} out of range", gps.longitude));
    }
    Ok(gps)
}

fn parse_datetime(s: &str) -> Result<NaiveDateTime, String> {
    convert::try_parse_datetime(s).ok_or_else(|| format!("unrecognized date '{s}'"))
}

impl Cli {
    fn has_changes(&self) -> bool {
        self.clear || self.has_setters()
    }

    fn has_setters(&self) -> bool {
        self.date_original.is_some()
            || self.date_digitized.is_some()
            || self.gps.is_some()
            || self.maker.is_some()
            || self.model.is_some()
            || self.artist.is_some()
            || self.copyright.is_some()
            || self.description.is_some()
            || self.software.is_some()
            || self.orientation.is_some()
            || !self.keywords.is_empty()
            || self.replace_keywords
    }
}

fn init_logging(cli: &Cli, config: &Config) -> Result<()> {
    let log_level = if cli.verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level));
    builder.format_timestamp(None);

    if let Some(log_file) = &config.logging.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .with_context(|| format!("Failed to open log file {log_file}"))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle --init
    if cli.init {
        let config = Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    let config_path = match cli.config.as_deref() {
        Some(p) => p.to_path_buf(),
        None => Config::config_path()?,
    };
    let found = Config::read(&config_path)?;
    let config_missing = found.is_none();
    let config = found.unwrap_or_default();
    init_logging(&cli, &config)?;
    if config_missing {
        log::warn!(
            "Config file not found at {}. Using defaults.",
            config_path.display()
        );
    }

    let Some(path) = cli.file.as_deref() else {
        anyhow::bail!("No input file specified. Use --help for usage.");
    };

    let mut mgr = ExifManager::from_config(&config);
    mgr.load_file(path)?;

    // Handle --show
    if cli.show {
        print!("{}", mgr.metadata_as_string());
        return Ok(());
    }

    if !cli.has_changes() {
        let summary = mgr.summary();
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print_summary(&summary);
        }
        return Ok(());
    }

    if cli.clear {
        log::info!("Clearing metadata");
        mgr.clear_metadata();
    }
    apply_changes(&cli, &config, &mut mgr);

    let overwrite = cli.overwrite || config.output.overwrite;
    let saved = mgr.save_file(cli.output.as_deref(), overwrite)?;

    if cli.json {
        let result = serde_json::json!({
            "path": saved.display().to_string(),
            "summary": mgr.summary(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Saved: {}", saved.display());
    }

    Ok(())
}

/// Apply CLI setters, then config defaults for fields not given explicitly.
/// A bare `--clear` leaves the file without metadata.
fn apply_changes(cli: &Cli, config: &Config, mgr: &mut ExifManager) {
    if let Some(dt) = &cli.date_original {
        mgr.set_date_original(dt);
    }
    if let Some(dt) = &cli.date_digitized {
        mgr.set_date_digitized(dt);
    }
    if let Some(gps) = cli.gps {
        let altitude_ref = if cli.below_sea_level {
            AltitudeRef::BelowSeaLevel
        } else {
            AltitudeRef::AboveSeaLevel
        };
        mgr.set_gps_data(gps.latitude, gps.longitude, gps.altitude, altitude_ref);
    }
    if let Some(v) = &cli.maker {
        mgr.set_camera_maker(v);
    }
    if let Some(v) = &cli.model {
        mgr.set_camera_model(v);
    }
    if let Some(v) = &cli.description {
        mgr.set_description(v);
    }
    if let Some(o) = cli.orientation {
        mgr.set_orientation(o);
    }
    if !cli.keywords.is_empty() || cli.replace_keywords {
        mgr.add_keywords(&cli.keywords, cli.replace_keywords);
    }

    if !cli.has_setters() {
        return;
    }

    let defaults = &config.defaults;
    if let Some(v) = cli.artist.as_ref().or(defaults.artist.as_ref()) {
        mgr.set_artist(v);
    }
    if let Some(v) = cli.copyright.as_ref().or(defaults.copyright.as_ref()) {
        mgr.set_copyright(v);
    }
    if let Some(v) = cli.software.as_ref().or(defaults.software.as_ref()) {
        mgr.set_software(v);
    }
    if !defaults.exif_version.is_empty() {
        mgr.set_exif_version(&defaults.exif_version);
    }
}

// ANSI color codes
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Print the typed fields of a file.
fn print_summary(s: &MetadataSummary) {
    println!();
    if let Some(file) = &s.file {
        println!("{BOLD}File:{RESET} {file}");
    }
    println!("{DIM}{}{RESET}", "═".repeat(72));

    let gps = s.gps.map(|g| {
        format!(
            "{:.6}, {:.6}, {:.2} m",
            g.latitude,
            g.longitude,
            g.signed_altitude()
        )
    });
    let keywords = (!s.keywords.is_empty()).then(|| s.keywords.join("; "));
    let orientation = s.orientation.map(|o| o.to_string());

    let rows: Vec<(&str, Option<&str>)> = vec![
        ("DateTimeOriginal", s.date_original.as_deref()),
        ("DateTimeDigitized", s.date_digitized.as_deref()),
        ("GPS", gps.as_deref()),
        ("Make", s.camera_maker.as_deref()),
        ("Model", s.camera_model.as_deref()),
        ("ImageDescription", s.description.as_deref()),
        ("Artist", s.artist.as_deref()),
        ("Copyright", s.copyright.as_deref()),
        ("Software", s.software.as_deref()),
        ("Orientation", orientation.as_deref()),
        ("XPKeywords", keywords.as_deref()),
    ];

    if rows.iter().all(|(_, v)| v.is_none()) {
        println!("  {DIM}(no EXIF metadata found){RESET}");
    }
    for (tag, val) in rows {
        if let Some(v) = val {
            println!("  {tag:<22} : {v}");
        }
    }
    println!();
}
