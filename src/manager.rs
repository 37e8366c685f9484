use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::convert::{self, Axis};
use crate::exif::tags::*;
use crate::exif::{self, ExifDict};
use crate::format::{EDITABLE_EXTENSIONS, ImageKind, READABLE_EXTENSIONS};

/// GPSVersionID written with every coordinate.
const GPS_VERSION: [u8; 4] = [2, 2, 0, 0];
/// Denominator for GPS seconds and altitude (hundredths).
const GPS_DENOMINATOR: u32 = 100;
/// SubSecTime written alongside a date.
const SUB_SEC_TIME: &str = "00";
/// ExifVersion used by [`ExifManager::set_default_exif_version`].
pub const DEFAULT_EXIF_VERSION: &str = "0220";

/// GPSAltitudeRef values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AltitudeRef {
    /// `0`
    AboveSeaLevel,
    /// `1`
    BelowSeaLevel,
}

impl AltitudeRef {
    pub fn as_byte(self) -> u8 {
        match self {
            AltitudeRef::AboveSeaLevel => 0,
            AltitudeRef::BelowSeaLevel => 1,
        }
    }

    /// `1` is below sea level; anything else is treated as above.
    pub fn from_byte(b: u8) -> Self {
        if b == 1 { AltitudeRef::BelowSeaLevel } else { AltitudeRef::AboveSeaLevel }
    }
}

/// Position read from the GPS section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpsData {
    /// Signed decimal degrees, negative south of the equator.
    pub latitude: f64,
    /// Signed decimal degrees, negative west of Greenwich.
    pub longitude: f64,
    /// Altitude magnitude in meters.
    pub altitude: f64,
    pub altitude_ref: AltitudeRef,
}

impl GpsData {
    /// Altitude in meters, negative below sea level.
    pub fn signed_altitude(&self) -> f64 {
        match self.altitude_ref {
            AltitudeRef::AboveSeaLevel => self.altitude,
            AltitudeRef::BelowSeaLevel => -self.altitude,
        }
    }
}

/// Snapshot of the typed fields, for display and JSON output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetadataSummary {
    pub file: Option<String>,
    pub date_original: Option<String>,
    pub date_digitized: Option<String>,
    pub gps: Option<GpsData>,
    pub keywords: Vec<String>,
    pub camera_maker: Option<String>,
    pub camera_model: Option<String>,
    pub description: Option<String>,
    pub copyright: Option<String>,
    pub artist: Option<String>,
    pub software: Option<String>,
    pub orientation: Option<u16>,
}

/// Typed access to the metadata of one JPEG/PNG file.
///
/// Load a file, read or change fields, then save. Setters only touch the
/// in-memory document; nothing reaches disk before [`ExifManager::save_file`].
///
/// # Example
///
/// ```rust,no_run
/// use exif_manager::ExifManager;
/// use exif_manager::manager::AltitudeRef;
/// use std::path::Path;
///
/// # fn main() -> anyhow::Result<()> {
/// let mut mgr = ExifManager::new(true);
/// mgr.load_file(Path::new("photo.jpg"))?;
///
/// if !mgr.has_gps_data() {
///     mgr.set_gps_data(37.6, -0.98, 12.5, AltitudeRef::AboveSeaLevel);
/// }
/// mgr.add_keywords(&["holiday", "beach"], false);
///
/// // Saved as photo(1).jpg next to the original
/// let saved = mgr.save_file(None, false)?;
/// println!("{}", saved.display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ExifManager {
    pub metadata: ExifDict,
    file: Option<PathBuf>,
    log_enabled: bool,
    backup_originals: bool,
}

impl Default for ExifManager {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ExifManager {
    pub fn new(log_enabled: bool) -> Self {
        Self {
            metadata: ExifDict::default(),
            file: None,
            log_enabled,
            backup_originals: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut mgr = Self::new(config.logging.enabled);
        mgr.backup_originals = config.output.backup_originals;
        mgr
    }

    /// The currently loaded file.
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    // ── file handling ────────────────────────────────────────────────

    /// Load the metadata of `path`, replacing any previous state.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        if self.log_enabled {
            log::info!("Loading file: {}", path.display());
        }
        if ImageKind::from_path(path).is_none() {
            anyhow::bail!(
                "File '{}' not compatible with metadata reading [Compatible formats = {}]",
                file_name(path),
                READABLE_EXTENSIONS.join(", ")
            );
        }

        self.file = None;
        self.metadata = ExifDict::default();

        self.metadata = exif::read_metadata(path)
            .with_context(|| format!("Failed to load metadata from {}", path.display()))?;
        self.file = Some(path.to_path_buf());
        Ok(())
    }

    /// Write the metadata into the loaded image.
    ///
    /// `filename` replaces the file name within the source directory; `None`
    /// keeps the source name. When `overwrite` is `false` an existing target
    /// is never replaced; the name is bumped to `name(n).ext` instead.
    /// Returns the path written.
    pub fn save_file(&self, filename: Option<&str>, overwrite: bool) -> Result<PathBuf> {
        let source = self.file.as_deref().context("No file loaded")?;

        let editable = ImageKind::from_path(source).is_some_and(|k| k.is_editable());
        if !editable {
            anyhow::bail!(
                "File '{}' not compatible with metadata writing [Compatible formats = {}]",
                file_name(source),
                EDITABLE_EXTENSIONS.join(", ")
            );
        }

        let mut output = match filename {
            Some(name) if !name.is_empty() => source.with_file_name(name),
            _ => source.to_path_buf(),
        };

        if !overwrite {
            output = exif::next_free_path(&output);
        } else if self.backup_originals && output.exists() {
            if let Err(e) = exif::backup_file(&output) {
                log::warn!("Failed to backup {}: {e}", output.display());
            }
        }

        if self.log_enabled {
            log::info!(
                "Writing file: {} in {}",
                file_name(&output),
                output.parent().map(|p| p.display().to_string()).unwrap_or_default()
            );
        }
        exif::write_metadata(&self.metadata, source, &output)?;
        Ok(output)
    }

    /// Drop every tag and image fact. Setters recreate sections as needed.
    pub fn clear_metadata(&mut self) {
        self.metadata.clear();
    }

    /// The document as an aligned `key | value` table (thumbnail omitted).
    pub fn metadata_as_string(&self) -> String {
        self.metadata.to_table()
    }

    // ── presence checks ──────────────────────────────────────────────

    pub fn has_gps_data(&self) -> bool {
        self.gps_data().is_some()
    }

    pub fn has_date_original(&self) -> bool {
        self.metadata.contains(Ifd::Exif, TAG_DATE_TIME_ORIGINAL)
    }

    pub fn has_date_digitized(&self) -> bool {
        self.metadata.contains(Ifd::Exif, TAG_DATE_TIME_DIGITIZED)
    }

    /// DateTimeOriginal is present and parses to a real date.
    pub fn has_valid_date_original(&self) -> bool {
        self.date_original()
            .is_some_and(|dt| convert::is_valid_date(&dt))
    }

    /// DateTimeDigitized is present and parses to a real date.
    pub fn has_valid_date_digitized(&self) -> bool {
        self.date_digitized()
            .is_some_and(|dt| convert::is_valid_date(&dt))
    }

    // ── getters ──────────────────────────────────────────────────────

    /// DateTimeOriginal. `None` if absent; [`convert::invalid_date`] if unparsable.
    pub fn date_original(&self) -> Option<NaiveDateTime> {
        self.date_tag(TAG_DATE_TIME_ORIGINAL)
    }

    /// DateTimeDigitized. `None` if absent; [`convert::invalid_date`] if unparsable.
    pub fn date_digitized(&self) -> Option<NaiveDateTime> {
        self.date_tag(TAG_DATE_TIME_DIGITIZED)
    }

    fn date_tag(&self, code: u16) -> Option<NaiveDateTime> {
        let value = self.metadata.get(Ifd::Exif, code)?;
        let text = match value.as_bytes() {
            Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            None => value.to_string(),
        };
        Some(convert::parse_exif_datetime(&text))
    }

    /// Latitude, longitude and altitude. `None` unless all six GPS position
    /// tags are present and well formed.
    pub fn gps_data(&self) -> Option<GpsData> {
        let latitude = self.coordinate(TAG_GPS_LATITUDE, TAG_GPS_LATITUDE_REF, Axis::Latitude)?;
        let longitude = self.coordinate(TAG_GPS_LONGITUDE, TAG_GPS_LONGITUDE_REF, Axis::Longitude)?;

        let altitude = self
            .metadata
            .get(Ifd::Gps, TAG_GPS_ALTITUDE)?
            .as_rationals()?
            .first()
            .map(|&r| convert::rational_to_f64(r))?;
        let altitude_ref = self.metadata.get(Ifd::Gps, TAG_GPS_ALTITUDE_REF)?.as_u32()?;

        Some(GpsData {
            latitude,
            longitude,
            altitude,
            altitude_ref: AltitudeRef::from_byte(altitude_ref as u8),
        })
    }

    fn coordinate(&self, value_code: u16, ref_code: u16, axis: Axis) -> Option<f64> {
        let dms = self.metadata.get(Ifd::Gps, value_code)?.as_rationals()?;
        let zone = self.metadata.get(Ifd::Gps, ref_code)?.as_text()?.chars().next()?;
        if dms.len() < 3 {
            return None;
        }
        Some(convert::dms_zone_to_deg(
            convert::rational_to_f64(dms[0]),
            convert::rational_to_f64(dms[1]),
            convert::rational_to_f64(dms[2]),
            axis.is_positive(zone),
        ))
    }

    /// XPKeywords as a list. Empty when the tag is absent.
    pub fn keywords(&self) -> Vec<String> {
        self.metadata
            .get(Ifd::Primary, TAG_XP_KEYWORDS)
            .and_then(|v| v.as_bytes())
            .map(decode_keywords)
            .unwrap_or_default()
    }

    pub fn camera_maker(&self) -> Option<String> {
        self.primary_text(TAG_MAKE)
    }

    pub fn camera_model(&self) -> Option<String> {
        self.primary_text(TAG_MODEL)
    }

    pub fn description(&self) -> Option<String> {
        self.primary_text(TAG_IMAGE_DESCRIPTION)
    }

    pub fn copyright(&self) -> Option<String> {
        self.primary_text(TAG_COPYRIGHT)
    }

    pub fn artist(&self) -> Option<String> {
        self.primary_text(TAG_ARTIST)
    }

    pub fn software(&self) -> Option<String> {
        self.primary_text(TAG_SOFTWARE)
    }

    pub fn orientation(&self) -> Option<u16> {
        self.metadata
            .get(Ifd::Primary, TAG_ORIENTATION)?
            .as_u32()
            .map(|o| o as u16)
    }

    fn primary_text(&self, code: u16) -> Option<String> {
        self.metadata
            .get(Ifd::Primary, code)?
            .as_text()
            .filter(|s| !s.is_empty())
    }

    /// All typed fields at once.
    pub fn summary(&self) -> MetadataSummary {
        MetadataSummary {
            file: self.file.as_ref().map(|p| p.display().to_string()),
            date_original: self.date_original().map(|dt| convert::format_exif_datetime(&dt)),
            date_digitized: self.date_digitized().map(|dt| convert::format_exif_datetime(&dt)),
            gps: self.gps_data(),
            keywords: self.keywords(),
            camera_maker: self.camera_maker(),
            camera_model: self.camera_model(),
            description: self.description(),
            copyright: self.copyright(),
            artist: self.artist(),
            software: self.software(),
            orientation: self.orientation(),
        }
    }

    // ── setters ──────────────────────────────────────────────────────

    /// Set DateTimeOriginal (and SubSecTimeOriginal to `00`).
    pub fn set_date_original(&mut self, dt: &NaiveDateTime) {
        self.set_date(TAG_DATE_TIME_ORIGINAL, TAG_SUB_SEC_TIME_ORIGINAL, dt);
    }

    /// Set DateTimeDigitized (and SubSecTimeDigitized to `00`).
    pub fn set_date_digitized(&mut self, dt: &NaiveDateTime) {
        self.set_date(TAG_DATE_TIME_DIGITIZED, TAG_SUB_SEC_TIME_DIGITIZED, dt);
    }

    fn set_date(&mut self, code: u16, sub_sec_code: u16, dt: &NaiveDateTime) {
        let text = convert::format_exif_datetime(dt);
        log::debug!("  {}: {text}", tag_name(Ifd::Exif, code).unwrap_or("date"));
        self.metadata.set(Ifd::Exif, sub_sec_code, TagValue::ascii(SUB_SEC_TIME));
        self.metadata.set(Ifd::Exif, code, TagValue::ascii(&text));
    }

    pub fn set_artist(&mut self, artist: &str) {
        self.metadata.set(Ifd::Primary, TAG_ARTIST, TagValue::ascii(artist));
    }

    pub fn set_camera_maker(&mut self, maker: &str) {
        self.metadata.set(Ifd::Primary, TAG_MAKE, TagValue::ascii(maker));
    }

    pub fn set_camera_model(&mut self, model: &str) {
        self.metadata.set(Ifd::Primary, TAG_MODEL, TagValue::ascii(model));
    }

    pub fn set_copyright(&mut self, copyright: &str) {
        self.metadata.set(Ifd::Primary, TAG_COPYRIGHT, TagValue::ascii(copyright));
    }

    pub fn set_description(&mut self, description: &str) {
        self.metadata
            .set(Ifd::Primary, TAG_IMAGE_DESCRIPTION, TagValue::ascii(description));
    }

    pub fn set_software(&mut self, software: &str) {
        self.metadata.set(Ifd::Primary, TAG_SOFTWARE, TagValue::ascii(software));
    }

    /// Orientation (1–8).
    pub fn set_orientation(&mut self, orientation: u16) {
        self.metadata
            .set(Ifd::Primary, TAG_ORIENTATION, TagValue::Short(vec![orientation]));
    }

    /// ExifVersion, a four character string such as `0220` or `0232`.
    pub fn set_exif_version(&mut self, version: &str) {
        self.metadata.set(
            Ifd::Exif,
            TAG_EXIF_VERSION,
            TagValue::Undefined(version.as_bytes().to_vec()),
        );
    }

    pub fn set_default_exif_version(&mut self) {
        self.set_exif_version(DEFAULT_EXIF_VERSION);
    }

    /// Write a position to the GPS section.
    ///
    /// Coordinates are stored as degrees/minutes/seconds with a hemisphere
    /// letter, seconds and altitude in hundredths.
    pub fn set_gps_data(&mut self, latitude: f64, longitude: f64, altitude: f64, altitude_ref: AltitudeRef) {
        let lat = convert::deg_to_dms_zone(latitude, Axis::Latitude);
        let lon = convert::deg_to_dms_zone(longitude, Axis::Longitude);
        log::debug!("  GPS: {latitude}, {longitude}, {altitude} m");

        let dms_value = |d: &convert::Dms| {
            TagValue::Rational(vec![
                (d.degrees, 1),
                (d.minutes, 1),
                (d.seconds_hundredths(), GPS_DENOMINATOR),
            ])
        };

        let gps = [
            (TAG_GPS_VERSION_ID, TagValue::Byte(GPS_VERSION.to_vec())),
            (TAG_GPS_ALTITUDE_REF, TagValue::Byte(vec![altitude_ref.as_byte()])),
            (TAG_GPS_LATITUDE_REF, TagValue::ascii(&lat.zone.to_string())),
            (TAG_GPS_LONGITUDE_REF, TagValue::ascii(&lon.zone.to_string())),
            (TAG_GPS_LATITUDE, dms_value(&lat)),
            (TAG_GPS_LONGITUDE, dms_value(&lon)),
            (
                TAG_GPS_ALTITUDE,
                TagValue::Rational(vec![convert::f64_to_rational(altitude, GPS_DENOMINATOR)]),
            ),
        ];
        for (code, value) in gps {
            self.metadata.set(Ifd::Gps, code, value);
        }
    }

    /// Add keywords to XPKeywords.
    ///
    /// Without `overwrite`, new keywords are appended to the existing list,
    /// skipping ones already present. With `overwrite`, the list is replaced.
    pub fn add_keywords<S: AsRef<str>>(&mut self, keywords: &[S], overwrite: bool) {
        let mut merged: Vec<String> = if overwrite { Vec::new() } else { self.keywords() };

        for kwd in keywords {
            let kwd = kwd.as_ref().trim();
            if kwd.is_empty() || merged.iter().any(|k| k == kwd) {
                continue;
            }
            merged.push(kwd.to_string());
        }

        log::debug!("  Keywords: {}", merged.join(", "));
        self.metadata
            .set(Ifd::Primary, TAG_XP_KEYWORDS, TagValue::Byte(encode_keywords(&merged)));
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
