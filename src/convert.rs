//! Unit conversion helpers used by the metadata accessors.
//!
//! - GPS coordinates: degrees/minutes/seconds with a hemisphere letter ↔ signed decimal degrees
//! - EXIF rationals ↔ floating point
//! - EXIF datetime strings (`YYYY:MM:DD HH:MM:SS`) ↔ [`NaiveDateTime`]

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// EXIF datetime layout (`2022:07:14 18:03:59`).
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Formats accepted when parsing user or reader supplied datetimes.
const ACCEPTED_DATETIME_FORMATS: &[&str] = &[
    EXIF_DATETIME_FORMAT,
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y:%m:%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Value returned for a present but unparsable date: `0001-01-01 00:00:00`.
pub fn invalid_date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Which coordinate a DMS value belongs to. Determines the hemisphere letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// `N` for positive, `S` for negative values.
    Latitude,
    /// `E` for positive, `W` for negative values.
    Longitude,
}

impl Axis {
    /// Hemisphere letters as `(positive, negative)`.
    pub fn zones(self) -> (char, char) {
        match self {
            Axis::Latitude => ('N', 'S'),
            Axis::Longitude => ('E', 'W'),
        }
    }

    /// Whether `zone` is the positive hemisphere of this axis.
    pub fn is_positive(self, zone: char) -> bool {
        zone.eq_ignore_ascii_case(&self.zones().0)
    }
}

/// A coordinate split into degrees, minutes, seconds and hemisphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dms {
    pub degrees: u32,
    pub minutes: u32,
    /// Seconds, rounded to hundredths.
    pub seconds: f64,
    /// Hemisphere letter (`N`, `S`, `E` or `W`).
    pub zone: char,
}

impl Dms {
    /// Seconds as an EXIF rational with a denominator of 100.
    pub fn seconds_hundredths(&self) -> u32 {
        (self.seconds * 100.0).round() as u32
    }
}

/// Split a signed decimal coordinate into DMS plus hemisphere.
///
/// Seconds are rounded to hundredths; a rounding carry into 60 seconds or
/// 60 minutes is propagated so the result is always normalized.
pub fn deg_to_dms_zone(value: f64, axis: Axis) -> Dms {
    let (positive, negative) = axis.zones();
    let zone = if value >= 0.0 { positive } else { negative };

    let abs = value.abs();
    let mut degrees = abs.floor() as u32;
    let minutes_f = (abs - degrees as f64) * 60.0;
    let mut minutes = minutes_f.floor() as u32;
    let mut hundredths = ((minutes_f - minutes as f64) * 60.0 * 100.0).round() as u32;

    if hundredths >= 6000 {
        hundredths -= 6000;
        minutes += 1;
    }
    if minutes >= 60 {
        minutes -= 60;
        degrees += 1;
    }

    Dms {
        degrees,
        minutes,
        seconds: hundredths as f64 / 100.0,
        zone,
    }
}

/// Combine degrees, minutes and seconds into a signed decimal coordinate.
pub fn dms_zone_to_deg(degrees: f64, minutes: f64, seconds: f64, zone_positive: bool) -> f64 {
    let value = degrees + minutes / 60.0 + seconds / 3600.0;
    if zone_positive { value } else { -value }
}

/// Convert an EXIF rational to `f64`. A zero denominator yields `0.0`.
pub fn rational_to_f64(rational: (u32, u32)) -> f64 {
    let (num, den) = rational;
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Convert a non-negative value to a rational with the given denominator (truncating).
pub fn f64_to_rational(value: f64, denominator: u32) -> (u32, u32) {
    ((value.abs() * denominator as f64) as u32, denominator)
}

/// Format a datetime the way EXIF stores it.
pub fn format_exif_datetime(dt: &NaiveDateTime) -> String {
    dt.format(EXIF_DATETIME_FORMAT).to_string()
}

/// Parse a datetime in any accepted layout, including RFC 3339 with an offset.
pub fn try_parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim().trim_end_matches('\0').trim();

    for fmt in ACCEPTED_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.naive_local())
}

/// Parse an EXIF datetime. Unparsable input (e.g. `0000:00:00 00:00:00`)
/// yields [`invalid_date`] rather than an error.
pub fn parse_exif_datetime(value: &str) -> NaiveDateTime {
    try_parse_datetime(value).unwrap_or_else(invalid_date)
}

/// `false` for the [`invalid_date`] sentinel.
pub fn is_valid_date(dt: &NaiveDateTime) -> bool {
    dt.year() != 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    // ── deg_to_dms_zone ──────────────────────────────────────────────

    #[test]
    fn dms_positive_latitude() {
        let dms = deg_to_dms_zone(40.446195, Axis::Latitude);
        assert_eq!(dms.degrees, 40);
        assert_eq!(dms.minutes, 26);
        assert!(approx(dms.seconds, 46.30));
        assert_eq!(dms.zone, 'N');
    }

    #[test]
    fn dms_negative_longitude() {
        let dms = deg_to_dms_zone(-79.948862, Axis::Longitude);
        assert_eq!(dms.degrees, 79);
        assert_eq!(dms.minutes, 56);
        assert!(approx(dms.seconds, 55.90));
        assert_eq!(dms.zone, 'W');
    }

    #[test]
    fn dms_zero_is_positive_hemisphere() {
        assert_eq!(deg_to_dms_zone(0.0, Axis::Latitude).zone, 'N');
        assert_eq!(deg_to_dms_zone(0.0, Axis::Longitude).zone, 'E');
    }

    #[test]
    fn dms_negative_latitude_is_south() {
        let dms = deg_to_dms_zone(-33.8688, Axis::Latitude);
        assert_eq!(dms.zone, 'S');
        assert_eq!(dms.degrees, 33);
        assert_eq!(dms.minutes, 52);
    }

    #[test]
    fn dms_exact_half_degree() {
        let dms = deg_to_dms_zone(10.5, Axis::Latitude);
        assert_eq!((dms.degrees, dms.minutes), (10, 30));
        assert!(approx(dms.seconds, 0.0));
    }

    #[test]
    fn dms_rounding_carries_into_minutes_and_degrees() {
        // 59' 59.999" rounds to 60.00" which must carry all the way up
        let dms = deg_to_dms_zone(12.0 + 59.0 / 60.0 + 59.999 / 3600.0, Axis::Latitude);
        assert_eq!(dms.degrees, 13);
        assert_eq!(dms.minutes, 0);
        assert!(approx(dms.seconds, 0.0));
    }

    #[test]
    fn dms_seconds_hundredths() {
        let dms = deg_to_dms_zone(40.446195, Axis::Latitude);
        assert_eq!(dms.seconds_hundredths(), 4630);
    }

    // ── dms_zone_to_deg ──────────────────────────────────────────────

    #[test]
    fn deg_from_dms_north() {
        assert!(approx(dms_zone_to_deg(40.0, 26.0, 46.0, true), 40.446111));
    }

    #[test]
    fn deg_from_dms_west_is_negative() {
        assert!(approx(dms_zone_to_deg(79.0, 58.0, 56.0, false), -79.982222));
    }

    #[test]
    fn dms_roundtrip_within_hundredth_second() {
        for value in [51.5007, -0.1246, 35.6586, 139.7454, -22.9519, -43.2105] {
            for axis in [Axis::Latitude, Axis::Longitude] {
                let dms = deg_to_dms_zone(value, axis);
                let back = dms_zone_to_deg(
                    dms.degrees as f64,
                    dms.minutes as f64,
                    dms.seconds,
                    axis.is_positive(dms.zone),
                );
                assert!((back - value).abs() < 0.01 / 3600.0, "{value} -> {back}");
            }
        }
    }

    #[test]
    fn axis_zone_letters() {
        assert!(Axis::Latitude.is_positive('N'));
        assert!(Axis::Latitude.is_positive('n'));
        assert!(!Axis::Latitude.is_positive('S'));
        assert!(Axis::Longitude.is_positive('E'));
        assert!(!Axis::Longitude.is_positive('W'));
    }

    // ── rationals ────────────────────────────────────────────────────

    #[test]
    fn rational_conversion() {
        assert!(approx(rational_to_f64((4630, 100)), 46.30));
        assert!(approx(rational_to_f64((5, 0)), 0.0));
        assert_eq!(f64_to_rational(123.456, 100), (12345, 100));
        assert_eq!(f64_to_rational(-12.5, 100), (1250, 100));
    }

    // ── datetimes ────────────────────────────────────────────────────

    #[test]
    fn parse_exif_layout() {
        let dt = parse_exif_datetime("2022:07:14 18:03:59");
        assert_eq!(format_exif_datetime(&dt), "2022:07:14 18:03:59");
        assert!(is_valid_date(&dt));
    }

    #[test]
    fn parse_trailing_nul() {
        let dt = parse_exif_datetime("2021:01:02 03:04:05\0");
        assert_eq!(format_exif_datetime(&dt), "2021:01:02 03:04:05");
    }

    #[test]
    fn parse_dash_and_rfc3339_layouts() {
        assert_eq!(
            try_parse_datetime("2020-02-29 12:00:00"),
            try_parse_datetime("2020:02:29 12:00:00")
        );
        let dt = try_parse_datetime("2020-02-29T12:00:00+02:00").unwrap();
        assert_eq!(format_exif_datetime(&dt), "2020:02:29 12:00:00");
    }

    #[test]
    fn invalid_dates_yield_sentinel() {
        for bad in ["0000:00:00 00:00:00", "", "    :  :     :  :  ", "2022:13:01 00:00:00"] {
            let dt = parse_exif_datetime(bad);
            assert_eq!(dt, invalid_date(), "{bad:?}");
            assert!(!is_valid_date(&dt));
        }
    }

    #[test]
    fn sentinel_is_year_one() {
        assert_eq!(invalid_date().year(), 1);
        assert_eq!(format_exif_datetime(&invalid_date()), "0001:01:01 00:00:00");
    }
}
