use anyhow::{Context, Result};
use image::ImageFormat;
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::{Bytes, ImageEXIF};
use nom_exif::{EntryValue, Exif, ExifIter, MediaParser, MediaSource};
use std::path::Path;

use super::codec;
use super::dict::ExifDict;
use super::tags::*;
use crate::convert;

/// IFD0 string tags recovered by the fallback reader.
const FALLBACK_TEXT_TAGS: &[u16] = &[
    TAG_IMAGE_DESCRIPTION,
    TAG_MAKE,
    TAG_MODEL,
    TAG_SOFTWARE,
    TAG_ARTIST,
    TAG_COPYRIGHT,
];

/// Some writers keep the JPEG APP1 prefix inside the PNG eXIf chunk.
const EXIF_PREFIX: &[u8] = b"Exif\0\0";

/// Read all metadata of an image file into an [`ExifDict`].
///
/// The image is identified first (format and dimensions land in
/// [`ExifDict::info`]). The EXIF block is taken from the JPEG APP1 segment
/// or the PNG `eXIf` chunk and decoded; if a JPEG block can't be decoded,
/// nom-exif is used to recover the fields the manager exposes.
/// The returned document always has every default section.
pub fn read_metadata(path: &Path) -> Result<ExifDict> {
    let mut dict = ExifDict::default();

    let format = read_image_info(path, &mut dict)?;

    match extract_exif_block(path, format)? {
        Some(tiff) => match codec::decode_tiff(tiff, &mut dict) {
            Ok(count) => log::debug!("Loaded {count} tags from {}", path.display()),
            Err(e) if format == ImageFormat::Jpeg => {
                log::debug!("{e:#}, trying nom-exif");
                if let Err(e) = read_with_nom_exif(path, &mut dict) {
                    log::warn!("Could not read EXIF from {}: {e}", path.display());
                }
            }
            Err(e) => log::warn!("Could not read EXIF from {}: {e:#}", path.display()),
        },
        None => log::debug!("No EXIF data found in {}", path.display()),
    }

    dict.ensure_default_sections();
    Ok(dict)
}

/// Identify the image container and record its format and dimensions.
fn read_image_info(path: &Path, dict: &mut ExifDict) -> Result<ImageFormat> {
    let reader = image::ImageReader::open(path)
        .context("Failed to open image file")?
        .with_guessed_format()
        .context("Failed to read image header")?;

    let format = reader
        .format()
        .with_context(|| format!("Unrecognized image format: {}", path.display()))?;
    dict.info.insert("format".to_string(), format!("{format:?}"));

    let (w, h) = reader
        .into_dimensions()
        .with_context(|| format!("Failed to decode image: {}", path.display()))?;
    dict.info.insert("dimensions".to_string(), format!("{w}x{h}"));

    Ok(format)
}

/// The raw TIFF block of the file's EXIF, if it has one.
fn extract_exif_block(path: &Path, format: ImageFormat) -> Result<Option<Vec<u8>>> {
    let bytes = Bytes::from(std::fs::read(path).context("Failed to read image file")?);

    let exif = match format {
        ImageFormat::Jpeg => Jpeg::from_bytes(bytes)
            .map_err(|e| anyhow::anyhow!("Failed to parse JPEG: {e}"))?
            .exif(),
        ImageFormat::Png => Png::from_bytes(bytes)
            .map_err(|e| anyhow::anyhow!("Failed to parse PNG: {e}"))?
            .exif(),
        _ => None,
    };

    Ok(exif.map(|block| {
        let block = block.strip_prefix(EXIF_PREFIX).unwrap_or(&block[..]);
        block.to_vec()
    }))
}

/// Recover the manager's fields with nom-exif.
fn read_with_nom_exif(path: &Path, dict: &mut ExifDict) -> Result<()> {
    let mut parser = MediaParser::new();
    let ms = MediaSource::file_path(path).context("Failed to open image file")?;

    let iter: ExifIter = match parser.parse(ms) {
        Ok(iter) => iter,
        Err(_) => {
            log::debug!("No EXIF data found in {}", path.display());
            return Ok(());
        }
    };

    // Parse GPS info before converting to Exif (consumes the iterator)
    let gps_info = iter.parse_gps_info().ok().flatten();
    let exif: Exif = iter.into();

    for &code in FALLBACK_TEXT_TAGS {
        if let Some(text) = exif.get_by_ifd_tag_code(0, code).and_then(entry_to_string) {
            dict.set(Ifd::Primary, code, TagValue::ascii(&text));
        }
    }

    if let Some(orientation) = exif
        .get_by_ifd_tag_code(0, TAG_ORIENTATION)
        .and_then(entry_to_string)
        .and_then(|s| s.parse::<u16>().ok())
    {
        dict.set(Ifd::Primary, TAG_ORIENTATION, TagValue::Short(vec![orientation]));
    }

    if let Some(val) = exif.get_by_ifd_tag_code(0, TAG_XP_KEYWORDS) {
        let bytes = match val {
            EntryValue::U8Array(b) | EntryValue::Undefined(b) => Some(b.clone()),
            _ => None,
        };
        if let Some(bytes) = bytes {
            dict.set(Ifd::Primary, TAG_XP_KEYWORDS, TagValue::Byte(bytes));
        }
    }

    // nom-exif converts dates; store them back in EXIF layout
    for code in [TAG_DATE_TIME_ORIGINAL, TAG_DATE_TIME_DIGITIZED] {
        if let Some(raw) = exif.get_by_ifd_tag_code(0, code).and_then(entry_to_string) {
            let text = convert::try_parse_datetime(&raw)
                .map(|dt| convert::format_exif_datetime(&dt))
                .unwrap_or(raw);
            dict.set(Ifd::Exif, code, TagValue::ascii(&text));
        }
    }

    if let Some(gps) = gps_info {
        let triple = |l: &nom_exif::LatLng| {
            vec![(l.0.0, l.0.1), (l.1.0, l.1.1), (l.2.0, l.2.1)]
        };
        dict.set(Ifd::Gps, TAG_GPS_LATITUDE_REF, TagValue::ascii(&gps.latitude_ref.to_string()));
        dict.set(Ifd::Gps, TAG_GPS_LATITUDE, TagValue::Rational(triple(&gps.latitude)));
        dict.set(Ifd::Gps, TAG_GPS_LONGITUDE_REF, TagValue::ascii(&gps.longitude_ref.to_string()));
        dict.set(Ifd::Gps, TAG_GPS_LONGITUDE, TagValue::Rational(triple(&gps.longitude)));
        dict.set(Ifd::Gps, TAG_GPS_ALTITUDE_REF, TagValue::Byte(vec![gps.altitude_ref]));
        dict.set(
            Ifd::Gps,
            TAG_GPS_ALTITUDE,
            TagValue::Rational(vec![(gps.altitude.0, gps.altitude.1)]),
        );
    }

    log::debug!("nom-exif recovered {} tags from {}", dict.tag_count(), path.display());
    Ok(())
}

/// Convert an EntryValue to an Option<String>.
fn entry_to_string(val: &EntryValue) -> Option<String> {
    let s = val.to_string();
    let s = s.trim().trim_matches('"').to_string();
    if s.is_empty() { None } else { Some(s) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::writer::write_metadata;
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_image(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        RgbImage::from_pixel(8, 6, Rgb([200, 120, 40])).save(&path).unwrap();
        path
    }

    fn tagged_dict() -> ExifDict {
        let mut dict = ExifDict::with_default_sections();
        dict.set(Ifd::Primary, TAG_MAKE, TagValue::ascii("Canon"));
        dict.set(Ifd::Primary, TAG_ORIENTATION, TagValue::Short(vec![3]));
        dict.set(Ifd::Primary, TAG_XP_KEYWORDS, TagValue::Byte(encode_keywords(&["beach", "sunset"])));
        dict.set(Ifd::Exif, TAG_DATE_TIME_ORIGINAL, TagValue::ascii("2022:07:14 18:03:59"));
        dict.set(Ifd::Gps, TAG_GPS_LATITUDE_REF, TagValue::ascii("S"));
        dict.set(Ifd::Gps, TAG_GPS_LATITUDE, TagValue::Rational(vec![(33, 1), (52, 1), (768, 100)]));
        dict.set(Ifd::Gps, TAG_GPS_LONGITUDE_REF, TagValue::ascii("E"));
        dict.set(Ifd::Gps, TAG_GPS_LONGITUDE, TagValue::Rational(vec![(151, 1), (12, 1), (3348, 100)]));
        dict.set(Ifd::Gps, TAG_GPS_ALTITUDE_REF, TagValue::Byte(vec![0]));
        dict.set(Ifd::Gps, TAG_GPS_ALTITUDE, TagValue::Rational(vec![(1250, 100)]));
        dict
    }

    // ── read_metadata ────────────────────────────────────────────────

    #[test]
    fn jpeg_without_exif_has_default_sections() {
        let dir = TempDir::new().unwrap();
        let path = write_image(&dir, "plain.jpg");

        let dict = read_metadata(&path).unwrap();
        for ifd in Ifd::ALL {
            assert!(dict.section(ifd).is_some());
        }
        assert!(!dict.contains(Ifd::Exif, TAG_DATE_TIME_ORIGINAL));
        assert_eq!(dict.info.get("format").map(String::as_str), Some("Jpeg"));
        assert_eq!(dict.info.get("dimensions").map(String::as_str), Some("8x6"));
    }

    #[test]
    fn png_is_identified() {
        let dir = TempDir::new().unwrap();
        let path = write_image(&dir, "plain.png");

        let dict = read_metadata(&path).unwrap();
        assert_eq!(dict.info.get("format").map(String::as_str), Some("Png"));
        assert!(dict.section(Ifd::Gps).is_some());
    }

    #[test]
    fn png_exif_chunk_is_read() {
        let dir = TempDir::new().unwrap();
        let path = write_image(&dir, "tagged.png");
        let tiff = codec::encode_tiff(&tagged_dict()).unwrap().unwrap();

        let mut png = Png::from_bytes(Bytes::from(std::fs::read(&path).unwrap())).unwrap();
        png.set_exif(Some(Bytes::from(tiff)));
        std::fs::write(&path, png.encoder().bytes()).unwrap();

        let dict = read_metadata(&path).unwrap();
        assert_eq!(dict.get(Ifd::Primary, TAG_MAKE), Some(&TagValue::ascii("Canon")));
        assert_eq!(dict.get(Ifd::Gps, TAG_GPS_LATITUDE_REF), Some(&TagValue::ascii("S")));
        assert_eq!(
            dict.get(Ifd::Exif, TAG_DATE_TIME_ORIGINAL),
            Some(&TagValue::ascii("2022:07:14 18:03:59"))
        );
    }

    #[test]
    fn png_exif_chunk_with_app1_prefix() {
        let dir = TempDir::new().unwrap();
        let path = write_image(&dir, "prefixed.png");
        let mut block = EXIF_PREFIX.to_vec();
        block.extend(codec::encode_tiff(&tagged_dict()).unwrap().unwrap());

        let mut png = Png::from_bytes(Bytes::from(std::fs::read(&path).unwrap())).unwrap();
        png.set_exif(Some(Bytes::from(block)));
        std::fs::write(&path, png.encoder().bytes()).unwrap();

        let dict = read_metadata(&path).unwrap();
        assert_eq!(dict.get(Ifd::Primary, TAG_MAKE), Some(&TagValue::ascii("Canon")));
    }

    #[test]
    fn jpeg_gps_section_is_read() {
        let dir = TempDir::new().unwrap();
        let src = write_image(&dir, "src.jpg");
        let out = dir.path().join("gps.jpg");
        write_metadata(&tagged_dict(), &src, &out).unwrap();

        let dict = read_metadata(&out).unwrap();
        assert_eq!(dict.get(Ifd::Gps, TAG_GPS_LATITUDE_REF), Some(&TagValue::ascii("S")));
        assert_eq!(
            dict.get(Ifd::Gps, TAG_GPS_LONGITUDE),
            Some(&TagValue::Rational(vec![(151, 1), (12, 1), (3348, 100)]))
        );
        assert_eq!(dict.get(Ifd::Gps, TAG_GPS_ALTITUDE_REF), Some(&TagValue::Byte(vec![0])));
    }

    #[test]
    fn non_image_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();
        assert!(read_metadata(&path).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(read_metadata(Path::new("/nonexistent/photo.jpg")).is_err());
    }

    // ── nom-exif fallback ────────────────────────────────────────────

    #[test]
    fn fallback_recovers_manager_fields() {
        let dir = TempDir::new().unwrap();
        let src = write_image(&dir, "src.jpg");
        let out = dir.path().join("tagged.jpg");
        write_metadata(&tagged_dict(), &src, &out).unwrap();

        let mut dict = ExifDict::default();
        read_with_nom_exif(&out, &mut dict).unwrap();

        assert_eq!(dict.get(Ifd::Primary, TAG_MAKE), Some(&TagValue::ascii("Canon")));
        assert_eq!(dict.get(Ifd::Primary, TAG_ORIENTATION), Some(&TagValue::Short(vec![3])));
        assert_eq!(
            dict.get(Ifd::Exif, TAG_DATE_TIME_ORIGINAL),
            Some(&TagValue::ascii("2022:07:14 18:03:59"))
        );
        assert_eq!(dict.get(Ifd::Gps, TAG_GPS_LATITUDE_REF), Some(&TagValue::ascii("S")));
        assert_eq!(
            dict.get(Ifd::Gps, TAG_GPS_LATITUDE),
            Some(&TagValue::Rational(vec![(33, 1), (52, 1), (768, 100)]))
        );
        assert_eq!(dict.get(Ifd::Gps, TAG_GPS_LONGITUDE_REF), Some(&TagValue::ascii("E")));
        assert_eq!(
            dict.get(Ifd::Gps, TAG_GPS_ALTITUDE),
            Some(&TagValue::Rational(vec![(1250, 100)]))
        );

        let keywords = dict
            .get(Ifd::Primary, TAG_XP_KEYWORDS)
            .and_then(TagValue::as_bytes)
            .map(decode_keywords);
        assert_eq!(keywords, Some(vec!["beach".to_string(), "sunset".to_string()]));
    }

    #[test]
    fn fallback_on_jpeg_without_exif_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = write_image(&dir, "plain.jpg");

        let mut dict = ExifDict::default();
        read_with_nom_exif(&path, &mut dict).unwrap();
        assert_eq!(dict.tag_count(), 0);
    }

    #[test]
    fn undecodable_jpeg_block_uses_fallback() {
        let dir = TempDir::new().unwrap();
        let path = write_image(&dir, "broken.jpg");

        // An APP1 segment that is not a TIFF block
        let mut jpeg = Jpeg::from_bytes(Bytes::from(std::fs::read(&path).unwrap())).unwrap();
        jpeg.set_exif(Some(Bytes::from_static(b"garbage")));
        std::fs::write(&path, jpeg.encoder().bytes()).unwrap();

        let dict = read_metadata(&path).unwrap();
        assert_eq!(dict.tag_count(), 0);
        assert!(dict.section(Ifd::Primary).is_some());
    }
}
