use anyhow::{Context as _, Result};
use kamadak_exif::experimental::Writer;
use kamadak_exif::{Context, Field, In, Rational, Reader, SRational, Tag, Value};
use std::io::Cursor;

use super::dict::ExifDict;
use super::tags::{Ifd, OFFSET_TAGS, TagValue};

// TIFF types without a dedicated TagValue variant, carried as Raw
const TYPE_SBYTE: u16 = 6;
const TYPE_SSHORT: u16 = 8;
const TYPE_SLONG: u16 = 9;
const TYPE_FLOAT: u16 = 11;
const TYPE_DOUBLE: u16 = 12;

/// Decode a TIFF block (`II*\0…` / `MM\0*…`) into `dict`. Returns the number
/// of tags copied.
pub(crate) fn decode_tiff(tiff: Vec<u8>, dict: &mut ExifDict) -> Result<usize> {
    let exif = Reader::new()
        .read_raw(tiff)
        .context("Failed to parse EXIF block")?;

    let mut count = 0;
    for field in exif.fields() {
        match from_field(field) {
            Some((ifd, code, value)) => {
                dict.set(ifd, code, value);
                count += 1;
            }
            None => log::debug!("Skipping {} in IFD {}", field.tag, field.ifd_num),
        }
    }
    Ok(count)
}

/// Serialize the Primary, Exif and GPS sections as a little-endian TIFF
/// block. `None` if there is nothing to write.
pub(crate) fn encode_tiff(dict: &ExifDict) -> Result<Option<Vec<u8>>> {
    let mut fields = Vec::new();
    for (ifd, tags) in &dict.sections {
        let Some(context) = context_for_ifd(*ifd) else {
            if !tags.is_empty() {
                log::debug!("Not writing {} tags of section {ifd}", tags.len());
            }
            continue;
        };
        for (code, value) in tags {
            match to_value(value) {
                Some(value) => fields.push(Field {
                    tag: Tag(context, *code),
                    ifd_num: In::PRIMARY,
                    value,
                }),
                None => log::warn!(
                    "Skipping tag 0x{code:04X} in {ifd}: unsupported type {}",
                    value.type_code()
                ),
            }
        }
    }

    if fields.is_empty() {
        return Ok(None);
    }

    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut buf = Cursor::new(Vec::new());
    writer
        .write(&mut buf, true)
        .context("Failed to serialize EXIF block")?;

    log::debug!("Serialized {} EXIF tags", fields.len());
    Ok(Some(buf.into_inner()))
}

fn context_for_ifd(ifd: Ifd) -> Option<Context> {
    match ifd {
        Ifd::Primary => Some(Context::Tiff),
        Ifd::Exif => Some(Context::Exif),
        Ifd::Gps => Some(Context::Gps),
        Ifd::Thumbnail => None,
    }
}

fn ifd_for_field(context: Context, ifd_num: In) -> Option<Ifd> {
    match (context, ifd_num) {
        (Context::Tiff, In::PRIMARY) => Some(Ifd::Primary),
        (Context::Tiff, In::THUMBNAIL) => Some(Ifd::Thumbnail),
        (Context::Exif, In::PRIMARY) => Some(Ifd::Exif),
        (Context::Gps, In::PRIMARY) => Some(Ifd::Gps),
        _ => None,
    }
}

fn from_field(field: &Field) -> Option<(Ifd, u16, TagValue)> {
    let ifd = ifd_for_field(field.tag.context(), field.ifd_num)?;
    let code = field.tag.number();
    if ifd != Ifd::Gps && OFFSET_TAGS.contains(&code) {
        return None;
    }
    Some((ifd, code, from_value(&field.value)?))
}

fn from_value(value: &Value) -> Option<TagValue> {
    let v = match value {
        Value::Byte(b) => TagValue::Byte(b.clone()),
        Value::Ascii(parts) => TagValue::Ascii(parts.join(&b' ')),
        Value::Short(v) => TagValue::Short(v.clone()),
        Value::Long(v) => TagValue::Long(v.clone()),
        Value::Rational(v) => TagValue::Rational(v.iter().map(|r| (r.num, r.denom)).collect()),
        Value::SRational(v) => TagValue::SRational(v.iter().map(|r| (r.num, r.denom)).collect()),
        Value::Undefined(b, _) => TagValue::Undefined(b.clone()),
        Value::SByte(v) => TagValue::Raw(TYPE_SBYTE, v.iter().map(|&b| b as u8).collect()),
        Value::SShort(v) => TagValue::Raw(TYPE_SSHORT, v.iter().flat_map(|x| x.to_le_bytes()).collect()),
        Value::SLong(v) => TagValue::Raw(TYPE_SLONG, v.iter().flat_map(|x| x.to_le_bytes()).collect()),
        Value::Float(v) => TagValue::Raw(TYPE_FLOAT, v.iter().flat_map(|x| x.to_le_bytes()).collect()),
        Value::Double(v) => TagValue::Raw(TYPE_DOUBLE, v.iter().flat_map(|x| x.to_le_bytes()).collect()),
        _ => return None,
    };
    Some(v)
}

fn to_value(value: &TagValue) -> Option<Value> {
    let v = match value {
        TagValue::Ascii(b) => Value::Ascii(vec![b.clone()]),
        TagValue::Byte(b) => Value::Byte(b.clone()),
        TagValue::Short(v) => Value::Short(v.clone()),
        TagValue::Long(v) => Value::Long(v.clone()),
        TagValue::Rational(v) => Value::Rational(
            v.iter().map(|&(num, denom)| Rational { num, denom }).collect(),
        ),
        TagValue::SRational(v) => Value::SRational(
            v.iter().map(|&(num, denom)| SRational { num, denom }).collect(),
        ),
        TagValue::Undefined(b) => Value::Undefined(b.clone(), 0),
        TagValue::Raw(TYPE_SBYTE, b) => Value::SByte(b.iter().map(|&x| x as i8).collect()),
        TagValue::Raw(TYPE_SSHORT, b) => Value::SShort(
            b.chunks_exact(2).map(|c| i16::from_le_bytes([c[0], c[1]])).collect(),
        ),
        TagValue::Raw(TYPE_SLONG, b) => Value::SLong(
            b.chunks_exact(4)
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        TagValue::Raw(TYPE_FLOAT, b) => Value::Float(
            b.chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        TagValue::Raw(TYPE_DOUBLE, b) => Value::Double(
            b.chunks_exact(8)
                .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        ),
        TagValue::Raw(..) => return None,
    };
    Some(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::tags::*;

    fn decode(tiff: Vec<u8>) -> ExifDict {
        let mut dict = ExifDict::default();
        decode_tiff(tiff, &mut dict).unwrap();
        dict
    }

    #[test]
    fn empty_document_encodes_nothing() {
        assert!(encode_tiff(&ExifDict::with_default_sections()).unwrap().is_none());
    }

    #[test]
    fn every_section_survives_encoding() {
        let mut dict = ExifDict::with_default_sections();
        dict.set(Ifd::Primary, TAG_MAKE, TagValue::ascii("Canon"));
        dict.set(Ifd::Primary, TAG_ORIENTATION, TagValue::Short(vec![6]));
        dict.set(Ifd::Exif, TAG_EXIF_VERSION, TagValue::Undefined(b"0220".to_vec()));
        dict.set(Ifd::Exif, TAG_DATE_TIME_ORIGINAL, TagValue::ascii("2022:07:14 18:03:59"));
        dict.set(Ifd::Gps, TAG_GPS_VERSION_ID, TagValue::Byte(vec![2, 2, 0, 0]));
        dict.set(Ifd::Gps, TAG_GPS_LATITUDE_REF, TagValue::ascii("N"));
        dict.set(
            Ifd::Gps,
            TAG_GPS_LATITUDE,
            TagValue::Rational(vec![(40, 1), (26, 1), (4630, 100)]),
        );

        let tiff = encode_tiff(&dict).unwrap().unwrap();
        assert_eq!(&tiff[..4], b"II*\0");

        let back = decode(tiff);
        for ifd in [Ifd::Primary, Ifd::Exif, Ifd::Gps] {
            assert_eq!(back.section(ifd), dict.section(ifd), "{ifd}");
        }
        assert!(back.section(Ifd::Thumbnail).is_none());
    }

    #[test]
    fn pointer_tags_are_not_copied() {
        let mut dict = ExifDict::default();
        dict.set(Ifd::Exif, TAG_DATE_TIME_DIGITIZED, TagValue::ascii("2020:01:01 00:00:00"));
        let back = decode(encode_tiff(&dict).unwrap().unwrap());

        let primary = back.section(Ifd::Primary).cloned().unwrap_or_default();
        assert!(OFFSET_TAGS.iter().all(|code| !primary.contains_key(code)));
        assert!(back.contains(Ifd::Exif, TAG_DATE_TIME_DIGITIZED));
    }

    #[test]
    fn signed_and_float_values() {
        let mut dict = ExifDict::default();
        dict.set(Ifd::Exif, 0x9201, TagValue::SRational(vec![(-7, 3)]));
        dict.set(Ifd::Exif, 0x9400, TagValue::Raw(TYPE_SSHORT, (-5i16).to_le_bytes().to_vec()));
        dict.set(Ifd::Exif, 0x9401, TagValue::Raw(TYPE_DOUBLE, 1.5f64.to_le_bytes().to_vec()));

        let back = decode(encode_tiff(&dict).unwrap().unwrap());
        assert_eq!(back.get(Ifd::Exif, 0x9201), Some(&TagValue::SRational(vec![(-7, 3)])));
        assert_eq!(
            back.get(Ifd::Exif, 0x9400),
            Some(&TagValue::Raw(TYPE_SSHORT, (-5i16).to_le_bytes().to_vec()))
        );
        assert_eq!(
            back.get(Ifd::Exif, 0x9401),
            Some(&TagValue::Raw(TYPE_DOUBLE, 1.5f64.to_le_bytes().to_vec()))
        );
    }

    #[test]
    fn unknown_raw_type_is_skipped() {
        let mut dict = ExifDict::default();
        dict.set(Ifd::Primary, TAG_MAKE, TagValue::ascii("Canon"));
        dict.set(Ifd::Primary, 0x9999, TagValue::Raw(13, vec![0; 4]));

        let back = decode(encode_tiff(&dict).unwrap().unwrap());
        assert!(back.contains(Ifd::Primary, TAG_MAKE));
        assert!(!back.contains(Ifd::Primary, 0x9999));
    }

    #[test]
    fn garbage_is_an_error() {
        let mut dict = ExifDict::default();
        assert!(decode_tiff(b"not a tiff block".to_vec(), &mut dict).is_err());
    }
}
