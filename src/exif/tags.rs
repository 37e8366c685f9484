use std::fmt;

// IFD0 (primary image)
pub const TAG_IMAGE_DESCRIPTION: u16 = 0x010E;
pub const TAG_MAKE: u16 = 0x010F;
pub const TAG_MODEL: u16 = 0x0110;
pub const TAG_ORIENTATION: u16 = 0x0112;
pub const TAG_SOFTWARE: u16 = 0x0131;
pub const TAG_DATE_TIME: u16 = 0x0132;
pub const TAG_ARTIST: u16 = 0x013B;
pub const TAG_COPYRIGHT: u16 = 0x8298;
pub const TAG_XP_TITLE: u16 = 0x9C9B;
pub const TAG_XP_COMMENT: u16 = 0x9C9C;
pub const TAG_XP_KEYWORDS: u16 = 0x9C9E;
pub const TAG_XP_SUBJECT: u16 = 0x9C9F;

// Exif sub-IFD
pub const TAG_EXIF_VERSION: u16 = 0x9000;
pub const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;
pub const TAG_DATE_TIME_DIGITIZED: u16 = 0x9004;
pub const TAG_USER_COMMENT: u16 = 0x9286;
pub const TAG_SUB_SEC_TIME_ORIGINAL: u16 = 0x9291;
pub const TAG_SUB_SEC_TIME_DIGITIZED: u16 = 0x9292;

// GPS sub-IFD
pub const TAG_GPS_VERSION_ID: u16 = 0x0000;
pub const TAG_GPS_LATITUDE_REF: u16 = 0x0001;
pub const TAG_GPS_LATITUDE: u16 = 0x0002;
pub const TAG_GPS_LONGITUDE_REF: u16 = 0x0003;
pub const TAG_GPS_LONGITUDE: u16 = 0x0004;
pub const TAG_GPS_ALTITUDE_REF: u16 = 0x0005;
pub const TAG_GPS_ALTITUDE: u16 = 0x0006;

/// Pointer tags regenerated by the serializer; never stored in the document.
pub const OFFSET_TAGS: &[u16] = &[0x8769, 0x8825, 0xA005, 0x0201, 0x0202];

/// A metadata section, named the way EXIF tooling usually labels them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Ifd {
    /// IFD0, "0th" — camera, software and copyright tags.
    Primary,
    /// Exif sub-IFD — capture dates, exposure, version.
    Exif,
    /// GPS sub-IFD.
    Gps,
    /// IFD1, "1st" — thumbnail description.
    Thumbnail,
}

impl Ifd {
    pub const ALL: [Ifd; 4] = [Ifd::Primary, Ifd::Exif, Ifd::Gps, Ifd::Thumbnail];

    pub fn name(self) -> &'static str {
        match self {
            Ifd::Primary => "0th",
            Ifd::Exif => "Exif",
            Ifd::Gps => "GPS",
            Ifd::Thumbnail => "1st",
        }
    }
}

impl fmt::Display for Ifd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded tag value. Numeric data is held in native integers; the
/// serializer picks the byte order.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// NUL-free ASCII/UTF-8 bytes.
    Ascii(Vec<u8>),
    Byte(Vec<u8>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    SRational(Vec<(i32, i32)>),
    Undefined(Vec<u8>),
    /// Any other TIFF type, kept as little-endian bytes with its type code.
    Raw(u16, Vec<u8>),
}

impl TagValue {
    pub fn ascii(s: &str) -> Self {
        TagValue::Ascii(s.as_bytes().to_vec())
    }

    /// The value as text, if it is a string tag.
    pub fn as_text(&self) -> Option<String> {
        match self {
            TagValue::Ascii(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                Some(text.trim_end_matches('\0').trim().to_string())
            }
            _ => None,
        }
    }

    /// Raw bytes of byte-like values (BYTE, UNDEFINED, ASCII).
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            TagValue::Byte(b) | TagValue::Undefined(b) | TagValue::Ascii(b) => Some(b),
            _ => None,
        }
    }

    /// First integer component of BYTE/SHORT/LONG values.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            TagValue::Byte(v) => v.first().map(|&b| b as u32),
            TagValue::Short(v) => v.first().map(|&s| s as u32),
            TagValue::Long(v) => v.first().copied(),
            _ => None,
        }
    }

    pub fn as_rationals(&self) -> Option<&[(u32, u32)]> {
        match self {
            TagValue::Rational(v) => Some(v),
            _ => None,
        }
    }

    /// TIFF field type code.
    pub fn type_code(&self) -> u16 {
        match self {
            TagValue::Byte(_) => 1,
            TagValue::Ascii(_) => 2,
            TagValue::Short(_) => 3,
            TagValue::Long(_) => 4,
            TagValue::Rational(_) => 5,
            TagValue::Undefined(_) => 7,
            TagValue::SRational(_) => 10,
            TagValue::Raw(code, _) => *code,
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            if items.len() == 1 {
                return write!(f, "{}", items[0]);
            }
            let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
            write!(f, "({})", parts.join(", "))
        }

        match self {
            TagValue::Ascii(_) => write!(f, "{}", self.as_text().unwrap_or_default()),
            TagValue::Byte(b) if b.len() <= 8 => list(f, b),
            TagValue::Short(v) => list(f, v),
            TagValue::Long(v) => list(f, v),
            TagValue::Rational(v) => {
                let parts: Vec<String> = v.iter().map(|(n, d)| format!("{n}/{d}")).collect();
                list(f, &parts)
            }
            TagValue::SRational(v) => {
                let parts: Vec<String> = v.iter().map(|(n, d)| format!("{n}/{d}")).collect();
                list(f, &parts)
            }
            TagValue::Undefined(b) if b.len() <= 8 && b.iter().all(|c| c.is_ascii_graphic()) => {
                write!(f, "{}", String::from_utf8_lossy(b))
            }
            TagValue::Byte(b) | TagValue::Undefined(b) | TagValue::Raw(_, b) => {
                write!(f, "<{} bytes>", b.len())
            }
        }
    }
}

/// Human-readable tag name, for the tags this crate knows about.
pub fn tag_name(ifd: Ifd, code: u16) -> Option<&'static str> {
    let name = match (ifd, code) {
        (Ifd::Gps, TAG_GPS_VERSION_ID) => "GPSVersionID",
        (Ifd::Gps, TAG_GPS_LATITUDE_REF) => "GPSLatitudeRef",
        (Ifd::Gps, TAG_GPS_LATITUDE) => "GPSLatitude",
        (Ifd::Gps, TAG_GPS_LONGITUDE_REF) => "GPSLongitudeRef",
        (Ifd::Gps, TAG_GPS_LONGITUDE) => "GPSLongitude",
        (Ifd::Gps, TAG_GPS_ALTITUDE_REF) => "GPSAltitudeRef",
        (Ifd::Gps, TAG_GPS_ALTITUDE) => "GPSAltitude",
        (Ifd::Gps, _) => return None,
        (_, TAG_IMAGE_DESCRIPTION) => "ImageDescription",
        (_, TAG_MAKE) => "Make",
        (_, TAG_MODEL) => "Model",
        (_, TAG_ORIENTATION) => "Orientation",
        (_, TAG_SOFTWARE) => "Software",
        (_, TAG_DATE_TIME) => "DateTime",
        (_, TAG_ARTIST) => "Artist",
        (_, TAG_COPYRIGHT) => "Copyright",
        (_, TAG_XP_TITLE) => "XPTitle",
        (_, TAG_XP_COMMENT) => "XPComment",
        (_, TAG_XP_KEYWORDS) => "XPKeywords",
        (_, TAG_XP_SUBJECT) => "XPSubject",
        (_, TAG_EXIF_VERSION) => "ExifVersion",
        (_, TAG_DATE_TIME_ORIGINAL) => "DateTimeOriginal",
        (_, TAG_DATE_TIME_DIGITIZED) => "DateTimeDigitized",
        (_, TAG_USER_COMMENT) => "UserComment",
        (_, TAG_SUB_SEC_TIME_ORIGINAL) => "SubSecTimeOriginal",
        (_, TAG_SUB_SEC_TIME_DIGITIZED) => "SubSecTimeDigitized",
        _ => return None,
    };
    Some(name)
}

/// Separator used inside XPKeywords.
pub const KEYWORD_SEPARATOR: char = ';';

/// Encode keywords for XPKeywords: `;`-joined, UTF-16LE, NUL-terminated.
pub fn encode_keywords<S: AsRef<str>>(keywords: &[S]) -> Vec<u8> {
    let joined = keywords
        .iter()
        .map(|k| k.as_ref())
        .collect::<Vec<_>>()
        .join(&KEYWORD_SEPARATOR.to_string());
    encode_utf16le(&joined)
}

/// Decode XPKeywords bytes into a keyword list.
///
/// Accepts an optional byte-order mark, stops at the first NUL code unit,
/// and drops empty entries.
pub fn decode_keywords(bytes: &[u8]) -> Vec<String> {
    decode_utf16(bytes)
        .split(KEYWORD_SEPARATOR)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Encode a string as UTF-16LE bytes with a NUL terminator (XP* tags).
pub fn encode_utf16le(s: &str) -> Vec<u8> {
    let mut bytes: Vec<u8> = s.encode_utf16().flat_map(|c| c.to_le_bytes()).collect();
    bytes.push(0);
    bytes.push(0);
    bytes
}

/// Decode UTF-16 bytes (little-endian unless a big-endian BOM is present).
pub fn decode_utf16(bytes: &[u8]) -> String {
    let (big_endian, body) = match bytes {
        [0xFE, 0xFF, rest @ ..] => (true, rest),
        [0xFF, 0xFE, rest @ ..] => (false, rest),
        _ => (false, bytes),
    };

    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|c| {
            if big_endian {
                u16::from_be_bytes([c[0], c[1]])
            } else {
                u16::from_le_bytes([c[0], c[1]])
            }
        })
        .take_while(|&u| u != 0)
        .collect();

    String::from_utf16_lossy(&units)
}
