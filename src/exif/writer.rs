use anyhow::{Context, Result};
use img_parts::Bytes;
use img_parts::ImageEXIF;
use img_parts::jpeg::Jpeg;
use std::path::{Path, PathBuf};

use super::codec;
use super::dict::ExifDict;

/// Write the document's EXIF into a copy of `source` saved at `output`.
///
/// All JPEG segments other than the EXIF APP1 are preserved. An empty
/// document removes the EXIF segment. `source` and `output` may be the same
/// path.
pub fn write_metadata(dict: &ExifDict, source: &Path, output: &Path) -> Result<()> {
    let file_bytes = std::fs::read(source).context("Failed to read image file")?;

    let mut jpeg = Jpeg::from_bytes(Bytes::from(file_bytes))
        .map_err(|e| anyhow::anyhow!("Failed to parse JPEG: {e}"))?;

    let orig_exif_pos = find_exif_segment_pos(&jpeg);

    match codec::encode_tiff(dict)? {
        Some(tiff_data) => {
            jpeg.set_exif(Some(Bytes::from(tiff_data)));

            // set_exif() inserts at position 3; move it back where it was
            // (or right after APP0) so EXIF precedes any XMP segment.
            if let Some(new_pos) = find_exif_segment_pos(&jpeg) {
                let target_pos = orig_exif_pos.unwrap_or(1);
                if target_pos < new_pos {
                    let segments = jpeg.segments_mut();
                    let seg = segments.remove(new_pos);
                    segments.insert(target_pos, seg);
                }
            }
        }
        None => {
            log::debug!("No EXIF tags to write, removing EXIF segment");
            jpeg.set_exif(None);
        }
    }

    let out = jpeg.encoder().bytes();
    std::fs::write(output, &out)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    Ok(())
}

/// Find the position of the EXIF APP1 segment in a JPEG.
/// EXIF segments have marker 0xE1 (APP1) and contents starting with "Exif\0\0".
fn find_exif_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    const EXIF_PREFIX: &[u8] = b"Exif\0\0";
    jpeg.segments()
        .iter()
        .position(|s| s.marker() == 0xE1 && s.contents().starts_with(EXIF_PREFIX))
}

/// First path of the form `name.ext`, `name(1).ext`, `name(2).ext`, …
/// that does not exist yet.
pub fn next_free_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

    (1u32..)
        .map(|n| {
            let name = match &ext {
                Some(ext) => format!("{stem}({n}).{ext}"),
                None => format!("{stem}({n})"),
            };
            path.with_file_name(name)
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Create a backup of the original file (`photo.jpg` → `photo.jpg.bak`).
/// An existing backup is left untouched.
pub fn backup_file(path: &Path) -> Result<PathBuf> {
    let backup_path = path.with_extension(format!(
        "{}.bak",
        path.extension().unwrap_or_default().to_string_lossy()
    ));

    if !backup_path.exists() {
        std::fs::copy(path, &backup_path).context("Failed to create backup")?;
        log::debug!("Backup created: {}", backup_path.display());
    }

    Ok(backup_path)
}
