use std::path::Path;

/// Extensions whose metadata can be read.
pub const READABLE_EXTENSIONS: &[&str] = &["JPG", "JPEG", "PNG"];

/// Extensions whose metadata can be written back.
pub const EDITABLE_EXTENSIONS: &[&str] = &["JPG", "JPEG"];

/// The container format of a supported image, determined by its extension.
///
/// # Example
///
/// ```rust
/// use exif_manager::format::ImageKind;
/// use std::path::Path;
///
/// let kind = ImageKind::from_path(Path::new("photo.JPG"));
/// assert_eq!(kind, Some(ImageKind::Jpeg));
/// assert!(kind.unwrap().is_editable());
///
/// assert_eq!(ImageKind::from_path(Path::new("scan.tiff")), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// JPEG — EXIF read and write
    Jpeg,
    /// PNG — EXIF read only
    Png,
}

impl ImageKind {
    /// Determine the image kind from a file path extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_uppercase();
        match ext.as_str() {
            "JPG" | "JPEG" => Some(Self::Jpeg),
            "PNG" => Some(Self::Png),
            _ => None,
        }
    }

    /// Whether metadata changes can be saved for this kind.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Jpeg)
    }
}
