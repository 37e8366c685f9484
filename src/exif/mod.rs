//! EXIF reading and writing.
//!
//! - [`read_metadata`] — Load every tag of a JPEG/PNG into an [`ExifDict`]
//! - [`write_metadata`] — Splice an [`ExifDict`] back into a JPEG
//!
//! Tags are grouped by section ([`Ifd`]) and keyed by their numeric code;
//! the constants in [`tags`] name the ones this crate works with.

mod codec;
mod dict;
mod reader;
pub mod tags;
mod writer;

pub use dict::ExifDict;
pub use reader::read_metadata;
pub use tags::{Ifd, TagValue};
pub use writer::{backup_file, next_free_path, write_metadata};
