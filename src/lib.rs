//! # exif-manager
//!
//! Read and edit the EXIF fields people actually care about (dates, GPS
//! position, camera maker and model, keywords, copyright) on JPEG and PNG
//! images, without touching raw tag tables.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use exif_manager::ExifManager;
//! use exif_manager::convert;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut mgr = ExifManager::new(true);
//!     mgr.load_file(Path::new("photo.jpg"))?;
//!
//!     match mgr.date_original() {
//!         Some(dt) if convert::is_valid_date(&dt) => println!("Taken: {dt}"),
//!         Some(_) => println!("Date present but unreadable"),
//!         None => println!("No date"),
//!     }
//!
//!     if let Some(gps) = mgr.gps_data() {
//!         println!("At {:.5}, {:.5}", gps.latitude, gps.longitude);
//!     }
//!
//!     mgr.set_copyright("© 2024 Jane Doe");
//!     mgr.add_keywords(&["family"], false);
//!     let saved = mgr.save_file(None, false)?;
//!     println!("Saved {}", saved.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Formats
//!
//! | Format | Read | Write |
//! |--------|------|-------|
//! | JPEG (`.jpg`, `.jpeg`) | yes | yes |
//! | PNG (`.png`) | yes | no |
//!
//! ## Modules
//!
//! - [`manager`] — [`ExifManager`], the typed field accessors
//! - [`convert`] — Degree/DMS and datetime conversions
//! - [`exif`] — Tag model, reader and writer
//! - [`format`] — Supported formats
//! - [`config`] — Configuration types and loading/saving

pub mod config;
pub mod convert;
pub mod exif;
pub mod format;
pub mod manager;

pub use manager::ExifManager;
