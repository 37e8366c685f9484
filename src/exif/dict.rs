use std::collections::BTreeMap;

use super::tags::{Ifd, TagValue, tag_name};

/// All metadata loaded from one image, grouped by section.
///
/// `sections` holds EXIF tags keyed by tag code. `info` holds facts about the
/// image container that are not EXIF tags (format, dimensions).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifDict {
    pub sections: BTreeMap<Ifd, BTreeMap<u16, TagValue>>,
    pub info: BTreeMap<String, String>,
}

impl ExifDict {
    /// An empty document with every section present.
    pub fn with_default_sections() -> Self {
        let mut dict = Self::default();
        dict.ensure_default_sections();
        dict
    }

    /// Create any missing section so setters and presence checks can rely on them.
    pub fn ensure_default_sections(&mut self) {
        for ifd in Ifd::ALL {
            self.sections.entry(ifd).or_default();
        }
    }

    pub fn section(&self, ifd: Ifd) -> Option<&BTreeMap<u16, TagValue>> {
        self.sections.get(&ifd)
    }

    pub fn get(&self, ifd: Ifd, code: u16) -> Option<&TagValue> {
        self.sections.get(&ifd)?.get(&code)
    }

    pub fn contains(&self, ifd: Ifd, code: u16) -> bool {
        self.get(ifd, code).is_some()
    }

    /// Insert or replace a tag, creating its section if needed.
    pub fn set(&mut self, ifd: Ifd, code: u16, value: TagValue) {
        self.sections.entry(ifd).or_default().insert(code, value);
    }

    pub fn remove(&mut self, ifd: Ifd, code: u16) -> Option<TagValue> {
        self.sections.get_mut(&ifd)?.remove(&code)
    }

    /// Total number of tags across all sections.
    pub fn tag_count(&self) -> usize {
        self.sections.values().map(|s| s.len()).sum()
    }

    /// `true` when there are no sections and no image info at all.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.info.is_empty()
    }

    pub fn clear(&mut self) {
        self.sections.clear();
        self.info.clear();
    }

    /// Render as an aligned `key | value` table, one line per section and per
    /// info entry. The thumbnail section is left out.
    pub fn to_table(&self) -> String {
        if self.is_empty() {
            return String::new();
        }

        let mut rows: Vec<(String, String)> = Vec::new();
        for (ifd, tags) in &self.sections {
            if *ifd == Ifd::Thumbnail {
                continue;
            }
            let entries: Vec<String> = tags
                .iter()
                .map(|(code, value)| {
                    let name = tag_name(*ifd, *code)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("0x{code:04X}"));
                    format!("{name}: {value}")
                })
                .collect();
            rows.push((ifd.name().to_string(), format!("{{{}}}", entries.join(", "))));
        }
        for (key, value) in &self.info {
            rows.push((key.clone(), value.clone()));
        }

        let width = rows.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
        let mut out = String::new();
        for (key, value) in rows {
            out.push_str(&format!("{key:<width$} | {value}\n"));
        }
        out
    }
}
