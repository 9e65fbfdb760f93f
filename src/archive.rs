//! Archive assembly: deterministic layout, ZIP packing, delivery.
//!
//! The layout walk is a pure function of the item sequence, so two
//! invocations over the same curriculum produce byte-identical
//! archives (ZIP entry timestamps are the format's constant default).

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{ArchiveError, Result};
use crate::types::{ItemKind, WorkItem};

/// Placeholder used when a title sanitizes down to nothing
const FALLBACK_TITLE: &str = "untitled";

/// Maximum length of a sanitized title, in characters
const MAX_TITLE_LEN: usize = 100;

/// Directory holding lectures that appear before the first chapter
const ORPHAN_DIR: &str = "00_Intro";

/// Sanitize a title for use in file and directory names
///
/// Strips every character outside letters, digits, space, hyphen and
/// underscore, trims, and truncates to 100 characters. An empty result
/// becomes `"untitled"`.
///
/// # Examples
///
/// ```
/// use lecture_dl::sanitize_title;
///
/// assert_eq!(sanitize_title("A/B: Intro?!"), "AB Intro");
/// assert_eq!(sanitize_title("???"), "untitled");
/// ```
pub fn sanitize_title(name: &str) -> String {
    let stripped: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let sanitized: String = stripped.trim().chars().take(MAX_TITLE_LEN).collect();

    if sanitized.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        sanitized
    }
}

/// Compute the archive's name → content mapping
///
/// Walks the items in stored order, keeping a running chapter counter
/// and a per-chapter lecture counter. Each chapter opens a directory
/// `NN_<sanitized title>` (chapters are numbered from zero; lectures
/// seen before any chapter land in `00_Intro`). Each lecture with
/// non-empty content yields one `NN_<sanitized title>.md` file and a
/// section in the merged course document, which is added last as
/// `<sanitized course title>_Full.md`.
pub fn archive_layout(items: &[WorkItem], course_title: &str) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    let mut merged = format!("# {}\n\n", course_title);
    let mut chapter_dir = ORPHAN_DIR.to_string();
    let mut chapter_count: u32 = 0;
    let mut lecture_count: u32 = 0;

    for item in items {
        match item.kind {
            ItemKind::Chapter => {
                let dir_index = chapter_count;
                chapter_count += 1;
                lecture_count = 0;
                chapter_dir = format!("{:02}_{}", dir_index, sanitize_title(&item.title));
                merged.push_str(&format!("\n\n## {}. {}\n\n", chapter_count, item.title));
            }
            ItemKind::Lecture => {
                let Some(content) = item.content.as_deref().filter(|c| !c.is_empty()) else {
                    continue;
                };
                lecture_count += 1;
                let file_name = format!("{:02}_{}.md", lecture_count, sanitize_title(&item.title));
                files.insert(format!("{}/{}", chapter_dir, file_name), content.to_string());
                merged.push_str(&format!(
                    "### {}. {}\n\n{}\n\n---\n\n",
                    lecture_count, item.title, content
                ));
            }
            ItemKind::Quiz | ItemKind::Other => {}
        }
    }

    files.insert(format!("{}_Full.md", sanitize_title(course_title)), merged);
    files
}

/// Build the compressed archive for the given items
///
/// # Errors
///
/// Returns [`ArchiveError`] when the ZIP container or one of its
/// entries cannot be written.
pub fn build_archive(
    items: &[WorkItem],
    course_title: &str,
    compression_level: i32,
) -> Result<Vec<u8>> {
    let files = archive_layout(items, course_title);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(compression_level));

    for (name, content) in &files {
        writer
            .start_file(name.as_str(), options)
            .map_err(ArchiveError::Zip)?;
        writer
            .write_all(content.as_bytes())
            .map_err(|e| ArchiveError::Encode {
                name: name.clone(),
                reason: e.to_string(),
            })?;
    }

    let cursor = writer.finish().map_err(ArchiveError::Zip)?;
    Ok(cursor.into_inner())
}

/// Receiver of the finished archive
///
/// The pipeline hands the complete archive to exactly one sink; a
/// partially built archive never reaches it.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Deliver a named byte payload to the end user
    ///
    /// # Errors
    ///
    /// A delivery failure is fatal to run finalization and surfaces as
    /// an `error` run status.
    async fn deliver(&self, name: &str, bytes: Vec<u8>) -> Result<()>;
}

/// A [`DeliverySink`] that writes the archive into a local directory
pub struct DirectorySink {
    output_dir: PathBuf,
}

impl DirectorySink {
    /// Create a sink writing into the given directory (created on demand)
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl DeliverySink for DirectorySink {
    async fn deliver(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| ArchiveError::Deliver {
                name: name.to_string(),
                reason: format!("failed to create output directory: {}", e),
            })?;

        let path = self.output_dir.join(name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| ArchiveError::Deliver {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(path = %path.display(), size_bytes = bytes.len(), "archive written");
        Ok(())
    }
}
