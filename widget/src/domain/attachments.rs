//! Files attached to a feedback submission and where they are stored.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use url::Url;

use super::feedback::TrackingId;

/// Most attachments a single submission may carry.
pub const MAX_ATTACHMENTS: usize = 5;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];
const SIZE_UNITS: [&str; 3] = ["Bytes", "KB", "MB"];

/// An in-memory file ready for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    name: String,
    content_type: String,
    bytes: Arc<[u8]>,
}

impl Attachment {
    /// Build an attachment, guessing the content type from the file name.
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let name = name.into();
        let content_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_owned();
        Self {
            name,
            content_type,
            bytes: bytes.into(),
        }
    }

    /// A PNG produced by the screen capture port.
    pub fn png(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            content_type: "image/png".to_owned(),
            bytes: bytes.into(),
        }
    }

    /// File name, used as the last storage path segment.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// MIME type sent with the upload.
    pub fn content_type(&self) -> &str {
        self.content_type.as_str()
    }

    /// File contents.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        u64::try_from(self.bytes.len()).unwrap_or(u64::MAX)
    }

    fn same_file(&self, other: &Self) -> bool {
        self.name == other.name && self.size() == other.size()
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.size())
            .finish()
    }
}

/// Attachments picked in the form.
///
/// ## Invariants
/// - No two entries share both name and size.
/// - At most [`MAX_ATTACHMENTS`] entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentList {
    items: Vec<Attachment>,
}

impl AttachmentList {
    /// Append files, dropping duplicates of earlier entries and anything past
    /// the cap.
    ///
    /// # Examples
    /// ```
    /// use feedback_widget::domain::{Attachment, AttachmentList};
    ///
    /// let mut list = AttachmentList::default();
    /// list.add([
    ///     Attachment::new("log.txt", b"abc".to_vec()),
    ///     Attachment::new("log.txt", b"xyz".to_vec()),
    /// ]);
    /// assert_eq!(list.len(), 1);
    /// ```
    pub fn add(&mut self, files: impl IntoIterator<Item = Attachment>) {
        for file in files {
            if self.items.iter().any(|existing| existing.same_file(&file)) {
                continue;
            }
            self.items.push(file);
        }
        self.items.truncate(MAX_ATTACHMENTS);
    }

    /// Remove the entry at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Attachment> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Return true when nothing is attached.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Attachment> {
        self.items.iter()
    }

    /// File names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.items.iter().map(|file| file.name.clone()).collect()
    }

    /// Borrow the entries.
    pub fn as_slice(&self) -> &[Attachment] {
        &self.items
    }
}

impl<'a> IntoIterator for &'a AttachmentList {
    type Item = &'a Attachment;
    type IntoIter = std::slice::Iter<'a, Attachment>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Render a byte count as `Bytes`, `KB` or `MB` with up to two decimals.
///
/// # Examples
/// ```
/// use feedback_widget::domain::format_file_size;
///
/// assert_eq!(format_file_size(0), "0 Bytes");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// ```
pub fn format_file_size(size: u64) -> String {
    if size == 0 {
        return "0 Bytes".to_owned();
    }
    let mut unit_index = 0_usize;
    let mut unit: u128 = 1;
    while unit_index + 1 < SIZE_UNITS.len() && u128::from(size) >= unit * 1024 {
        unit *= 1024;
        unit_index += 1;
    }
    let hundredths = (u128::from(size) * 100 + unit.div_euclid(2)).div_euclid(unit);
    let whole = hundredths.div_euclid(100);
    let fraction = hundredths.rem_euclid(100);
    let label = SIZE_UNITS.get(unit_index).copied().unwrap_or("MB");
    if fraction == 0 {
        format!("{whole} {label}")
    } else if fraction.rem_euclid(10) == 0 {
        format!("{whole}.{} {label}", fraction.div_euclid(10))
    } else {
        format!("{whole}.{fraction:02} {label}")
    }
}

/// Return true for names ending in a common raster image extension.
pub fn is_image_file(name: &str) -> bool {
    name.rsplit_once('.').is_some_and(|(_, extension)| {
        IMAGE_EXTENSIONS
            .iter()
            .any(|candidate| extension.eq_ignore_ascii_case(candidate))
    })
}

/// Object path inside the attachments bucket: `public/<tracking_id>/<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoragePath(String);

impl StoragePath {
    /// Path for `name` under the submission's folder.
    pub fn new(tracking_id: &TrackingId, name: &str) -> Self {
        Self(format!("public/{tracking_id}/{name}"))
    }

    /// Borrow the path.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public link to a stored attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentLink {
    /// File name.
    pub name: String,
    /// Public URL.
    pub url: Url,
    /// Whether the file can be previewed inline.
    pub is_image: bool,
}
