//! Reads files from disk into attachments.

use std::io;
use std::path::Path;

use cap_std::{ambient_authority, fs::Dir};

use crate::domain::Attachment;

/// Read `path` into an attachment named after its file name.
///
/// # Errors
///
/// Returns the underlying I/O error, or `InvalidInput` when `path` has no
/// file name.
pub fn read_attachment(path: &Path) -> io::Result<Attachment> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no usable file name", path.display()),
            )
        })?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let dir = Dir::open_ambient_dir(parent, ambient_authority())?;
    let bytes = dir.read(name)?;
    Ok(Attachment::new(name, bytes))
}

#[cfg(test)]
mod tests {
    //! Regression coverage for attachment reading.

    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    fn reads_bytes_and_guesses_type() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("trace.json");
        std::fs::write(&path, br#"{"ok":true}"#).expect("write");

        let attachment = read_attachment(&path).expect("read");

        assert_eq!(attachment.name(), "trace.json");
        assert_eq!(attachment.content_type(), "application/json");
        assert_eq!(attachment.size(), 11);
    }

    #[rstest]
    fn missing_files_fail() {
        let dir = TempDir::new().expect("tempdir");
        assert!(read_attachment(&dir.path().join("absent.txt")).is_err());
    }
}
