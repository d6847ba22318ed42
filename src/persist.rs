//! Directory-creating UTF-8 text writer.

use crate::error::{Result, VoxarchError};
use std::fs;
use std::path::Path;

/// Write `content` to `path`, creating missing parent directories first.
///
/// Bytes are written exactly as given. Any failure, whether creating the
/// directory or writing the file, is reported as `WriteFailed` for `path`.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    let write_failed = |source| VoxarchError::WriteFailed {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_failed)?;
    }
    fs::write(path, content.as_bytes()).map_err(write_failed)?;

    tracing::debug!(path = %path.display(), bytes = content.len(), "wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("out.txt");

        write_text(&path, "olá mundo").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "olá mundo");
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        write_text(&path, "first").unwrap();
        write_text(&path, "second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_write_keeps_whitespace_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        let content = "  leading\n\ttabs\r\ntrailing  \n\n";
        write_text(&path, content).unwrap();
        assert_eq!(fs::read(&path).unwrap(), content.as_bytes());
    }

    #[test]
    fn test_write_failure_is_write_failed() {
        let dir = TempDir::new().unwrap();
        // A regular file where a directory is needed
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let path = blocker.join("out.txt");

        let err = write_text(&path, "content").unwrap_err();
        match err {
            VoxarchError::WriteFailed { path: reported, .. } => {
                assert!(reported.ends_with("out.txt"));
            }
            other => panic!("expected WriteFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_write_bare_file_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.txt");
        write_text(&path, "").unwrap();
        assert!(path.exists());
    }
}
