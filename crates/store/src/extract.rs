//! Archive extraction.

use ladle_core::{Error, Result};
use std::io::Read;
use std::path::Path;

/// Unpacks a downloaded package archive.
pub trait ArchiveExtractor: Send + Sync {
    /// Extract every entry of `archive` into `destination`.
    ///
    /// `destination` already exists and is empty.
    fn extract(&self, archive: &Path, destination: &Path) -> Result<()>;
}

/// Extracts zip archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn extract(&self, archive: &Path, destination: &Path) -> Result<()> {
        let extraction_error = |message: String| Error::Extraction {
            path: archive.to_path_buf(),
            message,
        };

        let file =
            std::fs::File::open(archive).map_err(|e| Error::io(e, archive, "open archive"))?;
        let mut zip = zip::ZipArchive::new(file)
            .map_err(|e| extraction_error(format!("Failed to open zip: {}", e)))?;

        for i in 0..zip.len() {
            let mut entry = zip
                .by_index(i)
                .map_err(|e| extraction_error(format!("Failed to read zip entry: {}", e)))?;

            // Entries escaping the destination are skipped
            let outpath = match entry.enclosed_name() {
                Some(path) => destination.join(path),
                None => continue,
            };

            if entry.is_dir() {
                std::fs::create_dir_all(&outpath)
                    .map_err(|e| Error::io(e, &outpath, "create directory"))?;
                continue;
            }

            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::io(e, parent, "create directory"))?;
            }
            let mut content = Vec::new();
            entry
                .read_to_end(&mut content)
                .map_err(|e| extraction_error(format!("Failed to read {}: {}", entry.name(), e)))?;
            std::fs::write(&outpath, &content).map_err(|e| Error::io(e, &outpath, "write file"))?;

            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode() {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))
                    .map_err(|e| Error::io(e, &outpath, "set permissions"))?;
            }
        }

        Ok(())
    }
}
