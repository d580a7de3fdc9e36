// ZIP bundling of written artifacts

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::csv::table_id;
use crate::error::IoError;

pub const BUNDLE_FILE_NAME: &str = "Audit_Reports.zip";

/// Pack `files` into a ZIP archive at `zip_path`, each under its file name.
pub fn bundle(files: &[PathBuf], zip_path: &Path) -> Result<(), IoError> {
    let file = File::create(zip_path).map_err(|e| IoError::io(zip_path, e))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in files {
        let bytes = std::fs::read(path).map_err(|e| IoError::io(path, e))?;
        zip.start_file(table_id(path), options)?;
        zip.write_all(&bytes).map_err(|e| IoError::io(zip_path, e))?;
    }

    zip.finish()?;
    debug!(path = %zip_path.display(), entries = files.len(), "wrote bundle");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn bundle_contains_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("Audit_Log.csv");
        let b = dir.path().join("Duplicates.csv");
        std::fs::write(&a, "Issue,Count\nTotal Rows,3\n").unwrap();
        std::fs::write(&b, "Invoice ID\n").unwrap();
        let zip_path = dir.path().join(BUNDLE_FILE_NAME);

        bundle(&[a, b], &zip_path).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive
            .by_name("Audit_Log.csv")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "Issue,Count\nTotal Rows,3\n");
    }

    #[test]
    fn missing_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = bundle(&[dir.path().join("nope.csv")], &dir.path().join("x.zip")).unwrap_err();
        assert!(matches!(err, IoError::Io { .. }));
    }
}
