use super::index::PathIndex;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use zip::ZipArchive;
use zip::result::ZipError;

/// Zip package (`.zip`, or a bsp pakfile extracted to disk).
#[derive(Debug, Clone)]
pub struct ZipPackage {
    path: PathBuf,
    index: PathIndex,
}

impl ZipPackage {
    /// Reads the central directory; the file is closed before returning.
    pub fn open(path: &Path) -> Result<Self, ZipError> {
        let file = File::open(path)?;
        let archive = ZipArchive::new(BufReader::new(file))?;
        let index = archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            index,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self, path: &str) -> bool {
        self.index.contains(path)
    }

    pub fn entries(&self) -> &PathIndex {
        &self.index
    }
}

#[cfg(test)]
pub(crate) fn build_zip(path: &Path, files: &[&str]) {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
    for name in files {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"data").unwrap();
    }
    writer.finish().unwrap();
}
