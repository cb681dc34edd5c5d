//! Valve pack (VPK) directory files.
//!
//! Only the directory tree is read; file data lives in the numbered
//! `_NNN.vpk` siblings and is never touched.
//!
//! Header (all fields little endian):
//!
//! | Field          | Type   | Versions |
//! |----------------|--------|----------|
//! | Signature      | u32    | 1, 2     |
//! | Version        | u32    | 1, 2     |
//! | Tree size      | u32    | 1, 2     |
//! | Section sizes  | u32[4] | 2        |
//!
//! The tree follows the header. Every file in it is followed by an entry:
//! crc `u32`, preload size `u16`, archive index `u16`, offset `u32`, length
//! `u32`, terminator `u16`, then the preload bytes.

use super::index::PathIndex;
use byteorder::{LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const VPK_SIGNATURE: u32 = 0x55AA_1234;

const ENTRY_TERMINATOR: u16 = 0xFFFF;

/// File data, archive md5, other md5 and signature sections.
const V2_SECTION_COUNT: usize = 4;

#[derive(Error, Debug)]
pub enum VpkError {
    #[error("I/O error: {0}")]
    Io(io::Error),
    #[error("bad signature {0:#010x}")]
    BadSignature(u32),
    #[error("unsupported version {0}")]
    UnsupportedVersion(u32),
    #[error("directory tree is truncated")]
    Truncated,
    #[error("entry for {0} is not terminated")]
    BadEntry(String),
}

impl From<io::Error> for VpkError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => VpkError::Truncated,
            _ => VpkError::Io(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VpkArchive {
    path: PathBuf,
    index: PathIndex,
}

impl VpkArchive {
    pub fn open(path: &Path) -> Result<Self, VpkError> {
        let mut reader = BufReader::new(File::open(path)?);

        let signature = reader.read_u32::<LittleEndian>()?;
        if signature != VPK_SIGNATURE {
            return Err(VpkError::BadSignature(signature));
        }
        let version = reader.read_u32::<LittleEndian>()?;
        let tree_size = reader.read_u32::<LittleEndian>()? as usize;
        match version {
            1 => {}
            2 => {
                for _ in 0..V2_SECTION_COUNT {
                    reader.read_u32::<LittleEndian>()?;
                }
            }
            other => return Err(VpkError::UnsupportedVersion(other)),
        }

        let mut tree = vec![0u8; tree_size];
        reader.read_exact(&mut tree)?;

        Ok(Self {
            path: path.to_path_buf(),
            index: parse_tree(&tree)?,
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

/// Tree layout: extension, then directory, then file name, each level a run
/// of NUL-terminated strings closed by an empty one. A lone space stands for
/// "no extension" / "no directory".
fn parse_tree(tree: &[u8]) -> Result<PathIndex, VpkError> {
    let mut reader = Cursor::new(tree);
    let mut index = PathIndex::default();

    loop {
        let extension = read_string(&mut reader)?;
        if extension.is_empty() {
            break;
        }
        loop {
            let directory = read_string(&mut reader)?;
            if directory.is_empty() {
                break;
            }
            loop {
                let name = read_string(&mut reader)?;
                if name.is_empty() {
                    break;
                }

                let mut full = String::new();
                if directory != " " {
                    full.push_str(&directory);
                    full.push('/');
                }
                full.push_str(&name);
                if extension != " " {
                    full.push('.');
                    full.push_str(&extension);
                }

                let _crc = reader.read_u32::<LittleEndian>()?;
                let preload = reader.read_u16::<LittleEndian>()?;
                let _archive_index = reader.read_u16::<LittleEndian>()?;
                let _offset = reader.read_u32::<LittleEndian>()?;
                let _length = reader.read_u32::<LittleEndian>()?;
                if reader.read_u16::<LittleEndian>()? != ENTRY_TERMINATOR {
                    return Err(VpkError::BadEntry(full));
                }
                skip(&mut reader, u64::from(preload))?;

                index.insert(&full);
            }
        }
    }
    Ok(index)
}

fn read_string(reader: &mut Cursor<&[u8]>) -> Result<String, VpkError> {
    let mut buf = Vec::new();
    reader.read_until(0, &mut buf)?;
    if buf.pop() != Some(0) {
        return Err(VpkError::Truncated);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn skip(reader: &mut Cursor<&[u8]>, len: u64) -> Result<(), VpkError> {
    let end = reader.position().saturating_add(len);
    if end > reader.get_ref().len() as u64 {
        return Err(VpkError::Truncated);
    }
    reader.set_position(end);
    Ok(())
}

/// Builds a version 1 directory file from `(path, preload)` pairs.
#[cfg(test)]
pub(crate) fn build_vpk(files: &[(&str, &str)]) -> Vec<u8> {
    use byteorder::WriteBytesExt;
    use std::collections::BTreeMap;

    let mut tree: BTreeMap<String, BTreeMap<String, Vec<(String, Vec<u8>)>>> = BTreeMap::new();
    for &(path, preload) in files {
        let (dir, file) = path.rsplit_once('/').unwrap_or((" ", path));
        let (name, ext) = file.rsplit_once('.').unwrap_or((file, " "));
        tree.entry(ext.to_string())
            .or_default()
            .entry(dir.to_string())
            .or_default()
            .push((name.to_string(), preload.as_bytes().to_vec()));
    }

    let mut body = Vec::new();
    for (ext, dirs) in &tree {
        body.extend_from_slice(ext.as_bytes());
        body.push(0);
        for (dir, names) in dirs {
            body.extend_from_slice(dir.as_bytes());
            body.push(0);
            for (name, preload) in names {
                body.extend_from_slice(name.as_bytes());
                body.push(0);
                body.write_u32::<LittleEndian>(0).unwrap(); // crc
                body.write_u16::<LittleEndian>(preload.len() as u16).unwrap();
                body.write_u16::<LittleEndian>(0x7FFF).unwrap(); // data in this file
                body.write_u32::<LittleEndian>(0).unwrap();
                body.write_u32::<LittleEndian>(0).unwrap();
                body.write_u16::<LittleEndian>(ENTRY_TERMINATOR).unwrap();
                body.extend_from_slice(preload);
            }
            body.push(0);
        }
        body.push(0);
    }
    body.push(0);

    let mut out = Vec::new();
    out.write_u32::<LittleEndian>(VPK_SIGNATURE).unwrap();
    out.write_u32::<LittleEndian>(1).unwrap();
    out.write_u32::<LittleEndian>(body.len() as u32).unwrap();
    out.extend_from_slice(&body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_lists_tree() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("pak01_dir.vpk");
        std::fs::write(
            &path,
            build_vpk(&[
                ("materials/brick/wall01.vmt", "\"LightmappedGeneric\" {}"),
                ("models/props/crate.mdl", ""),
                ("readme", ""),
            ]),
        )
        .unwrap();

        let archive = VpkArchive::open(&path).unwrap();
        assert_eq!(archive.entries().len(), 3);
        assert!(archive.exists("materials/brick/wall01.vmt"));
        assert!(archive.exists("MATERIALS/Brick/Wall01.VMT"));
        assert!(archive.exists("readme"));
        assert!(!archive.exists("materials/brick/wall02.vmt"));
    }

    #[test]
    fn test_version_two_header() {
        let v1 = build_vpk(&[("scripts/game.txt", "")]);
        let mut v2 = Vec::new();
        v2.extend_from_slice(&v1[..4]);
        v2.extend_from_slice(&2u32.to_le_bytes());
        v2.extend_from_slice(&v1[8..12]);
        v2.extend_from_slice(&[0u8; 16]);
        v2.extend_from_slice(&v1[12..]);

        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("v2_dir.vpk");
        std::fs::write(&path, v2).unwrap();

        let archive = VpkArchive::open(&path).unwrap();
        assert!(archive.exists("scripts/game.txt"));
    }

    #[test]
    fn test_rejects_bad_input() {
        let temp = tempfile::tempdir().unwrap();

        let bad_sig = temp.path().join("bad.vpk");
        std::fs::write(&bad_sig, [0u8; 12]).unwrap();
        assert!(matches!(
            VpkArchive::open(&bad_sig),
            Err(VpkError::BadSignature(0))
        ));

        let mut truncated = build_vpk(&[("a/b.vmt", "")]);
        truncated.truncate(truncated.len() - 4);
        let truncated_path = temp.path().join("truncated.vpk");
        std::fs::write(&truncated_path, truncated).unwrap();
        assert!(matches!(
            VpkArchive::open(&truncated_path),
            Err(VpkError::Truncated)
        ));
    }

    #[test]
    fn test_rejects_unterminated_entry() {
        let mut data = build_vpk(&[("a/b.vmt", "")]);
        // Terminator sits just before the three closing NULs
        let at = data.len() - 5;
        data[at] = 0;
        data[at + 1] = 0;

        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("unterminated_dir.vpk");
        std::fs::write(&path, data).unwrap();
        assert!(matches!(
            VpkArchive::open(&path),
            Err(VpkError::BadEntry(name)) if name == "a/b.vmt"
        ));
    }
}
