//! In-memory zip bundling of album tracks

use bytes::Bytes;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::DownloadError;

/// One file to place in the archive folder
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Bytes,
}

/// Build a zip with every entry under `folder/`
///
/// Audio is already compressed, so entries are stored as-is.
pub fn build_zip(folder: &str, entries: &[ArchiveEntry]) -> Result<Vec<u8>, DownloadError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    writer.add_directory(format!("{}/", folder), options)?;
    for entry in entries {
        writer.start_file(format!("{}/{}", folder, entry.name), options)?;
        writer.write_all(&entry.data)?;
    }

    let cursor = writer.finish()?;
    let bytes = cursor.into_inner();
    debug!("Built archive {} with {} entries ({} bytes)", folder, entries.len(), bytes.len());
    Ok(bytes)
}

/// [`build_zip`] on the blocking pool
pub async fn build_zip_async(
    folder: String,
    entries: Vec<ArchiveEntry>,
) -> Result<Vec<u8>, DownloadError> {
    tokio::task::spawn_blocking(move || build_zip(&folder, &entries))
        .await
        .map_err(|e| DownloadError::DownloadFailed(format!("archive task failed: {e}")))?
}

/// Return `name`, or `name (n).ext` if it was already taken
pub fn unique_name(taken: &mut HashSet<String>, name: &str) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{}", ext)),
        None => (name, String::new()),
    };

    let mut n = 2;
    loop {
        let candidate = format!("{} ({}){}", stem, n, ext);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zip::ZipArchive;

    fn entry(name: &str, data: &'static [u8]) -> ArchiveEntry {
        ArchiveEntry {
            name: name.to_string(),
            data: Bytes::from_static(data),
        }
    }

    #[test]
    fn test_entries_land_in_folder_with_original_bytes() {
        let zip_bytes = build_zip(
            "My Album",
            &[entry("One_320kbps.mp3", b"one"), entry("Two_320kbps.mp3", b"two")],
        )
        .unwrap();

        let mut archive = ZipArchive::new(Cursor::new(zip_bytes)).unwrap();
        let mut files: Vec<String> = archive.file_names().map(str::to_string).collect();
        files.sort();
        assert_eq!(
            files,
            vec!["My Album/", "My Album/One_320kbps.mp3", "My Album/Two_320kbps.mp3"]
        );

        let mut contents = String::new();
        std::io::Read::read_to_string(
            &mut archive.by_name("My Album/Two_320kbps.mp3").unwrap(),
            &mut contents,
        )
        .unwrap();
        assert_eq!(contents, "two");
    }

    #[tokio::test]
    async fn test_empty_archive_is_valid() {
        let zip_bytes = build_zip_async("Empty".to_string(), Vec::new()).await.unwrap();
        let archive = ZipArchive::new(Cursor::new(zip_bytes)).unwrap();
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn test_unique_name() {
        let mut taken = HashSet::new();
        assert_eq!(unique_name(&mut taken, "Song_320kbps.mp3"), "Song_320kbps.mp3");
        assert_eq!(unique_name(&mut taken, "Song_320kbps.mp3"), "Song_320kbps (2).mp3");
        assert_eq!(unique_name(&mut taken, "Song_320kbps.mp3"), "Song_320kbps (3).mp3");
        assert_eq!(unique_name(&mut taken, "README"), "README");
        assert_eq!(unique_name(&mut taken, "README"), "README (2)");
    }
}
