use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::errors::Result;
use crate::wire::GeneratedFile;

/// Pack the files into an in-memory deflate ZIP, one entry per file at its
/// literal path. Directories are implied by the entry names.
///
/// The `zip` writer refuses duplicate entry names, so a path that appears
/// more than once is stored once, with the content of its last occurrence.
/// The file list itself keeps every copy.
pub fn pack(files: &[GeneratedFile]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut seen = HashSet::new();
    let mut last_wins: Vec<&GeneratedFile> = files.iter().rev().filter(|f| seen.insert(f.path.as_str())).collect();
    last_wins.reverse();
    if last_wins.len() < files.len() {
        tracing::warn!(dropped = files.len() - last_wins.len(), "duplicate paths in archive, keeping last");
    }

    for f in last_wins {
        zip.start_file(f.path.as_str(), options)?;
        zip.write_all(f.content.as_bytes())?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// Download name for the archive: `<domain>_jobmaster.zip`.
///
/// Characters that cannot appear in a file name are replaced; a blank domain
/// falls back to `workflow`.
pub fn file_name(domain: &str) -> String {
    let cleaned: String = domain
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = if cleaned.is_empty() { "workflow" } else { cleaned.as_str() };
    format!("{stem}_jobmaster.zip")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn single_entry_round_trips() {
        let bytes = pack(&[GeneratedFile::new("a/b.txt", "hello")]).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);

        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), "a/b.txt");
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        let mut out = String::new();
        entry.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn no_directory_entries() {
        let files = vec![
            GeneratedFile::new("Orders/Import/config/import.yml", "a: 1\n"),
            GeneratedFile::new("Orders/Feed/sql/load.gql", "SELECT 1;\n"),
        ];
        let bytes = pack(&files).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| !n.ends_with('/')));
    }

    #[test]
    fn empty_list_is_valid_archive() {
        let bytes = pack(&[]).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }

    #[test]
    fn duplicate_path_keeps_last_content() {
        let files = vec![
            GeneratedFile::new("a.yml", "first\n"),
            GeneratedFile::new("b.gql", "SELECT 1;\n"),
            GeneratedFile::new("a.yml", "second\n"),
        ];
        let bytes = pack(&files).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.by_index(0).unwrap().name(), "b.gql");
        let mut out = String::new();
        archive.by_name("a.yml").unwrap().read_to_string(&mut out).unwrap();
        assert_eq!(out, "second\n");
    }

    #[test]
    fn archive_name_from_domain() {
        assert_eq!(file_name("Invoices"), "Invoices_jobmaster.zip");
        assert_eq!(file_name("  "), "workflow_jobmaster.zip");
        assert_eq!(file_name("HR/Payroll"), "HR_Payroll_jobmaster.zip");
    }
}
