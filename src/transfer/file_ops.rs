//! Module `file_ops`
//!
//! Filesystem helpers for downloads: the download directory, collision-free
//! `.part` and final paths, and announced-filename hardening.

use std::env;
use std::path::{Path, PathBuf};

pub const DOWNLOAD_DIR_NAME: &str = "radi8-files";
pub const PART_SUFFIX: &str = ".part";

/// `$HOME/radi8-files`, or the working directory when no home is set
pub fn default_download_dir() -> PathBuf {
    let home = env::var_os("HOME").or_else(|| env::var_os("USERPROFILE"));
    match home {
        Some(home) => PathBuf::from(home).join(DOWNLOAD_DIR_NAME),
        None => PathBuf::from(DOWNLOAD_DIR_NAME),
    }
}

/// Reduce an announced filename to its final component.
///
/// Falls back to `file-<id>` when nothing usable remains.
pub fn sanitize_filename(announced: &str, id: u32) -> String {
    let name = announced
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        format!("file-{}", id)
    } else {
        name.to_string()
    }
}

/// `name.part`, then `name.part.1`, `name.part.2`, ... until unused.
pub fn unique_temp_path(dir: &Path, filename: &str) -> PathBuf {
    let base = format!("{}{}", filename, PART_SUFFIX);
    let mut candidate = dir.join(&base);
    let mut counter = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{}.{}", base, counter));
        counter += 1;
    }
    candidate
}

/// `name.ext`, then `name_1.ext`, `name_2.ext`, ... until unused.
pub fn unique_final_path(dir: &Path, filename: &str) -> PathBuf {
    let mut candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, extension) = split_extension(filename);
    let mut counter = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{}_{}{}", stem, counter, extension));
        counter += 1;
    }
    candidate
}

/// Split at the last dot; a leading dot (hidden file) is not an extension.
fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => filename.split_at(idx),
        _ => (filename, ""),
    }
}

/// Final path component of a local file, for announcing it to peers.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd", 3), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\x\\doc.txt", 3), "doc.txt");
        assert_eq!(sanitize_filename("photo.jpg", 3), "photo.jpg");
        assert_eq!(sanitize_filename("", 3), "file-3");
        assert_eq!(sanitize_filename("dir/", 4), "file-4");
        assert_eq!(sanitize_filename("..", 5), "file-5");
    }

    #[test]
    fn test_temp_path_avoids_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let first = unique_temp_path(dir.path(), "a.bin");
        assert_eq!(first, dir.path().join("a.bin.part"));

        File::create(&first).unwrap();
        let second = unique_temp_path(dir.path(), "a.bin");
        assert_eq!(second, dir.path().join("a.bin.part.1"));

        File::create(&second).unwrap();
        assert_eq!(
            unique_temp_path(dir.path(), "a.bin"),
            dir.path().join("a.bin.part.2")
        );
    }

    #[test]
    fn test_final_path_inserts_counter_before_extension() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            unique_final_path(dir.path(), "report.pdf"),
            dir.path().join("report.pdf")
        );

        File::create(dir.path().join("report.pdf")).unwrap();
        File::create(dir.path().join("report_1.pdf")).unwrap();
        assert_eq!(
            unique_final_path(dir.path(), "report.pdf"),
            dir.path().join("report_2.pdf")
        );

        File::create(dir.path().join("README")).unwrap();
        assert_eq!(
            unique_final_path(dir.path(), "README"),
            dir.path().join("README_1")
        );

        File::create(dir.path().join(".env")).unwrap();
        assert_eq!(
            unique_final_path(dir.path(), ".env"),
            dir.path().join(".env_1")
        );
    }
}
