//! Cross-platform utility functions

use std::io;
use std::path::{Component, Path, PathBuf};

/// Longest file name common filesystems accept, in bytes
const MAX_FILE_NAME_BYTES: usize = 255;

/// Room left for a stem once `.mp4` / `.mp3` is appended
const MAX_STEM_BYTES: usize = MAX_FILE_NAME_BYTES - ".mp4".len();

/// Get the default root for per-request working directories
pub fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("tubeconvert")
}

/// Create the work root, or accept an existing one only when it is a real
/// directory owned by the current user. Returns the canonical path.
pub async fn prepare_work_root(path: &Path) -> io::Result<PathBuf> {
    tokio::fs::create_dir_all(path).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::{MetadataExt, PermissionsExt};

        let meta = tokio::fs::symlink_metadata(path).await?;
        // SAFETY: geteuid has no preconditions and cannot fail
        let euid = unsafe { libc::geteuid() };
        if meta.file_type().is_symlink() || !meta.is_dir() || meta.uid() != euid {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("Work dir {} is not a directory owned by the current user", path.display()),
            ));
        }
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700)).await?;
    }

    tokio::fs::canonicalize(path).await
}

/// Check if a path lives inside the work root (for file serving)
pub fn is_path_allowed(path: &Path, work_root: &Path) -> bool {
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return false;
    }

    // Normalize for case-insensitive comparison on Windows
    #[cfg(windows)]
    {
        let path_str = path.to_string_lossy().to_lowercase();
        let root_str = work_root.to_string_lossy().to_lowercase();
        return Path::new(&path_str).starts_with(Path::new(&root_str));
    }

    #[cfg(not(windows))]
    {
        path.starts_with(work_root)
    }
}

/// Turn an arbitrary title into a single, filesystem-safe path component.
/// Returns `None` when nothing usable is left.
pub fn sanitize_file_stem(raw: &str) -> Option<String> {
    let replaced: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| c.is_whitespace() || c == '.');

    let mut end = trimmed.len().min(MAX_STEM_BYTES);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    let trimmed = trimmed[..end].trim_end_matches(|c: char| c.is_whitespace() || c == '.');

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Content type for a served file, derived from its extension
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("mp4") => "video/mp4",
        Some("mp3") => "audio/mpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_dir_exists_after_creation() {
        let dir = default_work_dir();
        std::fs::create_dir_all(&dir).expect("Failed to create work dir");
        assert!(dir.exists());
    }

    #[test]
    fn test_path_allowed_only_under_root() {
        let root = Path::new("/tmp/tubeconvert");
        assert!(is_path_allowed(Path::new("/tmp/tubeconvert/yt_1/a.mp4"), root));
        assert!(!is_path_allowed(Path::new("/etc/passwd"), root));
        assert!(!is_path_allowed(Path::new("/tmp/tubeconvert-other/a.mp4"), root));
        assert!(!is_path_allowed(Path::new("/tmp/tubeconvert/../../etc/passwd"), root));
    }

    #[test]
    fn test_sanitize_keeps_plain_titles() {
        assert_eq!(sanitize_file_stem("Sample Clip").as_deref(), Some("Sample Clip"));
        assert_eq!(sanitize_file_stem("track1").as_deref(), Some("track1"));
    }

    #[test]
    fn test_sanitize_replaces_reserved_characters() {
        assert_eq!(sanitize_file_stem("AC/DC: Live?").as_deref(), Some("AC_DC_ Live_"));
        assert_eq!(sanitize_file_stem("  ..hidden.. ").as_deref(), Some("hidden"));
        assert_eq!(sanitize_file_stem("a\tb").as_deref(), Some("a_b"));
    }

    #[test]
    fn test_sanitize_truncates_on_char_boundary() {
        let title = "日本語".repeat(30);
        let stem = sanitize_file_stem(&title).unwrap();
        assert!(stem.len() <= MAX_STEM_BYTES);
        assert!(format!("{}.mp3", stem).len() <= MAX_FILE_NAME_BYTES);
        assert!(title.starts_with(&stem));
        assert_eq!(stem.len() % 3, 0);

        let ascii = "a".repeat(400);
        assert_eq!(sanitize_file_stem(&ascii).unwrap().len(), MAX_STEM_BYTES);
    }

    #[test]
    fn test_sanitize_rejects_empty() {
        assert_eq!(sanitize_file_stem(""), None);
        assert_eq!(sanitize_file_stem("  ...  "), None);
    }

    #[test]
    fn test_content_type_for_extension() {
        assert_eq!(content_type_for(Path::new("/x/a.mp4")), "video/mp4");
        assert_eq!(content_type_for(Path::new("/x/a.MP3")), "audio/mpeg");
        assert_eq!(content_type_for(Path::new("/x/a")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_prepare_work_root_creates_private_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("work");

        let prepared = prepare_work_root(&root).await.unwrap();

        assert!(prepared.is_absolute());
        assert_eq!(prepared, std::fs::canonicalize(&root).unwrap());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&root).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_prepare_work_root_refuses_symlink() {
        let tmp = tempfile::tempdir().unwrap();
        let real = tmp.path().join("real");
        std::fs::create_dir(&real).unwrap();
        let link = tmp.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let err = prepare_work_root(&link).await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }
}
