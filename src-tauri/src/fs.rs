//! Filesystem access for the controller.
//!
//! The panel never touches `std::fs` directly; it goes through [`NoteFs`] so
//! the desktop shell and the tests can supply their own backing store.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

pub trait NoteFs: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn write_file(&self, path: &Path, content: &str) -> io::Result<()>;

    fn write_binary(&self, path: &Path, content: &[u8]) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// File names (not paths) directly inside `dir`.
    fn list_file_names(&self, dir: &Path) -> io::Result<Vec<String>>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NativeFs;

impl NoteFs for NativeFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write_file(&self, path: &Path, content: &str) -> io::Result<()> {
        fs::write(path, content)
    }

    fn write_binary(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn list_file_names(&self, dir: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Lexically resolves `.` and `..` and lower-cases a leading drive letter so
/// paths reported by the webview compare equal to the ones we build.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    lower_case_drive_letter(&out)
}

fn lower_case_drive_letter(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    let bytes = text.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_uppercase() {
        let mut lowered = text.into_owned();
        lowered[..1].make_ascii_lowercase();
        return PathBuf::from(lowered);
    }
    path.to_path_buf()
}

/// Forward-slash form used inside markdown links.
pub fn to_link_path(path: &str) -> String {
    path.trim().replace('\\', "/").trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dot_segments() {
        assert_eq!(
            normalize_path(Path::new("/notes/./daily/../media/img.png")),
            PathBuf::from("/notes/media/img.png")
        );
    }

    #[test]
    fn lowers_drive_letter() {
        assert_eq!(
            lower_case_drive_letter(Path::new("C:/notes")),
            PathBuf::from("c:/notes")
        );
        assert_eq!(
            lower_case_drive_letter(Path::new("/notes")),
            PathBuf::from("/notes")
        );
    }

    #[test]
    fn link_paths_use_forward_slashes() {
        assert_eq!(to_link_path("\\media\\a b.png"), "media/a b.png");
    }

    #[test]
    fn native_fs_lists_only_files() {
        let dir = tempfile::tempdir().unwrap();
        let fs = NativeFs;
        fs.write_file(&dir.path().join("b.md"), "b").unwrap();
        fs.write_binary(&dir.path().join("a.png"), &[1, 2, 3]).unwrap();
        fs.create_dir_all(&dir.path().join("sub")).unwrap();

        let names = fs.list_file_names(dir.path()).unwrap();
        assert_eq!(names, vec!["a.png".to_string(), "b.md".to_string()]);
        assert!(fs.exists(&dir.path().join("b.md")));
        assert_eq!(fs.read_to_string(&dir.path().join("b.md")).unwrap(), "b");
    }
}
