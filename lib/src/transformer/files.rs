use crate::jvm::Error;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File in a directory being transformed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Location on disk
    pub path: PathBuf,

    /// Location relative to the root of the traversal (just the file name when the root is itself
    /// a file)
    pub relative: PathBuf,
}

impl InputFile {
    pub fn is_class(&self) -> bool {
        self.path.extension().map_or(false, |ext| ext == "class")
    }
}

/// List every file under `root` (or just `root`, if it is a file)
///
/// Files are listed in a stable order (sorted by name at each level), so passes over the same
/// input always visit classes in the same order.
pub fn input_files(root: &Path) -> Result<Vec<InputFile>, Error> {
    if root.is_file() {
        let relative = root
            .file_name()
            .map_or_else(|| root.to_path_buf(), PathBuf::from);
        return Ok(vec![InputFile {
            path: root.to_path_buf(),
            relative,
        }]);
    }

    let mut files = vec![];
    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry.map_err(|err| Error::IoError(err.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        let relative = match path.strip_prefix(root) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => path.clone(),
        };
        files.push(InputFile { path, relative });
    }
    Ok(files)
}
