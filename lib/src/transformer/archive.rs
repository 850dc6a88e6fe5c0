use crate::jvm::Error;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// Is this a jar (or plain zip) archive of classes?
pub fn is_archive(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .map_or(false, |ext| ext == "jar" || ext == "zip")
}

/// Entry read out of an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the archive, always `/` separated
    pub name: String,

    /// Directory entries have no contents
    pub directory: bool,

    pub contents: Vec<u8>,
}

impl ArchiveEntry {
    pub fn is_class(&self) -> bool {
        !self.directory && self.name.ends_with(".class")
    }
}

/// Visit the entries of an archive, in the order they are stored
pub fn visit_archive<E: From<Error>>(
    path: &Path,
    mut visit: impl FnMut(ArchiveEntry) -> Result<(), E>,
) -> Result<(), E> {
    let file = File::open(path).map_err(Error::IoError)?;
    let mut archive = ZipArchive::new(file).map_err(Error::from)?;
    for index in 0..archive.len() {
        let entry = {
            let mut entry = archive.by_index(index).map_err(Error::from)?;
            let mut contents = vec![];
            entry.read_to_end(&mut contents).map_err(Error::IoError)?;
            ArchiveEntry {
                name: entry.name().to_owned(),
                directory: entry.is_dir(),
                contents,
            }
        };
        visit(entry)?;
    }
    Ok(())
}

/// Archive being written out, entry by entry
///
/// Every entry gets the same (earliest possible) timestamp, so the same entries always produce
/// the same bytes.
pub struct ArchiveWriter {
    zip: ZipWriter<File>,
    options: SimpleFileOptions,
}

impl ArchiveWriter {
    pub fn create(path: &Path) -> Result<ArchiveWriter, Error> {
        let file = File::create(path)?;
        Ok(ArchiveWriter {
            zip: ZipWriter::new(file),
            options: SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .last_modified_time(DateTime::default()),
        })
    }

    pub fn add(&mut self, entry: &ArchiveEntry) -> Result<(), Error> {
        if entry.directory {
            self.zip.add_directory(entry.name.as_str(), self.options)?;
        } else {
            self.zip.start_file(entry.name.as_str(), self.options)?;
            self.zip.write_all(&entry.contents)?;
        }
        Ok(())
    }

    pub fn finish(self) -> Result<(), Error> {
        self.zip.finish()?;
        Ok(())
    }
}
