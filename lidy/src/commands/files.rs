use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::rules::errors::Error;

pub(crate) fn read_file_content(file: File) -> Result<String, std::io::Error> {
    let mut file_content = String::new();
    let mut buf_reader = BufReader::new(file);
    buf_reader.read_to_string(&mut file_content)?;
    Ok(file_content)
}

pub(crate) fn read_path(path: &Path) -> Result<String, Error> {
    if !path.exists() {
        return Err(Error::FileNotFoundError(path.display().to_string()));
    }
    Ok(read_file_content(File::open(path)?)?)
}

///
/// Files under `file` accepted by `filter`, directories walked in sorted
/// order. A plain file is returned as is, whatever its extension.
///
pub(crate) fn get_files_with_filter<S, F>(
    file: &str,
    sort: S,
    filter: F,
) -> Result<Vec<PathBuf>, Error>
where
    S: FnMut(&DirEntry, &DirEntry) -> Ordering + Send + Sync + 'static,
    F: Fn(&DirEntry) -> bool,
{
    let base = Path::new(file);
    if !base.exists() {
        return Err(Error::FileNotFoundError(file.to_string()));
    }
    if base.is_file() {
        return Ok(vec![base.to_path_buf()]);
    }

    let mut selected = Vec::with_capacity(10);
    let walker = WalkDir::new(file).sort_by(sort).into_iter();
    let dir_check = |entry: &DirEntry| {
        // select directories to traverse
        if entry.path().is_dir() {
            return true;
        }
        filter(entry)
    };
    for entry in walker.filter_entry(dir_check) {
        let entry = entry.map_err(|e| Error::IoError(e.into()))?;
        if entry.path().is_file() {
            selected.push(entry.into_path());
        }
    }

    Ok(selected)
}

pub(crate) fn alphabetical(first: &DirEntry, second: &DirEntry) -> Ordering {
    first.file_name().cmp(second.file_name())
}

pub(crate) fn has_a_supported_extension(name: &str, extensions: &[&str]) -> bool {
    extensions.iter().any(|extension| name.ends_with(extension))
}
