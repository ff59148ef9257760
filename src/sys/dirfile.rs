//! Line-level layout of a directory file and its atomic persistence.
//!
//! A [`DirectoryFile`] keeps the parsed records in file order together with the
//! position of every line that is not a record (blank lines, comments and NIS
//! compat entries) so that an unedited file serializes back byte for byte.

use std::fs;
use std::io::Write;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, FormatError, FormatErrorKind, Result};
use crate::sys::entry::Record;

/// What to do with blank lines and `#` comments when a file is loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CommentPolicy {
    /// Keep them at their position when the file is saved.
    #[default]
    Preserve,
    /// Forget them; they are absent from the next save.
    Drop,
}

impl CommentPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preserve" | "keep" => Some(Self::Preserve),
            "drop" | "strip" => Some(Self::Drop),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preserve => "preserve",
            Self::Drop => "drop",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Slot {
    Record,
    Verbatim(String),
}

#[derive(Clone, Debug)]
pub struct DirectoryFile<T> {
    entries: Vec<T>,
    layout: Vec<Slot>,
    trailing_newline: bool,
}

impl<T: Record> Default for DirectoryFile<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            layout: Vec::new(),
            trailing_newline: true,
        }
    }
}

impl<T: Record> DirectoryFile<T> {
    /// Parse raw file text. Fails on the first malformed line or on a
    /// duplicate record name.
    pub fn parse(raw: &str, policy: CommentPolicy) -> std::result::Result<Self, FormatError> {
        let mut file = Self::default();
        if raw.is_empty() {
            return Ok(file);
        }

        let mut lines: Vec<&str> = raw.split('\n').collect();
        file.trailing_newline = lines.last() == Some(&"");
        if file.trailing_newline {
            lines.pop();
        }

        for (idx, line) in lines.into_iter().enumerate() {
            let lineno = idx + 1;
            if line.starts_with('+') || line.starts_with('-') {
                file.layout.push(Slot::Verbatim(line.to_string()));
                continue;
            }
            if line.trim().is_empty() || line.starts_with('#') {
                if policy == CommentPolicy::Preserve {
                    file.layout.push(Slot::Verbatim(line.to_string()));
                }
                continue;
            }
            let record = T::parse_line(line).map_err(|kind| FormatError { line: lineno, kind })?;
            if file.position(record.name()).is_some() {
                return Err(FormatError {
                    line: lineno,
                    kind: FormatErrorKind::Duplicate {
                        name: record.name().to_string(),
                    },
                });
            }
            file.entries.push(record);
            file.layout.push(Slot::Record);
        }
        Ok(file)
    }

    /// Render the file back to text. Records beyond the original record slots
    /// are appended at the end; surplus slots are skipped.
    pub fn serialize(&self) -> String {
        let mut records = self.entries.iter();
        let mut out: Vec<String> = Vec::with_capacity(self.layout.len() + 1);
        for slot in &self.layout {
            match slot {
                Slot::Verbatim(line) => out.push(line.clone()),
                Slot::Record => {
                    if let Some(r) = records.next() {
                        out.push(r.to_line());
                    }
                }
            }
        }
        out.extend(records.map(T::to_line));

        if out.is_empty() {
            return String::new();
        }
        let mut text = out.join("\n");
        if self.trailing_newline {
            text.push('\n');
        }
        text
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.position(name).map(|i| &self.entries[i])
    }

    /// Append a record, refusing a name that is already present.
    pub fn push(&mut self, record: T) -> Result<()> {
        if self.position(record.name()).is_some() {
            return Err(Error::Duplicate {
                kind: T::KIND,
                name: record.name().to_string(),
            });
        }
        self.entries.push(record);
        Ok(())
    }

    /// Replace the whole record sequence with an edited copy. The previous
    /// sequence is kept when the copy contains a duplicate name.
    pub fn replace(&mut self, records: Vec<T>) -> Result<()> {
        let mut seen = std::collections::HashSet::with_capacity(records.len());
        for r in &records {
            if !seen.insert(r.name()) {
                return Err(Error::Duplicate {
                    kind: T::KIND,
                    name: r.name().to_string(),
                });
            }
        }
        self.entries = records;
        Ok(())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name() == name)
    }
}

/// Read and parse a directory file from disk.
pub fn read_file<T: Record>(path: &Path, policy: CommentPolicy) -> Result<DirectoryFile<T>> {
    read_with_contents(path, policy).map(|(file, _)| file)
}

/// Like [`read_file`], also returning the exact text that was parsed.
pub fn read_with_contents<T: Record>(
    path: &Path,
    policy: CommentPolicy,
) -> Result<(DirectoryFile<T>, String)> {
    let raw = read_contents(path)?;
    let file = DirectoryFile::parse(&raw, policy).map_err(|source| Error::Format {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), records = file.entries().len(), "parsed directory file");
    Ok((file, raw))
}

pub fn read_contents(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Replace `path` with `contents` through a temporary file in the same
/// directory followed by a rename. The old file's mode and owner are carried
/// over so `/etc/passwd` stays `0644 root:root`.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".usrgrp-editor.")
        .tempfile_in(dir)
        .map_err(|e| Error::io(dir, e))?;

    tmp.write_all(contents.as_bytes())
        .map_err(|e| Error::io(tmp.path(), e))?;

    if let Ok(meta) = fs::metadata(path) {
        let file = tmp.as_file();
        file.set_permissions(meta.permissions())
            .map_err(|e| Error::io(path, e))?;
        std::os::unix::fs::fchown(file, Some(meta.uid()), Some(meta.gid()))
            .map_err(|e| Error::io(path, e))?;
    }

    tmp.as_file().sync_all().map_err(|e| Error::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| Error::io(path, e.error))?;

    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        warn!(dir = %dir.display(), error = %e, "could not sync directory after rename");
    }
    Ok(())
}
