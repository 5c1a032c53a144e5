//! Mailbox store: a directory of `.eml` files with deferred deletion.
//!
//! Deletions are only recorded while the store is in use and committed when
//! it is closed, either explicitly through [`MailboxStore::close`] or when the
//! store is dropped. Each pending file is deleted at most once.
//!
//! The store assumes exclusive access to its directory; two stores over the
//! same directory may race on deletions.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{MailboxError, Result};
use crate::model::entry::MailboxEntry;
use crate::parser::header::{decode_text, HeaderIndex};
use crate::parser::message::Message;
use crate::parser::split::{find_delimiter, header_bounds_strict};

/// Extension of tracked message files, without the dot.
pub const DEFAULT_EXTENSION: &str = "eml";

/// Outcome of committing pending deletions.
#[derive(Debug, Default)]
pub struct CloseReport {
    /// Files that were removed.
    pub deleted: Vec<PathBuf>,
    /// Deletions that failed; the remaining ones were still attempted.
    pub failed: Vec<MailboxError>,
}

impl CloseReport {
    /// `true` when every pending deletion succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Message store over one directory. Ids are 0-based positions in
/// [`entries`](Self::entries).
#[derive(Debug)]
pub struct MailboxStore {
    dir: Option<PathBuf>,
    extension: String,
    entries: Vec<MailboxEntry>,
    closed: bool,
}

impl MailboxStore {
    /// Open a mailbox directory and scan it.
    ///
    /// A path that is not a directory yields an empty store instead of an
    /// error; use [`try_open`](Self::try_open) to get the failure.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let dir = if path.is_dir() {
            Some(path.to_path_buf())
        } else {
            warn!(path = %path.display(), "Mailbox path is not a directory, store is empty");
            None
        };

        let mut store = Self {
            dir,
            extension: DEFAULT_EXTENSION.to_string(),
            entries: Vec::new(),
            closed: false,
        };
        store.scan();
        store
    }

    /// Open a mailbox directory, failing if it is not a readable directory.
    pub fn try_open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(MailboxError::NotADirectory(path.to_path_buf()));
        }
        std::fs::read_dir(path).map_err(|e| MailboxError::io(path, e))?;
        Ok(Self::open(path))
    }

    /// Track files with another extension (case-sensitive, without the dot)
    /// and rescan.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self.scan();
        self
    }

    /// List the directory and rebuild the entry list.
    ///
    /// Only regular files with the tracked extension are kept, sorted by
    /// name. Names still present keep their pending-deletion flag. Returns
    /// the number of tracked entries.
    pub fn scan(&mut self) -> usize {
        let Some(dir) = &self.dir else {
            return 0;
        };

        let read = match std::fs::read_dir(dir) {
            Ok(read) => read,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Failed to list mailbox directory");
                return self.entries.len();
            }
        };

        let mut names: Vec<String> = read
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name != "." && name != "..")
            .filter(|name| Path::new(name).extension() == Some(OsStr::new(&self.extension)))
            .collect();
        names.sort();

        let pending: HashSet<String> = self
            .entries
            .iter()
            .filter(|e| e.pending_delete)
            .map(|e| e.file_name.clone())
            .collect();
        let entries: Vec<MailboxEntry> = names
            .into_iter()
            .map(|name| {
                let mut entry = MailboxEntry::new(name);
                entry.pending_delete = pending.contains(&entry.file_name);
                entry
            })
            .collect();

        debug!(path = %dir.display(), count = entries.len(), "Scanned mailbox");
        self.entries = entries;
        self.entries.len()
    }

    /// Number of tracked messages.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[MailboxEntry] {
        &self.entries
    }

    /// The mailbox directory, `None` for a store opened on a non-directory.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// File sizes in bytes.
    ///
    /// With an id: a one-element list, or `Ok(None)` if the id is unknown.
    /// Without: every entry's size in order.
    pub fn sizes(&self, id: Option<usize>) -> Result<Option<Vec<u64>>> {
        match id {
            Some(id) => match self.path_of(id) {
                Some(path) => Ok(Some(vec![file_size(&path)?])),
                None => Ok(None),
            },
            None => (0..self.entries.len())
                .filter_map(|id| self.path_of(id))
                .map(|path| file_size(&path))
                .collect::<Result<Vec<_>>>()
                .map(Some),
        }
    }

    /// Mark a message for deletion at close. Returns `false` for unknown ids.
    pub fn mark_deleted(&mut self, id: usize) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.pending_delete = true;
                true
            }
            None => false,
        }
    }

    /// Clear the deletion mark of one message, or of every message when
    /// `id` is `None`. Returns `false` for unknown ids.
    pub fn unmark_deleted(&mut self, id: Option<usize>) -> bool {
        match id {
            Some(id) => match self.entries.get_mut(id) {
                Some(entry) => {
                    entry.pending_delete = false;
                    true
                }
                None => false,
            },
            None => {
                self.unmark_all();
                true
            }
        }
    }

    /// Clear every deletion mark.
    pub fn unmark_all(&mut self) {
        for entry in &mut self.entries {
            entry.pending_delete = false;
        }
    }

    /// Headers (and preamble) of a message.
    ///
    /// For a multipart message this is everything before the first boundary
    /// delimiter; otherwise the header block up to the first blank line.
    pub fn top(&self, id: usize) -> Result<Option<Vec<u8>>> {
        Ok(self.retrieve(id)?.map(|raw| top_of(&raw).to_vec()))
    }

    /// Full raw bytes of a message, `Ok(None)` for unknown ids.
    pub fn retrieve(&self, id: usize) -> Result<Option<Vec<u8>>> {
        let Some(path) = self.path_of(id) else {
            return Ok(None);
        };
        debug!(path = %path.display(), id, "Reading message");
        std::fs::read(&path)
            .map(Some)
            .map_err(|e| MailboxError::io(&path, e))
    }

    /// Retrieve and decompose a message, tagging it with its id.
    pub fn message(&self, id: usize) -> Result<Option<Message>> {
        Ok(self.retrieve(id)?.map(|raw| Message::parse(raw, Some(id))))
    }

    /// Commit pending deletions.
    ///
    /// Runs once: later calls (and the one made on drop) return an empty
    /// report. A failed deletion is logged and recorded, and the remaining
    /// ones are still attempted.
    pub fn close(&mut self) -> CloseReport {
        let mut report = CloseReport::default();
        if self.closed {
            return report;
        }
        self.closed = true;

        let Some(dir) = &self.dir else {
            return report;
        };

        for entry in self.entries.iter().filter(|e| e.pending_delete) {
            let path = dir.join(&entry.file_name);
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    info!(path = %path.display(), "Deleted message");
                    report.deleted.push(path);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to delete message");
                    report
                        .failed
                        .push(MailboxError::DeleteFailed { path, source: e });
                }
            }
        }

        report
    }

    fn path_of(&self, id: usize) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        self.entries.get(id).map(|e| dir.join(&e.file_name))
    }
}

impl Drop for MailboxStore {
    fn drop(&mut self) {
        self.close();
    }
}

fn file_size(path: &Path) -> Result<u64> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| MailboxError::io(path, e))
}

/// Prefix of a raw message returned by [`MailboxStore::top`].
fn top_of(raw: &[u8]) -> &[u8] {
    let (header_end, body_start) = header_bounds_strict(raw).unwrap_or((raw.len(), raw.len()));
    let header = HeaderIndex::parse(&decode_text(&raw[..header_end]));

    if let Some(boundary) = header.boundary() {
        let delimiter = format!("--{boundary}");
        if let Some((pos, _)) = find_delimiter(raw, &delimiter, body_start) {
            return &raw[..pos];
        }
    }
    &raw[..header_end]
}
