//! In-memory account and group directories backed by their files.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::sys::dirfile::{self, CommentPolicy, DirectoryFile};
use crate::sys::entry::{AccountEntry, GroupEntry, Record};
use crate::sys::lock::DirectoryLock;

/// Where the model reads from and writes to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryPaths {
    pub accounts: PathBuf,
    pub groups: PathBuf,
    /// Advisory lock file; `None` disables locking.
    pub lock: Option<PathBuf>,
}

impl DirectoryPaths {
    /// Account and group files with the conventional lock file next to the
    /// account file.
    pub fn new(accounts: impl Into<PathBuf>, groups: impl Into<PathBuf>) -> Self {
        let accounts = accounts.into();
        let lock = Some(default_lock_path(&accounts));
        Self {
            accounts,
            groups: groups.into(),
            lock,
        }
    }

    pub fn without_lock(mut self) -> Self {
        self.lock = None;
        self
    }
}

impl Default for DirectoryPaths {
    fn default() -> Self {
        Self::new("/etc/passwd", "/etc/group")
    }
}

/// `.pwd.lock` in the account file's directory.
pub fn default_lock_path(accounts: &Path) -> PathBuf {
    match accounts.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(".pwd.lock"),
        _ => PathBuf::from(".pwd.lock"),
    }
}

/// Account and group sequences for one load/edit/save cycle.
///
/// The text each file held when it was last read or written is kept, and a
/// save refuses to overwrite a file that changed on disk since then.
#[derive(Debug)]
pub struct DirectoryModel {
    paths: DirectoryPaths,
    policy: CommentPolicy,
    accounts: DirectoryFile<AccountEntry>,
    groups: DirectoryFile<GroupEntry>,
    accounts_on_disk: String,
    groups_on_disk: String,
    /// Bumped on every successful load.
    generation: u64,
}

impl DirectoryModel {
    /// An empty model; call [`load`](Self::load) to populate it.
    pub fn new(paths: DirectoryPaths, policy: CommentPolicy) -> Self {
        Self {
            paths,
            policy,
            accounts: DirectoryFile::default(),
            groups: DirectoryFile::default(),
            accounts_on_disk: String::new(),
            groups_on_disk: String::new(),
            generation: 0,
        }
    }

    pub fn open(paths: DirectoryPaths, policy: CommentPolicy) -> Result<Self> {
        let mut model = Self::new(paths, policy);
        model.load()?;
        Ok(model)
    }

    pub fn paths(&self) -> &DirectoryPaths {
        &self.paths
    }

    /// Identifies the last successful load. Edited copies taken from the
    /// model carry this number so a commit can tell they are out of date.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Re-read both files. Both parse before either replaces the in-memory
    /// state, so a failed load leaves the previous contents in place.
    pub fn load(&mut self) -> Result<()> {
        let _lock = self.lock()?;
        let (accounts, accounts_raw) = dirfile::read_with_contents(&self.paths.accounts, self.policy)?;
        let (groups, groups_raw) = dirfile::read_with_contents(&self.paths.groups, self.policy)?;
        self.accounts = accounts;
        self.groups = groups;
        self.accounts_on_disk = accounts_raw;
        self.groups_on_disk = groups_raw;
        self.generation += 1;
        debug!(
            accounts = self.accounts.entries().len(),
            groups = self.groups.entries().len(),
            generation = self.generation,
            "loaded directory model"
        );
        Ok(())
    }

    /// Write both files back atomically.
    pub fn save(&mut self) -> Result<()> {
        let _lock = self.lock()?;
        ensure_unchanged(&self.paths.accounts, &self.accounts_on_disk)?;
        ensure_unchanged(&self.paths.groups, &self.groups_on_disk)?;
        self.accounts_on_disk = write(&self.paths.accounts, &self.accounts)?;
        self.groups_on_disk = write(&self.paths.groups, &self.groups)?;
        Ok(())
    }

    pub fn save_accounts(&mut self) -> Result<()> {
        let _lock = self.lock()?;
        ensure_unchanged(&self.paths.accounts, &self.accounts_on_disk)?;
        self.accounts_on_disk = write(&self.paths.accounts, &self.accounts)?;
        Ok(())
    }

    pub fn save_groups(&mut self) -> Result<()> {
        let _lock = self.lock()?;
        ensure_unchanged(&self.paths.groups, &self.groups_on_disk)?;
        self.groups_on_disk = write(&self.paths.groups, &self.groups)?;
        Ok(())
    }

    pub fn accounts(&self) -> &[AccountEntry] {
        self.accounts.entries()
    }

    pub fn groups(&self) -> &[GroupEntry] {
        self.groups.entries()
    }

    pub fn account(&self, name: &str) -> Option<&AccountEntry> {
        self.accounts.get(name)
    }

    pub fn group(&self, name: &str) -> Option<&GroupEntry> {
        self.groups.get(name)
    }

    /// Accounts with uid >= 1000, in file order.
    pub fn regular_accounts(&self) -> impl Iterator<Item = &AccountEntry> {
        self.accounts().iter().filter(|a| a.is_regular())
    }

    /// Accounts with uid < 1000, in file order.
    pub fn system_accounts(&self) -> impl Iterator<Item = &AccountEntry> {
        self.accounts().iter().filter(|a| a.is_system())
    }

    /// Add an account in memory only; [`save`](Self::save) persists it.
    pub fn append_account(&mut self, entry: AccountEntry) -> Result<()> {
        self.accounts.push(entry)
    }

    pub fn append_group(&mut self, entry: GroupEntry) -> Result<()> {
        self.groups.push(entry)
    }

    /// Replace the account sequence in memory only.
    pub fn replace_accounts(&mut self, edited: Vec<AccountEntry>) -> Result<()> {
        self.accounts.replace(edited)
    }

    pub fn replace_groups(&mut self, edited: Vec<GroupEntry>) -> Result<()> {
        self.groups.replace(edited)
    }

    /// Replace and save the account sequence in one step. `based_on` is the
    /// [`generation`](Self::generation) the copy was taken at. If the write
    /// fails the previous sequence is put back.
    pub fn commit_accounts(&mut self, edited: Vec<AccountEntry>, based_on: u64) -> Result<()> {
        self.ensure_current(based_on)?;
        let previous = self.accounts.clone();
        self.accounts.replace(edited)?;
        let res = self.save_accounts();
        if res.is_err() {
            self.accounts = previous;
        }
        res
    }

    pub fn commit_groups(&mut self, edited: Vec<GroupEntry>, based_on: u64) -> Result<()> {
        self.ensure_current(based_on)?;
        let previous = self.groups.clone();
        self.groups.replace(edited)?;
        let res = self.save_groups();
        if res.is_err() {
            self.groups = previous;
        }
        res
    }

    fn ensure_current(&self, based_on: u64) -> Result<()> {
        if based_on != self.generation {
            return Err(Error::StaleDraft {
                based_on,
                current: self.generation,
            });
        }
        Ok(())
    }

    fn lock(&self) -> Result<Option<DirectoryLock>> {
        self.paths
            .lock
            .as_deref()
            .map(DirectoryLock::acquire)
            .transpose()
    }
}

/// Fails with [`Error::Modified`] when `path` no longer holds `expected`.
/// Called with the lock held.
fn ensure_unchanged(path: &Path, expected: &str) -> Result<()> {
    let current = dirfile::read_contents(path)?;
    if current != expected {
        warn!(path = %path.display(), "file changed since it was loaded");
        return Err(Error::Modified {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Returns the text written, which becomes the new on-disk baseline.
fn write<T: Record>(path: &Path, file: &DirectoryFile<T>) -> Result<String> {
    let contents = file.serialize();
    dirfile::write_atomic(path, &contents)?;
    info!(path = %path.display(), records = file.entries().len(), "saved {} file", T::KIND);
    Ok(contents)
}
