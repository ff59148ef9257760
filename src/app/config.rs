//! Settings: parse/write `usrgrp-editor.conf` and locate config files.
//!
//! The file uses `key = value` lines; `#` starts a comment. Unknown keys are
//! ignored so older files keep working. Command line flags are applied on top
//! by the binary.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::sys::{CommentPolicy, DirectoryPaths, Platform};
use crate::sys::model::default_lock_path;

pub const SETTINGS_FILE: &str = "usrgrp-editor.conf";
pub const KEYBINDS_FILE: &str = "keybinds.conf";
pub const LOG_FILE: &str = "usrgrp-editor.log";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub passwd_path: PathBuf,
    pub group_path: PathBuf,
    /// Lock file override; defaults to `.pwd.lock` beside `passwd_path`.
    pub lock_path: Option<PathBuf>,
    pub lock: bool,
    pub comments: CommentPolicy,
    /// OS family override, e.g. `debian` or `freebsd`.
    pub platform: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            passwd_path: PathBuf::from("/etc/passwd"),
            group_path: PathBuf::from("/etc/group"),
            lock_path: None,
            lock: true,
            comments: CommentPolicy::Preserve,
            platform: None,
            log_file: None,
        }
    }
}

impl Settings {
    /// Read settings from `path`, or write a commented default file there and
    /// return the defaults.
    /// Read the settings file, or write the defaults there if it does not
    /// exist yet. Failures fall back to the defaults with a warning.
    pub fn load_or_init(path: &Path) -> Self {
        if path.exists() {
            return Self::from_file(path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "cannot read settings, using defaults");
                Self::default()
            });
        }
        let s = Self::default();
        if let Some(dir) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                warn!(dir = %dir.display(), error = %e, "cannot create config directory");
            }
        }
        if let Err(e) = s.write_file(path) {
            warn!(path = %path.display(), error = %e, "cannot write default settings");
        }
        s
    }

    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        let mut s = Self::default();
        for raw in contents.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "passwd" if !value.is_empty() => s.passwd_path = PathBuf::from(value),
                "group" if !value.is_empty() => s.group_path = PathBuf::from(value),
                "lock_file" => s.lock_path = non_empty(value).map(PathBuf::from),
                "lock" => s.lock = parse_bool(value),
                "comments" => s.comments = CommentPolicy::parse(value).unwrap_or(s.comments),
                "platform" => s.platform = non_empty(value).map(str::to_string),
                "log_file" => s.log_file = non_empty(value).map(PathBuf::from),
                _ => {}
            }
        }
        s
    }

    pub fn write_file(&self, path: &Path) -> std::io::Result<()> {
        use std::fmt::Write as _;
        let mut buf = String::new();
        buf.push_str("# usrgrp-editor settings\n");
        buf.push_str("# Format: <key> = <value>\n\n");
        let _ = writeln!(buf, "passwd = {}", self.passwd_path.display());
        let _ = writeln!(buf, "group = {}", self.group_path.display());
        buf.push_str("# Empty lock_file means .pwd.lock next to the passwd file\n");
        let _ = writeln!(buf, "lock_file = {}", display_opt(self.lock_path.as_deref()));
        let _ = writeln!(buf, "lock = {}", self.lock);
        buf.push_str("# Blank and comment lines in the directory files: preserve|drop\n");
        let _ = writeln!(buf, "comments = {}", self.comments.as_str());
        buf.push_str("# Empty platform means detect from /etc/os-release\n");
        let _ = writeln!(buf, "platform = {}", self.platform.as_deref().unwrap_or(""));
        let _ = writeln!(buf, "log_file = {}", display_opt(self.log_file.as_deref()));
        std::fs::write(path, buf)
    }

    pub fn directory_paths(&self) -> DirectoryPaths {
        let lock = self.lock.then(|| {
            self.lock_path
                .clone()
                .unwrap_or_else(|| default_lock_path(&self.passwd_path))
        });
        DirectoryPaths {
            accounts: self.passwd_path.clone(),
            groups: self.group_path.clone(),
            lock,
        }
    }

    /// The configured platform, or the detected one.
    pub fn platform(&self) -> Platform {
        match &self.platform {
            Some(id) => Platform::named(id),
            None => Platform::detect(),
        }
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| config_dir().join(LOG_FILE))
    }
}

/// `$XDG_CONFIG_HOME/usrgrp-editor`, falling back to `~/.config/usrgrp-editor`
/// and finally the working directory.
pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg).join("usrgrp-editor");
    }
    if let Some(home) = std::env::var_os("HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(home).join(".config").join("usrgrp-editor");
    }
    PathBuf::from(".")
}

pub fn config_file_path(name: &str) -> PathBuf {
    config_dir().join(name)
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}

fn display_opt(p: Option<&Path>) -> String {
    p.map(|p| p.display().to_string()).unwrap_or_default()
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
