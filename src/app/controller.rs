//! Orchestrates load, edit and save cycles and turns user actions into model
//! edits and backend commands.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::app::config::Settings;
use crate::error::{Error, Result};
use crate::sys::{
    AccountEntry, CommandRunner, DirectoryModel, GroupEntry, Platform, PlatformBackend,
    SystemRunner, select_backend,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(err: &Error) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: format!("[{}] {}", err.kind(), err),
        }
    }
}

/// Receives user-facing notifications.
pub trait Notifier {
    fn notify(&mut self, notice: Notice);
}

/// Shared queue of notices; clones see the same queue.
#[derive(Clone, Debug, Default)]
pub struct NoticeQueue(Rc<RefCell<VecDeque<Notice>>>);

impl NoticeQueue {
    pub fn drain(&self) -> Vec<Notice> {
        self.0.borrow_mut().drain(..).collect()
    }
}

impl Notifier for NoticeQueue {
    fn notify(&mut self, notice: Notice) {
        self.0.borrow_mut().push_back(notice);
    }
}

/// Writes notices to the log only.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!("{}", notice.message),
            NoticeLevel::Error => error!("{}", notice.message),
        }
    }
}

pub struct Controller {
    model: DirectoryModel,
    backend: Box<dyn PlatformBackend>,
    notifier: Box<dyn Notifier>,
}

impl Controller {
    pub fn new(
        model: DirectoryModel,
        backend: Box<dyn PlatformBackend>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            model,
            backend,
            notifier,
        }
    }

    /// Select the backend first, so an unsupported host fails before any
    /// file is read, then load the model.
    pub fn from_settings(settings: &Settings, notifier: Box<dyn Notifier>) -> Result<Self> {
        Self::with_runner(settings, &settings.platform(), Arc::new(SystemRunner), notifier)
    }

    pub fn with_runner(
        settings: &Settings,
        platform: &Platform,
        runner: Arc<dyn CommandRunner>,
        notifier: Box<dyn Notifier>,
    ) -> Result<Self> {
        let backend = select_backend(platform, runner)?;
        let model = DirectoryModel::open(settings.directory_paths(), settings.comments)?;
        info!(platform = %platform, backend = backend.name(), "controller ready");
        Ok(Self::new(model, backend, notifier))
    }

    pub fn model(&self) -> &DirectoryModel {
        &self.model
    }

    pub fn backend(&self) -> &dyn PlatformBackend {
        self.backend.as_ref()
    }

    pub fn reload(&mut self) -> Result<()> {
        let res = self.model.load();
        self.report(res)
    }

    /// Create the account through the backend, then reload so the OS-assigned
    /// uid, gid and home show up. The reload happens even when the command
    /// failed.
    pub fn add_user(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        let res = require_name(name, "user name").and_then(|_| self.backend.add_user(name));
        let res = self.after_command(res);
        self.report(res)?;
        self.notifier.notify(Notice::info(format!("User {name} was created")));
        Ok(())
    }

    pub fn add_group(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        let res = require_name(name, "group name").and_then(|_| self.backend.add_group(name));
        let res = self.after_command(res);
        self.report(res)?;
        self.notifier.notify(Notice::info(format!("Group {name} was created")));
        Ok(())
    }

    /// Commit an edited copy of the accounts and write the account file.
    /// `based_on` is the model generation the copy was taken at; a copy from
    /// before the last reload is refused.
    pub fn save_accounts(&mut self, edited: Vec<AccountEntry>, based_on: u64) -> Result<()> {
        let res = self.model.commit_accounts(edited, based_on);
        self.report(res)?;
        self.notifier.notify(Notice::info("Accounts saved"));
        Ok(())
    }

    pub fn save_groups(&mut self, edited: Vec<GroupEntry>, based_on: u64) -> Result<()> {
        let res = self.model.commit_groups(edited, based_on);
        self.report(res)?;
        self.notifier.notify(Notice::info("Groups saved"));
        Ok(())
    }

    pub fn home_dir_missing(&self, account: &AccountEntry) -> bool {
        !Path::new(&account.home).exists()
    }

    /// Create the named account's home directory, then reload.
    pub fn create_home_dir(&mut self, name: &str) -> Result<()> {
        let account = match self.model.account(name) {
            Some(a) => a.clone(),
            None => {
                let err = Error::Invalid(format!("no account named '{name}'"));
                return self.report(Err(err));
            }
        };
        let res = self.backend.make_home_dir(&account);
        let res = self.after_command(res);
        self.report(res)?;
        self.notifier
            .notify(Notice::info(format!("Home dir for {} was created", account.name)));
        Ok(())
    }

    /// Reload after an OS command. A command error wins over a reload error.
    fn after_command(&mut self, res: Result<()>) -> Result<()> {
        let reloaded = self.model.load();
        match (res, reloaded) {
            (Err(e), Err(reload)) => {
                warn!(error = %reload, "reload after failed command also failed");
                Err(e)
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    fn report<T>(&mut self, res: Result<T>) -> Result<T> {
        if let Err(e) = &res {
            self.notifier.notify(Notice::error(e));
        }
        res
    }
}

/// Names go to account commands as arguments, so a leading `-` is refused
/// along with anything that cannot live in a directory file field.
fn require_name(name: &str, what: &str) -> Result<()> {
    if name.is_empty()
        || name.starts_with('-')
        || name.contains(':')
        || name.contains(char::is_whitespace)
    {
        return Err(Error::Invalid(format!("invalid {what} '{name}'")));
    }
    Ok(())
}
