//! Application state types and entry glue.
//!
//! The TUI works on draft copies of the account and group sequences. Field
//! edits only touch the drafts; saving hands a whole draft to the
//! [`controller::Controller`], and reloading throws the drafts away.

pub mod config;
pub mod controller;
pub mod keymap;
pub mod update;

use ratatui::style::Color;

use crate::app::controller::{Controller, Notice, NoticeQueue};
use crate::app::keymap::Keymap;
use crate::sys::{AccountEntry, GroupEntry};

/// Top-level active tab in the UI.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ActiveTab {
    Users,
    SystemUsers,
    Groups,
}

impl ActiveTab {
    pub fn next(self) -> Self {
        match self {
            ActiveTab::Users => ActiveTab::SystemUsers,
            ActiveTab::SystemUsers => ActiveTab::Groups,
            ActiveTab::Groups => ActiveTab::Users,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ActiveTab::Users => "Users",
            ActiveTab::SystemUsers => "System users",
            ActiveTab::Groups => "Groups",
        }
    }

    pub fn shows_accounts(self) -> bool {
        !matches!(self, ActiveTab::Groups)
    }
}

/// Current input mode for key handling.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Modal,
}

/// Editable fields of an account row.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AccountField {
    FullName,
    Home,
    Shell,
}

impl AccountField {
    pub const ALL: [AccountField; 3] = [AccountField::FullName, AccountField::Home, AccountField::Shell];

    pub fn label(self) -> &'static str {
        match self {
            AccountField::FullName => "Full name",
            AccountField::Home => "Home directory",
            AccountField::Shell => "Shell",
        }
    }

    pub fn get(self, account: &AccountEntry) -> &str {
        match self {
            AccountField::FullName => &account.comment,
            AccountField::Home => &account.home,
            AccountField::Shell => &account.shell,
        }
    }

    pub fn set(self, account: &mut AccountEntry, value: String) {
        match self {
            AccountField::FullName => account.comment = value,
            AccountField::Home => account.home = value,
            AccountField::Shell => account.shell = value,
        }
    }
}

/// Modal dialog states.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModalState {
    /// Name prompt for a new user (account tabs) or group (groups tab).
    NewEntry { name: String },
    /// Pick which account field to edit.
    FieldPicker { selected: usize },
    EditAccountField { field: AccountField, value: String },
    /// Comma separated member list of the selected group.
    EditMembers { value: String },
}

/// Color palette for the TUI.
#[derive(Clone, Copy, Debug)]
pub struct Theme {
    pub text: Color,
    pub muted: Color,
    pub title: Color,
    pub border: Color,
    pub header_bg: Color,
    pub header_fg: Color,
    pub status_bg: Color,
    pub status_fg: Color,
    pub highlight_fg: Color,
    pub highlight_bg: Color,
    pub error: Color,
    pub dirty: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            text: Color::Gray,
            muted: Color::DarkGray,
            title: Color::LightBlue,
            border: Color::DarkGray,
            header_bg: Color::Reset,
            header_fg: Color::LightBlue,
            status_bg: Color::DarkGray,
            status_fg: Color::White,
            highlight_fg: Color::Black,
            highlight_bg: Color::LightYellow,
            error: Color::LightRed,
            dirty: Color::Yellow,
        }
    }
}

pub struct AppState {
    pub controller: Controller,
    pub notices: NoticeQueue,
    pub keymap: Keymap,
    pub theme: Theme,
    pub active_tab: ActiveTab,
    pub selected_user_index: usize,
    pub selected_system_index: usize,
    pub selected_group_index: usize,
    pub rows_per_page: usize,
    pub input_mode: InputMode,
    pub modal: Option<ModalState>,
    pub account_draft: Vec<AccountEntry>,
    pub group_draft: Vec<GroupEntry>,
    pub accounts_dirty: bool,
    pub groups_dirty: bool,
    /// Model generation both drafts were copied from.
    pub draft_generation: u64,
    /// Most recent notice, shown in the status bar.
    pub status: Option<Notice>,
}

impl AppState {
    /// `notices` must be the queue the controller was built with.
    pub fn new(controller: Controller, notices: NoticeQueue, keymap: Keymap) -> Self {
        let mut app = Self {
            controller,
            notices,
            keymap,
            theme: Theme::default(),
            active_tab: ActiveTab::Users,
            selected_user_index: 0,
            selected_system_index: 0,
            selected_group_index: 0,
            rows_per_page: 10,
            input_mode: InputMode::Normal,
            modal: None,
            account_draft: Vec::new(),
            group_draft: Vec::new(),
            accounts_dirty: false,
            groups_dirty: false,
            draft_generation: 0,
            status: None,
        };
        app.reset_drafts();
        app
    }

    /// Replace both drafts with the model's current sequences.
    pub fn reset_drafts(&mut self) {
        self.account_draft = self.controller.model().accounts().to_vec();
        self.group_draft = self.controller.model().groups().to_vec();
        self.accounts_dirty = false;
        self.groups_dirty = false;
        self.draft_generation = self.controller.model().generation();
        self.clamp_selection();
    }

    /// Whether either draft holds edits that are not on disk yet.
    pub fn has_unsaved_edits(&self) -> bool {
        self.accounts_dirty || self.groups_dirty
    }

    /// Move queued notices into the status line; the last one wins.
    pub fn pull_notices(&mut self) {
        if let Some(last) = self.notices.drain().pop() {
            self.status = Some(last);
        }
    }

    /// Draft indices of the accounts shown on the current account tab.
    pub fn visible_accounts(&self) -> Vec<usize> {
        let system = self.active_tab == ActiveTab::SystemUsers;
        self.account_draft
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_system() == system)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn selected_index(&self) -> usize {
        match self.active_tab {
            ActiveTab::Users => self.selected_user_index,
            ActiveTab::SystemUsers => self.selected_system_index,
            ActiveTab::Groups => self.selected_group_index,
        }
    }

    pub fn selected_index_mut(&mut self) -> &mut usize {
        match self.active_tab {
            ActiveTab::Users => &mut self.selected_user_index,
            ActiveTab::SystemUsers => &mut self.selected_system_index,
            ActiveTab::Groups => &mut self.selected_group_index,
        }
    }

    /// Number of rows on the current tab.
    pub fn row_count(&self) -> usize {
        if self.active_tab.shows_accounts() {
            self.visible_accounts().len()
        } else {
            self.group_draft.len()
        }
    }

    /// Draft index of the selected account, if an account tab is active.
    pub fn selected_account_slot(&self) -> Option<usize> {
        if !self.active_tab.shows_accounts() {
            return None;
        }
        self.visible_accounts().get(self.selected_index()).copied()
    }

    pub fn selected_account(&self) -> Option<&AccountEntry> {
        self.selected_account_slot().map(|i| &self.account_draft[i])
    }

    pub fn selected_group(&self) -> Option<&GroupEntry> {
        if self.active_tab != ActiveTab::Groups {
            return None;
        }
        self.group_draft.get(self.selected_group_index)
    }

    /// Groups the account belongs to, by primary gid or supplementary membership.
    pub fn groups_of(&self, account: &AccountEntry) -> Vec<&GroupEntry> {
        self.group_draft
            .iter()
            .filter(|g| g.gid == account.gid || g.has_member(&account.name))
            .collect()
    }

    /// Whether "create home directory" is offered for the selected account.
    /// Hidden once the directory exists, and while any draft has edits, since
    /// the reload that follows the command replaces both drafts.
    pub fn can_create_home(&self) -> bool {
        match self.selected_account() {
            Some(a) => !self.has_unsaved_edits() && self.controller.home_dir_missing(a),
            None => false,
        }
    }

    pub fn clamp_selection(&mut self) {
        let tab = self.active_tab;
        for t in [ActiveTab::Users, ActiveTab::SystemUsers, ActiveTab::Groups] {
            self.active_tab = t;
            let len = self.row_count();
            let idx = self.selected_index_mut();
            *idx = (*idx).min(len.saturating_sub(1));
        }
        self.active_tab = tab;
    }
}

/// Re-export the application event loop entry function.
pub use update::run_app as run;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::app::config::Settings;
    use crate::sys::Platform;
    use crate::sys::backend::testing::RecordingRunner;
    use std::sync::Arc;

    pub(crate) struct TestApp {
        pub _dir: tempfile::TempDir,
        pub runner: Arc<RecordingRunner>,
        pub app: AppState,
    }

    pub(crate) fn test_app(passwd: &str, group: &str) -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            passwd_path: dir.path().join("passwd"),
            group_path: dir.path().join("group"),
            ..Settings::default()
        };
        std::fs::write(&settings.passwd_path, passwd).unwrap();
        std::fs::write(&settings.group_path, group).unwrap();
        let runner = Arc::new(RecordingRunner::default());
        let notices = NoticeQueue::default();
        let controller = Controller::with_runner(
            &settings,
            &Platform::named("debian"),
            runner.clone(),
            Box::new(notices.clone()),
        )
        .unwrap();
        TestApp {
            _dir: dir,
            runner,
            app: AppState::new(controller, notices, Keymap::default()),
        }
    }

    const PASSWD: &str = "root:x:0:0:root:/root:/bin/bash\n\
                          alice:x:1000:1000:Alice:/home/alice:/bin/bash\n\
                          daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin\n\
                          bob:x:1001:1001::/home/bob:/bin/sh\n";
    const GROUP: &str = "root:x:0:\nalice:x:1000:\nwheel:x:10:alice,bob\n";

    #[test]
    fn tabs_partition_accounts() {
        let mut t = test_app(PASSWD, GROUP);
        let names = |app: &AppState| -> Vec<String> {
            app.visible_accounts()
                .into_iter()
                .map(|i| app.account_draft[i].name.clone())
                .collect()
        };
        assert_eq!(names(&t.app), ["alice", "bob"]);
        t.app.active_tab = ActiveTab::SystemUsers;
        assert_eq!(names(&t.app), ["root", "daemon"]);
        t.app.active_tab = ActiveTab::Groups;
        assert!(t.app.selected_account().is_none());
        assert_eq!(t.app.selected_group().map(|g| g.name.as_str()), Some("root"));
    }

    #[test]
    fn groups_of_uses_primary_and_members() {
        let t = test_app(PASSWD, GROUP);
        let alice = t.app.selected_account().unwrap();
        let names: Vec<_> = t.app.groups_of(alice).iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["alice", "wheel"]);
    }

    #[test]
    fn home_action_hidden_when_dir_exists_or_draft_dirty() {
        let homes = tempfile::tempdir().unwrap();
        let home = homes.path().join("alice");
        let passwd = format!("alice:x:1000:1000::{}:/bin/sh\n", home.display());
        let mut t = test_app(&passwd, GROUP);
        assert!(t.app.can_create_home());
        t.app.accounts_dirty = true;
        assert!(!t.app.can_create_home());
        t.app.accounts_dirty = false;
        t.app.groups_dirty = true;
        assert!(!t.app.can_create_home());
        t.app.groups_dirty = false;
        assert!(t.app.can_create_home());
        std::fs::create_dir_all(&home).unwrap();
        assert!(!t.app.can_create_home());
    }
}
