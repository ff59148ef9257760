//! Event loop and key handling.
//!
//! Keys resolve through the [`Keymap`](crate::app::keymap::Keymap) in normal
//! mode; modals take raw keys. Every action that reaches the controller is
//! followed by pulling its notices into the status line.

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Terminal;
use ratatui::backend::Backend;
use tracing::debug;

use crate::app::controller::Notice;
use crate::app::keymap::KeyAction;
use crate::app::{AccountField, ActiveTab, AppState, InputMode, ModalState};
use crate::sys::entry::parse_member_list;
use crate::ui;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut AppState) -> Result<()> {
    loop {
        terminal.draw(|f| ui::render(f, app))?;

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handle_key(app, key) == Flow::Quit {
                    break;
                }
            }
        }
    }
    Ok(())
}

pub fn handle_key(app: &mut AppState, key: KeyEvent) -> Flow {
    let flow = match app.input_mode {
        InputMode::Normal => match app.keymap.resolve(&key) {
            Some(action) => handle_action(app, action),
            None => Flow::Continue,
        },
        InputMode::Modal => {
            handle_modal_key(app, key);
            Flow::Continue
        }
    };
    app.pull_notices();
    flow
}

fn handle_action(app: &mut AppState, action: KeyAction) -> Flow {
    debug!(?action, tab = app.active_tab.title(), "key action");
    match action {
        KeyAction::Quit => return Flow::Quit,
        KeyAction::Ignore => {}
        KeyAction::SwitchTab => {
            app.active_tab = app.active_tab.next();
            app.clamp_selection();
        }
        KeyAction::MoveUp => move_selection(app, -1),
        KeyAction::MoveDown => move_selection(app, 1),
        KeyAction::PageUp => move_selection(app, -(app.rows_per_page.max(1) as isize)),
        KeyAction::PageDown => move_selection(app, app.rows_per_page.max(1) as isize),
        KeyAction::NewEntry => {
            // The reload after the command replaces both drafts.
            if app.has_unsaved_edits() {
                set_info(app, "Save or reload the pending edits first");
            } else {
                open_modal(app, ModalState::NewEntry { name: String::new() });
            }
        }
        KeyAction::EditEntry => {
            if app.selected_account().is_some() {
                open_modal(app, ModalState::FieldPicker { selected: 0 });
            } else if let Some(g) = app.selected_group() {
                let value = g.members.join(",");
                open_modal(app, ModalState::EditMembers { value });
            }
        }
        KeyAction::Save => save_current(app),
        KeyAction::CreateHomeDir => {
            if app.has_unsaved_edits() {
                set_info(app, "Save or reload the pending edits first");
            } else {
                create_home(app);
            }
        }
        KeyAction::Reload => {
            if app.controller.reload().is_ok() {
                app.reset_drafts();
                set_info(app, "Reloaded from disk");
            }
        }
    }
    Flow::Continue
}

fn handle_modal_key(app: &mut AppState, key: KeyEvent) {
    let Some(modal) = app.modal.as_mut() else {
        close_modal(app);
        return;
    };
    match modal {
        ModalState::FieldPicker { selected } => match key.code {
            KeyCode::Esc => close_modal(app),
            KeyCode::Up | KeyCode::Char('k') => *selected = selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                *selected = (*selected + 1).min(AccountField::ALL.len() - 1)
            }
            KeyCode::Enter => {
                let field = AccountField::ALL[*selected];
                let value = app
                    .selected_account()
                    .map(|a| field.get(a).to_string())
                    .unwrap_or_default();
                app.modal = Some(ModalState::EditAccountField { field, value });
            }
            _ => {}
        },
        ModalState::NewEntry { name: value }
        | ModalState::EditAccountField { value, .. }
        | ModalState::EditMembers { value } => match key.code {
            KeyCode::Esc => close_modal(app),
            KeyCode::Enter => {
                if let Some(state) = app.modal.take() {
                    close_modal(app);
                    submit(app, state);
                }
            }
            KeyCode::Backspace => {
                value.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => value.push(c),
            _ => {}
        },
    }
}

fn submit(app: &mut AppState, state: ModalState) {
    match state {
        ModalState::NewEntry { name } => {
            let name = name.trim().to_string();
            if app.active_tab.shows_accounts() {
                let ok = app.controller.add_user(&name).is_ok();
                app.reset_drafts();
                if ok {
                    select_account(app, &name);
                }
            } else {
                let ok = app.controller.add_group(&name).is_ok();
                app.reset_drafts();
                if ok {
                    if let Some(i) = app.group_draft.iter().position(|g| g.name == name) {
                        app.selected_group_index = i;
                    }
                }
            }
        }
        ModalState::EditAccountField { field, value } => {
            if let Some(slot) = app.selected_account_slot() {
                let account = &mut app.account_draft[slot];
                if field.get(account) != value {
                    field.set(account, value);
                    app.accounts_dirty = true;
                }
            }
        }
        ModalState::EditMembers { value } => {
            let idx = app.selected_group_index;
            if let Some(group) = app.group_draft.get_mut(idx) {
                let members = parse_member_list(&value);
                if group.members != members {
                    group.members = members;
                    app.groups_dirty = true;
                }
            }
        }
        ModalState::FieldPicker { .. } => {}
    }
}

fn save_current(app: &mut AppState) {
    if app.active_tab.shows_accounts() {
        if !app.accounts_dirty {
            set_info(app, "No account changes to save");
            return;
        }
        let draft = app.account_draft.clone();
        if app.controller.save_accounts(draft, app.draft_generation).is_ok() {
            refresh_accounts(app);
        }
    } else {
        if !app.groups_dirty {
            set_info(app, "No group changes to save");
            return;
        }
        let draft = app.group_draft.clone();
        if app.controller.save_groups(draft, app.draft_generation).is_ok() {
            refresh_groups(app);
        }
    }
}

fn create_home(app: &mut AppState) {
    if !app.can_create_home() {
        return;
    }
    let Some(name) = app.selected_account().map(|a| a.name.clone()) else {
        return;
    };
    // The reload happens inside the controller either way.
    let _ = app.controller.create_home_dir(&name);
    app.reset_drafts();
    select_account(app, &name);
}

/// Take a fresh copy of the accounts after saving them. Saving does not
/// reload, so the group draft and its generation stay valid.
fn refresh_accounts(app: &mut AppState) {
    app.account_draft = app.controller.model().accounts().to_vec();
    app.accounts_dirty = false;
    app.clamp_selection();
}

fn refresh_groups(app: &mut AppState) {
    app.group_draft = app.controller.model().groups().to_vec();
    app.groups_dirty = false;
    app.clamp_selection();
}

/// Switch to the tab that lists `name` and select it.
fn select_account(app: &mut AppState, name: &str) {
    let Some(account) = app.account_draft.iter().find(|a| a.name == name) else {
        return;
    };
    app.active_tab = if account.is_system() {
        ActiveTab::SystemUsers
    } else {
        ActiveTab::Users
    };
    if let Some(pos) = app
        .visible_accounts()
        .iter()
        .position(|&i| app.account_draft[i].name == name)
    {
        *app.selected_index_mut() = pos;
    }
}

fn move_selection(app: &mut AppState, delta: isize) {
    let len = app.row_count();
    let idx = app.selected_index_mut();
    *idx = idx.saturating_add_signed(delta).min(len.saturating_sub(1));
}

fn set_info(app: &mut AppState, message: &str) {
    app.status = Some(Notice::info(message));
}

fn open_modal(app: &mut AppState, modal: ModalState) {
    app.modal = Some(modal);
    app.input_mode = InputMode::Modal;
}

fn close_modal(app: &mut AppState) {
    app.modal = None;
    app.input_mode = InputMode::Normal;
}
