//! Shared UI components: status bar, modal dialogs and layout helpers.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::app::controller::NoticeLevel;
use crate::app::keymap::KeyAction;
use crate::app::{AccountField, AppState, ModalState};

/// Bottom line: the last notice if there is one, otherwise key hints.
pub fn render_status_bar(f: &mut Frame, area: Rect, app: &AppState) {
    let base = Style::default().fg(app.theme.status_fg).bg(app.theme.status_bg);
    let mut spans = Vec::new();
    if app.has_unsaved_edits() {
        spans.push(Span::styled(
            "[unsaved] ",
            base.fg(app.theme.dirty).add_modifier(Modifier::BOLD),
        ));
    }
    match &app.status {
        Some(n) if n.level == NoticeLevel::Error => {
            spans.push(Span::styled(n.message.clone(), base.fg(app.theme.error)));
        }
        Some(n) => spans.push(Span::styled(n.message.clone(), base)),
        None => spans.push(Span::styled(hints(app), base)),
    }
    f.render_widget(Paragraph::new(Line::from(spans)).style(base), area);
}

fn hints(app: &AppState) -> String {
    let key = |a: KeyAction| {
        app.keymap
            .keys_for(a)
            .into_iter()
            .next()
            .unwrap_or_else(|| "-".to_string())
    };
    let mut parts = vec![
        format!("{}: tab", key(KeyAction::SwitchTab)),
        format!("{}: new", key(KeyAction::NewEntry)),
        format!("{}: edit", key(KeyAction::EditEntry)),
        format!("{}: save", key(KeyAction::Save)),
        format!("{}: reload", key(KeyAction::Reload)),
    ];
    if app.can_create_home() {
        parts.push(format!("{}: create home", key(KeyAction::CreateHomeDir)));
    }
    parts.push(format!("{}: quit", key(KeyAction::Quit)));
    parts.join("  ")
}

pub fn render_modal(f: &mut Frame, area: Rect, app: &AppState, state: &ModalState) {
    match state {
        ModalState::NewEntry { name } => {
            let what = if app.active_tab.shows_accounts() { "user" } else { "group" };
            render_input(f, area, app, &format!("New {what}"), "Name:", name);
        }
        ModalState::FieldPicker { selected } => {
            let rect = centered_rect(34, AccountField::ALL.len() as u16 + 2, area);
            let mut text = String::new();
            for (idx, field) in AccountField::ALL.iter().enumerate() {
                let marker = if idx == *selected { "▶ " } else { "  " };
                text.push_str(marker);
                text.push_str(field.label());
                text.push('\n');
            }
            let p = Paragraph::new(text).block(
                Block::default()
                    .title("Edit field")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(app.theme.border)),
            );
            f.render_widget(Clear, rect);
            f.render_widget(p, rect);
        }
        ModalState::EditAccountField { field, value } => {
            render_input(f, area, app, "Edit", &format!("{}:", field.label()), value);
        }
        ModalState::EditMembers { value } => {
            render_input(f, area, app, "Members (comma separated)", "Members:", value);
        }
    }
}

fn render_input(f: &mut Frame, area: Rect, app: &AppState, title: &str, label: &str, value: &str) {
    let rect = centered_rect(60, 5, area);
    let lines = vec![
        Line::from(vec![
            Span::raw(format!("{label} ")),
            Span::styled(format!("{value}_"), Style::default().fg(app.theme.highlight_bg)),
        ]),
        Line::from(Span::styled(
            "Enter: apply  Esc: cancel",
            Style::default().fg(app.theme.muted),
        )),
    ];
    let p = Paragraph::new(lines).block(
        Block::default()
            .title(title.to_string())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    );
    f.render_widget(Clear, rect);
    f.render_widget(p, rect);
}

/// Rect of at most `width` x `height` centered in `area`.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}
