//! Rendering. Nothing here mutates the drafts; only `rows_per_page` is
//! updated from the table height.

pub mod components;
pub mod groups;
pub mod users;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::{ActiveTab, AppState};

pub fn render(f: &mut Frame, app: &mut AppState) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5), Constraint::Length(1)])
        .split(f.area());
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(root[1]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(4)])
        .split(body[1]);

    render_header(f, root[0], app);

    match app.active_tab {
        ActiveTab::Users | ActiveTab::SystemUsers => {
            users::render_users_table(f, body[0], app);
            users::render_user_details(f, right[0], app);
            users::render_user_groups(f, right[1], app);
        }
        ActiveTab::Groups => {
            groups::render_groups_table(f, body[0], app);
            groups::render_group_details(f, right[0], app);
            groups::render_group_members(f, right[1], app);
        }
    }

    components::render_status_bar(f, root[2], app);

    if let Some(modal) = app.modal.clone() {
        let area = f.area();
        components::render_modal(f, area, app, &modal);
    }
}

fn render_header(f: &mut Frame, area: ratatui::layout::Rect, app: &AppState) {
    let who = crate::sys::current_username().unwrap_or_else(|| "unknown".to_string());
    let mut spans = vec![Span::raw(format!(
        "{} as {who}  ",
        app.controller.backend().name()
    ))];
    for tab in [ActiveTab::Users, ActiveTab::SystemUsers, ActiveTab::Groups] {
        let style = if tab == app.active_tab {
            Style::default()
                .fg(app.theme.title)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(app.theme.muted)
        };
        spans.push(Span::styled(tab.title(), style));
        spans.push(Span::raw("  "));
    }
    let p = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .title("usrgrp-editor")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .style(Style::default().fg(app.theme.header_fg).bg(app.theme.header_bg));
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ModalState;
    use crate::app::tests::test_app;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn screen(app: &mut AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn renders_each_tab() {
        let mut t = test_app(
            "root:x:0:0:root:/root:/bin/bash\nalice:x:1000:1000:Alice:/home/alice:/bin/bash\n",
            "root:x:0:\nstaff:x:50:alice,ghost\n",
        );
        let users = screen(&mut t.app);
        assert!(users.contains("alice"));
        assert!(!users.contains("/root"));

        t.app.active_tab = ActiveTab::SystemUsers;
        assert!(screen(&mut t.app).contains("/root"));

        t.app.active_tab = ActiveTab::Groups;
        t.app.selected_group_index = 1;
        let groups = screen(&mut t.app);
        assert!(groups.contains("staff"));
        assert!(groups.contains("ghost"));
    }

    #[test]
    fn unsaved_marker_and_modal_render() {
        let mut t = test_app("alice:x:1000:1000::/home/alice:/bin/sh\n", "alice:x:1000:\n");
        t.app.accounts_dirty = true;
        t.app.modal = Some(ModalState::NewEntry { name: "dave".into() });
        let out = screen(&mut t.app);
        assert!(out.contains("[unsaved]"));
        assert!(out.contains("New user"));
        assert!(out.contains("dave_"));
    }
}
