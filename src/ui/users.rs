use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};

use crate::app::AppState;

pub fn render_users_table(f: &mut Frame, area: Rect, app: &mut AppState) {
    let body_height = area.height.saturating_sub(3) as usize;
    if body_height > 0 {
        app.rows_per_page = body_height;
    }

    let visible = app.visible_accounts();
    let selected = app.selected_index();
    let start = (selected / app.rows_per_page) * app.rows_per_page;
    let end = (start + app.rows_per_page).min(visible.len());

    let rows = visible[start..end].iter().enumerate().map(|(i, &slot)| {
        let u = &app.account_draft[slot];
        let style = if start + i == selected {
            Style::default()
                .fg(app.theme.highlight_fg)
                .bg(app.theme.highlight_bg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(app.theme.text)
        };
        Row::new(vec![
            Cell::from(u.uid.to_string()),
            Cell::from(u.name.clone()),
            Cell::from(u.gid.to_string()),
            Cell::from(u.home.clone()),
            Cell::from(u.shell.clone()),
        ])
        .style(style)
    });

    let widths = [
        Constraint::Length(7),
        Constraint::Length(18),
        Constraint::Length(7),
        Constraint::Percentage(45),
        Constraint::Percentage(35),
    ];
    let header = Row::new(vec!["UID", "USER", "GID", "HOME", "SHELL"])
        .style(Style::default().fg(app.theme.title).add_modifier(Modifier::BOLD));

    let mut title = format!("{} ({})", app.active_tab.title(), visible.len());
    if app.accounts_dirty {
        title.push_str(" *");
    }
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .column_spacing(1);
    f.render_widget(table, area);
}

pub fn render_user_details(f: &mut Frame, area: Rect, app: &AppState) {
    let text = match app.selected_account() {
        Some(u) => {
            let home_note = if app.can_create_home() {
                "  (missing)"
            } else {
                ""
            };
            format!(
                "Username: {}\nFull name: {}\nUID: {}\nGID: {}\nHome directory: {}{home_note}\nShell: {}\nPassword field: {}",
                u.name, u.comment, u.uid, u.gid, u.home, u.shell, u.password
            )
        }
        None => "No account selected".to_string(),
    };
    let p = Paragraph::new(text).style(Style::default().fg(app.theme.text)).block(
        Block::default()
            .title("Details")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    );
    f.render_widget(p, area);
}

pub fn render_user_groups(f: &mut Frame, area: Rect, app: &AppState) {
    let groups = app
        .selected_account()
        .map(|u| app.groups_of(u))
        .unwrap_or_default();

    let rows = groups.iter().map(|g| {
        Row::new(vec![Cell::from(g.gid.to_string()), Cell::from(g.name.clone())])
            .style(Style::default().fg(app.theme.text))
    });
    let widths = [Constraint::Length(8), Constraint::Percentage(100)];
    let header = Row::new(vec!["GID", "NAME"])
        .style(Style::default().fg(app.theme.title).add_modifier(Modifier::BOLD));

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title("Member of")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .column_spacing(1);
    f.render_widget(table, area);
}
