use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table};

use crate::app::AppState;

pub fn render_groups_table(f: &mut Frame, area: Rect, app: &mut AppState) {
    let body_height = area.height.saturating_sub(3) as usize;
    if body_height > 0 {
        app.rows_per_page = body_height;
    }

    let selected = app.selected_group_index;
    let start = (selected / app.rows_per_page) * app.rows_per_page;
    let end = (start + app.rows_per_page).min(app.group_draft.len());

    let rows = app.group_draft[start..end].iter().enumerate().map(|(i, g)| {
        let style = if start + i == selected {
            Style::default()
                .fg(app.theme.highlight_fg)
                .bg(app.theme.highlight_bg)
                .add_modifier(Modifier::BOLD)
        } else if g.is_system() {
            Style::default().fg(app.theme.muted)
        } else {
            Style::default().fg(app.theme.text)
        };
        Row::new(vec![
            Cell::from(g.gid.to_string()),
            Cell::from(g.name.clone()),
            Cell::from(g.members.len().to_string()),
        ])
        .style(style)
    });

    let widths = [
        Constraint::Length(7),
        Constraint::Percentage(70),
        Constraint::Length(8),
    ];
    let header = Row::new(vec!["GID", "GROUP", "MEMBERS"])
        .style(Style::default().fg(app.theme.title).add_modifier(Modifier::BOLD));

    let mut title = format!("Groups ({})", app.group_draft.len());
    if app.groups_dirty {
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

pub fn render_group_details(f: &mut Frame, area: Rect, app: &AppState) {
    let text = match app.selected_group() {
        Some(g) => {
            let primary: Vec<&str> = app
                .account_draft
                .iter()
                .filter(|a| a.gid == g.gid)
                .map(|a| a.name.as_str())
                .collect();
            format!(
                "Group: {}\nGID: {}\nPassword field: {}\nPrimary group of: {}",
                g.name,
                g.gid,
                g.password,
                primary.join(", ")
            )
        }
        None => "No group selected".to_string(),
    };
    let p = Paragraph::new(text).style(Style::default().fg(app.theme.text)).block(
        Block::default()
            .title("Details")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    );
    f.render_widget(p, area);
}

pub fn render_group_members(f: &mut Frame, area: Rect, app: &AppState) {
    let items: Vec<ListItem> = app
        .selected_group()
        .map(|g| {
            g.members
                .iter()
                .map(|m| {
                    // Members that name no account are kept as written.
                    let style = if app.account_draft.iter().any(|a| &a.name == m) {
                        Style::default().fg(app.theme.text)
                    } else {
                        Style::default().fg(app.theme.error)
                    };
                    ListItem::new(m.clone()).style(style)
                })
                .collect()
        })
        .unwrap_or_default();
    let list = List::new(items).block(
        Block::default()
            .title("Members")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    );
    f.render_widget(list, area);
}
