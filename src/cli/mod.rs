//! Terminal console: tables, the terminal presenter and command dispatch.

use terminal_size::{terminal_size, Width};

use crate::registry::{team_label, Team, User};

pub mod dashboard;
pub mod terminal;

pub use dashboard::{Console, Flow};
pub use terminal::TerminalPresenter;

const MAX_COL_WIDTH: usize = 48;

/// Users table with team labels resolved against the cached teams.
pub fn users_table(users: &[User], teams: &[Team]) -> String {
    let headers = ["id", "username", "email", "role", "team"];
    let rows: Vec<Vec<String>> = users
        .iter()
        .map(|u| vec![u.id.clone(), u.username.clone(), u.email.clone(), u.role.to_string(), team_label(u, teams)])
        .collect();
    render_table(&headers, &rows, terminal_width())
}

pub fn teams_table(teams: &[Team]) -> String {
    let headers = ["id", "name", "description", "members", "created"];
    let rows: Vec<Vec<String>> = teams
        .iter()
        .map(|t| {
            vec![
                t.id.to_string(),
                t.name.clone(),
                t.description_or_default().to_string(),
                t.member_count.map(|c| c.to_string()).unwrap_or_else(|| "-".into()),
                t.created_on(),
            ]
        })
        .collect();
    render_table(&headers, &rows, terminal_width())
}

fn terminal_width() -> usize {
    match terminal_size() {
        Some((Width(w), _)) => (w as usize).saturating_sub(4).max(40),
        None => 120,
    }
}

/// Render an ASCII table. Columns are capped so the whole table fits `max_width` when it can;
/// over-long cells are truncated with an ellipsis.
pub fn render_table(headers: &[&str], rows: &[Vec<String>], max_width: usize) -> String {
    if rows.is_empty() {
        return "(no rows)".to_string();
    }
    let mut widths: Vec<usize> = headers.iter().map(|h| display_len(h).min(MAX_COL_WIDTH)).collect();
    for r in rows {
        for (i, cell) in r.iter().enumerate().take(headers.len()) {
            widths[i] = widths[i].max(display_len(cell).min(MAX_COL_WIDTH));
        }
    }
    shrink_to_fit(&mut widths, max_width);

    let sep = build_separator(&widths);
    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let mut out = Vec::with_capacity(rows.len() + 4);
    out.push(sep.clone());
    out.push(build_row(&header_cells, &widths));
    out.push(sep.clone());
    for r in rows {
        out.push(build_row(r, &widths));
    }
    out.push(sep);
    out.push(format!("rows: {}", rows.len()));
    out.join("\n")
}

// Each column costs its width plus 3 chars of border/padding, plus the leading '|'.
fn shrink_to_fit(widths: &mut [usize], max_width: usize) {
    let total = |w: &[usize]| w.iter().map(|c| c + 3).sum::<usize>() + 1;
    while total(widths) > max_width {
        let Some((idx, widest)) = widths.iter().copied().enumerate().max_by_key(|(_, w)| *w) else {
            return;
        };
        if widest <= 4 {
            return;
        }
        widths[idx] = widest - 1;
    }
}

fn display_len(s: &str) -> usize {
    s.chars().count()
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::from("+");
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let text = truncate(cell, *w);
        let pad = " ".repeat(w.saturating_sub(display_len(&text)));
        s.push(' ');
        if is_numeric_like(cell) {
            s.push_str(&pad);
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&pad);
        }
        s.push_str(" |");
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    if display_len(s) <= max {
        return s.to_string();
    }
    if max <= 1 {
        return "…".to_string();
    }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    !st.is_empty() && st.chars().all(|c| c.is_ascii_digit() || c == '-') && st.chars().any(|c| c.is_ascii_digit())
}
