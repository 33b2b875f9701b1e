use std::io::{self, IsTerminal, Write};

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::controller::TaskSyncController;
use crate::format::{created_label, empty_hint};
use crate::guard::Scope;
use crate::session::Session;

const DESCRIPTION_WIDTH: usize = 40;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    /// Color only when stdout is a terminal and `NO_COLOR` is unset.
    pub fn new(color: bool) -> Self {
        let color = color && io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self { color }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all)]
    pub fn print_page<W: Write>(&self, mut out: W, ctrl: &TaskSyncController) -> anyhow::Result<()> {
        let items = ctrl.visible_items();
        let show_owner = ctrl.scope() == Scope::All;

        if let Some(error) = ctrl.error() {
            writeln!(out, "{}", self.paint(error, "31"))?;
        }

        if items.is_empty() {
            writeln!(out, "No tasks found")?;
            writeln!(out, "{}", empty_hint(ctrl.is_filtered(), ctrl.scope()))?;
            return Ok(());
        }

        let mut headers = vec!["ID".to_string(), "Title".to_string(), "Created".to_string()];
        if show_owner {
            headers.push("By".to_string());
        }
        headers.push("Description".to_string());

        let rows = items
            .iter()
            .map(|task| {
                let mut row = vec![
                    self.paint(&task.id, "33"),
                    task.title.clone(),
                    created_label(task.created_at.as_deref()),
                ];
                if show_owner {
                    row.push(task.created_by.clone().unwrap_or_default());
                }
                row.push(truncate_to_width(&task.description, DESCRIPTION_WIDTH));
                row
            })
            .collect();

        write_table(&mut out, headers, rows)?;

        if let Some(summary) = ctrl.page().summary() {
            writeln!(out)?;
            writeln!(out, "{summary}")?;
        }

        let mut nav = Vec::new();
        if ctrl.page().has_previous() {
            nav.push(format!("--page {} for the previous 10", ctrl.page().page_index()));
        }
        if ctrl.page().has_next() {
            nav.push(format!("--page {} for the next 10", ctrl.page().page_index() + 2));
        }
        if !nav.is_empty() {
            writeln!(out, "{}", nav.join("; "))?;
        }

        if show_owner && !ctrl.facets().is_empty() {
            writeln!(out, "Users on this page: {}", ctrl.facets().join(", "))?;
        }

        Ok(())
    }

    pub fn print_session<W: Write>(&self, mut out: W, session: &Session) -> anyhow::Result<()> {
        writeln!(out, "email     {}", session.user_email())?;
        writeln!(out, "role      {}", session.role().as_str())?;
        writeln!(out, "token     {}", mask_token(session.token()))?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{visible}…")
    }
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    let single_line = text.replace(['\n', '\r'], " ");
    if UnicodeWidthStr::width(single_line.as_str()) <= max_width {
        return single_line;
    }

    let mut out = String::new();
    let mut width = 0;
    for ch in single_line.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width + 1 > max_width {
            break;
        }
        width += ch_width;
        out.push(ch);
    }
    out.push('…');
    out
}

fn write_table<W: Write>(mut writer: W, headers: Vec<String>, rows: Vec<Vec<String>>) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|header| UnicodeWidthStr::width(header.as_str()))
        .collect();

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, width) in headers.iter().zip(widths.iter().copied()) {
        write!(writer, "{header:width$} ")?;
    }
    writeln!(writer)?;

    for width in widths.iter().copied() {
        write!(writer, "{:-<width$} ", "")?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(widths.iter().copied()) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use taskdesk_shared::{Role, TaskDto, TaskPageDto};

    use super::*;
    use crate::controller::RefreshReason;

    fn controller(scope: Scope, tasks: Vec<TaskDto>, total: usize) -> TaskSyncController {
        let mut ctrl = TaskSyncController::new(Session::new("secret-token", "root@example.com", Role::Admin), scope);
        let ticket = ctrl.begin_refresh(RefreshReason::Mount).unwrap();
        ctrl.finish_load(ticket, Ok(TaskPageDto { data: tasks, total }));
        ctrl
    }

    fn task(id: &str, title: &str, owner: &str) -> TaskDto {
        TaskDto {
            id: id.to_string(),
            title: title.to_string(),
            description: "line one\nline two".to_string(),
            created_at: None,
            created_by: Some(owner.to_string()),
        }
    }

    #[test]
    fn admin_page_lists_owner_column_and_facets() {
        let ctrl = controller(
            Scope::All,
            vec![task("t1", "Pay rent", "ana"), task("t2", "Fix sink", "bo")],
            12,
        );
        let mut out = Vec::new();
        Renderer::plain().print_page(&mut out, &ctrl).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("ID"));
        assert!(text.contains("By"));
        assert!(text.contains("line one line two"));
        assert!(text.contains("Showing 1 to 10 of 12 tasks"));
        assert!(text.contains("--page 2 for the next 10"));
        assert!(text.contains("Users on this page: ana, bo"));
    }

    #[test]
    fn empty_own_page_shows_hint() {
        let ctrl = controller(Scope::Own, vec![], 0);
        let mut out = Vec::new();
        Renderer::plain().print_page(&mut out, &ctrl).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "No tasks found\nCreate your first task to get started.\n");
    }

    #[test]
    fn long_descriptions_are_cut_by_display_width() {
        let cut = truncate_to_width("設計レビューを準備する", 9);
        assert_eq!(cut, "設計レビ…");
        assert!(UnicodeWidthStr::width(cut.as_str()) <= 9);
        assert_eq!(truncate_to_width("short", 9), "short");
    }

    #[test]
    fn token_is_masked() {
        assert_eq!(mask_token("abc"), "****");
        assert_eq!(mask_token("abcdefgh"), "abcd…");
    }
}
