use crate::task::Task;
use crossterm::{
    cursor::MoveTo,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, Padding, Row, Table, Widget},
};
use std::fmt::Display;
use std::io::{self, BufRead, Write};

pub const TASK_COLUMNS: [&str; 6] = [
    "ID",
    "Title",
    "Description",
    "Due Date",
    "Priority",
    "Completed",
];
const COLUMN_SPACING: u16 = 3;

/// Line-oriented terminal I/O for the menus.
///
/// When `interactive` is set the console talks to a real terminal: screens
/// are cleared and passwords are read without echo. Otherwise it is a plain
/// line reader, which is what tests and piped input use.
pub struct Console<R, W> {
    input: R,
    output: W,
    interactive: bool,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            interactive: false,
        }
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn say(&mut self, message: impl Display) -> io::Result<()> {
        writeln!(self.output, "{}", message)
    }

    /// Print `message` and read one line. Returns `None` at end of input.
    pub fn prompt(&mut self, message: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", message)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    /// Like `prompt`, but keystrokes are not echoed on a terminal.
    pub fn prompt_secret(&mut self, message: &str) -> io::Result<Option<String>> {
        if !self.interactive {
            return self.prompt(message);
        }
        write!(self.output, "{}", message)?;
        self.output.flush()?;

        enable_raw_mode()?;
        let secret = read_hidden_keys();
        disable_raw_mode()?;
        writeln!(self.output)?;
        secret
    }

    /// Wait for Enter. Returns `None` at end of input.
    pub fn pause(&mut self) -> io::Result<Option<()>> {
        Ok(self.prompt("\nPress Enter to continue...")?.map(|_| ()))
    }

    pub fn clear(&mut self) -> io::Result<()> {
        if self.interactive {
            execute!(self.output, Clear(ClearType::All), MoveTo(0, 0))?;
        }
        Ok(())
    }
}

fn read_hidden_keys() -> io::Result<Option<String>> {
    let mut secret = String::new();
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Enter => return Ok(Some(secret)),
                KeyCode::Char('c') | KeyCode::Char('d')
                    if key.modifiers.contains(KeyModifiers::CONTROL) =>
                {
                    return Ok(None)
                }
                KeyCode::Backspace => {
                    secret.pop();
                }
                KeyCode::Char(c) => secret.push(c),
                _ => {}
            }
        }
    }
}

fn display_width(text: &str) -> u16 {
    u16::try_from(Span::raw(text).width()).unwrap_or(u16::MAX)
}

/// Render tasks as a bordered table, one line per terminal row.
pub fn render_task_table(title: &str, tasks: &[Task]) -> String {
    let rows: Vec<[String; 6]> = tasks
        .iter()
        .map(|t| {
            [
                t.id.to_string(),
                t.title.clone(),
                t.description.clone(),
                t.due_date.clone(),
                t.priority.clone(),
                t.status_glyph().to_string(),
            ]
        })
        .collect();

    let mut widths = TASK_COLUMNS.map(display_width);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(cell));
        }
    }

    // Columns are sized to their widest cell so every field is shown in full.
    let inner_width = widths
        .iter()
        .fold(COLUMN_SPACING * (widths.len() as u16 - 1), |acc, w| acc.saturating_add(*w));
    let table_width = inner_width.max(display_width(title)).saturating_add(4);
    let table_height = u16::try_from(rows.len()).unwrap_or(u16::MAX - 4).saturating_add(4);

    let table = Table::new(
        rows.into_iter().map(Row::new),
        widths.map(Constraint::Length),
    )
    .header(
        Row::new(TASK_COLUMNS)
            .style(Style::default().add_modifier(Modifier::BOLD))
            .bottom_margin(1),
    )
    .column_spacing(COLUMN_SPACING)
    .block(Block::bordered().title(title.to_string()).padding(Padding::horizontal(1)));

    let area = Rect::new(0, 0, table_width, table_height);
    let mut buf = Buffer::empty(area);
    Widget::render(table, area, &mut buf);
    buffer_to_string(&buf)
}

fn buffer_to_string(buf: &Buffer) -> String {
    let width = buf.area.width as usize;
    buf.content
        .chunks(width)
        .map(|row| {
            let mut line = String::new();
            let mut skip = 0;
            for cell in row {
                // Cells trailing a wide glyph hold filler.
                if skip > 0 {
                    skip -= 1;
                    continue;
                }
                let symbol = cell.symbol();
                skip = display_width(symbol).saturating_sub(1);
                line.push_str(symbol);
            }
            line.trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn task(id: u32, title: &str, completed: bool) -> Task {
        let mut t = Task::new(id, title.into(), "desc".into(), "2024-05-01".into(), "High".into());
        t.completed = completed;
        t
    }

    fn console(input: &str) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
        Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn prompt_strips_line_ending_only() {
        let mut c = console("  spaced title \r\nnext\n");
        assert_eq!(c.prompt("> ").unwrap().as_deref(), Some("  spaced title "));
        assert_eq!(c.prompt("> ").unwrap().as_deref(), Some("next"));
        assert_eq!(c.prompt("> ").unwrap(), None);
        assert_eq!(String::from_utf8_lossy(c.output()), "> > > ");
    }

    #[test]
    fn secret_prompt_reads_lines_when_not_interactive() {
        let mut c = console("pw1\n");
        assert_eq!(c.prompt_secret("Password: ").unwrap().as_deref(), Some("pw1"));
    }

    #[test]
    fn clear_is_silent_when_not_interactive() {
        let mut c = console("");
        c.clear().unwrap();
        assert!(c.output().is_empty());
    }

    #[test]
    fn table_has_header_and_one_line_per_task() {
        let out = render_task_table(" Tasks ", &[task(1, "Buy milk", false), task(2, "Walk dog", true)]);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with('┌'));
        assert!(lines[0].contains("Tasks"));
        for column in TASK_COLUMNS {
            assert!(lines[1].contains(column), "header missing {}", column);
        }
        assert!(lines[3].contains("Buy milk") && lines[3].contains('✗'));
        assert!(lines[4].contains("Walk dog") && lines[4].contains('✓'));
        assert!(lines[5].starts_with('└'));
    }

    #[test]
    fn table_rows_are_aligned() {
        let out = render_task_table("", &[task(1, "a", false), task(10, "a much longer title", false)]);
        let widths: Vec<usize> = out.lines().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "{:?}\n{}", widths, out);
    }

    #[test]
    fn long_cells_are_shown_in_full() {
        let mut long = task(1, "short", false);
        long.description = format!("{}END", "lorem ipsum ".repeat(20));
        let out = render_task_table("", &[long.clone(), task(2, "other", false)]);

        assert!(out.contains(&long.description), "{}", out);
        let widths: Vec<usize> = out.lines().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "{:?}", widths);
    }
}
