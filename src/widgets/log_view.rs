use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::log_sink::{LogLine, Severity};

/// Upper bound on retained lines; older lines are dropped first.
const MAX_LINES: usize = 5000;

/// The "Output / Logs" pane: every line the session wrote to the sink.
#[derive(Default)]
pub struct LogView {
    lines: Vec<LogLine>,
    /// Lines scrolled up from the bottom; 0 follows new output.
    scroll_back: usize,
}

impl LogView {
    pub fn push(&mut self, line: LogLine) {
        self.lines.push(line);
        if self.lines.len() > MAX_LINES {
            let overflow = self.lines.len() - MAX_LINES;
            self.lines.drain(..overflow);
        }
        if self.scroll_back > 0 {
            // keep the viewed lines in place while output arrives
            self.scroll_back = (self.scroll_back + 1).min(self.lines.len());
        }
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    pub fn scroll_up(&mut self, amount: usize) {
        self.scroll_back = (self.scroll_back + amount).min(self.lines.len().saturating_sub(1));
    }

    pub fn scroll_down(&mut self, amount: usize) {
        self.scroll_back = self.scroll_back.saturating_sub(amount);
    }

    fn style(severity: Severity) -> Style {
        match severity {
            Severity::Info => Style::default().fg(Color::White),
            Severity::Success => Style::default().fg(Color::LightGreen),
            Severity::Error => Style::default().fg(Color::LightRed),
            Severity::Output => Style::default().fg(Color::Gray),
        }
    }
}

impl LogView {
    /// Splits one log line into rows of at most `width` cells, so the pane can
    /// count rows instead of lines when anchoring to the bottom.
    fn rows(line: &LogLine, width: usize) -> Vec<Line<'static>> {
        let stamp_style = Style::default().fg(Color::DarkGray);
        let text_style = LogView::style(line.severity);
        let cells: Vec<(char, Style)> = line
            .timestamp
            .format("%H:%M:%S ")
            .to_string()
            .chars()
            .map(|c| (c, stamp_style))
            .chain(line.text.chars().map(|c| (c, text_style)))
            .collect();

        cells
            .chunks(width.max(1))
            .map(|row| {
                let spans: Vec<Span> = row
                    .chunk_by(|a, b| a.1 == b.1)
                    .map(|run| Span::styled(run.iter().map(|(c, _)| *c).collect::<String>(), run[0].1))
                    .collect();
                Line::from(spans)
            })
            .collect()
    }
}

impl Widget for &LogView {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Output / Logs ")
            .borders(Borders::ALL);
        let inner = block.inner(area);
        let height = inner.height as usize;
        let width = inner.width as usize;

        // walk back from the newest visible line until the pane is full
        let end = self.lines.len().saturating_sub(self.scroll_back);
        let mut rows: Vec<Line> = Vec::new();
        for line in self.lines[..end].iter().rev() {
            if rows.len() >= height {
                break;
            }
            let mut wrapped = LogView::rows(line, width);
            wrapped.append(&mut rows);
            rows = wrapped;
        }
        let skip = rows.len().saturating_sub(height);
        let text: Vec<Line> = rows.into_iter().skip(skip).collect();

        Paragraph::new(text).block(block).render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn line(text: &str) -> LogLine {
        LogLine {
            timestamp: Local::now(),
            severity: Severity::Info,
            text: text.to_string(),
        }
    }

    fn rendered(view: &LogView, width: u16, height: u16) -> String {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        view.render(area, &mut buf);
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_follows_newest_lines() {
        let mut view = LogView::default();
        for i in 0..10 {
            view.push(line(&format!("line-{i}")));
        }
        let screen = rendered(&view, 40, 5);
        assert!(screen.contains("line-9"));
        assert!(screen.contains("line-7"));
        assert!(!screen.contains("line-6"));
    }

    #[test]
    fn test_scroll_back_shows_older_lines() {
        let mut view = LogView::default();
        for i in 0..10 {
            view.push(line(&format!("line-{i}")));
        }
        view.scroll_up(5);
        let screen = rendered(&view, 40, 5);
        assert!(screen.contains("line-4"));
        assert!(!screen.contains("line-9"));

        view.scroll_down(100);
        assert!(rendered(&view, 40, 5).contains("line-9"));
    }

    #[test]
    fn test_wrapped_lines_keep_newest_visible() {
        let mut view = LogView::default();
        for i in 0..10 {
            view.push(line(&format!("line-{i} {}", "x".repeat(41))));
        }
        // 28 columns inside the border: each 57-cell line takes three rows
        let screen = rendered(&view, 30, 6);
        assert!(screen.contains("line-9"));
        assert!(!screen.contains("line-8"));

        let area = Rect::new(0, 0, 30, 6);
        let mut buf = Buffer::empty(area);
        (&view).render(area, &mut buf);
        // last row inside the border holds the tail of the newest line
        let last_row: String = buf.content()[4 * 30 + 1..4 * 30 + 29]
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert_eq!(last_row.trim_end(), "x");
    }

    #[test]
    fn test_wrapped_rows_split_at_pane_width() {
        let rows = LogView::rows(&line("abcdefghij"), 8);
        // "HH:MM:SS " plus ten characters
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.width() <= 8));
    }

    #[test]
    fn test_retention_is_bounded() {
        let mut view = LogView::default();
        for i in 0..(MAX_LINES + 10) {
            view.push(line(&i.to_string()));
        }
        assert_eq!(view.lines().len(), MAX_LINES);
        assert_eq!(view.lines()[0].text, "10");
    }
}
