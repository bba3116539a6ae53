use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    style::{Modifier, Style},
    widgets::{Block, Borders, Clear, HighlightSpacing, List, ListItem, ListState},
    Frame,
};

use crate::helper;
use crate::ssh::discovery::ScriptCandidate;

#[derive(Debug)]
pub enum PickOutcome {
    Pending,
    Run(ScriptCandidate),
    Cancel,
}

/// Popup list of discovered scripts.
///
/// The list is fixed when the popup opens; a selection hands back a copy of
/// the chosen candidate.
pub struct ScriptPicker {
    candidates: Vec<ScriptCandidate>,
    state: ListState,
}

impl ScriptPicker {
    pub fn new(candidates: Vec<ScriptCandidate>) -> Self {
        let mut state = ListState::default();
        if !candidates.is_empty() {
            state.select(Some(0));
        }
        Self { candidates, state }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PickOutcome {
        if key.kind != KeyEventKind::Press {
            return PickOutcome::Pending;
        }
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => PickOutcome::Cancel,
            KeyCode::Char('j') | KeyCode::Down => {
                self.next();
                PickOutcome::Pending
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.previous();
                PickOutcome::Pending
            }
            KeyCode::Enter => match self.state.selected() {
                Some(i) => PickOutcome::Run(self.candidates[i].clone()),
                None => PickOutcome::Cancel,
            },
            _ => PickOutcome::Pending,
        }
    }

    fn next(&mut self) {
        if self.candidates.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < self.candidates.len() => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    fn previous(&mut self) {
        if self.candidates.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.candidates.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn render(&mut self, f: &mut Frame) {
        let area = helper::centered_rect(60, 60, f.area());
        let items: Vec<ListItem> = self
            .candidates
            .iter()
            .map(|c| ListItem::new(format!("{:<24} {}", c.package, c.executable)))
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title(" Run a script (Enter), Back (ESC) ")
                    .borders(Borders::ALL),
            )
            .highlight_style(
                Style::default()
                    .add_modifier(Modifier::BOLD)
                    .add_modifier(Modifier::REVERSED),
            )
            .highlight_symbol("> ")
            .highlight_spacing(HighlightSpacing::Always);

        f.render_widget(Clear, area);
        f.render_stateful_widget(list, area, &mut self.state);
    }
}
