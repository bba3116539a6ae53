use std::ops::{Add, Sub};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout},
    style::{Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::helper;
use crate::ssh::ssh_session::Target;

/// current selected item in form
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum CurrentSelect {
    Host = 0,
    User,
    Password,
}

const FIELD_COUNT: isize = 3;

impl CurrentSelect {
    fn from_index(index: isize) -> Self {
        match index.rem_euclid(FIELD_COUNT) {
            0 => CurrentSelect::Host,
            1 => CurrentSelect::User,
            2 => CurrentSelect::Password,
            _ => unreachable!(),
        }
    }
}

impl Add<isize> for CurrentSelect {
    type Output = Self;

    fn add(self, other: isize) -> Self {
        Self::from_index(self as isize + other)
    }
}

impl Sub<isize> for CurrentSelect {
    type Output = Self;

    fn sub(self, other: isize) -> Self {
        Self::from_index(self as isize - other)
    }
}

/// What the form wants after a key press.
#[derive(Debug)]
pub enum FormOutcome {
    Pending,
    Submit(Target),
    Cancel,
}

/// Host / user / password prompt shown before connecting.
pub struct ConnectForm {
    /// Current values of the input boxes
    input: Vec<String>,
    /// Position of cursor in the editor area.
    character_index: usize,
    current_select: CurrentSelect,
    port: u16,
    /// shown under the form when a submit is refused
    hint: Option<&'static str>,
}

impl ConnectForm {
    pub fn new(host: &str, user: &str, port: u16) -> Self {
        // start on the first field that still needs typing
        let current_select = if host.is_empty() {
            CurrentSelect::Host
        } else if user.is_empty() {
            CurrentSelect::User
        } else {
            CurrentSelect::Password
        };
        let mut form = Self {
            input: vec![host.to_string(), user.to_string(), String::new()],
            character_index: 0,
            current_select,
            port,
            hint: None,
        };
        form.move_cursor_to_end();
        form
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormOutcome {
        if key.kind != KeyEventKind::Press {
            return FormOutcome::Pending;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers == KeyModifiers::CONTROL => FormOutcome::Cancel,
            KeyCode::Esc => FormOutcome::Cancel,
            KeyCode::Enter if self.current_select == CurrentSelect::Password => self.submit(),
            KeyCode::Char(to_insert) => {
                self.enter_char(to_insert);
                FormOutcome::Pending
            }
            KeyCode::Backspace => {
                self.delete_char();
                FormOutcome::Pending
            }
            KeyCode::Left => {
                self.move_cursor_left();
                FormOutcome::Pending
            }
            KeyCode::Right => {
                self.move_cursor_right();
                FormOutcome::Pending
            }
            KeyCode::Up | KeyCode::BackTab => {
                self.current_select = self.current_select - 1;
                self.move_cursor_to_end();
                FormOutcome::Pending
            }
            KeyCode::Down | KeyCode::Enter | KeyCode::Tab => {
                self.current_select = self.current_select + 1;
                self.move_cursor_to_end();
                FormOutcome::Pending
            }
            _ => FormOutcome::Pending,
        }
    }

    fn submit(&mut self) -> FormOutcome {
        let host = self.input[CurrentSelect::Host as usize].trim().to_string();
        let user = self.input[CurrentSelect::User as usize].trim().to_string();
        if host.is_empty() || user.is_empty() {
            self.hint = Some("host and user are required");
            return FormOutcome::Pending;
        }
        let password = std::mem::take(&mut self.input[CurrentSelect::Password as usize]);
        FormOutcome::Submit(Target::new(host, user, password).with_port(self.port))
    }

    fn enter_char(&mut self, new_char: char) {
        let index = self.byte_index();
        self.input[self.current_select as usize].insert(index, new_char);
        self.move_cursor_right();
        self.hint = None;
    }

    /// Returns the byte index based on the character position.
    fn byte_index(&self) -> usize {
        let field = &self.input[self.current_select as usize];
        field
            .char_indices()
            .map(|(i, _)| i)
            .nth(self.character_index)
            .unwrap_or(field.len())
    }

    fn delete_char(&mut self) {
        if self.character_index == 0 {
            return;
        }
        let current_index = self.character_index;
        let field = &self.input[self.current_select as usize];
        // rebuild from chars, String::remove works on bytes
        let before = field.chars().take(current_index - 1);
        let after = field.chars().skip(current_index);
        self.input[self.current_select as usize] = before.chain(after).collect();
        self.move_cursor_left();
    }

    fn move_cursor_left(&mut self) {
        self.character_index = self.clamp_cursor(self.character_index.saturating_sub(1));
    }

    fn move_cursor_right(&mut self) {
        self.character_index = self.clamp_cursor(self.character_index.saturating_add(1));
    }

    fn move_cursor_to_end(&mut self) {
        self.character_index = self.input[self.current_select as usize].chars().count();
    }

    fn clamp_cursor(&self, new_cursor_pos: usize) -> usize {
        new_cursor_pos.clamp(0, self.input[self.current_select as usize].chars().count())
    }

    fn field_line(&self, field: CurrentSelect, label: &'static str) -> Line<'static> {
        let value = match field {
            // we use * to replace the password
            CurrentSelect::Password => "*".repeat(self.input[field as usize].chars().count()),
            _ => self.input[field as usize].clone(),
        };
        let label = if self.current_select == field {
            Span::styled(label, Style::new().bold())
        } else {
            Span::raw(label)
        };
        Line::from(vec![label, value.into()])
    }

    pub fn render(&self, f: &mut Frame) {
        let area = helper::centered_rect(60, 40, f.area());
        let block = Block::default()
            .title(format!(" Connect (port {}) ", self.port))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        f.render_widget(Clear, area);
        f.render_widget(block, area);

        let [form_area, hint_area] =
            Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(inner);
        let text = vec![
            self.field_line(CurrentSelect::Host, "    host:"),
            self.field_line(CurrentSelect::User, "    user:"),
            self.field_line(CurrentSelect::Password, "password:"),
        ];
        f.render_widget(Paragraph::new(text), form_area);

        let hint = match self.hint {
            Some(hint) => Text::from(hint).light_red(),
            None => Text::from("Next (Tab/Enter), Connect (Enter on password), Cancel (ESC)").dim(),
        };
        f.render_widget(Paragraph::new(hint), hint_area);

        //due to input character index start at 9
        //eg: "password:"
        //so here add 9
        let cursor_x = form_area.x + self.character_index as u16 + 9;
        let cursor_y = form_area.y + self.current_select as u16;
        f.set_cursor_position((cursor_x, cursor_y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(form: &mut ConnectForm, s: &str) {
        for c in s.chars() {
            form.handle_key(press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_select_wraps_around() {
        assert_eq!(CurrentSelect::Host - 1, CurrentSelect::Password);
        assert_eq!(CurrentSelect::Password + 1, CurrentSelect::Host);
        assert_eq!(CurrentSelect::User + 1, CurrentSelect::Password);
    }

    #[test]
    fn test_prefilled_form_starts_on_password() {
        let mut form = ConnectForm::new("192.168.2.2", "jetson", 22);
        type_str(&mut form, "secret");
        match form.handle_key(press(KeyCode::Enter)) {
            FormOutcome::Submit(target) => {
                assert_eq!(target.host, "192.168.2.2");
                assert_eq!(target.username, "jetson");
                assert_eq!(target.password.as_str(), "secret");
                assert_eq!(target.port, 22);
            }
            other => panic!("expected submit, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_form_walks_fields() {
        let mut form = ConnectForm::new("", "", 2222);
        type_str(&mut form, "auv.local");
        form.handle_key(press(KeyCode::Enter));
        type_str(&mut form, "ubuntx");
        form.handle_key(press(KeyCode::Backspace));
        type_str(&mut form, "u");
        form.handle_key(press(KeyCode::Tab));
        type_str(&mut form, "pw");
        match form.handle_key(press(KeyCode::Enter)) {
            FormOutcome::Submit(target) => {
                assert_eq!(target.to_string(), "ubuntu@auv.local:2222");
            }
            other => panic!("expected submit, got {other:?}"),
        }
    }

    #[test]
    fn test_submit_requires_host_and_user() {
        let mut form = ConnectForm::new("", "", 22);
        form.handle_key(press(KeyCode::Up));
        assert!(matches!(
            form.handle_key(press(KeyCode::Enter)),
            FormOutcome::Pending
        ));
        assert!(form.hint.is_some());
    }

    #[test]
    fn test_cursor_editing_in_the_middle() {
        let mut form = ConnectForm::new("hst", "", 22);
        form.current_select = CurrentSelect::Host;
        form.move_cursor_to_end();
        form.handle_key(press(KeyCode::Left));
        form.handle_key(press(KeyCode::Left));
        type_str(&mut form, "o");
        assert_eq!(form.input[0], "host");
    }

    #[test]
    fn test_escape_cancels() {
        let mut form = ConnectForm::new("a", "b", 22);
        assert!(matches!(
            form.handle_key(press(KeyCode::Esc)),
            FormOutcome::Cancel
        ));
    }
}
