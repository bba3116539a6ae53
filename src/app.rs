use std::time::Duration;

use anyhow::Result;
use crossterm::event;
use crossterm::event::Event;
use crossterm::event::KeyCode::*;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use ratatui::backend::Backend;
use ratatui::layout::Constraint;
use ratatui::layout::Layout;
use ratatui::style::Color;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::text::Text;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::HighlightSpacing;
use ratatui::widgets::List;
use ratatui::widgets::ListItem;
use ratatui::widgets::ListState;
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use ratatui::Terminal;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::watch;
use tracing::debug;

use crate::config::app_config::{Config, Service, TargetConfig};
use crate::log_sink::{LogLine, LogReceiver};
use crate::session::{SessionManager, SessionState};
use crate::ssh::discovery::ScriptCandidate;
use crate::ssh::ssh_session::Target;
use crate::widgets::connect_form::{ConnectForm, FormOutcome};
use crate::widgets::log_view::LogView;
use crate::widgets::script_picker::{PickOutcome, ScriptPicker};

const LOG_PAGE: usize = 10;

/// A request for the session manager, produced by the user.
#[derive(Debug)]
pub enum Command {
    Connect(Target),
    StartService(Service),
    DiscoverScripts,
    RunScript(ScriptCandidate),
    Disconnect,
}

/// Results handed back to the UI by background tasks.
#[derive(Debug)]
pub enum UiEvent {
    ScriptsDiscovered(Vec<ScriptCandidate>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MenuAction {
    Connect,
    /// index into the configured services
    StartService(usize),
    RunScript,
    Disconnect,
    Quit,
}

struct MenuItem {
    title: String,
    description: String,
    shortcut: char,
    action: MenuAction,
}

struct Menu {
    state: ListState,
    items: Vec<MenuItem>,
}

impl Menu {
    fn for_services(services: &[Service]) -> Menu {
        let mut items = vec![MenuItem {
            title: "Connect to target".to_string(),
            description: "Establish an SSH connection".to_string(),
            shortcut: ' ',
            action: MenuAction::Connect,
        }];
        for (i, service) in services.iter().enumerate() {
            items.push(MenuItem {
                title: format!("Start {}", service.name),
                description: format!("Run {} in a background session", service.name),
                shortcut: ' ',
                action: MenuAction::StartService(i),
            });
        }
        items.push(MenuItem {
            title: "Run a script".to_string(),
            description: "Select and run a ROS node".to_string(),
            shortcut: ' ',
            action: MenuAction::RunScript,
        });
        items.push(MenuItem {
            title: "Disconnect".to_string(),
            description: "Close the SSH connection".to_string(),
            shortcut: ' ',
            action: MenuAction::Disconnect,
        });
        // digits in order, as far as they go
        for (item, digit) in items.iter_mut().zip('1'..='9') {
            item.shortcut = digit;
        }
        items.push(MenuItem {
            title: "Quit".to_string(),
            description: "Exit the application".to_string(),
            shortcut: 'q',
            action: MenuAction::Quit,
        });

        let mut state = ListState::default();
        state.select(Some(0));
        Menu { state, items }
    }

    fn next(&mut self) {
        let i = match self.state.selected() {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    fn previous(&mut self) {
        let i = match self.state.selected() {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    fn selected_action(&self) -> Option<MenuAction> {
        self.state.selected().map(|i| self.items[i].action)
    }

    fn select_shortcut(&mut self, c: char) -> Option<MenuAction> {
        let index = self
            .items
            .iter()
            .position(|item| item.shortcut != ' ' && item.shortcut == c)?;
        self.state.select(Some(index));
        Some(self.items[index].action)
    }
}

enum Screen {
    Menu,
    Connect(ConnectForm),
    Scripts(ScriptPicker),
}

/// The control surface: a menu, the operation log and the popups in between.
///
/// It never talks to the target itself; user choices become [`Command`]s that
/// run as background tasks against the [`SessionManager`].
pub struct App {
    menu: Menu,
    screen: Screen,
    log: LogView,
    services: Vec<Service>,
    target: TargetConfig,
    session_state: watch::Receiver<SessionState>,
    should_quit: bool,
}

impl App {
    pub fn new(config: &Config, session_state: watch::Receiver<SessionState>) -> Self {
        Self {
            menu: Menu::for_services(&config.services),
            screen: Screen::Menu,
            log: LogView::default(),
            services: config.services.clone(),
            target: config.target.clone(),
            session_state,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn on_log(&mut self, line: LogLine) {
        self.log.push(line);
    }

    pub fn on_ui_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::ScriptsDiscovered(candidates) => {
                // an empty result is already reported in the log
                if !candidates.is_empty() && matches!(self.screen, Screen::Menu) {
                    self.screen = Screen::Scripts(ScriptPicker::new(candidates));
                }
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Command> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        match key.code {
            PageUp => {
                self.log.scroll_up(LOG_PAGE);
                return None;
            }
            PageDown => {
                self.log.scroll_down(LOG_PAGE);
                return None;
            }
            _ => {}
        }

        match self.screen {
            Screen::Menu => self.handle_menu_key(key),
            Screen::Connect(ref mut form) => match form.handle_key(key) {
                FormOutcome::Pending => None,
                FormOutcome::Cancel => {
                    self.screen = Screen::Menu;
                    None
                }
                FormOutcome::Submit(target) => {
                    // prefill the next attempt
                    self.target.host = target.host.clone();
                    self.target.user = target.username.clone();
                    self.screen = Screen::Menu;
                    Some(Command::Connect(target))
                }
            },
            Screen::Scripts(ref mut picker) => match picker.handle_key(key) {
                PickOutcome::Pending => None,
                PickOutcome::Cancel => {
                    self.screen = Screen::Menu;
                    None
                }
                PickOutcome::Run(candidate) => {
                    self.screen = Screen::Menu;
                    Some(Command::RunScript(candidate))
                }
            },
        }
    }

    fn handle_menu_key(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            Esc => self.activate(MenuAction::Quit),
            Char('c') if key.modifiers == KeyModifiers::CONTROL => self.activate(MenuAction::Quit),
            Char('j') | Down => {
                self.menu.next();
                None
            }
            Char('k') | Up => {
                self.menu.previous();
                None
            }
            Enter => {
                let action = self.menu.selected_action()?;
                self.activate(action)
            }
            Char(c) => {
                let action = self.menu.select_shortcut(c)?;
                self.activate(action)
            }
            _ => None,
        }
    }

    fn activate(&mut self, action: MenuAction) -> Option<Command> {
        debug!("menu action {:?}", action);
        match action {
            MenuAction::Connect => {
                self.screen = Screen::Connect(ConnectForm::new(
                    &self.target.host,
                    &self.target.user,
                    self.target.port,
                ));
                None
            }
            MenuAction::StartService(i) => self.services.get(i).cloned().map(Command::StartService),
            MenuAction::RunScript => Some(Command::DiscoverScripts),
            MenuAction::Disconnect => Some(Command::Disconnect),
            MenuAction::Quit => {
                self.should_quit = true;
                None
            }
        }
    }

    pub fn render(&mut self, f: &mut Frame) {
        let [body_area, status_area] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(f.area());
        let [menu_area, log_area] =
            Layout::horizontal([Constraint::Ratio(1, 4), Constraint::Ratio(3, 4)])
                .areas(body_area);

        let items: Vec<ListItem> = self
            .menu
            .items
            .iter()
            .map(|item| {
                ListItem::new(Text::from(vec![
                    Line::from(format!("{} {}", item.shortcut, item.title)),
                    Line::from(format!("  {}", item.description)).dim(),
                ]))
            })
            .collect();
        let menu = List::new(items)
            .block(Block::default().title(" AUV Control ").borders(Borders::ALL))
            .highlight_style(
                Style::default()
                    .add_modifier(Modifier::BOLD)
                    .add_modifier(Modifier::REVERSED),
            )
            .highlight_spacing(HighlightSpacing::Always);
        f.render_stateful_widget(menu, menu_area, &mut self.menu.state);
        f.render_widget(&self.log, log_area);

        let state = *self.session_state.borrow();
        let state_color = match state {
            SessionState::Connected => Color::LightGreen,
            SessionState::Connecting => Color::Yellow,
            _ => Color::LightRed,
        };
        let status = Line::from(vec![
            Span::styled(
                format!(" {state} "),
                Style::default().fg(state_color).add_modifier(Modifier::BOLD),
            ),
            "  Select (Enter), Scroll log (PgUp/PgDn), Quit (q)".dim(),
        ]);
        f.render_widget(Paragraph::new(status), status_area);

        match self.screen {
            Screen::Menu => {}
            Screen::Connect(ref form) => form.render(f),
            Screen::Scripts(ref mut picker) => picker.render(f),
        }
    }

    fn draw(&mut self, terminal: &mut Terminal<impl Backend>) -> Result<()> {
        terminal.draw(|f| self.render(f))?;
        Ok(())
    }

    /// Runs the control loop until the user quits, then shuts the session down.
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<impl Backend>,
        manager: SessionManager,
        mut log_rx: LogReceiver,
    ) -> Result<()> {
        let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
        loop {
            while let Ok(line) = log_rx.try_recv() {
                self.on_log(line);
            }
            while let Ok(event) = ui_rx.try_recv() {
                self.on_ui_event(event);
            }
            self.draw(terminal)?;
            if self.should_quit {
                break;
            }

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if let Some(command) = self.handle_key(key) {
                        spawn_command(&manager, command, &ui_tx);
                    }
                }
            }
        }
        manager.shutdown().await;
        Ok(())
    }
}

/// Runs `command` as its own task; outcomes arrive through the log sink.
pub fn spawn_command(manager: &SessionManager, command: Command, ui_tx: &UnboundedSender<UiEvent>) {
    let manager = manager.clone();
    match command {
        Command::Connect(target) => {
            tokio::spawn(async move {
                let _ = manager.connect(target).await;
            });
        }
        Command::StartService(service) => {
            tokio::spawn(async move {
                let _ = manager.run_service(&service).await;
            });
        }
        Command::DiscoverScripts => {
            let ui_tx = ui_tx.clone();
            tokio::spawn(async move {
                if let Ok(candidates) = manager.discover_scripts().await {
                    let _ = ui_tx.send(UiEvent::ScriptsDiscovered(candidates));
                }
            });
        }
        Command::RunScript(candidate) => {
            tokio::spawn(async move {
                let _ = manager.run_script(&candidate).await;
            });
        }
        Command::Disconnect => {
            tokio::spawn(async move {
                let _ = manager.disconnect().await;
            });
        }
    }
}
