use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};
use std::io::stdout;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::info;

use crate::auth::{self, Access};
use crate::client::Transport;
use crate::form::{ApplicationForm, SubmitGuard};
use crate::models::{AuthContext, Field, Notice, NoticeLevel, Route};
use crate::notify::{Navigator, Notifier, RouteRecorder};
use crate::submit::{self, SubmitResult};
use crate::validate::ACCEPTED_EXTENSIONS;

const TOAST_TTL: Duration = Duration::from_secs(4);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How the form was left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormExit {
    Navigated {
        route: Route,
        notice: Option<Notice>,
    },
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Text(Field),
    Resume,
    Submit,
}

const FOCUS_ORDER: [Focus; 7] = [
    Focus::Text(Field::Name),
    Focus::Text(Field::Email),
    Focus::Text(Field::Phone),
    Focus::Text(Field::Address),
    Focus::Text(Field::CoverLetter),
    Focus::Resume,
    Focus::Submit,
];

struct Toast {
    notice: Notice,
    shown_at: Instant,
}

#[derive(Default)]
struct Toasts {
    items: Vec<Toast>,
}

impl Toasts {
    fn prune(&mut self) {
        self.items.retain(|t| t.shown_at.elapsed() < TOAST_TTL);
    }

    fn last(&self) -> Option<&Notice> {
        self.items.last().map(|t| &t.notice)
    }
}

impl Notifier for Toasts {
    fn notify(&mut self, notice: Notice) {
        info!(message = %notice.message, level = ?notice.level, "notice");
        self.items.push(Toast {
            notice,
            shown_at: Instant::now(),
        });
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Action {
    None,
    Submit,
    Quit,
}

struct FormState {
    form: ApplicationForm,
    focus: usize,
    toasts: Toasts,
    nav: RouteRecorder,
}

impl FormState {
    fn new(job_id: Option<String>) -> Self {
        Self {
            form: ApplicationForm::new(job_id),
            focus: 0,
            toasts: Toasts::default(),
            nav: RouteRecorder::default(),
        }
    }

    fn focus(&self) -> Focus {
        FOCUS_ORDER[self.focus]
    }

    fn move_focus(&mut self, forward: bool) {
        if self.focus() == Focus::Resume {
            self.commit_resume();
        }
        let len = FOCUS_ORDER.len();
        self.focus = if forward {
            (self.focus + 1) % len
        } else {
            (self.focus + len - 1) % len
        };
    }

    /// Runs whatever path was typed into the file control through the
    /// validator. A rejected path is put back to the current selection.
    fn commit_resume(&mut self) {
        let typed = self.form.file_input().to_string();
        let current = self
            .form
            .draft()
            .resume
            .as_ref()
            .map(|f| f.path.display().to_string())
            .unwrap_or_default();
        if typed == current {
            return;
        }

        if !self.form.select_resume_path(&typed, None, &mut self.toasts) {
            if let Some(input) = self.form.file_input_mut() {
                *input = current;
            }
        }
    }

    fn focused_text(&mut self) -> Option<&mut String> {
        match self.focus() {
            Focus::Text(field) => self.form.field_mut(field),
            Focus::Resume => self.form.file_input_mut(),
            Focus::Submit => None,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Action {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return Action::Quit,
            KeyCode::Char('c') if ctrl => return Action::Quit,
            KeyCode::Tab | KeyCode::Down => {
                self.move_focus(true);
                return Action::None;
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.move_focus(false);
                return Action::None;
            }
            _ => {}
        }

        // Inputs are disabled while the request is out.
        if self.form.is_submitting() {
            return Action::None;
        }

        match key.code {
            KeyCode::Char('s') if ctrl => {
                if self.focus() == Focus::Resume {
                    self.commit_resume();
                }
                Action::Submit
            }
            KeyCode::Enter => match self.focus() {
                Focus::Submit => Action::Submit,
                Focus::Text(Field::CoverLetter) => {
                    if let Some(text) = self.focused_text() {
                        text.push('\n');
                    }
                    Action::None
                }
                _ => {
                    self.move_focus(true);
                    Action::None
                }
            },
            KeyCode::Backspace => {
                if let Some(text) = self.focused_text() {
                    text.pop();
                }
                Action::None
            }
            KeyCode::Char(c) if !ctrl => {
                if let Some(text) = self.focused_text() {
                    text.push(c);
                }
                Action::None
            }
            _ => Action::None,
        }
    }
}

type Finished = (SubmitResult, SubmitGuard);

fn start_submit<T>(state: &mut FormState, handle: &Handle, transport: &T, tx: &UnboundedSender<Finished>)
where
    T: Transport + Clone + Send + Sync + 'static,
{
    let Ok((payload, guard)) = submit::begin(&state.form, &mut state.toasts) else {
        return;
    };

    let transport = transport.clone();
    let tx = tx.clone();
    handle.spawn(async move {
        let result = submit::deliver(&transport, &payload).await;
        // The guard travels back so the form stays disabled until the
        // outcome has been applied.
        let _ = tx.send((result, guard));
    });
}

fn apply_finished(state: &mut FormState, rx: &mut UnboundedReceiver<Finished>) {
    while let Ok((result, guard)) = rx.try_recv() {
        submit::settle(&mut state.form, &result, &mut state.toasts, &mut state.nav);
        drop(guard);
    }
}

/// Shows the application form for `job_id` until the user submits
/// successfully or leaves. Users the gate turns away never see it.
pub fn run_form<T>(
    handle: &Handle,
    auth_context: &AuthContext,
    job_id: Option<String>,
    transport: T,
) -> Result<FormExit>
where
    T: Transport + Clone + Send + Sync + 'static,
{
    if let Access::Redirect(route) = auth::check(auth_context) {
        let mut nav = RouteRecorder::default();
        nav.navigate(route.clone());
        return Ok(FormExit::Navigated {
            route,
            notice: None,
        });
    }

    if let Some(id) = &job_id {
        info!(route = %Route::Application(id.clone()).path(), "opening application form");
    }
    let mut state = FormState::new(job_id);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, handle, &transport);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop<T>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut FormState,
    handle: &Handle,
    transport: &T,
) -> Result<FormExit>
where
    T: Transport + Clone + Send + Sync + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Finished>();

    loop {
        apply_finished(state, &mut rx);
        if let Some(route) = state.nav.route.clone() {
            return Ok(FormExit::Navigated {
                route,
                notice: state.toasts.last().cloned(),
            });
        }

        state.toasts.prune();
        terminal.draw(|frame| draw(frame, state))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match state.handle_key(key) {
                Action::Quit => return Ok(FormExit::Cancelled),
                Action::Submit => start_submit(state, handle, transport, &tx),
                Action::None => {}
            }
        }
    }
}

fn draw(frame: &mut Frame, state: &FormState) {
    let toast_height = state.toasts.items.len().min(3) as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Length(toast_height),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let title = match state.form.job_id() {
        Some(id) => format!(" Application Form  (job {})", id),
        None => " Application Form".to_string(),
    };
    frame.render_widget(
        Paragraph::new(title).style(Style::default().add_modifier(Modifier::BOLD)),
        chunks[0],
    );

    let disabled = state.form.is_submitting();
    for (i, field) in Field::ALL.iter().enumerate() {
        let focused = state.focus() == Focus::Text(*field);
        let area = chunks[i + 1];
        let value = state.form.draft().get(*field);
        let text = if *field == Field::CoverLetter {
            textwrap::fill(value, area.width.saturating_sub(2).max(1) as usize)
        } else {
            value.to_string()
        };
        let widget = Paragraph::new(with_cursor(text, focused && !disabled))
            .block(input_block(field.placeholder(), focused, disabled))
            .wrap(Wrap { trim: false });
        frame.render_widget(widget, area);
    }

    let resume_focused = state.focus() == Focus::Resume;
    let mut resume_lines = vec![Line::from(with_cursor(
        state.form.file_input().to_string(),
        resume_focused && !disabled,
    ))];
    if let Some(file) = &state.form.draft().resume {
        resume_lines.push(Line::from(Span::styled(
            format!(
                "{} ({:.1} KB, {})",
                file.file_name,
                file.size as f64 / 1024.0,
                file.content_type
            ),
            Style::default().fg(Color::Green),
        )));
    }
    let resume_title = format!("Select Resume * ({})", ACCEPTED_EXTENSIONS);
    frame.render_widget(
        Paragraph::new(resume_lines).block(input_block(&resume_title, resume_focused, disabled)),
        chunks[6],
    );

    let label = if disabled { "Submitting..." } else { "Send Application" };
    let button_style = if disabled {
        Style::default().fg(Color::DarkGray)
    } else if state.focus() == Focus::Submit {
        Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    frame.render_widget(
        Paragraph::new(Span::styled(format!("[ {} ]", label), button_style))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL)),
        chunks[7],
    );

    let toast_lines: Vec<Line> = state
        .toasts
        .items
        .iter()
        .rev()
        .take(3)
        .map(|toast| {
            let (icon, color) = match toast.notice.level {
                NoticeLevel::Success => ("+", Color::Green),
                NoticeLevel::Error => ("x", Color::Red),
            };
            Line::from(Span::styled(
                format!(" {} {}", icon, toast.notice.message),
                Style::default().fg(color),
            ))
        })
        .collect();
    frame.render_widget(Paragraph::new(toast_lines), chunks[8]);

    let help = Paragraph::new(
        " Tab/Shift-Tab:move  Enter:next/submit  Ctrl-S:submit  Esc:leave",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[9]);
}

fn input_block(title: &str, focused: bool, disabled: bool) -> Block<'static> {
    let style = if disabled {
        Style::default().fg(Color::DarkGray)
    } else if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", title))
        .border_style(style)
}

fn with_cursor(mut text: String, show: bool) -> String {
    if show {
        text.push('_');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::MAX_RESUME_BYTES;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(state: &mut FormState, text: &str) {
        for c in text.chars() {
            state.handle_key(press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_typing_fills_focused_field() {
        let mut state = FormState::new(Some("job-1".to_string()));
        type_text(&mut state, "Ada");
        state.handle_key(press(KeyCode::Backspace));
        state.handle_key(press(KeyCode::Tab));
        type_text(&mut state, "ada@example.com");

        assert_eq!(state.form.draft().name, "Ad");
        assert_eq!(state.form.draft().email, "ada@example.com");
    }

    #[test]
    fn test_focus_wraps_both_ways() {
        let mut state = FormState::new(None);
        state.handle_key(press(KeyCode::BackTab));
        assert_eq!(state.focus(), Focus::Submit);
        state.handle_key(press(KeyCode::Tab));
        assert_eq!(state.focus(), Focus::Text(Field::Name));
    }

    #[test]
    fn test_enter_in_cover_letter_adds_newline() {
        let mut state = FormState::new(None);
        state.focus = 4;
        type_text(&mut state, "Hi");
        state.handle_key(press(KeyCode::Enter));
        type_text(&mut state, "there");
        assert_eq!(state.form.draft().cover_letter, "Hi\nthere");
        assert_eq!(state.focus(), Focus::Text(Field::CoverLetter));
    }

    #[test]
    fn test_leaving_resume_field_validates_path() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("cv.pdf");
        std::fs::write(&good, b"%PDF").unwrap();
        let big = dir.path().join("big.pdf");
        std::fs::File::create(&big)
            .unwrap()
            .set_len(MAX_RESUME_BYTES + 1)
            .unwrap();

        let mut state = FormState::new(None);
        state.focus = 5;
        type_text(&mut state, good.to_str().unwrap());
        state.handle_key(press(KeyCode::Tab));
        assert_eq!(state.form.draft().resume.as_ref().unwrap().path, good);

        state.focus = 5;
        if let Some(input) = state.form.file_input_mut() {
            *input = big.display().to_string();
        }
        state.handle_key(press(KeyCode::Tab));
        assert_eq!(state.form.draft().resume.as_ref().unwrap().path, good);
        assert_eq!(state.form.file_input(), good.display().to_string());
        assert_eq!(
            state.toasts.last().map(|n| n.message.as_str()),
            Some("File size should be less than 5MB")
        );
    }

    #[test]
    fn test_submit_keys() {
        let mut state = FormState::new(None);
        assert_eq!(state.handle_key(ctrl('s')), Action::Submit);
        state.focus = 6;
        assert_eq!(state.handle_key(press(KeyCode::Enter)), Action::Submit);
        assert_eq!(state.handle_key(press(KeyCode::Esc)), Action::Quit);
        assert_eq!(state.handle_key(ctrl('c')), Action::Quit);
    }

    #[test]
    fn test_inputs_ignored_while_submitting() {
        let mut state = FormState::new(None);
        let guard = state.form.begin_submit().unwrap();

        type_text(&mut state, "Ada");
        assert_eq!(state.handle_key(ctrl('s')), Action::None);
        assert_eq!(state.form.draft().name, "");

        state.handle_key(press(KeyCode::Tab));
        assert_eq!(state.focus(), Focus::Text(Field::Email));

        drop(guard);
        type_text(&mut state, "a");
        assert_eq!(state.form.draft().email, "a");
    }

    #[test]
    fn test_start_submit_reports_missing_resume() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let transport = crate::client::HttpTransport::new(
            "http://127.0.0.1:9",
            Duration::from_secs(1),
            None,
        )
        .unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();

        let mut state = FormState::new(Some("job-1".to_string()));
        for field in Field::ALL {
            state.form.set_field(field, "x@example.com");
        }
        start_submit(&mut state, runtime.handle(), &transport, &tx);

        assert!(!state.form.is_submitting());
        assert_eq!(
            state.toasts.last().map(|n| n.message.as_str()),
            Some("Please upload your resume")
        );
    }

    #[test]
    fn test_gate_redirects_without_rendering() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let transport = crate::client::HttpTransport::new(
            "http://127.0.0.1:9",
            Duration::from_secs(1),
            None,
        )
        .unwrap();

        let exit = run_form(
            runtime.handle(),
            &AuthContext::default(),
            Some("job-1".to_string()),
            transport,
        )
        .unwrap();
        assert_eq!(
            exit,
            FormExit::Navigated {
                route: Route::Home,
                notice: None
            }
        );
    }
}
