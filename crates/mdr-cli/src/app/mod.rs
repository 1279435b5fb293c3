pub mod keymap;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::ExecutableCommand;
use crossterm::cursor::Show;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, MouseEventKind,
};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use mdr_core::{
    BULLET, Control, LineKind, RenderOptions, Transition, Viewport, classify_line,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};

use crate::ui::theme::{ThemeChoice, ThemeTokens, build_theme, style_for_line};
use crate::watcher::DocumentWatch;
use keymap::{BINDINGS, KeyDispatcher, RENDER_VIEW};

const SCROLL_STEP_LINES: usize = 3;

#[derive(Debug, Clone)]
pub struct AppOptions {
    pub render: RenderOptions,
    pub theme: ThemeChoice,
    pub no_color: bool,
    pub watch: Option<PathBuf>,
}

pub struct App {
    viewport: Viewport,
    keys: KeyDispatcher,
    theme: ThemeTokens,
    watch: Option<DocumentWatch>,
    interactive_input: bool,
    #[cfg(test)]
    test_events: std::collections::VecDeque<InputEvent>,
    #[cfg(test)]
    test_draw_error: Option<io::Error>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InputEvent {
    Key(KeyEvent),
    ScrollUp,
    ScrollDown,
    Resize(u16, u16),
}

impl App {
    pub fn new(content: String, options: AppOptions) -> Result<Self> {
        let keys = KeyDispatcher::register_all(BINDINGS)?;
        let watch = match &options.watch {
            Some(path) => Some(
                DocumentWatch::start(path)
                    .with_context(|| format!("error watching {}", path.display()))?,
            ),
            None => None,
        };

        Ok(Self {
            viewport: Viewport::new(content, options.render),
            keys,
            theme: build_theme(options.theme, options.no_color),
            watch,
            interactive_input: true,
            #[cfg(test)]
            test_events: std::collections::VecDeque::new(),
            #[cfg(test)]
            test_draw_error: None,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let interactive = self.interactive_input;
        let result = with_restore(
            || {
                let mut terminal = start_terminal(interactive)?;
                self.run_loop(&mut terminal)
            },
            || restore_terminal(interactive),
        );

        tracing::info!(ok = result.is_ok(), "session ended");
        result
    }

    fn run_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            self.handle_watch_updates();

            #[cfg(test)]
            if let Some(err) = self.test_draw_error.take() {
                return Err(err.into());
            }
            terminal.draw(|frame| self.draw(frame))?;

            if !self.interactive_input {
                return Ok(());
            }

            let Some(input_event) = self.next_input_event()? else {
                continue;
            };
            if self.handle_input(input_event) == Control::Quit {
                tracing::info!("quit requested");
                return Ok(());
            }
        }
    }

    fn handle_input(&mut self, input_event: InputEvent) -> Control {
        match input_event {
            InputEvent::Key(key) => match self.keys.dispatch(RENDER_VIEW, key) {
                Some(transition) => self.viewport.handle(transition),
                None => Control::Continue,
            },
            InputEvent::ScrollUp => self.scroll_by(Transition::LineUp),
            InputEvent::ScrollDown => self.scroll_by(Transition::LineDown),
            InputEvent::Resize(width, height) => {
                tracing::debug!(width, height, "terminal resized");
                Control::Continue
            }
        }
    }

    fn scroll_by(&mut self, transition: Transition) -> Control {
        for _ in 0..SCROLL_STEP_LINES {
            self.viewport.handle(transition);
        }
        Control::Continue
    }

    fn handle_watch_updates(&mut self) {
        let Some(watch) = &self.watch else {
            return;
        };

        if let Some(text) = watch.latest()
            && text != self.viewport.raw()
        {
            tracing::info!(bytes = text.len(), "document changed on disk");
            self.viewport.set_content(text);
        }
    }

    fn next_input_event(&mut self) -> Result<Option<InputEvent>> {
        #[cfg(test)]
        if let Some(event) = self.test_events.pop_front() {
            return Ok(Some(event));
        }
        next_terminal_input(event::poll, event::read)
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let area = frame.area();
        let view = self.viewport.layout(area.width, area.height);
        let lines: Vec<Line<'static>> = view
            .visible_lines(usize::from(area.height))
            .map(|line| styled_line(line, &self.theme))
            .collect();
        let x_offset = u16::try_from(view.x_offset).unwrap_or(u16::MAX);

        frame.render_widget(Paragraph::new(lines).scroll((0, x_offset)), area);
    }
}

fn styled_line(line: &str, theme: &ThemeTokens) -> Line<'static> {
    let kind = classify_line(line);
    if kind != LineKind::Bullet {
        return Line::from(Span::styled(line.to_string(), style_for_line(theme, kind)));
    }

    let body = line.trim_start();
    let indent = line.len() - body.len();
    let marker_len = if body.starts_with(BULLET) {
        BULLET.len()
    } else {
        body.find(". ").map_or(0, |dot| dot + 2)
    };
    let (marker, rest) = line.split_at(indent + marker_len);

    let mut spans = vec![Span::styled(marker.to_string(), theme.bullet)];
    if !rest.is_empty() {
        spans.push(Span::styled(rest.to_string(), theme.plain));
    }
    Line::from(spans)
}

fn start_terminal(interactive: bool) -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    if interactive {
        stdout.execute(EnableMouseCapture)?;
    }
    let terminal =
        Terminal::new(CrosstermBackend::new(stdout)).context("error starting the interactive UI")?;
    toggle_raw_mode(interactive, enable_raw_mode)?;
    Ok(terminal)
}

/// Undoes every step of `start_terminal`, even after an earlier step failed.
fn restore_terminal(interactive: bool) -> Result<()> {
    let mut stdout = io::stdout();
    let raw = if interactive { disable_raw_mode() } else { Ok(()) };
    let mouse = if interactive {
        stdout.execute(DisableMouseCapture).map(|_| ())
    } else {
        Ok(())
    };
    let screen = stdout.execute(LeaveAlternateScreen).map(|_| ());
    let cursor = stdout.execute(Show).map(|_| ());

    raw.and(mouse)
        .and(screen)
        .and(cursor)
        .context("error restoring the terminal")
}

/// Runs `session`, then `restore` whatever happened. The first error wins.
fn with_restore<S, R>(session: S, restore: R) -> Result<()>
where
    S: FnOnce() -> Result<()>,
    R: FnOnce() -> Result<()>,
{
    let result = session();
    let restored = restore();
    result.and(restored)
}

fn toggle_raw_mode<F>(interactive: bool, mut f: F) -> Result<()>
where
    F: FnMut() -> io::Result<()>,
{
    if interactive {
        f().context("error starting the interactive UI")?;
    }
    Ok(())
}

fn next_terminal_input<P, R>(mut poll: P, mut read: R) -> Result<Option<InputEvent>>
where
    P: FnMut(Duration) -> io::Result<bool>,
    R: FnMut() -> io::Result<Event>,
{
    if !poll(Duration::from_millis(30))? {
        return Ok(None);
    }
    let event = read()?;
    match event {
        Event::Key(key) if key.kind == event::KeyEventKind::Press => Ok(Some(InputEvent::Key(key))),
        Event::Mouse(mouse) if mouse.kind == MouseEventKind::ScrollUp => {
            Ok(Some(InputEvent::ScrollUp))
        }
        Event::Mouse(mouse) if mouse.kind == MouseEventKind::ScrollDown => {
            Ok(Some(InputEvent::ScrollDown))
        }
        Event::Resize(width, height) => Ok(Some(InputEvent::Resize(width, height))),
        _ => Ok(None),
    }
}
