// SPDX-License-Identifier: GPL-3.0-only

//! Terminal front end
//!
//! Renders the live preview and the captured photo with Unicode half-block
//! characters for improved vertical resolution. Keys and mouse drags become
//! [`Message`]s for the [`AppModel`]; everything drawn comes back as
//! [`PresentationEvent`]s.

use crate::app::{AppModel, Message, PresentationEvent, View};
use crate::backends::camera::{CameraBackend, SessionState};
use crate::config::Config;
use crate::constants::{self, terminal::DRAG_UNITS_PER_CELL};
use crate::filters::FilterCatalogProvider;
use crate::media::Bitmap;
use crate::pipelines::filter::{LabelState, SwipeDirection};
use crate::pipelines::photo::ExportTarget;

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};
use std::io::{self, stdout};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

/// Run the terminal viewer until the user quits
///
/// The app runs on `runtime`; this thread only draws and reads input.
pub fn run(
    runtime: &Runtime,
    backend: Arc<dyn CameraBackend>,
    provider: Arc<dyn FilterCatalogProvider>,
    config: &Config,
    export_target: Option<ExportTarget>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (sink, mut events) = mpsc::unbounded_channel();
    let (inbox, inbox_rx) = mpsc::unbounded_channel();

    let app_task = {
        let _guard = runtime.enter();
        let mut app = AppModel::new(backend, provider, config, sink);
        if let Some(target) = export_target {
            app = app.with_export_target(target);
        }
        runtime.spawn(app.run(inbox_rx))
    };

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_viewer(&mut terminal, &mut events, &inbox);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    let _ = inbox.send(Message::Quit);
    drop(inbox);
    match runtime.block_on(app_task) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "App ended with an error"),
        Err(e) => error!(error = %e, "App task failed"),
    }

    result
}

fn run_viewer(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    events: &mut mpsc::UnboundedReceiver<PresentationEvent>,
    inbox: &mpsc::UnboundedSender<Message>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut viewer = Viewer::default();
    let mut drag_start: Option<u16> = None;

    loop {
        // Drain everything the app sent since the last frame
        while let Ok(event) = events.try_recv() {
            viewer.apply(event);
        }

        terminal.draw(|f| {
            let area = f.area();

            // Reserve bottom line for status
            let image_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(1),
            };
            f.render_widget(
                FrameWidget {
                    bitmap: viewer.displayed(),
                    placeholder: viewer.placeholder(),
                },
                image_area,
            );
            f.render_widget(LabelOverlay { label: &viewer.label }, image_area);

            let status_area = Rect {
                x: area.x,
                y: area.height.saturating_sub(1),
                width: area.width,
                height: 1,
            };
            let status = StatusBar {
                message: &viewer.status_line(),
            };
            f.render_widget(status, status_area);
        })?;

        // Handle input with timeout for frame updates
        if !event::poll(constants::terminal::POLL_INTERVAL)? {
            continue;
        }
        let action = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => key_action(&key, viewer.view),
            Event::Mouse(mouse) => drag_action(&mouse, &mut drag_start),
            _ => None,
        };
        match action {
            Some(KeyAction::Send(Message::Quit)) => break,
            Some(KeyAction::Send(message)) => {
                viewer.show_help = false;
                if inbox.send(message).is_err() {
                    viewer.notice = Some("Camera session has ended".into());
                }
            }
            Some(KeyAction::ToggleHelp) => viewer.show_help = !viewer.show_help,
            None => {}
        }
    }

    info!("Terminal viewer closed");
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum KeyAction {
    Send(Message),
    ToggleHelp,
}

fn key_action(key: &KeyEvent, view: View) -> Option<KeyAction> {
    // Ctrl+C to quit
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(KeyAction::Send(Message::Quit));
    }
    let message = match (key.code, view) {
        (KeyCode::Char('q'), _) => Message::Quit,
        (KeyCode::Char('h'), _) => return Some(KeyAction::ToggleHelp),
        (KeyCode::Char(' ') | KeyCode::Char('p'), View::Camera) => Message::Capture,
        (KeyCode::Right, View::Detail) => Message::Swipe(SwipeDirection::Next),
        (KeyCode::Left, View::Detail) => Message::Swipe(SwipeDirection::Previous),
        (KeyCode::Char('s'), View::Detail) => Message::Export,
        (KeyCode::Char('b') | KeyCode::Esc, View::Detail) => Message::BackToCamera,
        _ => return None,
    };
    Some(KeyAction::Send(message))
}

/// Turn a left-button drag into a swipe once it is released
fn drag_action(mouse: &MouseEvent, drag_start: &mut Option<u16>) -> Option<KeyAction> {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            *drag_start = Some(mouse.column);
            None
        }
        MouseEventKind::Up(MouseButton::Left) => {
            let start = drag_start.take()?;
            let dx = (f32::from(mouse.column) - f32::from(start)) * DRAG_UNITS_PER_CELL;
            constants::swipe_from_drag(dx).map(|d| KeyAction::Send(Message::Swipe(d)))
        }
        _ => None,
    }
}

/// What the terminal currently knows about the app
#[derive(Default)]
struct Viewer {
    view: View,
    session: SessionState,
    preview: Option<Bitmap>,
    /// Current photo id and the bitmap showing for it
    photo: Option<(Uuid, Bitmap)>,
    filter_name: String,
    label: LabelState,
    notice: Option<String>,
    show_help: bool,
}

impl Viewer {
    fn apply(&mut self, event: PresentationEvent) {
        match event {
            PresentationEvent::Preview(bitmap) => self.preview = Some(bitmap),
            PresentationEvent::CaptureCompleted(base) => {
                self.photo = Some((base.id(), base.bitmap().clone()));
                self.filter_name = constants::ORIGINAL_FILTER_NAME.to_string();
                self.notice = None;
            }
            PresentationEvent::Rendered(rendered) => {
                if let Some((id, bitmap)) = &mut self.photo
                    && *id == rendered.base_id
                {
                    *bitmap = rendered.bitmap;
                    self.filter_name = rendered.filter_name.to_string();
                }
            }
            PresentationEvent::Label(label) => self.label = label,
            PresentationEvent::SessionState(state) => self.session = state,
            PresentationEvent::View(view) => self.view = view,
            PresentationEvent::CatalogLoaded(count) => {
                info!(count, "Filters available");
            }
            PresentationEvent::Exported(path) => {
                self.notice = Some(format!("Saved: {}", path.display()));
            }
            PresentationEvent::Notice(text) => self.notice = Some(text),
            PresentationEvent::SessionFailed(text) => {
                self.notice = Some(format!("Error: {}", text));
            }
        }
    }

    fn displayed(&self) -> Option<&Bitmap> {
        match self.view {
            View::Camera => self.preview.as_ref(),
            View::Detail => self.photo.as_ref().map(|(_, bitmap)| bitmap),
        }
    }

    fn placeholder(&self) -> &'static str {
        match self.session {
            SessionState::Failed => "Camera unavailable",
            _ => "Waiting for camera...",
        }
    }

    fn status_line(&self) -> String {
        if self.show_help {
            return help_message(self.view).to_string();
        }
        let hints = match (self.view, self.session) {
            (View::Camera, SessionState::Capturing) => "capturing…",
            (View::Camera, _) => "'space' capture | 'h' help | 'q' quit",
            (View::Detail, _) => "←/→ filter | 's' save | 'b' back | 'q' quit",
        };
        let mut line = match self.view {
            View::Camera => format!("[{}] {}", self.session, hints),
            View::Detail => format!("[{}] {}", self.filter_name, hints),
        };
        if let Some(notice) = &self.notice {
            line.push_str(" | ");
            line.push_str(notice);
        }
        line
    }
}

fn help_message(view: View) -> &'static str {
    match view {
        View::Camera => "space/p: Take picture | h: Toggle help | q/Ctrl+C: Quit",
        View::Detail => {
            "←/→ or drag: Change filter | s: Save photo | b/Esc: Back to camera | h: Toggle help | q/Ctrl+C: Quit"
        }
    }
}

/// Renders a bitmap using half-block characters
struct FrameWidget<'a> {
    bitmap: Option<&'a Bitmap>,
    placeholder: &'a str,
}

impl Widget for FrameWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(bitmap) = self.bitmap.filter(|b| b.width() > 0 && b.height() > 0) else {
            render_centered(self.placeholder, area, buf, Style::default());
            return;
        };

        let (display_width, display_height) = fit(bitmap.width(), bitmap.height(), area);
        if display_width == 0 || display_height == 0 {
            return;
        }

        // Center the image
        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = bitmap.width() as f64 / display_width as f64;
        let y_scale = bitmap.height() as f64 / (display_height as f64 * 2.0);

        // Upper half (▀) colored with fg, lower half with bg
        for ty in 0..display_height {
            for tx in 0..display_width {
                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                if let Some(cell) = buf.cell_mut((x_offset + tx, y_offset + ty)) {
                    cell.set_char('▀');
                    cell.set_fg(sample_pixel(bitmap, src_x, src_y_top));
                    cell.set_bg(sample_pixel(bitmap, src_x, src_y_bottom));
                }
            }
        }
    }
}

/// Largest cell size that keeps the aspect ratio; each cell covers two
/// vertical pixels
fn fit(width: u32, height: u32, area: Rect) -> (u16, u16) {
    let aspect = width as f64 / height as f64;
    let term_width = area.width as f64;
    let term_height = area.height as f64 * 2.0;

    if term_width / term_height > aspect {
        // Terminal is wider - fit to height
        ((term_height * aspect) as u16, area.height)
    } else {
        // Terminal is taller - fit to width
        (area.width, (term_width / aspect / 2.0) as u16)
    }
}

fn sample_pixel(bitmap: &Bitmap, x: u32, y: u32) -> Color {
    let [r, g, b, _] = bitmap.pixel(x, y);
    Color::Rgb(r, g, b)
}

fn render_centered(text: &str, area: Rect, buf: &mut Buffer, style: Style) {
    let width = text.chars().count() as u16;
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height / 2;
    if y < area.y + area.height && x < area.x + area.width {
        buf.set_string(x, y, text, style);
    }
}

/// Filter name shown near the top while the label is visible
struct LabelOverlay<'a> {
    label: &'a LabelState,
}

impl Widget for LabelOverlay<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if !self.label.visible || area.height < 2 {
            return;
        }
        let text = format!(" {} ", self.label.text);
        let top = Rect {
            x: area.x,
            y: area.y + 1,
            width: area.width,
            height: 1,
        };
        let style = Style::default().fg(Color::Black).bg(Color::White);
        let width = text.chars().count() as u16;
        let x = top.x + top.width.saturating_sub(width) / 2;
        buf.set_string(x, top.y, &text, style);
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Fill background
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(
            area.x,
            area.y,
            text,
            Style::default().fg(Color::White).bg(Color::DarkGray),
        );
    }
}
