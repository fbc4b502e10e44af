//! Player — the interactive terminal front end.
//!
//! Owns a [`SpinViewer`], feeds it mouse and keyboard input, fetches frames
//! as the viewer allows, and draws whatever the viewer's render plan says.
//! All callbacks run on one thread; only asset fetching happens elsewhere.

pub mod adapters;

use std::collections::HashMap;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::{cursor, execute, queue, style, terminal};
use image::RgbaImage;

use crate::assets::{FrameFetcher, SnapshotResolver};
use crate::config::{KeyBindings, ViewerConfig};
use crate::engine::input::PressHandler;
use crate::engine::keys::KeyRouter;
use crate::engine::{LoadHandle, SpinViewer};
use crate::menubar::{VIEWER_HINTS, render_menubar};
use crate::renderer::{Cell, Compositor, Grid, RenderSink, diff};
use crate::types::RenderPlan;
use adapters::{Canvas, handle_mouse};

/// Rows reserved above the canvas for the menu bar.
const CANVAS_OFFSET: u16 = 1;
const POLL_INTERVAL: Duration = Duration::from_millis(30);
const MIN_WIDTH: u16 = 16;
const MIN_HEIGHT: u16 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Redraw,
    Resized,
    Quit,
}

/// Puts the terminal into raw, alternate-screen, mouse-capturing mode and
/// restores it on drop, including when unwinding from a panic.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn acquire() -> Result<Self> {
        terminal::enable_raw_mode()?;
        let guard = TerminalGuard;
        execute!(
            io::stdout(),
            terminal::EnterAlternateScreen,
            event::EnableMouseCapture,
            event::EnableFocusChange,
            cursor::Hide,
            terminal::Clear(terminal::ClearType::All),
        )?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(
            io::stdout(),
            event::DisableFocusChange,
            event::DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen,
        );
        let _ = terminal::disable_raw_mode();
    }
}

pub struct Player {
    viewer: SpinViewer,
    config: ViewerConfig,
    keys: KeyRouter,
    loads: LoadHandle,
    fetcher: FrameFetcher,
    sink: TerminalSink,
    started: Instant,
}

impl Player {
    pub fn new(config: ViewerConfig) -> Result<Self> {
        let viewer = SpinViewer::new(&config)?;
        let loads = viewer.load_handle();
        let fetcher = FrameFetcher::new(config.base_path.clone(), Box::new(SnapshotResolver));
        Ok(Player {
            viewer,
            config,
            keys: KeyRouter::new(),
            loads,
            fetcher,
            sink: TerminalSink::new(),
            started: Instant::now(),
        })
    }

    /// Run the viewer until the user quits. The terminal is restored on
    /// every exit path.
    pub fn play(&mut self) -> Result<()> {
        let (term_w, term_h) = terminal::size()?;
        if term_w < MIN_WIDTH || term_h < MIN_HEIGHT {
            bail!(
                "Terminal too small: need {MIN_WIDTH}x{MIN_HEIGHT}, have {term_w}x{term_h}"
            );
        }

        let _terminal = TerminalGuard::acquire()?;
        self.viewer.activate_keys(&self.keys);
        let result = self.run_loop();
        self.viewer.deactivate_keys();
        result
    }

    fn run_loop(&mut self) -> Result<()> {
        self.schedule_loads();
        self.sink.invalidate();
        self.present()?;

        loop {
            let mut dirty = self.pump_loads();
            if event::poll(POLL_INTERVAL)? {
                match self.handle_event(event::read()?)? {
                    Flow::Continue => {}
                    Flow::Redraw | Flow::Resized => dirty = true,
                    Flow::Quit => break,
                }
            }
            if dirty {
                self.schedule_loads();
                self.present()?;
            }
        }
        Ok(())
    }

    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn canvas(&self) -> Result<Canvas> {
        let (w, h) = terminal::size()?;
        Ok(Canvas {
            top: CANVAS_OFFSET,
            width: w,
            // One row above for the menu bar, one below for the status line.
            height: h.saturating_sub(CANVAS_OFFSET + 1),
        })
    }

    fn handle_event(&mut self, event: Event) -> Result<Flow> {
        let canvas = self.canvas()?;
        let now = self.now_ms();
        let flow = route_event(
            &mut self.viewer,
            &self.keys,
            &self.config.key_bindings,
            event,
            canvas,
            now,
        );
        if flow == Flow::Resized {
            self.sink.invalidate();
            return Ok(Flow::Redraw);
        }
        Ok(flow)
    }

    fn schedule_loads(&mut self) {
        for index in self.viewer.frames_to_start() {
            self.fetcher.request(index);
        }
    }

    /// Apply finished fetches. Returns whether anything changed.
    fn pump_loads(&mut self) -> bool {
        let mut changed = false;
        for fetched in self.fetcher.drain() {
            match fetched.image {
                Ok(image) => {
                    self.sink.frames.insert(fetched.index, image);
                    changed |= self.loads.mark_loaded(fetched.index);
                }
                Err(e) => log::warn!("frame {} unavailable: {e:#}", fetched.index),
            }
        }
        changed
    }

    fn present(&mut self) -> Result<()> {
        let plan = self.viewer.render_plan();
        self.sink.present(&plan)
    }
}

/// Feed one terminal event to the viewer and say what the screen needs.
fn route_event(
    viewer: &mut SpinViewer,
    keys: &KeyRouter,
    bindings: &KeyBindings,
    event: Event,
    canvas: Canvas,
    now_ms: u64,
) -> Flow {
    let before = viewer.current_index();
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => {
            if bindings.is_quit(&key) {
                return Flow::Quit;
            }
            keys.dispatch(bindings.translate(&key));
        }
        Event::Mouse(mouse) => {
            let reduced_speed = viewer.reduced_speed();
            handle_mouse(&mut *viewer, &mouse, canvas, reduced_speed, now_ms);
        }
        // Leaving the window ends the drag like a release would.
        Event::FocusLost => viewer.press_end(),
        Event::Resize(_, _) => return Flow::Resized,
        _ => {}
    }
    redraw_if(viewer.current_index() != before)
}

fn redraw_if(changed: bool) -> Flow {
    if changed { Flow::Redraw } else { Flow::Continue }
}

/// Draws render plans to stdout, sending only changed cells between frames.
struct TerminalSink {
    frames: HashMap<usize, RgbaImage>,
    compositor: Compositor,
    screen: Option<Grid>,
}

impl TerminalSink {
    fn new() -> Self {
        TerminalSink {
            frames: HashMap::new(),
            compositor: Compositor::new(),
            screen: None,
        }
    }

    /// Force the next present to repaint everything.
    fn invalidate(&mut self) {
        self.screen = None;
    }
}

impl RenderSink for TerminalSink {
    fn present(&mut self, plan: &RenderPlan) -> Result<()> {
        let (w, h) = terminal::size()?;
        let canvas_h = h.saturating_sub(CANVAS_OFFSET + 1);
        let grid = self.compositor.compose(plan, &self.frames, w, canvas_h);
        let mut stdout = io::stdout();

        match &self.screen {
            Some(prev) if same_shape(prev, &grid) => {
                for change in diff(prev, &grid) {
                    queue!(stdout, cursor::MoveTo(change.x, change.y + CANVAS_OFFSET))?;
                    print_cell(&mut stdout, &change.cell)?;
                }
            }
            _ => {
                queue!(stdout, terminal::Clear(terminal::ClearType::All))?;
                render_menubar(&mut stdout, 0, VIEWER_HINTS)?;
                for (y, row) in grid.iter().enumerate() {
                    queue!(stdout, cursor::MoveTo(0, y as u16 + CANVAS_OFFSET))?;
                    for cell in row {
                        print_cell(&mut stdout, cell)?;
                    }
                }
            }
        }

        let status = format!(
            " Frame {}/{} | loaded {}% ",
            plan.active_index + 1,
            plan.tiers.len(),
            plan.percent_loaded,
        );
        let mut cs = style::ContentStyle::default();
        cs.attributes.set(style::Attribute::Dim);
        queue!(
            stdout,
            cursor::MoveTo(0, canvas_h + CANVAS_OFFSET),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::PrintStyledContent(style::StyledContent::new(cs, status)),
        )?;
        stdout.flush()?;

        self.screen = Some(grid);
        Ok(())
    }
}

fn same_shape(a: &Grid, b: &Grid) -> bool {
    a.len() == b.len() && a.first().map(Vec::len) == b.first().map(Vec::len)
}

fn print_cell(out: &mut impl Write, cell: &Cell) -> Result<()> {
    let mut cs = style::ContentStyle::default();
    cs.foreground_color = Some(to_ct_color(cell.fg));
    cs.background_color = Some(to_ct_color(cell.bg));
    if cell.bold {
        cs.attributes.set(style::Attribute::Bold);
    }
    queue!(out, style::PrintStyledContent(style::StyledContent::new(cs, cell.ch)))?;
    Ok(())
}

fn to_ct_color(c: crate::renderer::Rgb) -> style::Color {
    style::Color::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{
        KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    };

    use super::*;

    const CANVAS: Canvas = Canvas {
        top: CANVAS_OFFSET,
        width: 720,
        height: 40,
    };

    fn mouse(kind: MouseEventKind, column: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row: 10,
            modifiers: KeyModifiers::NONE,
        })
    }

    fn setup() -> (SpinViewer, KeyRouter, KeyBindings) {
        let config = ViewerConfig::default();
        let mut viewer = SpinViewer::new(&config).unwrap();
        let keys = KeyRouter::new();
        viewer.activate_keys(&keys);
        (viewer, keys, config.key_bindings)
    }

    #[test]
    fn focus_loss_ends_the_drag() {
        let (mut viewer, keys, bindings) = setup();
        let down = mouse(MouseEventKind::Down(MouseButton::Left), 100);
        assert_eq!(route_event(&mut viewer, &keys, &bindings, down, CANVAS, 0), Flow::Continue);
        assert!(viewer.is_dragging());

        let flow = route_event(&mut viewer, &keys, &bindings, Event::FocusLost, CANVAS, 5);
        assert_eq!(flow, Flow::Continue);
        assert!(!viewer.is_dragging());

        // Motion after the drag ended no longer spins.
        let drag = mouse(MouseEventKind::Drag(MouseButton::Left), 130);
        assert_eq!(route_event(&mut viewer, &keys, &bindings, drag, CANVAS, 9), Flow::Continue);
        assert_eq!(viewer.current_index(), 0);
    }

    #[test]
    fn drag_and_keys_request_redraws() {
        let (mut viewer, keys, bindings) = setup();
        route_event(&mut viewer, &keys, &bindings, mouse(MouseEventKind::Down(MouseButton::Left), 100), CANVAS, 0);
        let flow = route_event(&mut viewer, &keys, &bindings, mouse(MouseEventKind::Drag(MouseButton::Left), 130), CANVAS, 5);
        assert_eq!(flow, Flow::Redraw);
        assert_eq!(viewer.current_index(), 69);

        let left = Event::Key(KeyEvent::new(KeyCode::Left, KeyModifiers::NONE));
        assert_eq!(route_event(&mut viewer, &keys, &bindings, left, CANVAS, 6), Flow::Redraw);
        assert_eq!(viewer.current_index(), 70);
    }

    #[test]
    fn quit_and_resize_are_reported() {
        let (mut viewer, keys, bindings) = setup();
        let quit = Event::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE));
        assert_eq!(route_event(&mut viewer, &keys, &bindings, quit, CANVAS, 0), Flow::Quit);
        assert_eq!(
            route_event(&mut viewer, &keys, &bindings, Event::Resize(80, 24), CANVAS, 0),
            Flow::Resized
        );
        assert_eq!(
            route_event(&mut viewer, &keys, &bindings, Event::FocusGained, CANVAS, 0),
            Flow::Continue
        );
    }
}
