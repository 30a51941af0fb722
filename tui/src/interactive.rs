use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event as TermEvent, KeyCode, KeyEventKind, KeyModifiers,
        MouseButton, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;
use std::time::{Duration, Instant};

use recap_core::input::{NavKey, SwipeTracker};
use recap_core::RecapSession;
use recap_protocol::Op;

use crate::app::Viewer;

const FRAME: Duration = Duration::from_millis(33);
/// Rough pixel size of one terminal cell, so swipe thresholds keep their meaning.
const CELL_PX: (f64, f64) = (8.0, 16.0);

/// Runs the recap viewer until the user quits or the session ends.
pub async fn run_viewer(session: RecapSession, theme_keys: Vec<String>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &session, Viewer::new(theme_keys)).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop<B: Backend>(terminal: &mut Terminal<B>, session: &RecapSession, mut viewer: Viewer) -> Result<()> {
    let mut swipe = SwipeTracker::default();

    let size = terminal.size()?;
    let mut width = size.width;
    session.submit(resize_op(size.width, size.height)).await?;

    while viewer.running {
        let now = Instant::now();
        while let Some(ev) = session.try_next_event() {
            viewer.apply(ev, now);
        }
        viewer.tick(now);
        terminal.draw(|f| viewer.draw(f, now))?;

        let polled = tokio::task::spawn_blocking(|| -> io::Result<Option<TermEvent>> {
            if event::poll(FRAME)? {
                Ok(Some(event::read()?))
            } else {
                Ok(None)
            }
        })
        .await??;

        if let Some(TermEvent::Resize(columns, _)) = polled {
            width = columns;
        }
        let Some(op) = polled.and_then(|ev| input_op(ev, &viewer, &mut swipe, width)) else {
            continue;
        };
        if let Err(e) = session.submit(op).await {
            tracing::warn!("session closed: {e}");
            viewer.running = false;
        }
    }
    Ok(())
}

fn resize_op(columns: u16, rows: u16) -> Op {
    Op::Resize {
        width: f64::from(columns) * CELL_PX.0,
        height: f64::from(rows) * CELL_PX.1,
    }
}

/// Maps a terminal event to a session op. `width` is the terminal width in columns.
fn input_op(event: TermEvent, viewer: &Viewer, swipe: &mut SwipeTracker, width: u16) -> Option<Op> {
    match event {
        TermEvent::Key(key) if key.kind == KeyEventKind::Press => match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Op::Shutdown),
            KeyCode::Char('q') | KeyCode::Esc => Some(Op::Shutdown),
            KeyCode::Left | KeyCode::Char('h') => Some(NavKey::ArrowLeft.op()),
            KeyCode::Right | KeyCode::Char('l') => Some(NavKey::ArrowRight.op()),
            KeyCode::Char(c @ '1'..='9') => Some(Op::ChooseOption { option: (c as usize) - ('1' as usize) }),
            KeyCode::Enter => Some(Op::SubmitQuiz),
            KeyCode::Char('t') => viewer.next_theme().map(|key| Op::SelectTheme { key }),
            KeyCode::Char('d') => Some(Op::Download),
            KeyCode::Home if viewer.total() > 0 => Some(Op::JumpTo { index: 0 }),
            KeyCode::End if viewer.total() > 0 => Some(Op::JumpTo { index: viewer.total() - 1 }),
            _ => None,
        },
        TermEvent::Mouse(mouse) => {
            let (x, y) = (f64::from(mouse.column) * CELL_PX.0, f64::from(mouse.row) * CELL_PX.1);
            match mouse.kind {
                MouseEventKind::Down(MouseButton::Left) => {
                    if let Some(index) = viewer.jump_target(mouse.column, mouse.row, width) {
                        return Some(Op::JumpTo { index });
                    }
                    swipe.begin(x, y);
                    None
                }
                MouseEventKind::Up(MouseButton::Left) => swipe.end(x, y).map(|dir| dir.op()),
                _ => None,
            }
        }
        TermEvent::FocusLost => {
            swipe.cancel();
            None
        }
        TermEvent::Resize(columns, rows) => Some(resize_op(columns, rows)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, MouseEvent};
    use recap_protocol::Event;

    fn key(code: KeyCode) -> TermEvent {
        TermEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> TermEvent {
        TermEvent::Mouse(MouseEvent { kind, column, row, modifiers: KeyModifiers::NONE })
    }

    #[test]
    fn keys_map_to_ops() {
        let viewer = Viewer::new(Vec::new());
        let mut swipe = SwipeTracker::default();
        assert_eq!(input_op(key(KeyCode::Right), &viewer, &mut swipe, 80), Some(Op::Next));
        assert_eq!(input_op(key(KeyCode::Left), &viewer, &mut swipe, 80), Some(Op::Prev));
        assert_eq!(input_op(key(KeyCode::Char('2')), &viewer, &mut swipe, 80), Some(Op::ChooseOption { option: 1 }));
        assert_eq!(input_op(key(KeyCode::Enter), &viewer, &mut swipe, 80), Some(Op::SubmitQuiz));
        assert_eq!(input_op(key(KeyCode::Char('q')), &viewer, &mut swipe, 80), Some(Op::Shutdown));
        assert_eq!(input_op(key(KeyCode::Char('t')), &viewer, &mut swipe, 80), None);
    }

    #[test]
    fn mouse_drag_swipes() {
        let viewer = Viewer::new(Vec::new());
        let mut swipe = SwipeTracker::default();
        let down = MouseEventKind::Down(MouseButton::Left);
        let up = MouseEventKind::Up(MouseButton::Left);
        assert_eq!(input_op(mouse(down, 40, 10), &viewer, &mut swipe, 80), None);
        assert_eq!(input_op(mouse(up, 20, 10), &viewer, &mut swipe, 80), Some(Op::Next));
        assert_eq!(input_op(mouse(down, 20, 10), &viewer, &mut swipe, 80), None);
        assert_eq!(input_op(mouse(up, 22, 10), &viewer, &mut swipe, 80), None);
    }

    #[test]
    fn gauge_click_and_home_end_jump() {
        let mut viewer = Viewer::new(Vec::new());
        let mut swipe = SwipeTracker::default();
        let down = MouseEventKind::Down(MouseButton::Left);
        assert_eq!(input_op(key(KeyCode::End), &viewer, &mut swipe, 80), None);

        viewer.apply(Event::SessionStarted { total: 7 }, Instant::now());
        assert_eq!(input_op(mouse(down, 78, 1), &viewer, &mut swipe, 80), Some(Op::JumpTo { index: 6 }));
        assert_eq!(input_op(mouse(down, 1, 1), &viewer, &mut swipe, 80), Some(Op::JumpTo { index: 0 }));
        assert_eq!(input_op(key(KeyCode::Home), &viewer, &mut swipe, 80), Some(Op::JumpTo { index: 0 }));
        assert_eq!(input_op(key(KeyCode::End), &viewer, &mut swipe, 80), Some(Op::JumpTo { index: 6 }));

        // Below the gauge a press still starts a swipe.
        assert_eq!(input_op(mouse(down, 40, 10), &viewer, &mut swipe, 80), None);
        let up = MouseEventKind::Up(MouseButton::Left);
        assert_eq!(input_op(mouse(up, 20, 10), &viewer, &mut swipe, 80), Some(Op::Next));
    }

    #[test]
    fn resize_reports_approximate_pixels() {
        assert_eq!(resize_op(150, 40), Op::Resize { width: 1200.0, height: 640.0 });
    }
}
