use super::*;
use std::time::Duration;

/// Cap on terminal events drained per frame so a burst (fast typing, huge
/// paste split into events) cannot starve rendering.
const MAX_EVENTS_PER_FRAME: usize = 64;

const ACTIVE_POLL: Duration = Duration::from_millis(33);
const IDLE_POLL: Duration = Duration::from_millis(100);
const WHEEL_STEP: u16 = 3;

pub(crate) fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let mut app = App::new();
    let mut needs_draw = true;

    loop {
        if app.poll_transport() {
            needs_draw = true;
        }

        if needs_draw {
            let size = terminal.size().context("failed to query terminal size")?;
            app.update_viewport(size.width, size.height);
            app.ensure_render_cache();
            terminal
                .draw(|f| ui::draw(f, &app))
                .context("failed to draw frame")?;
            needs_draw = false;
        }

        if app.should_quit {
            break;
        }

        // Poll faster while a reply is streaming so fragments show promptly.
        let timeout = if app.awaiting_reply {
            ACTIVE_POLL
        } else {
            IDLE_POLL
        };

        if event::poll(timeout).context("failed to poll terminal events")? {
            let mut wheel_delta: i32 = 0;
            let mut processed = 0usize;
            loop {
                match event::read().context("failed to read terminal event")? {
                    Event::Key(key) => {
                        if key.kind != KeyEventKind::Release {
                            app.handle_key(key);
                        }
                    }
                    Event::Mouse(mouse) => match mouse.kind {
                        MouseEventKind::ScrollUp => wheel_delta -= 1,
                        MouseEventKind::ScrollDown => wheel_delta += 1,
                        _ => {}
                    },
                    Event::Paste(text) => app.handle_paste_event(&text),
                    Event::Resize(..) => {}
                    _ => {}
                }
                needs_draw = true;
                processed += 1;
                if processed >= MAX_EVENTS_PER_FRAME
                    || !event::poll(Duration::from_millis(0))
                        .context("failed to poll terminal events")?
                {
                    break;
                }
            }
            if wheel_delta < 0 {
                app.scroll_up(wheel_delta.unsigned_abs() as u16 * WHEEL_STEP);
            } else if wheel_delta > 0 {
                app.scroll_down(wheel_delta as u16 * WHEEL_STEP);
            }
        }
    }

    app.persist_session();
    Ok(())
}
