use std::io::{self, Write};

use crossterm::{
    cursor::{MoveTo, Show},
    event::DisableMouseCapture,
    execute,
    terminal::{
        Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, SetSize, disable_raw_mode,
        enable_raw_mode,
    },
};
use tracing::{debug, warn};

use super::{DisplaySurface, SurfaceOptions};

// RIS: full terminal reset (modes, charsets, tab stops).
const FULL_RESET: &[u8] = b"\x1bc";

/// Mirrors onto a local terminal through crossterm. Stdin is never read; raw
/// mode keeps the local tty from echoing keystrokes over the mirrored view,
/// and the alternate screen has no local scrollback to scroll.
pub struct TerminalSurface<W: Write + Send> {
    out: W,
    raw_mode: bool,
    alternate_screen: bool,
    tty: bool,
}

impl TerminalSurface<io::Stdout> {
    pub fn stdout() -> Self {
        use std::io::IsTerminal;
        let tty = io::stdout().is_terminal() && io::stdin().is_terminal();
        Self::new(io::stdout(), tty)
    }
}

impl<W: Write + Send> TerminalSurface<W> {
    /// `tty` controls whether raw mode is toggled on the process terminal.
    pub fn new(out: W, tty: bool) -> Self {
        Self {
            out,
            raw_mode: false,
            alternate_screen: false,
            tty,
        }
    }

    fn restore(&mut self) -> io::Result<()> {
        if self.alternate_screen {
            execute!(self.out, Show, LeaveAlternateScreen)?;
            self.alternate_screen = false;
        }
        if self.raw_mode {
            disable_raw_mode()?;
            self.raw_mode = false;
        }
        Ok(())
    }
}

impl<W: Write + Send> DisplaySurface for TerminalSurface<W> {
    fn open(&mut self, options: SurfaceOptions) -> io::Result<()> {
        debug!(target: "spyglass::view", ?options, tty = self.tty, "opening terminal surface");
        if !options.input_enabled && self.tty {
            enable_raw_mode()?;
            self.raw_mode = true;
        }
        if !options.local_scroll {
            execute!(self.out, EnterAlternateScreen, DisableMouseCapture)?;
            self.alternate_screen = true;
        }
        execute!(self.out, Clear(ClearType::All), MoveTo(0, 0))
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)?;
        self.out.flush()
    }

    fn reset(&mut self) -> io::Result<()> {
        self.out.write_all(FULL_RESET)?;
        // RIS also drops the alternate screen and mouse modes; raw mode is
        // termios state and survives.
        if self.alternate_screen {
            execute!(self.out, EnterAlternateScreen, DisableMouseCapture)?;
        }
        execute!(
            self.out,
            Clear(ClearType::All),
            Clear(ClearType::Purge),
            MoveTo(0, 0)
        )
    }

    fn clear(&mut self) -> io::Result<()> {
        execute!(self.out, Clear(ClearType::All), MoveTo(0, 0))
    }

    fn resize(&mut self, rows: u16, cols: u16) -> io::Result<()> {
        execute!(self.out, SetSize(cols, rows))
    }

    fn close(&mut self) -> io::Result<()> {
        self.restore()
    }
}

impl<W: Write + Send> Drop for TerminalSurface<W> {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            warn!(target: "spyglass::view", error = %err, "failed to restore terminal");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn take(&self) -> Vec<u8> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|window| window == needle)
    }

    #[test]
    fn open_enters_alternate_screen_without_tty() {
        let buf = SharedBuf::default();
        let mut surface = TerminalSurface::new(buf.clone(), false);
        surface.open(SurfaceOptions::read_only()).unwrap();
        let out = buf.take();
        assert!(contains(&out, b"\x1b[?1049h"));
        assert!(!surface.raw_mode);
    }

    #[test]
    fn write_is_verbatim() {
        let buf = SharedBuf::default();
        let mut surface = TerminalSurface::new(buf.clone(), false);
        let payload = b"\x1b[1mbold\x1b[0m\xff\x00";
        surface.write(payload).unwrap();
        assert_eq!(buf.take(), payload.to_vec());
    }

    #[test]
    fn reset_purges_scrollback_and_homes_cursor() {
        let buf = SharedBuf::default();
        let mut surface = TerminalSurface::new(buf.clone(), false);
        surface.reset().unwrap();
        let out = buf.take();
        assert!(out.starts_with(FULL_RESET));
        assert!(contains(&out, b"\x1b[3J"));
        assert!(contains(&out, b"\x1b[1;1H"));
    }

    #[test]
    fn reset_keeps_a_read_only_surface_on_the_alternate_screen() {
        let buf = SharedBuf::default();
        let mut surface = TerminalSurface::new(buf.clone(), false);
        surface.open(SurfaceOptions::read_only()).unwrap();
        buf.take();
        surface.reset().unwrap();
        let out = buf.take();
        assert!(out.starts_with(FULL_RESET));
        let reentered = out
            .windows(8)
            .position(|window| window == b"\x1b[?1049h")
            .expect("alternate screen re-entered after reset");
        let cleared = out
            .windows(4)
            .position(|window| window == b"\x1b[2J")
            .unwrap();
        assert!(reentered < cleared);
        assert!(contains(&out, b"\x1b[3J"));
    }

    #[test]
    fn reset_without_alternate_screen_stays_put() {
        let buf = SharedBuf::default();
        let mut surface = TerminalSurface::new(buf.clone(), false);
        surface.reset().unwrap();
        assert!(!contains(&buf.take(), b"\x1b[?1049h"));
    }

    #[test]
    fn close_leaves_alternate_screen_once() {
        let buf = SharedBuf::default();
        let mut surface = TerminalSurface::new(buf.clone(), false);
        surface.open(SurfaceOptions::read_only()).unwrap();
        buf.take();
        surface.close().unwrap();
        assert!(contains(&buf.take(), b"\x1b[?1049l"));
        drop(surface);
        assert!(buf.take().is_empty());
    }
}
