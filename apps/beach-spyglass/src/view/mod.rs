pub mod mock;
pub mod terminal;

use std::io;

use tracing::{debug, trace};

use crate::protocol::Command;

pub use mock::{MockSurface, SurfaceOp, SurfaceProbe};
pub use terminal::TerminalSurface;

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("display surface error: {0}")]
    Surface(#[from] io::Error),
}

/// How a surface treats local interaction once opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceOptions {
    /// Interpret and echo local keystrokes.
    pub input_enabled: bool,
    /// Let local scrolling move the visible viewport.
    pub local_scroll: bool,
}

impl SurfaceOptions {
    /// The only configuration a mirror uses: nothing local may perturb the
    /// view, since there is no channel back to the producer.
    pub const fn read_only() -> Self {
        Self {
            input_enabled: false,
            local_scroll: false,
        }
    }
}

/// The terminal emulator a mirror drives. Escape sequences in `write` are the
/// surface's business.
pub trait DisplaySurface: Send {
    fn open(&mut self, options: SurfaceOptions) -> io::Result<()>;
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;
    /// Clear screen and scrollback, home the cursor, drop modes.
    fn reset(&mut self) -> io::Result<()>;
    /// Clear the visible screen and home the cursor.
    fn clear(&mut self) -> io::Result<()>;
    fn resize(&mut self, rows: u16, cols: u16) -> io::Result<()>;
    /// Release the surface at session teardown.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: DisplaySurface + ?Sized> DisplaySurface for Box<S> {
    fn open(&mut self, options: SurfaceOptions) -> io::Result<()> {
        (**self).open(options)
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }

    fn reset(&mut self) -> io::Result<()> {
        (**self).reset()
    }

    fn clear(&mut self) -> io::Result<()> {
        (**self).clear()
    }

    fn resize(&mut self, rows: u16, cols: u16) -> io::Result<()> {
        (**self).resize(rows, cols)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Written { bytes: usize },
    Reset { bytes: usize },
    Resized { rows: u16, cols: u16 },
    Ignored,
}

/// Applies decoded commands to one display surface for the lifetime of a
/// session.
pub struct ViewController<S: DisplaySurface> {
    surface: S,
}

impl<S: DisplaySurface> ViewController<S> {
    pub fn new(mut surface: S) -> Result<Self, ViewError> {
        surface.open(SurfaceOptions::read_only())?;
        Ok(Self { surface })
    }

    pub fn apply(&mut self, command: Command) -> Result<Applied, ViewError> {
        match command {
            Command::Write(bytes) => {
                self.apply_write(&bytes)?;
                Ok(Applied::Written { bytes: bytes.len() })
            }
            Command::ResetAndWrite(bytes) => {
                self.apply_reset_and_write(&bytes)?;
                Ok(Applied::Reset { bytes: bytes.len() })
            }
            Command::ResizeAndClear { rows, cols } => {
                self.apply_resize_and_clear(rows, cols)?;
                Ok(Applied::Resized { rows, cols })
            }
            Command::Unknown { .. } => Ok(Applied::Ignored),
        }
    }

    pub fn apply_write(&mut self, bytes: &[u8]) -> Result<(), ViewError> {
        trace!(target: "spyglass::view", len = bytes.len(), "write");
        self.surface.write(bytes)?;
        Ok(())
    }

    pub fn apply_reset_and_write(&mut self, bytes: &[u8]) -> Result<(), ViewError> {
        debug!(target: "spyglass::view", len = bytes.len(), "reset and write");
        self.surface.reset()?;
        self.apply_write(bytes)
    }

    pub fn apply_resize_and_clear(&mut self, rows: u16, cols: u16) -> Result<(), ViewError> {
        debug!(target: "spyglass::view", rows, cols, "clear and resize");
        // Clear first so stale content never reflows at the new size.
        self.surface.clear()?;
        self.surface.resize(rows, cols)?;
        Ok(())
    }

    /// Blank the view after a reconnect; the remote state is unknown until
    /// the new connection sends commands.
    pub fn prepare_for_fresh_connection(&mut self) -> Result<(), ViewError> {
        debug!(target: "spyglass::view", "clearing view for fresh connection");
        self.surface.clear()?;
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), ViewError> {
        self.surface.close()?;
        Ok(())
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn controller() -> (ViewController<MockSurface>, SurfaceProbe) {
        let surface = MockSurface::new(24, 80);
        let probe = surface.probe();
        (ViewController::new(surface).unwrap(), probe)
    }

    #[test]
    fn construction_opens_read_only() {
        let (_view, probe) = controller();
        assert_eq!(
            probe.ops(),
            vec![SurfaceOp::Open(SurfaceOptions::read_only())]
        );
        assert!(!probe.options().unwrap().input_enabled);
    }

    #[test]
    fn reset_precedes_write() {
        let (mut view, probe) = controller();
        view.apply(Command::Write(Bytes::from_static(b"stale"))).unwrap();
        view.apply(Command::ResetAndWrite(Bytes::from_static(b"fresh")))
            .unwrap();
        assert_eq!(probe.content(), b"fresh");
        assert_eq!(
            &probe.ops()[2..],
            &[SurfaceOp::Reset, SurfaceOp::Write(b"fresh".to_vec())]
        );
    }

    #[test]
    fn resize_clears_before_resizing() {
        let (mut view, probe) = controller();
        view.apply(Command::Write(Bytes::from_static(b"old"))).unwrap();
        let applied = view
            .apply(Command::ResizeAndClear { rows: 40, cols: 120 })
            .unwrap();
        assert_eq!(applied, Applied::Resized { rows: 40, cols: 120 });
        assert_eq!(
            &probe.ops()[2..],
            &[SurfaceOp::Clear, SurfaceOp::Resize { rows: 40, cols: 120 }]
        );
        assert!(probe.content().is_empty());
        assert_eq!(probe.dimensions(), (40, 120));
    }

    #[test]
    fn resize_is_idempotent() {
        let (mut view, probe) = controller();
        let resize = Command::ResizeAndClear { rows: 24, cols: 80 };
        view.apply(resize.clone()).unwrap();
        let once = (probe.dimensions(), probe.content());
        view.apply(resize).unwrap();
        assert_eq!((probe.dimensions(), probe.content()), once);
    }

    #[test]
    fn unknown_commands_leave_the_surface_alone() {
        let (mut view, probe) = controller();
        view.apply(Command::Write(Bytes::from_static(b"keep"))).unwrap();
        let before = probe.ops().len();
        let applied = view.apply(Command::Unknown { opcode: Some(99) }).unwrap();
        assert_eq!(applied, Applied::Ignored);
        assert_eq!(probe.ops().len(), before);
        assert_eq!(probe.content(), b"keep");
        assert_eq!(probe.dimensions(), (24, 80));
    }

    #[test]
    fn writes_apply_in_order() {
        let (mut view, probe) = controller();
        view.apply(Command::Write(Bytes::from_static(b"A"))).unwrap();
        view.apply(Command::Write(Bytes::from_static(b"B"))).unwrap();
        assert_eq!(probe.content(), b"AB");
    }

    #[test]
    fn surface_failures_surface_as_view_errors() {
        let (mut view, probe) = controller();
        probe.fail_writes(true);
        let err = view
            .apply(Command::Write(Bytes::from_static(b"x")))
            .unwrap_err();
        assert!(matches!(err, ViewError::Surface(_)));
        probe.fail_writes(false);
        view.apply(Command::Write(Bytes::from_static(b"y"))).unwrap();
        assert_eq!(probe.content(), b"y");
    }
}
