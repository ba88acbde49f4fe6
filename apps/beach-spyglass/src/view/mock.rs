use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{DisplaySurface, SurfaceOptions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOp {
    Open(SurfaceOptions),
    Write(Vec<u8>),
    Reset,
    Clear,
    Resize { rows: u16, cols: u16 },
    Close,
}

#[derive(Debug, Default)]
struct MockState {
    ops: Vec<SurfaceOp>,
    content: Vec<u8>,
    rows: u16,
    cols: u16,
    options: Option<SurfaceOptions>,
    fail_writes: bool,
}

/// In-memory surface that records every operation. Content is the raw byte
/// stream written since the last clear or reset.
pub struct MockSurface {
    state: Arc<Mutex<MockState>>,
}

/// Shared view into a [`MockSurface`] that stays usable after the surface is
/// moved into a controller.
#[derive(Clone)]
pub struct SurfaceProbe {
    state: Arc<Mutex<MockState>>,
}

impl MockSurface {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                rows,
                cols,
                ..MockState::default()
            })),
        }
    }

    pub fn probe(&self) -> SurfaceProbe {
        SurfaceProbe {
            state: self.state.clone(),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DisplaySurface for MockSurface {
    fn open(&mut self, options: SurfaceOptions) -> io::Result<()> {
        let mut state = self.state();
        state.options = Some(options);
        state.ops.push(SurfaceOp::Open(options));
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.state();
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failure"));
        }
        state.content.extend_from_slice(bytes);
        state.ops.push(SurfaceOp::Write(bytes.to_vec()));
        Ok(())
    }

    fn reset(&mut self) -> io::Result<()> {
        let mut state = self.state();
        state.content.clear();
        state.ops.push(SurfaceOp::Reset);
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        let mut state = self.state();
        state.content.clear();
        state.ops.push(SurfaceOp::Clear);
        Ok(())
    }

    fn resize(&mut self, rows: u16, cols: u16) -> io::Result<()> {
        let mut state = self.state();
        state.rows = rows;
        state.cols = cols;
        state.ops.push(SurfaceOp::Resize { rows, cols });
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.state().ops.push(SurfaceOp::Close);
        Ok(())
    }
}

impl SurfaceProbe {
    pub fn ops(&self) -> Vec<SurfaceOp> {
        lock(&self.state).ops.clone()
    }

    pub fn content(&self) -> Vec<u8> {
        lock(&self.state).content.clone()
    }

    pub fn dimensions(&self) -> (u16, u16) {
        let state = lock(&self.state);
        (state.rows, state.cols)
    }

    pub fn options(&self) -> Option<SurfaceOptions> {
        lock(&self.state).options
    }

    pub fn fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }
}
