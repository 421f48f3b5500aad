//! Completion signal for asynchronously loaded meshes.
//!
//! The asset loader keeps the [`LoadTrigger`] and fires it when the mesh is
//! ready, from any thread. The container keeps the [`MeshLoad`] and polls
//! it once per frame, so the object goes live on the next tick after
//! completion and never in the middle of one.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};

/// Observed state of a load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    /// Still loading.
    Pending,
    /// Mesh is ready.
    Loaded,
    /// The loader went away without completing.
    Abandoned,
}

/// Consumer side of a mesh load.
#[derive(Debug)]
pub struct MeshLoad {
    rx: Option<Receiver<()>>,
    status: LoadStatus,
}

impl MeshLoad {
    /// Starts a load, returning the signal and the loader's trigger.
    #[must_use]
    pub fn pending() -> (Self, LoadTrigger) {
        let (tx, rx) = bounded(1);
        (Self { rx: Some(rx), status: LoadStatus::Pending }, LoadTrigger(tx))
    }

    /// A signal that is already complete.
    #[must_use]
    pub fn loaded() -> Self {
        Self { rx: None, status: LoadStatus::Loaded }
    }

    /// Checks for completion without blocking.
    pub fn poll(&mut self) -> LoadStatus {
        if let Some(rx) = &self.rx {
            match rx.try_recv() {
                Ok(()) => self.status = LoadStatus::Loaded,
                Err(TryRecvError::Empty) => return LoadStatus::Pending,
                Err(TryRecvError::Disconnected) => self.status = LoadStatus::Abandoned,
            }
            self.rx = None;
        }
        self.status
    }

    /// Last observed status.
    #[must_use]
    pub fn status(&self) -> LoadStatus {
        self.status
    }
}

/// Producer side of a mesh load.
#[derive(Debug)]
pub struct LoadTrigger(Sender<()>);

impl LoadTrigger {
    /// Signals that the mesh finished loading.
    pub fn complete(self) {
        // The receiver may already be gone if the object was deleted.
        let _ = self.0.try_send(());
    }
}
