//! Selection coordination across capture surfaces (one overlay per display).
//!
//! When the user starts dragging on one surface, every other surface must drop
//! its in-progress rectangle. This is a plain fan-out over a broadcast channel.

use tokio::sync::broadcast;

const SIGNAL_CAPACITY: usize = 16;

#[derive(Clone, Debug)]
pub struct SelectionCoordinator {
    tx: broadcast::Sender<u32>,
}

/// One capture surface's view of the coordinator.
pub struct SelectionSurface {
    display_id: u32,
    tx: broadcast::Sender<u32>,
    rx: broadcast::Receiver<u32>,
}

impl SelectionCoordinator {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self { tx }
    }

    /// Registers the overlay covering `display_id`.
    pub fn register(&self, display_id: u32) -> SelectionSurface {
        SelectionSurface {
            display_id,
            tx: self.tx.clone(),
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for SelectionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionSurface {
    pub fn display_id(&self) -> u32 {
        self.display_id
    }

    /// Announces that a selection started here; all other surfaces get told
    /// to clear theirs.
    pub fn selection_started(&self) {
        // No receivers just means no other surfaces are open.
        let _ = self.tx.send(self.display_id);
    }

    /// Drains pending signals without waiting. Returns `true` when another
    /// surface started a selection since the last call.
    pub fn should_clear(&mut self) -> bool {
        let mut clear = false;
        loop {
            match self.rx.try_recv() {
                Ok(origin) if origin != self.display_id => clear = true,
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Lagged(_)) => clear = true,
                Err(_) => break,
            }
        }
        clear
    }

    /// Waits until another surface starts a selection.
    /// Returns `false` if the channel closed.
    pub async fn cleared_by_other(&mut self) -> bool {
        loop {
            match self.rx.recv().await {
                Ok(origin) if origin != self.display_id => return true,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => return true,
                Err(broadcast::error::RecvError::Closed) => return false,
            }
        }
    }
}
