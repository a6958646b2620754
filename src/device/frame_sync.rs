use std::sync::Arc;

use super::Generation;

/// Swaps device generations at frame boundaries.
///
/// A submitted generation only becomes visible at the next `begin_frame`.
/// The generation it replaces is kept alive for one more frame, so traversals
/// still running against it from the previous frame never see freed memory.
#[derive(Debug, Default)]
pub struct FrameSync {
    active: Option<Arc<Generation>>,
    pending: Option<Arc<Generation>>,
    retiring: Option<Arc<Generation>>,
    frame: u64,
}

impl FrameSync {
    pub fn new() -> FrameSync {
        FrameSync::default()
    }

    /// Queues a generation to become active at the next frame boundary.
    /// Replaces a generation that is still pending, that one was never visible to traversals.
    pub fn submit(&mut self, generation: Generation) {
        if let Some(replaced) = self.pending.replace(Arc::new(generation)) {
            log::debug!("Dropping pending generation {} before activation", replaced.id());
        }
    }

    /// Frame boundary: releases the generation retired at the previous boundary,
    /// then activates the pending generation, if any.
    /// Returns the number of the frame that starts.
    pub fn begin_frame(&mut self) -> u64 {
        self.frame += 1;

        if let Some(released) = self.retiring.take() {
            log::debug!("Releasing generation {} at frame {}", released.id(), self.frame);
        }

        if let Some(pending) = self.pending.take() {
            log::debug!("Activating generation {} at frame {}", pending.id(), self.frame);
            self.retiring = self.active.replace(pending);
        }

        self.frame
    }

    /// Generation traversals of the current frame should use.
    pub fn active(&self) -> Option<&Arc<Generation>> {
        self.active.as_ref()
    }

    pub fn pending(&self) -> Option<&Arc<Generation>> {
        self.pending.as_ref()
    }

    pub fn retiring(&self) -> Option<&Arc<Generation>> {
        self.retiring.as_ref()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}
