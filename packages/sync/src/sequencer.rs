//! Epoch issuance for synchronization attempts.

use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one synchronization attempt.
pub type Epoch = u64;

/// Issues strictly increasing epochs and decides which one is current.
///
/// Issuing a new epoch immediately makes every earlier epoch stale, whether
/// or not its fetch has resolved. The last *issued* epoch wins, regardless
/// of the order in which fetches resolve.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    last_issued: AtomicU64,
}

impl RequestSequencer {
    /// Creates a sequencer that has issued nothing yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_issued: AtomicU64::new(0),
        }
    }

    /// Issues the next epoch. The first epoch is `1`.
    pub fn next_epoch(&self) -> Epoch {
        self.last_issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `epoch` is the last one issued.
    #[must_use]
    pub fn is_current(&self, epoch: Epoch) -> bool {
        epoch == self.current()
    }

    /// The last issued epoch, or `0` before the first call to
    /// [`Self::next_epoch`].
    #[must_use]
    pub fn current(&self) -> Epoch {
        self.last_issued.load(Ordering::SeqCst)
    }
}
