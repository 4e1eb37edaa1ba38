use thiserror::Error;

/// Rejection reasons for [`EventProcessor::commit`](crate::EventProcessor::commit).
///
/// Every variant is a caller mistake on the commit path. A rejected commit
/// publishes nothing and leaves the reservation record live, so the caller can
/// inspect, correct, and retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommitError {
    /// No live reservation record at this handle.
    #[error("no live reservation at handle {handle}")]
    StaleHandle {
        /// The handle passed to `commit`.
        handle: usize,
    },

    /// The commit asked for more events than the reservation holds.
    #[error("commit of {requested} events exceeds the {reserved} reserved cells")]
    CountExceedsReservation {
        /// Events the caller tried to commit.
        requested: usize,
        /// Cells actually reserved.
        reserved: usize,
    },

    /// The sequence number does not identify the run at this handle.
    #[error("sequence number {given} does not match reservation at {expected}")]
    SequenceMismatch {
        /// The sequence number passed to `commit`.
        given: u64,
        /// The run's actual start sequence.
        expected: u64,
    },

    /// A cell inside the committed prefix was never filled.
    #[error("cell {index} was never filled; emplace before committing")]
    UnfilledCell {
        /// Index of the first unfilled cell.
        index: usize,
    },
}

impl CommitError {
    /// Returns `true` if the handle itself was bad (record gone or never
    /// allocated), as opposed to a fixable argument error.
    #[inline]
    pub fn is_stale_handle(&self) -> bool {
        matches!(self, Self::StaleHandle { .. })
    }
}
