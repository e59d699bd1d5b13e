//! Batch writer states and the transition table.
//!
//! The writer is a strictly sequential state machine. Every requested
//! transition is checked by [`validate_transition`] before it takes effect:
//!
//! ```text
//! Start -> BatchStarted -> {ChangesetStarted | OperationCreated | BatchCompleted}
//! ChangesetStarted -> {OperationCreated | ChangesetCompleted}
//! OperationCreated -> {OperationCreated | OperationStreamRequested | ChangesetStarted
//!                      | ChangesetCompleted | BatchCompleted}
//! OperationStreamRequested -> OperationStreamDisposed
//! OperationStreamDisposed -> {OperationCreated | ChangesetStarted | ChangesetCompleted
//!                             | BatchCompleted}
//! ChangesetCompleted -> {ChangesetStarted | OperationCreated | BatchCompleted}
//! BatchCompleted -> (terminal)
//! ```
//!
//! `Error` can be entered from any state and only re-entered from itself.

use crate::error::BatchError;

/// The current position of a batch writer in the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum BatchWriterState {
    /// The writer was created; nothing has been written.
    #[default]
    Start,
    /// `write_start_batch` was called.
    BatchStarted,
    /// `write_start_changeset` was called.
    ChangesetStarted,
    /// An operation message was created.
    OperationCreated,
    /// The content stream of the current operation was requested and is open.
    OperationStreamRequested,
    /// The content stream of the current operation was disposed.
    OperationStreamDisposed,
    /// `write_end_changeset` was called.
    ChangesetCompleted,
    /// `write_end_batch` was called.
    BatchCompleted,
    /// A failure occurred; the writer can no longer be used.
    Error,
}

impl BatchWriterState {
    /// Get the name of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchWriterState::Start => "Start",
            BatchWriterState::BatchStarted => "BatchStarted",
            BatchWriterState::ChangesetStarted => "ChangesetStarted",
            BatchWriterState::OperationCreated => "OperationCreated",
            BatchWriterState::OperationStreamRequested => "OperationStreamRequested",
            BatchWriterState::OperationStreamDisposed => "OperationStreamDisposed",
            BatchWriterState::ChangesetCompleted => "ChangesetCompleted",
            BatchWriterState::BatchCompleted => "BatchCompleted",
            BatchWriterState::Error => "Error",
        }
    }

    /// The exhaustive set of states reachable from this one, excluding the
    /// implicit transition into `Error`.
    pub fn allowed_next(&self) -> &'static [BatchWriterState] {
        use BatchWriterState::*;

        match self {
            Start => &[BatchStarted],
            BatchStarted => &[ChangesetStarted, OperationCreated, BatchCompleted],
            ChangesetStarted => &[OperationCreated, ChangesetCompleted],
            OperationCreated => &[
                OperationCreated,
                OperationStreamRequested,
                ChangesetStarted,
                ChangesetCompleted,
                BatchCompleted,
            ],
            OperationStreamRequested => &[OperationStreamDisposed],
            OperationStreamDisposed => &[
                OperationCreated,
                ChangesetStarted,
                ChangesetCompleted,
                BatchCompleted,
            ],
            ChangesetCompleted => &[ChangesetStarted, OperationCreated, BatchCompleted],
            BatchCompleted => &[],
            Error => &[Error],
        }
    }

    /// Whether this is the terminal success state.
    pub fn is_completed(&self) -> bool {
        matches!(self, BatchWriterState::BatchCompleted)
    }

    /// Whether this is the error state.
    pub fn is_error(&self) -> bool {
        matches!(self, BatchWriterState::Error)
    }
}

impl std::fmt::Display for BatchWriterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check whether moving from `from` to `to` is allowed.
///
/// A writer already in `Error` may only re-enter `Error`. Moving into `Error`
/// is always allowed. Anything else must appear in
/// [`BatchWriterState::allowed_next`].
///
/// # Example
///
/// ```
/// use odata_batch_core::{BatchWriterState, validate_transition};
///
/// assert!(validate_transition(BatchWriterState::Start, BatchWriterState::BatchStarted).is_ok());
/// assert!(validate_transition(BatchWriterState::BatchCompleted, BatchWriterState::Error).is_ok());
/// assert!(validate_transition(BatchWriterState::Start, BatchWriterState::BatchCompleted).is_err());
/// ```
pub fn validate_transition(
    from: BatchWriterState,
    to: BatchWriterState,
) -> Result<(), BatchError> {
    if from.is_error() {
        if to.is_error() {
            return Ok(());
        }
        return Err(BatchError::InvalidTransition { from, to });
    }

    if to.is_error() {
        return Ok(());
    }

    if from.allowed_next().contains(&to) {
        Ok(())
    } else {
        Err(BatchError::InvalidTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BatchWriterState::*;

    const ALL: [BatchWriterState; 9] = [
        Start,
        BatchStarted,
        ChangesetStarted,
        OperationCreated,
        OperationStreamRequested,
        OperationStreamDisposed,
        ChangesetCompleted,
        BatchCompleted,
        Error,
    ];

    #[test]
    fn test_error_reachable_from_every_state() {
        for from in ALL {
            assert!(validate_transition(from, Error).is_ok(), "{from} -> Error");
        }
    }

    #[test]
    fn test_error_is_sticky() {
        for to in ALL {
            let result = validate_transition(Error, to);
            if to == Error {
                assert!(result.is_ok());
            } else {
                assert!(matches!(
                    result,
                    Err(BatchError::InvalidTransition { from: Error, .. })
                ));
            }
        }
    }

    #[test]
    fn test_batch_completed_is_terminal() {
        for to in ALL.into_iter().filter(|s| *s != Error) {
            assert!(validate_transition(BatchCompleted, to).is_err());
        }
    }

    #[test]
    fn test_stream_requested_only_allows_dispose() {
        for to in ALL.into_iter().filter(|s| *s != Error) {
            let result = validate_transition(OperationStreamRequested, to);
            assert_eq!(result.is_ok(), to == OperationStreamDisposed, "-> {to}");
        }
    }

    #[test]
    fn test_table_matches_state_diagram() {
        assert!(validate_transition(Start, BatchStarted).is_ok());
        assert!(validate_transition(BatchStarted, ChangesetStarted).is_ok());
        assert!(validate_transition(BatchStarted, BatchCompleted).is_ok());
        assert!(validate_transition(ChangesetStarted, ChangesetCompleted).is_ok());
        assert!(validate_transition(OperationCreated, OperationCreated).is_ok());
        assert!(validate_transition(OperationStreamDisposed, ChangesetCompleted).is_ok());
        assert!(validate_transition(ChangesetCompleted, ChangesetStarted).is_ok());

        assert!(validate_transition(Start, OperationCreated).is_err());
        assert!(validate_transition(BatchStarted, ChangesetCompleted).is_err());
        assert!(validate_transition(ChangesetStarted, ChangesetStarted).is_err());
        assert!(validate_transition(ChangesetStarted, BatchCompleted).is_err());
        assert!(validate_transition(OperationStreamDisposed, OperationStreamRequested).is_err());
    }

    #[test]
    fn test_invalid_transition_carries_pair() {
        let err = validate_transition(ChangesetStarted, BatchCompleted).unwrap_err();
        match err {
            BatchError::InvalidTransition { from, to } => {
                assert_eq!(from, ChangesetStarted);
                assert_eq!(to, BatchCompleted);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
