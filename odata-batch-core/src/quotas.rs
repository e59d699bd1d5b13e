//! Size quotas for batch payloads.
//!
//! Quotas bound the number of parts a single batch may carry so a buggy or
//! hostile caller cannot grow a payload without limit.
//!
//! # Batch vs Changeset Quotas
//!
//! - **Parts per batch** (`max_parts_per_batch`): counts the direct children
//!   of the batch, i.e. top-level operations plus changesets.
//!
//! - **Operations per changeset** (`max_operations_per_changeset`): counts the
//!   operations inside the current changeset; the counter restarts at every
//!   changeset.

use serde::{Deserialize, Serialize};

use crate::error::BatchError;

/// Default maximum number of top-level parts in a batch.
pub const DEFAULT_MAX_PARTS_PER_BATCH: usize = 100;

/// Default maximum number of operations in a changeset.
pub const DEFAULT_MAX_OPERATIONS_PER_CHANGESET: usize = 1000;

/// Configuration for batch size quotas.
///
/// Both limits are unsigned, so negative quotas cannot be configured.
///
/// # Example
///
/// ```rust
/// use odata_batch_core::MessageQuotas;
///
/// // Library defaults (100 parts, 1000 operations per changeset)
/// let quotas = MessageQuotas::default();
///
/// // Tighter limits for untrusted callers
/// let quotas = MessageQuotas::new()
///     .max_parts_per_batch(10)
///     .max_operations_per_changeset(20);
/// assert_eq!(quotas.get_max_parts_per_batch(), 10);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageQuotas {
    /// Maximum number of top-level operations and changesets in a batch.
    max_parts_per_batch: usize,
    /// Maximum number of operations in a single changeset.
    max_operations_per_changeset: usize,
}

impl Default for MessageQuotas {
    fn default() -> Self {
        Self {
            max_parts_per_batch: DEFAULT_MAX_PARTS_PER_BATCH,
            max_operations_per_changeset: DEFAULT_MAX_OPERATIONS_PER_CHANGESET,
        }
    }
}

impl MessageQuotas {
    /// Create quotas with the library defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of top-level parts in a batch.
    pub fn max_parts_per_batch(mut self, max: usize) -> Self {
        self.max_parts_per_batch = max;
        self
    }

    /// Set the maximum number of operations in a changeset.
    pub fn max_operations_per_changeset(mut self, max: usize) -> Self {
        self.max_operations_per_changeset = max;
        self
    }

    /// Returns the maximum number of top-level parts in a batch.
    pub fn get_max_parts_per_batch(&self) -> usize {
        self.max_parts_per_batch
    }

    /// Returns the maximum number of operations in a changeset.
    pub fn get_max_operations_per_changeset(&self) -> usize {
        self.max_operations_per_changeset
    }

    /// Check a batch part count that already includes the part being added.
    pub fn check_batch_size(&self, size: usize) -> Result<(), BatchError> {
        if size > self.max_parts_per_batch {
            return Err(BatchError::MaxBatchSizeExceeded {
                max: self.max_parts_per_batch,
            });
        }
        Ok(())
    }

    /// Check a changeset operation count that already includes the operation
    /// being added.
    pub fn check_changeset_size(&self, size: usize) -> Result<(), BatchError> {
        if size > self.max_operations_per_changeset {
            return Err(BatchError::MaxChangesetSizeExceeded {
                max: self.max_operations_per_changeset,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_quotas() {
        let quotas = MessageQuotas::default();
        assert_eq!(quotas.get_max_parts_per_batch(), DEFAULT_MAX_PARTS_PER_BATCH);
        assert_eq!(
            quotas.get_max_operations_per_changeset(),
            DEFAULT_MAX_OPERATIONS_PER_CHANGESET
        );
    }

    #[test]
    fn test_builder_methods() {
        let quotas = MessageQuotas::new()
            .max_parts_per_batch(2)
            .max_operations_per_changeset(3);
        assert_eq!(quotas.get_max_parts_per_batch(), 2);
        assert_eq!(quotas.get_max_operations_per_changeset(), 3);
    }

    #[test]
    fn test_check_batch_size() {
        let quotas = MessageQuotas::new().max_parts_per_batch(2);
        assert!(quotas.check_batch_size(1).is_ok());
        assert!(quotas.check_batch_size(2).is_ok());

        let err = quotas.check_batch_size(3).unwrap_err();
        assert!(matches!(err, BatchError::MaxBatchSizeExceeded { max: 2 }));
    }

    #[test]
    fn test_check_changeset_size() {
        let quotas = MessageQuotas::new().max_operations_per_changeset(1);
        assert!(quotas.check_changeset_size(1).is_ok());

        let err = quotas.check_changeset_size(2).unwrap_err();
        assert!(matches!(err, BatchError::MaxChangesetSizeExceeded { max: 1 }));
    }

    #[test]
    fn test_zero_quota_rejects_first_part() {
        let quotas = MessageQuotas::new().max_parts_per_batch(0);
        assert!(quotas.check_batch_size(1).is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let quotas: MessageQuotas =
            serde_json::from_str(r#"{"max_parts_per_batch": 5}"#).unwrap();
        assert_eq!(quotas.get_max_parts_per_batch(), 5);
        assert_eq!(
            quotas.get_max_operations_per_changeset(),
            DEFAULT_MAX_OPERATIONS_PER_CHANGESET
        );
    }

    #[test]
    fn test_deserialize_rejects_negative() {
        let result = serde_json::from_str::<MessageQuotas>(r#"{"max_parts_per_batch": -1}"#);
        assert!(result.is_err());
    }
}
