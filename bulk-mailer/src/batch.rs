//! Batch planning.
//!
//! Splits the recipient list into contiguous, order-preserving slices no larger
//! than the provider's per-request limit.

use crate::error::BulkSendError;
use crate::message::Recipient;

/// A contiguous slice of the recipient list, sent as one provider call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Batch<'a> {
    /// Position of this batch in the plan
    pub index: usize,
    pub recipients: &'a [Recipient],
}

impl<'a> Batch<'a> {
    pub fn new(index: usize, recipients: &'a [Recipient]) -> Self {
        Self { index, recipients }
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}

/// Partition `recipients` into batches of at most `max_batch_size`.
///
/// Every batch is full except possibly the last. Concatenating the batches
/// reproduces `recipients` exactly.
pub fn plan(recipients: &[Recipient], max_batch_size: usize) -> Result<Vec<Batch<'_>>, BulkSendError> {
    if recipients.is_empty() {
        return Err(BulkSendError::InvalidInput(
            "Missing recipients[]".to_string(),
        ));
    }
    if max_batch_size == 0 {
        return Err(BulkSendError::InvalidInput(
            "Batch size must be positive".to_string(),
        ));
    }

    Ok(recipients
        .chunks(max_batch_size)
        .enumerate()
        .map(|(index, chunk)| Batch::new(index, chunk))
        .collect())
}
