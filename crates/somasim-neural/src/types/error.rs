// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for solver operations

/// Error taxonomy shared by the marshaller, the kernels and the window chainer.
///
/// Validation failures (`InvalidBatch`, `InvalidWindow`) are raised before any
/// device interaction. `LayoutMismatch` is an internal-consistency violation
/// between a kernel and the marshaller and is never recovered by truncation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolverError {
    /// Empty or malformed input batch
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    /// Time window fields out of range, or a window unusable for the requested operation
    #[error("Invalid time window: {0}")]
    InvalidWindow(String),

    /// Device or runtime error during a window dispatch
    #[error("Kernel failure: {0}")]
    KernelFailure(String),

    /// A result array does not have the length implied by the window and batch
    #[error("Layout mismatch for field '{field}': expected {expected} values, got {actual}")]
    LayoutMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = core::result::Result<T, SolverError>;
pub type Error = SolverError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_mismatch_message_names_field() {
        let err = SolverError::LayoutMismatch {
            field: "V".to_string(),
            expected: 30,
            actual: 29,
        };
        let msg = err.to_string();
        assert!(msg.contains("'V'"));
        assert!(msg.contains("30"));
        assert!(msg.contains("29"));
    }
}
