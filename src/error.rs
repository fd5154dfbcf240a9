use core::alloc::Layout;

use snafu::Snafu;

/// The error type for fallible allocation in the containers of this crate.
///
/// Returned by every `try_*` operation. A call that fails with this error
/// leaves the container's contents, order, and length exactly as they were
/// before the call.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TryReserveError {
    /// The requested capacity exceeds what the index table can address.
    #[snafu(display("capacity overflow"))]
    CapacityOverflow,

    /// The memory backend could not satisfy an allocation.
    #[snafu(display(
        "memory allocation of {} bytes (align {}) failed",
        layout.size(),
        layout.align()
    ))]
    AllocError {
        /// The layout of the rejected allocation.
        layout: Layout,
    },
}

/// Converts an allocation error into the infallible-API behavior used by the
/// standard collections: panic on overflow, `handle_alloc_error` on
/// exhaustion.
#[cold]
#[inline(never)]
pub(crate) fn handle_error(error: TryReserveError) -> ! {
    match error {
        TryReserveError::CapacityOverflow => panic!("capacity overflow"),
        TryReserveError::AllocError { layout } => alloc::alloc::handle_alloc_error(layout),
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            TryReserveError::CapacityOverflow.to_string(),
            "capacity overflow"
        );

        let layout = Layout::from_size_align(64, 8).unwrap();
        assert_eq!(
            TryReserveError::AllocError { layout }.to_string(),
            "memory allocation of 64 bytes (align 8) failed"
        );
    }

    #[test]
    #[should_panic(expected = "capacity overflow")]
    fn overflow_panics() {
        handle_error(TryReserveError::CapacityOverflow);
    }
}
