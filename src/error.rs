use core::alloc::Layout;
use core::fmt;

/// The error type for `try_reserve` and `try_with_capacity`.
///
/// When one of these is returned the container is left exactly as it was
/// before the call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TryReserveError {
    /// The requested element count has no slot count in the capacity table,
    /// or the node store for it would exceed `isize::MAX` bytes.
    CapacityOverflow,
    /// The allocator refused to provide the node store.
    AllocError {
        /// The layout of the allocation request that failed.
        layout: Layout,
    },
}

impl fmt::Display for TryReserveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("memory allocation failed")?;
        match self {
            TryReserveError::CapacityOverflow => {
                f.write_str(" because the computed capacity exceeded the collection's maximum")
            }
            TryReserveError::AllocError { layout } => write!(
                f,
                " because the memory allocator returned an error for {} bytes",
                layout.size()
            ),
        }
    }
}

impl core::error::Error for TryReserveError {}
