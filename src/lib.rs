#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod capacity;
mod error;
mod list;

/// A HashMap built on the closed hash table.
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a standard key-value map interface with configurable hashers.
pub mod hash_map;

pub mod hash_table;

/// A hash set built on the closed hash table.
///
/// This module provides a `HashSet` that wraps the `HashTable` and provides
/// a standard set interface with configurable hashers.
pub mod hash_set;

pub use error::TryReserveError;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::Handle;
pub use hash_table::HashTable;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used when none is specified.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used when none is specified.
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        /// Placeholder hasher builder for builds without `std` or `foldhash`.
        ///
        /// It cannot be constructed, so containers must be created with an
        /// explicit hasher through `with_hasher`.
        #[derive(Clone, Copy, Debug)]
        pub enum DefaultHashBuilder {}

        /// The hasher of [`DefaultHashBuilder`]. It cannot be constructed.
        #[derive(Clone, Copy, Debug)]
        pub enum DefaultHasher {}

        impl core::hash::Hasher for DefaultHasher {
            fn finish(&self) -> u64 {
                match *self {}
            }

            fn write(&mut self, _bytes: &[u8]) {
                match *self {}
            }
        }

        impl core::hash::BuildHasher for DefaultHashBuilder {
            type Hasher = DefaultHasher;

            fn build_hasher(&self) -> Self::Hasher {
                match *self {}
            }
        }
    }
}
