use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;

use crate::DefaultHashBuilder;
use crate::error::TryReserveError;
use crate::hash_table::Entry;
use crate::hash_table::Handle;
use crate::hash_table::HashTable;

/// A hash set implemented using the closed [`HashTable`] as the underlying
/// storage.
///
/// `HashSet<T, S>` stores values of type `T` where `T` implements `Hash + Eq`
/// and uses a configurable hasher builder `S` to hash values. Values are
/// unique; inserting a value equal to a stored one replaces it.
///
/// Iteration order is the table's used-list order: it is deterministic for a
/// given sequence of operations and only changes on mutation.
///
/// # Performance Characteristics
///
/// - **Memory**: two link indices, a slot state and the cached hash per slot,
///   plus the size of `T`. Capacities are primes and the table fills to 100%
///   before growing.
#[derive(Clone)]
pub struct HashSet<T, S = DefaultHashBuilder> {
    table: HashTable<T>,
    hash_builder: S,
}

impl<T, S> PartialEq for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }
}

impl<T, S> Eq for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
}

impl<T, S> Debug for HashSet<T, S>
where
    T: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.table.iter()).finish()
    }
}

impl<T, S> HashSet<T, S> {
    /// Creates a new hash set with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "std")]
    /// # {
    /// use std::hash::RandomState;
    ///
    /// use closed_hash::hash_set::HashSet;
    ///
    /// let set: HashSet<i32, _> = HashSet::with_hasher(RandomState::new());
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub const fn with_hasher(hash_builder: S) -> Self {
        Self {
            table: HashTable::new(),
            hash_builder,
        }
    }

    /// Creates a new hash set with the specified capacity and hasher builder.
    ///
    /// The actual capacity is the next prime in the capacity table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "std")]
    /// # {
    /// use std::hash::RandomState;
    ///
    /// use closed_hash::hash_set::HashSet;
    ///
    /// let set: HashSet<i32, _> = HashSet::with_capacity_and_hasher(100, RandomState::new());
    /// assert!(set.capacity() >= 100);
    /// # }
    /// ```
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hash_builder,
        }
    }

    /// Fallible version of [`HashSet::with_capacity_and_hasher`].
    pub fn try_with_capacity_and_hasher(
        capacity: usize,
        hash_builder: S,
    ) -> Result<Self, TryReserveError> {
        Ok(Self {
            table: HashTable::try_with_capacity(capacity)?,
            hash_builder,
        })
    }

    /// Returns a reference to the set's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Returns the number of elements in the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use closed_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert_eq!(set.len(), 0);
    /// set.insert(1);
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of elements the set can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the largest capacity the set can ever reach.
    pub fn max_size(&self) -> usize {
        self.table.max_size()
    }

    /// Clears the set, removing all values. Keeps the allocated memory.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use closed_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(1);
    /// set.insert(2);
    /// set.clear();
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// An iterator visiting all values in iteration order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use closed_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(1);
    /// set.insert(2);
    ///
    /// let mut values: Vec<_> = set.iter().copied().collect();
    /// values.sort();
    /// assert_eq!(values, [1, 2]);
    /// # }
    /// ```
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Clears the set, returning all values as an iterator.
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Retains only the values for which `f` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use closed_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = (0..8).collect();
    /// set.retain(|&v| v % 2 == 0);
    /// assert_eq!(set.len(), 4);
    /// # }
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&T) -> bool) {
        self.table.retain(|v| f(v));
    }

    /// Returns the value at `handle`, or `None` if its slot is empty.
    ///
    /// See [`Handle`] for the mutations that make a handle stale.
    pub fn get_at(&self, handle: Handle) -> Option<&T> {
        self.table.get_at(handle)
    }

    /// Removes the value at `handle`, returning it together with a handle to
    /// the value that now follows it in iteration order.
    pub fn remove_at(&mut self, handle: Handle) -> Option<(T, Option<Handle>)> {
        self.table.remove_at(handle)
    }

    /// A handle to the first value in iteration order.
    pub fn first_handle(&self) -> Option<Handle> {
        self.table.first_handle()
    }

    /// A handle to the last value in iteration order.
    pub fn last_handle(&self) -> Option<Handle> {
        self.table.last_handle()
    }

    /// The handle following `handle` in iteration order.
    pub fn next_handle(&self, handle: Handle) -> Option<Handle> {
        self.table.next_handle(handle)
    }

    /// The handle preceding `handle` in iteration order.
    pub fn prev_handle(&self, handle: Handle) -> Option<Handle> {
        self.table.prev_handle(handle)
    }

    /// Swaps the contents of two sets, including their hasher builders.
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }

    #[doc(hidden)]
    pub fn check_invariants(&self) {
        self.table.check_invariants();
    }
}

impl<T, S> HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn hash<Q: Hash + ?Sized>(&self, value: &Q) -> u64 {
        self.hash_builder.hash_one(value)
    }

    /// Shrinks the capacity of the set as much as possible.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }

    /// Reserves capacity for at least `additional` more elements.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use closed_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.reserve(10);
    /// assert!(set.capacity() >= 10);
    /// # }
    /// ```
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Tries to reserve capacity for at least `additional` more elements.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.table.try_reserve(additional)
    }

    /// Adds a value to the set.
    ///
    /// Returns `true` if the value was not present. If an equal value was
    /// present it is replaced by `value` and `false` is returned.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use closed_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert!(set.insert(1));
    /// assert!(!set.insert(1));
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    pub fn insert(&mut self, value: T) -> bool {
        self.insert_handle(value).1
    }

    /// Adds a value to the set, returning a handle to it and whether it was
    /// newly inserted.
    pub fn insert_handle(&mut self, value: T) -> (Handle, bool) {
        let hash = self.hash(&value);
        match self.table.entry(hash, |v| *v == value) {
            Entry::Occupied(mut entry) => {
                entry.insert(value);
                (entry.handle(), false)
            }
            Entry::Vacant(entry) => (entry.insert_handle(value), true),
        }
    }

    /// Returns `true` if the set contains a value equal to `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use closed_hash::HashSet;
    ///
    /// let mut set: HashSet<String> = HashSet::new();
    /// set.insert("a".to_string());
    /// assert!(set.contains("a"));
    /// assert!(!set.contains("b"));
    /// # }
    /// ```
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(value).is_some()
    }

    /// Returns a reference to the stored value equal to `value`, if any.
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.find(self.hash(value), |v| v.borrow() == value)
    }

    /// Returns a handle to the stored value equal to `value`, if any.
    pub fn find<Q>(&self, value: &Q) -> Option<Handle>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table
            .find_handle(self.hash(value), |v| v.borrow() == value)
    }

    /// Returns the number of stored values equal to `value`: zero or one.
    pub fn count<Q>(&self, value: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        usize::from(self.contains(value))
    }

    /// Returns an iterator over every stored value equal to `value`. Since
    /// values are unique it yields at most one item.
    pub fn equal_range<Q>(&self, value: &Q) -> core::option::IntoIter<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(value).into_iter()
    }

    /// Removes a value from the set. Returns whether it was present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use closed_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(1);
    /// assert!(set.remove(&1));
    /// assert!(!set.remove(&1));
    /// # }
    /// ```
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.take(value).is_some()
    }

    /// Removes and returns the value equal to `value`, if any.
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash(value);
        self.table.remove(hash, |v| v.borrow() == value)
    }

    /// Adds a value to the set, returning the equal value it replaced.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use closed_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert_eq!(set.replace(5), None);
    /// assert_eq!(set.replace(5), Some(5));
    /// # }
    /// ```
    pub fn replace(&mut self, value: T) -> Option<T> {
        let hash = self.hash(&value);
        match self.table.entry(hash, |v| *v == value) {
            Entry::Occupied(mut entry) => Some(entry.insert(value)),
            Entry::Vacant(entry) => {
                entry.insert(value);
                None
            }
        }
    }

    /// Returns `true` if `self` has no values in common with `other`.
    pub fn is_disjoint(&self, other: &HashSet<T, S>) -> bool {
        if self.len() <= other.len() {
            self.iter().all(|v| !other.contains(v))
        } else {
            other.iter().all(|v| !self.contains(v))
        }
    }

    /// Returns `true` if every value of `self` is in `other`.
    pub fn is_subset(&self, other: &HashSet<T, S>) -> bool {
        self.len() <= other.len() && self.iter().all(|v| other.contains(v))
    }

    /// Returns `true` if every value of `other` is in `self`.
    pub fn is_superset(&self, other: &HashSet<T, S>) -> bool {
        other.is_subset(self)
    }

    /// Visits the values in `self` or `other`, without duplicates.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use closed_hash::HashSet;
    ///
    /// let a: HashSet<i32> = [1, 2, 3].into_iter().collect();
    /// let b: HashSet<i32> = [2, 3, 4].into_iter().collect();
    ///
    /// let mut union: Vec<_> = a.union(&b).copied().collect();
    /// union.sort();
    /// assert_eq!(union, [1, 2, 3, 4]);
    /// # }
    /// ```
    pub fn union<'a>(&'a self, other: &'a HashSet<T, S>) -> Union<'a, T, S> {
        Union {
            inner: self.iter().chain(other.absent_from(self)),
        }
    }

    /// Visits the values in both `self` and `other`.
    pub fn intersection<'a>(&'a self, other: &'a HashSet<T, S>) -> Intersection<'a, T, S> {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        Intersection {
            inner: Membership {
                values: small.iter(),
                against: large,
                wanted: true,
            },
        }
    }

    /// Visits the values in `self` but not in `other`.
    pub fn difference<'a>(&'a self, other: &'a HashSet<T, S>) -> Difference<'a, T, S> {
        Difference {
            inner: self.absent_from(other),
        }
    }

    /// Visits the values in exactly one of `self` and `other`.
    pub fn symmetric_difference<'a>(
        &'a self,
        other: &'a HashSet<T, S>,
    ) -> SymmetricDifference<'a, T, S> {
        SymmetricDifference {
            inner: self.absent_from(other).chain(other.absent_from(self)),
        }
    }

    fn absent_from<'a>(&'a self, other: &'a HashSet<T, S>) -> Membership<'a, T, S> {
        Membership {
            values: self.iter(),
            against: other,
            wanted: false,
        }
    }

    /// Returns occupancy statistics for the underlying table.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> crate::hash_table::TableStats {
        self.table.stats()
    }
}

impl<T, S> HashSet<T, S>
where
    S: Default,
{
    /// Creates a new hash set using the default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use closed_hash::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::new();
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a new hash set with the specified capacity using the default
    /// hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use closed_hash::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::with_capacity(100);
    /// assert!(set.capacity() >= 100);
    /// # }
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<T, S> Default for HashSet<T, S>
where
    S: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

/// An iterator over the values of a `HashSet`.
pub struct Iter<'a, T> {
    inner: crate::hash_table::Iter<'a, T>,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

/// A draining iterator over the values of a `HashSet`.
pub struct Drain<'a, T> {
    inner: crate::hash_table::Drain<'a, T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Drain<'_, T> {}

/// A consuming iterator over the values of a `HashSet`.
pub struct IntoIter<T> {
    inner: crate::hash_table::IntoIter<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for IntoIter<T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T, S> IntoIterator for HashSet<T, S> {
    type IntoIter = IntoIter<T>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, T, S> IntoIterator for &'a HashSet<T, S> {
    type IntoIter = Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S> FromIterator<T> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = HashSet::new();
        set.extend(iter);
        set
    }
}

impl<T, S> Extend<T> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        // Duplicates are likely when extending a populated set.
        let (lower, _) = iter.size_hint();
        let additional = if self.is_empty() { lower } else { lower.div_ceil(2) };
        self.reserve(additional);
        iter.for_each(|value| {
            self.insert(value);
        });
    }
}

/// Walks `values`, yielding those whose membership in `against` is `wanted`.
struct Membership<'a, T, S> {
    values: Iter<'a, T>,
    against: &'a HashSet<T, S>,
    wanted: bool,
}

impl<T, S> Clone for Membership<'_, T, S> {
    fn clone(&self) -> Self {
        Membership {
            values: self.values.clone(),
            against: self.against,
            wanted: self.wanted,
        }
    }
}

impl<'a, T, S> Iterator for Membership<'a, T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let (against, wanted) = (self.against, self.wanted);
        self.values.find(|v| against.contains(*v) == wanted)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.values.size_hint().1)
    }
}

macro_rules! set_algebra_iter {
    ($(#[$doc:meta])* $name:ident, $inner:ty) => {
        $(#[$doc])*
        pub struct $name<'a, T, S> {
            inner: $inner,
        }

        impl<T, S> Clone for $name<'_, T, S> {
            fn clone(&self) -> Self {
                $name {
                    inner: self.inner.clone(),
                }
            }
        }

        impl<'a, T, S> Iterator for $name<'a, T, S>
        where
            T: Hash + Eq,
            S: BuildHasher,
        {
            type Item = &'a T;

            fn next(&mut self) -> Option<&'a T> {
                self.inner.next()
            }

            fn size_hint(&self) -> (usize, Option<usize>) {
                self.inner.size_hint()
            }
        }

        impl<T, S> FusedIterator for $name<'_, T, S>
        where
            T: Hash + Eq,
            S: BuildHasher,
        {
        }
    };
}

set_algebra_iter!(
    /// An iterator over the union of two sets: every value of the first,
    /// then the values only the second holds.
    Union,
    core::iter::Chain<Iter<'a, T>, Membership<'a, T, S>>
);

set_algebra_iter!(
    /// An iterator over the values two sets share, in the smaller set's order.
    Intersection,
    Membership<'a, T, S>
);

set_algebra_iter!(
    /// An iterator over the values of one set that the other lacks.
    Difference,
    Membership<'a, T, S>
);

set_algebra_iter!(
    /// An iterator over the values held by exactly one of two sets.
    SymmetricDifference,
    core::iter::Chain<Membership<'a, T, S>, Membership<'a, T, S>>
);

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::hash::Hasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;

    #[derive(Clone)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            Self {
                k1: OsRng.try_next_u64().unwrap_or(0),
                k2: OsRng.try_next_u64().unwrap_or(0),
            }
        }
    }

    /// Sends every value to the same bucket.
    #[derive(Clone, Default)]
    struct ConstantHashBuilder;

    struct ConstantHasher;

    impl Hasher for ConstantHasher {
        fn finish(&self) -> u64 {
            7
        }

        fn write(&mut self, _bytes: &[u8]) {}
    }

    impl BuildHasher for ConstantHashBuilder {
        type Hasher = ConstantHasher;

        fn build_hasher(&self) -> Self::Hasher {
            ConstantHasher
        }
    }

    fn sorted<'a>(iter: impl Iterator<Item = &'a i32>) -> Vec<i32> {
        let mut values = iter.copied().collect::<Vec<_>>();
        values.sort_unstable();
        values
    }

    #[test]
    fn test_new_and_with_hasher() {
        let set: HashSet<i32, SipHashBuilder> = HashSet::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert_eq!(set.capacity(), 0);

        let set2 = HashSet::<i32, _>::with_hasher(SipHashBuilder::default());
        assert!(set2.is_empty());
    }

    #[test]
    fn test_with_capacity() {
        let set: HashSet<i32, SipHashBuilder> = HashSet::with_capacity(100);
        assert!(set.capacity() >= 100);
        assert!(set.is_empty());

        let set2 =
            HashSet::<i32, _>::try_with_capacity_and_hasher(200, SipHashBuilder::default())
                .unwrap();
        assert!(set2.capacity() >= 200);

        assert_eq!(
            HashSet::<i32, _>::try_with_capacity_and_hasher(usize::MAX, SipHashBuilder::default())
                .err(),
            Some(TryReserveError::CapacityOverflow)
        );
    }

    #[test]
    fn test_insert_and_contains() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        assert!(set.insert(1));
        assert_eq!(set.len(), 1);
        assert!(set.contains(&1));

        assert!(!set.insert(1));
        assert_eq!(set.len(), 1);

        assert!(set.insert(2));
        assert_eq!(set.len(), 2);
        assert!(set.contains(&2));
        assert!(!set.contains(&3));
        assert_eq!(set.count(&1), 1);
        assert_eq!(set.count(&3), 0);
        set.check_invariants();
    }

    #[test]
    fn test_insert_replaces_equal_value() {
        #[derive(Debug, Clone)]
        struct Tagged {
            key: u32,
            tag: &'static str,
        }

        impl PartialEq for Tagged {
            fn eq(&self, other: &Self) -> bool {
                self.key == other.key
            }
        }

        impl Eq for Tagged {}

        impl core::hash::Hash for Tagged {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.key.hash(state);
            }
        }

        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        assert!(set.insert(Tagged { key: 1, tag: "first" }));
        assert!(!set.insert(Tagged { key: 1, tag: "second" }));
        assert_eq!(set.len(), 1);
        let probe = Tagged { key: 1, tag: "" };
        assert_eq!(set.get(&probe).unwrap().tag, "second");

        let old = set.replace(Tagged { key: 1, tag: "third" }).unwrap();
        assert_eq!(old.tag, "second");
        assert_eq!(set.get(&probe).unwrap().tag, "third");
    }

    #[test]
    fn test_remove_and_take() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        set.extend([1, 2, 3]);

        assert!(set.remove(&2));
        assert_eq!(set.len(), 2);
        assert!(!set.contains(&2));
        assert!(!set.remove(&2));
        assert!(!set.remove(&4));

        assert_eq!(set.take(&1), Some(1));
        assert_eq!(set.take(&1), None);
        assert_eq!(sorted(set.iter()), [3]);
        set.check_invariants();
    }

    #[test]
    fn test_borrowed_lookups() {
        let mut set: HashSet<String, SipHashBuilder> = HashSet::new();
        set.insert("alpha".to_string());
        set.insert("beta".to_string());

        assert!(set.contains("alpha"));
        assert_eq!(set.get("beta").map(String::as_str), Some("beta"));
        assert_eq!(set.equal_range("alpha").count(), 1);
        assert_eq!(set.equal_range("gamma").count(), 0);
        assert_eq!(set.take("alpha"), Some("alpha".to_string()));
        assert!(!set.contains("alpha"));
    }

    #[test]
    fn test_clear_and_reserve() {
        let mut set = HashSet::<i32, _>::with_hasher(SipHashBuilder::default());
        set.reserve(1000);
        assert!(set.capacity() >= 1000);
        let capacity = set.capacity();

        for i in 0..500 {
            set.insert(i);
        }
        assert_eq!(set.capacity(), capacity);

        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.capacity(), capacity);
        assert!(!set.contains(&1));

        set.shrink_to_fit();
        assert_eq!(set.capacity(), 0);
        assert_eq!(set.try_reserve(10), Ok(()));
        assert!(set.capacity() >= 10);
    }

    #[test]
    fn test_iter_and_into_iter() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        for i in 0..20 {
            set.insert(i);
        }
        assert_eq!(set.iter().len(), 20);
        assert_eq!(sorted(set.iter()), (0..20).collect::<Vec<_>>());

        let forward = set.iter().copied().collect::<Vec<_>>();
        let mut backward = set.iter().rev().copied().collect::<Vec<_>>();
        backward.reverse();
        assert_eq!(forward, backward);

        let by_ref = (&set).into_iter().count();
        assert_eq!(by_ref, 20);

        let mut owned = set.into_iter().collect::<Vec<_>>();
        owned.sort_unstable();
        assert_eq!(owned, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_drain() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        set.extend([1, 2, 3]);

        let mut drained = set.drain().collect::<Vec<_>>();
        drained.sort_unstable();
        assert_eq!(drained, vec![1, 2, 3]);
        assert!(set.is_empty());
        set.check_invariants();
    }

    #[test]
    fn test_collision_handling() {
        let mut set = HashSet::with_hasher(ConstantHashBuilder);
        for i in 0..50 {
            assert!(set.insert(i));
            set.check_invariants();
        }
        for i in 0..50 {
            assert!(set.contains(&i));
        }
        for i in (0..50).step_by(2) {
            assert!(set.remove(&i));
            set.check_invariants();
        }
        for i in 0..50 {
            assert_eq!(set.contains(&i), i % 2 == 1);
        }
    }

    #[test]
    fn test_retain() {
        let mut set = HashSet::with_hasher(ConstantHashBuilder);
        set.extend(0..30);
        set.retain(|&v| v % 3 == 0);
        assert_eq!(sorted(set.iter()), (0..30).step_by(3).collect::<Vec<_>>());
        set.check_invariants();
    }

    #[test]
    fn test_handle_walk() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        set.extend(0..10);

        let mut forward = Vec::new();
        let mut at = set.first_handle();
        while let Some(handle) = at {
            forward.push(*set.get_at(handle).unwrap());
            at = set.next_handle(handle);
        }
        assert_eq!(forward, set.iter().copied().collect::<Vec<_>>());

        let mut backward = Vec::new();
        let mut at = set.last_handle();
        while let Some(handle) = at {
            backward.push(*set.get_at(handle).unwrap());
            at = set.prev_handle(handle);
        }
        backward.reverse();
        assert_eq!(forward, backward);

        let handle = set.find(&4).unwrap();
        let (removed, _) = set.remove_at(handle).unwrap();
        assert_eq!(removed, 4);
        assert!(set.find(&4).is_none());

        let (handle, inserted) = set.insert_handle(4);
        assert!(inserted);
        assert_eq!(set.get_at(handle), Some(&4));
    }

    #[test]
    fn test_string_values() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        set.insert("hello".to_string());
        set.insert("world".to_string());

        assert!(set.contains(&"hello".to_string()));
        assert!(!set.contains(&"foo".to_string()));
        assert!(set.remove(&"hello".to_string()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_equality_and_debug() {
        let a: HashSet<i32, SipHashBuilder> = [1, 2, 3].into_iter().collect();
        let b: HashSet<i32, SipHashBuilder> = [3, 2, 1].into_iter().collect();
        let c: HashSet<i32, SipHashBuilder> = [1, 2].into_iter().collect();
        assert_eq!(a, b);
        assert_ne!(a, c);

        let one: HashSet<i32, SipHashBuilder> = [7].into_iter().collect();
        assert_eq!(alloc::format!("{one:?}"), "{7}");
    }

    #[test]
    fn test_swap_and_clone() {
        let mut a: HashSet<i32, SipHashBuilder> = [1, 2].into_iter().collect();
        let mut b: HashSet<i32, SipHashBuilder> = [3].into_iter().collect();
        a.swap(&mut b);
        assert_eq!(sorted(a.iter()), [3]);
        assert_eq!(sorted(b.iter()), [1, 2]);

        let cloned = b.clone();
        assert_eq!(cloned, b);
        cloned.check_invariants();
    }

    #[test]
    fn test_default_trait() {
        let set: HashSet<i32, SipHashBuilder> = HashSet::default();
        assert!(set.is_empty());
        assert!(set.max_size() > 1000);
    }

    #[test]
    fn test_is_disjoint() {
        let a: HashSet<i32, SipHashBuilder> = [1, 2, 3].into_iter().collect();
        let b: HashSet<i32, SipHashBuilder> = [4, 5].into_iter().collect();
        let c: HashSet<i32, SipHashBuilder> = [3, 4].into_iter().collect();
        assert!(a.is_disjoint(&b));
        assert!(!a.is_disjoint(&c));
        assert!(!c.is_disjoint(&b));
    }

    #[test]
    fn test_is_subset_and_superset() {
        let a: HashSet<i32, SipHashBuilder> = [1, 2].into_iter().collect();
        let b: HashSet<i32, SipHashBuilder> = [1, 2, 3].into_iter().collect();
        assert!(a.is_subset(&b));
        assert!(!b.is_subset(&a));
        assert!(b.is_superset(&a));
        assert!(!a.is_superset(&b));
    }

    #[test]
    fn test_union() {
        let a: HashSet<i32, SipHashBuilder> = [1, 2, 3].into_iter().collect();
        let b: HashSet<i32, SipHashBuilder> = [3, 4, 5].into_iter().collect();
        assert_eq!(sorted(a.union(&b)), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_union_visits_self_first() {
        let a: HashSet<i32, SipHashBuilder> = [1, 2, 3].into_iter().collect();
        let b: HashSet<i32, SipHashBuilder> = [3, 4, 5].into_iter().collect();

        let union = a.union(&b);
        assert_eq!(union.size_hint(), (3, Some(6)));
        let head = union.clone().take(3).copied().collect::<Vec<_>>();
        assert_eq!(head, a.iter().copied().collect::<Vec<_>>());

        let mut union = union;
        assert_eq!(union.by_ref().count(), 5);
        assert_eq!(union.next(), None);

        let empty: HashSet<i32, SipHashBuilder> = HashSet::default();
        assert_eq!(sorted(empty.union(&a)), [1, 2, 3]);
        assert_eq!(sorted(a.union(&empty)), [1, 2, 3]);
    }

    #[test]
    fn test_intersection() {
        let a: HashSet<i32, SipHashBuilder> = [1, 2, 3, 4].into_iter().collect();
        let b: HashSet<i32, SipHashBuilder> = [3, 4, 5].into_iter().collect();
        assert_eq!(sorted(a.intersection(&b)), [3, 4]);
        assert_eq!(sorted(b.intersection(&a)), [3, 4]);
    }

    #[test]
    fn test_difference() {
        let a: HashSet<i32, SipHashBuilder> = [1, 2, 3].into_iter().collect();
        let b: HashSet<i32, SipHashBuilder> = [2, 3, 4].into_iter().collect();
        assert_eq!(sorted(a.difference(&b)), [1]);
        assert_eq!(sorted(b.difference(&a)), [4]);
    }

    #[test]
    fn test_symmetric_difference() {
        let a: HashSet<i32, SipHashBuilder> = [1, 2, 3].into_iter().collect();
        let b: HashSet<i32, SipHashBuilder> = [2, 3, 4].into_iter().collect();
        assert_eq!(sorted(a.symmetric_difference(&b)), [1, 4]);
    }

    #[test]
    fn test_extend_populated_set() {
        let mut set: HashSet<i32, SipHashBuilder> = (0..10).collect();
        set.extend(5..20);
        assert_eq!(set.len(), 20);
        assert_eq!(sorted(set.iter()), (0..20).collect::<Vec<_>>());
        set.check_invariants();
    }
}
