//! The raw closed hash table.
//!
//! [`HashTable<V>`] stores values in a single node store whose length is drawn
//! from an ascending table of primes. Every slot is in one of three states:
//!
//! - `Free`: unoccupied and linked into the free list.
//! - `Home`: occupied by a value whose bucket (`hash % capacity`) is the
//!   slot's own index. Home values never move while the store is live.
//! - `Misplaced`: occupied by a value whose home slot was already taken by a
//!   different bucket's home value when it was inserted.
//!
//! Occupied slots are threaded through the used list, which defines iteration
//! order. A bucket's collision chain is its home node followed by the
//! contiguous run of misplaced nodes after it in the used list, so a lookup
//! stops at the first node that is not misplaced.
//!
//! The table does not hash or compare values itself. Every operation takes the
//! hash of the key and an equality predicate, so any hashing, equality, and
//! key-extraction scheme can be layered on top (see [`crate::HashSet`] and
//! [`crate::HashMap`]). The hash is cached per entry and rehashing never calls
//! back into user code.

use alloc::alloc::handle_alloc_error;
use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt::Debug;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::capacity;
use crate::error::TryReserveError;
use crate::list;
use crate::list::Link;
use crate::list::Linked;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotState {
    Free,
    Home,
    Misplaced,
}

#[derive(Clone)]
struct Item<V> {
    hash: u64,
    value: V,
}

#[derive(Clone)]
struct Node<V> {
    link: Link,
    state: SlotState,
    item: Option<Item<V>>,
    // Bumped whenever a value leaves the slot.
    #[cfg(debug_assertions)]
    generation: u32,
}

impl<V> Node<V> {
    fn vacant(at: usize) -> Self {
        Node {
            link: Link::detached(at),
            state: SlotState::Free,
            item: None,
            #[cfg(debug_assertions)]
            generation: 0,
        }
    }
}

impl<V> Linked for Node<V> {
    #[inline(always)]
    fn link(&self) -> &Link {
        &self.link
    }

    #[inline(always)]
    fn link_mut(&mut self) -> &mut Link {
        &mut self.link
    }
}

#[cold]
fn handle_reserve_error(err: TryReserveError) -> ! {
    match err {
        TryReserveError::CapacityOverflow => panic!("capacity overflow"),
        TryReserveError::AllocError { layout } => handle_alloc_error(layout),
    }
}

/// A position in a [`HashTable`], in iteration order.
///
/// Handles are returned by lookups and insertions and can be stepped forward
/// and backward with [`HashTable::next_handle`] and
/// [`HashTable::prev_handle`]. A handle names a slot, not a value, so it is
/// invalidated whenever its value leaves that slot:
///
/// - the element is removed, or `clear` runs;
/// - removing the head of a collision chain moves the next value of the chain
///   into the head's slot, invalidating handles to both;
/// - an insertion whose bucket is occupied by a misplaced value moves that
///   value to another slot;
/// - the table reallocates (growth, `reserve`, `shrink_to_fit`).
///
/// A stale handle whose slot is still empty yields `None`. In release builds
/// a stale handle whose slot has been reused refers to the new value; debug
/// builds detect that case and every handle used across a reallocation, and
/// panic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    index: usize,
    #[cfg(debug_assertions)]
    epoch: u32,
    #[cfg(debug_assertions)]
    generation: u32,
}

impl Handle {
    /// The physical slot index this handle refers to.
    pub fn slot(&self) -> usize {
        self.index
    }
}

/// Occupancy statistics for a [`HashTable`].
///
/// Only available with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct TableStats {
    /// Number of elements currently in the table.
    pub len: usize,
    /// Number of slots in the node store.
    pub capacity: usize,
    /// Slots holding a value in its own bucket.
    pub home: usize,
    /// Slots holding a value displaced from its bucket.
    pub misplaced: usize,
    /// Unoccupied slots.
    pub free: usize,
    /// Number of nodes in the longest collision chain.
    pub longest_chain: usize,
    /// `chain_lengths[n]` is the number of buckets whose chain holds `n`
    /// values. Index 0 is unused.
    pub chain_lengths: Vec<usize>,
    /// `len / capacity`.
    pub load_factor: f64,
}

#[cfg(any(test, feature = "stats"))]
impl TableStats {
    /// Pretty-print the statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Closed Hash Table Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.len,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Slots: {} home, {} misplaced, {} free",
            self.home, self.misplaced, self.free
        );
        println!("Longest chain: {}", self.longest_chain);
        for (length, buckets) in self.chain_lengths.iter().enumerate().skip(1) {
            if *buckets != 0 {
                println!("  chain length {length:>3}: {buckets} buckets");
            }
        }
    }
}

/// A closed hash table with prime capacities and in-place collision chains.
///
/// `HashTable<V>` stores values of type `V`. Like a raw table, it requires the
/// caller to supply the hash of the key and an equality predicate for each
/// operation. Keys are unique: inserting a value whose key is already present
/// overwrites the stored value.
///
/// Iteration follows the used list, not bucket order, and is stable between
/// mutations.
///
/// ## Example
///
/// ```rust
/// use closed_hash::HashTable;
/// use closed_hash::hash_table::Entry;
///
/// let mut table: HashTable<(u64, &str)> = HashTable::new();
///
/// // The key here is its own hash.
/// table.insert(7, (7, "seven"), |v| v.0 == 7);
/// match table.entry(9, |v| v.0 == 9) {
///     Entry::Vacant(entry) => {
///         entry.insert((9, "nine"));
///     }
///     Entry::Occupied(_) => unreachable!(),
/// }
///
/// assert_eq!(table.find(7, |v| v.0 == 7), Some(&(7, "seven")));
/// assert_eq!(table.len(), 2);
/// ```
#[derive(Clone)]
pub struct HashTable<V> {
    // `capacity` data slots, then the used-list and free-list sentinels. Empty
    // when `capacity` is zero.
    nodes: Vec<Node<V>>,
    capacity: usize,
    populated: usize,
    #[cfg(debug_assertions)]
    epoch: u32,
}

impl<V> Debug for HashTable<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::string::String;

        let slots = self.nodes[..self.capacity]
            .iter()
            .map(|node| match node.state {
                SlotState::Free => '.',
                SlotState::Home => 'H',
                SlotState::Misplaced => 'M',
            })
            .collect::<String>();

        let mut order = Vec::with_capacity(self.populated);
        let mut at = self.first_index();
        while let Some(index) = at {
            order.push(index);
            at = self.next_index(index);
        }

        f.debug_struct("HashTable")
            .field("populated", &self.populated)
            .field("capacity", &self.capacity)
            .field("slots", &slots)
            .field("order", &order)
            .finish()
    }
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> HashTable<V> {
    /// Creates an empty table. It does not allocate until the first insertion.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use closed_hash::HashTable;
    /// let table: HashTable<u32> = HashTable::new();
    /// assert_eq!(table.capacity(), 0);
    /// ```
    pub const fn new() -> Self {
        Self {
            nodes: Vec::new(),
            capacity: 0,
            populated: 0,
            #[cfg(debug_assertions)]
            epoch: 0,
        }
    }

    /// Creates a table that can hold at least `capacity` elements without
    /// reallocating.
    ///
    /// The slot count is rounded up to the next prime in the capacity table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use closed_hash::HashTable;
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert_eq!(table.capacity(), 163);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        match Self::try_with_capacity(capacity) {
            Ok(table) => table,
            Err(err) => handle_reserve_error(err),
        }
    }

    /// Fallible version of [`HashTable::with_capacity`].
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut table = Self::new();
        table.try_reserve(capacity)?;
        Ok(table)
    }

    #[inline(always)]
    fn used_sentinel(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    fn free_sentinel(&self) -> usize {
        self.capacity + 1
    }

    #[inline(always)]
    fn bucket(&self, hash: u64) -> usize {
        (hash % self.capacity as u64) as usize
    }

    #[inline(always)]
    fn item(&self, at: usize) -> &Item<V> {
        match &self.nodes[at].item {
            Some(item) => item,
            None => unreachable!("slot {at} is not occupied"),
        }
    }

    #[inline(always)]
    fn item_mut(&mut self, at: usize) -> &mut Item<V> {
        match &mut self.nodes[at].item {
            Some(item) => item,
            None => unreachable!("slot {at} is not occupied"),
        }
    }

    /// Builds a node store with every slot on the free list.
    fn allocate(capacity: usize) -> Result<Vec<Node<V>>, TryReserveError> {
        if capacity == 0 {
            return Ok(Vec::new());
        }

        let total = capacity
            .checked_add(2)
            .ok_or(TryReserveError::CapacityOverflow)?;
        let layout =
            Layout::array::<Node<V>>(total).map_err(|_| TryReserveError::CapacityOverflow)?;

        let mut nodes = Vec::new();
        nodes
            .try_reserve_exact(total)
            .map_err(|_| TryReserveError::AllocError { layout })?;
        nodes.extend((0..total).map(Node::vacant));

        let free = capacity + 1;
        for index in 0..capacity {
            list::push_back(&mut nodes, free, index);
        }

        Ok(nodes)
    }

    /// Replaces the node store with one of `capacity` slots and move-inserts
    /// every element into it, in iteration order.
    ///
    /// The new store is allocated before anything is moved, so on error the
    /// table is untouched.
    fn resize(&mut self, capacity: usize) -> Result<(), TryReserveError> {
        debug_assert!(capacity >= self.populated);

        let nodes = Self::allocate(capacity)?;
        let mut old = core::mem::replace(&mut self.nodes, nodes);
        let old_used = core::mem::replace(&mut self.capacity, capacity);
        let populated = core::mem::replace(&mut self.populated, 0);
        #[cfg(debug_assertions)]
        {
            self.epoch = self.epoch.wrapping_add(1);
        }

        if populated == 0 {
            return Ok(());
        }

        let mut at = list::next(&old, old_used);
        while at != old_used {
            let next = list::next(&old, at);
            if let Some(Item { hash, value }) = old[at].item.take() {
                self.place(hash, value);
            }
            at = next;
        }

        debug_assert_eq!(self.populated, populated);
        Ok(())
    }

    /// Returns the index of the value matching `eq`, walking the chain of
    /// `hash`'s bucket.
    fn find_index(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<usize> {
        if self.populated == 0 {
            return None;
        }

        let mut at = self.bucket(hash);
        // Chains only ever start at a home slot.
        if self.nodes[at].state != SlotState::Home {
            return None;
        }

        loop {
            let node = &self.nodes[at];
            if let Some(item) = &node.item
                && item.hash == hash
                && eq(&item.value)
            {
                return Some(at);
            }

            at = node.link.next;
            // A home node or either sentinel ends the chain.
            if self.nodes[at].state != SlotState::Misplaced {
                return None;
            }
        }
    }

    #[inline(always)]
    fn take_free(&self) -> usize {
        let free = self.free_sentinel();
        let slot = list::next(&self.nodes, free);
        debug_assert!(slot != free, "free list exhausted");
        slot
    }

    #[inline(always)]
    fn occupy(&mut self, at: usize, state: SlotState, hash: u64, value: V) {
        let node = &mut self.nodes[at];
        debug_assert!(node.item.is_none());
        node.state = state;
        node.item = Some(Item { hash, value });
    }

    fn occupy_home(&mut self, at: usize, hash: u64, value: V) -> usize {
        let used = self.used_sentinel();
        list::push_back(&mut self.nodes, used, at);
        self.occupy(at, SlotState::Home, hash, value);
        at
    }

    /// Moves the misplaced value at `at` into a free slot that takes its place
    /// in the owning chain, leaving `at` unoccupied.
    fn evict(&mut self, at: usize) {
        debug_assert_eq!(self.nodes[at].state, SlotState::Misplaced);

        let slot = self.take_free();
        list::move_before(&mut self.nodes, at, slot);

        let item = self.nodes[at].item.take();
        let node = &mut self.nodes[slot];
        node.item = item;
        node.state = SlotState::Misplaced;
        self.nodes[at].state = SlotState::Free;
        self.retire(at);
    }

    /// Marks every handle to `at` as stale.
    #[cfg(debug_assertions)]
    #[inline(always)]
    fn retire(&mut self, at: usize) {
        let node = &mut self.nodes[at];
        node.generation = node.generation.wrapping_add(1);
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn retire(&mut self, _at: usize) {}

    /// Stores a value whose key is known to be absent. Requires a free slot.
    fn place(&mut self, hash: u64, value: V) -> usize {
        debug_assert!(self.populated < self.capacity);

        let home = self.bucket(hash);
        let at = match self.nodes[home].state {
            SlotState::Home => {
                let slot = self.take_free();
                let after = list::next(&self.nodes, home);
                list::move_before(&mut self.nodes, after, slot);
                self.occupy(slot, SlotState::Misplaced, hash, value);
                slot
            }
            SlotState::Misplaced => {
                self.evict(home);
                self.occupy_home(home, hash, value)
            }
            SlotState::Free => self.occupy_home(home, hash, value),
        };

        self.populated += 1;
        at
    }

    /// Removes the value at `at`. Returns it together with the index of the
    /// value that now follows it in iteration order.
    fn remove_index(&mut self, at: usize) -> (V, Option<usize>) {
        debug_assert!(self.nodes[at].state != SlotState::Free);

        let follower = list::next(&self.nodes, at);
        let (vacated, successor) = if self.nodes[at].state == SlotState::Home
            && self.nodes[follower].state == SlotState::Misplaced
        {
            // The home slot has to stay occupied while its chain is not empty:
            // the first misplaced value moves into it and its slot is freed.
            let moved = self.nodes[follower].item.take();
            let erased = core::mem::replace(&mut self.nodes[at].item, moved);
            self.nodes[follower].item = erased;
            (follower, Some(at))
        } else {
            (at, (follower != self.used_sentinel()).then_some(follower))
        };

        self.retire(at);
        if vacated != at {
            self.retire(vacated);
        }

        let free = self.free_sentinel();
        list::push_front(&mut self.nodes, free, vacated);
        let node = &mut self.nodes[vacated];
        node.state = SlotState::Free;
        let item = node.item.take();
        self.populated -= 1;

        match item {
            Some(item) => (item.value, successor),
            None => unreachable!("slot {vacated} was occupied without a value"),
        }
    }

    fn first_index(&self) -> Option<usize> {
        if self.populated == 0 {
            return None;
        }
        Some(list::next(&self.nodes, self.used_sentinel()))
    }

    fn last_index(&self) -> Option<usize> {
        if self.populated == 0 {
            return None;
        }
        Some(list::prior(&self.nodes, self.used_sentinel()))
    }

    fn next_index(&self, at: usize) -> Option<usize> {
        let next = list::next(&self.nodes, at);
        (next != self.used_sentinel()).then_some(next)
    }

    fn prev_index(&self, at: usize) -> Option<usize> {
        let prior = list::prior(&self.nodes, at);
        (prior != self.used_sentinel()).then_some(prior)
    }

    #[inline(always)]
    fn handle(&self, index: usize) -> Handle {
        Handle {
            index,
            #[cfg(debug_assertions)]
            epoch: self.epoch,
            #[cfg(debug_assertions)]
            generation: self.nodes[index].generation,
        }
    }

    /// Maps a handle back to an occupied slot.
    fn resolve(&self, handle: Handle) -> Option<usize> {
        #[cfg(debug_assertions)]
        assert_eq!(
            handle.epoch, self.epoch,
            "handle used after the table was rehashed"
        );

        let index = handle.index;
        if index >= self.capacity || self.nodes[index].state == SlotState::Free {
            return None;
        }

        #[cfg(debug_assertions)]
        assert_eq!(
            handle.generation, self.nodes[index].generation,
            "handle used after its value was removed or moved"
        );

        Some(index)
    }

    /// Returns an iterator over all values in the table, in iteration order.
    ///
    /// The iterator is double-ended; `iter().rev()` walks the same sequence
    /// backwards.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use closed_hash::HashTable;
    /// let mut table = HashTable::new();
    /// for n in [3u64, 1, 2] {
    ///     table.insert(n, n, |&v| v == n);
    /// }
    ///
    /// assert_eq!(table.iter().copied().collect::<Vec<_>>(), [3, 1, 2]);
    /// assert_eq!(table.iter().rev().copied().collect::<Vec<_>>(), [2, 1, 3]);
    /// ```
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            nodes: &self.nodes,
            front: self.first_index().unwrap_or(0),
            back: self.last_index().unwrap_or(0),
            remaining: self.populated,
        }
    }

    /// Returns an iterator yielding mutable references to all values, in
    /// iteration order.
    ///
    /// Mutating a value must not change its hash or equality.
    pub fn iter_mut(&mut self) -> IterMut<'_, V> {
        let front = self.first_index().unwrap_or(0);
        let back = self.last_index().unwrap_or(0);
        IterMut {
            // SAFETY: `Vec::as_mut_ptr` never returns null.
            nodes: unsafe { NonNull::new_unchecked(self.nodes.as_mut_ptr()) },
            front,
            back,
            remaining: self.populated,
            _marker: PhantomData,
        }
    }

    /// Returns an iterator that removes and yields every value.
    ///
    /// The table keeps its capacity. Values not consumed by the iterator are
    /// dropped when it is dropped.
    pub fn drain(&mut self) -> Drain<'_, V> {
        Drain { table: self }
    }

    /// Returns `true` if the table contains no elements.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of elements in the table.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns the number of slots in the node store, which is the number of
    /// elements the table holds before the next insertion grows it.
    ///
    /// This is always zero or a prime from the capacity table
    /// (3, 7, 17, 37, 79, ...).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the largest capacity a table of `V` can ever reach.
    pub fn max_size(&self) -> usize {
        let node = core::mem::size_of::<Node<V>>();
        let limit = (isize::MAX as usize / node).saturating_sub(2);
        capacity::largest_at_most(limit)
    }

    /// Removes all elements from the table, keeping its capacity.
    ///
    /// Handles into the table no longer refer to any element afterwards.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use closed_hash::HashTable;
    /// let mut table = HashTable::new();
    /// table.insert(1, 1u64, |&v| v == 1);
    /// table.insert(2, 2u64, |&v| v == 2);
    /// let capacity = table.capacity();
    ///
    /// table.clear();
    /// assert!(table.is_empty());
    /// assert_eq!(table.capacity(), capacity);
    /// ```
    pub fn clear(&mut self) {
        if self.populated == 0 {
            return;
        }

        let (used, free) = (self.used_sentinel(), self.free_sentinel());
        list::append(&mut self.nodes, free, used);
        self.populated = 0;

        for node in &mut self.nodes[..self.capacity] {
            node.state = SlotState::Free;
            node.item = None;
            #[cfg(debug_assertions)]
            {
                node.generation = node.generation.wrapping_add(1);
            }
        }
    }

    /// Shrinks the node store to the smallest capacity that holds the current
    /// elements. An empty table releases its storage entirely.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use closed_hash::HashTable;
    /// let mut table: HashTable<u64> = HashTable::with_capacity(1000);
    /// table.insert(42, 5, |&v| v == 5);
    /// table.insert(123, 10, |&v| v == 10);
    ///
    /// table.shrink_to_fit();
    /// assert_eq!(table.capacity(), 3);
    /// assert_eq!(table.find(42, |&v| v == 5), Some(&5));
    /// ```
    pub fn shrink_to_fit(&mut self) {
        let Some(capacity) = capacity::capacity_for(self.populated) else {
            return;
        };
        if capacity < self.capacity
            && let Err(err) = self.resize(capacity)
        {
            handle_reserve_error(err);
        }
    }

    /// Reserves capacity for at least `additional` more elements.
    ///
    /// After this call `capacity() >= len() + additional`. The slot count is
    /// rounded up to the next prime in the capacity table. Does nothing if the
    /// capacity is already sufficient.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity overflows, and aborts through
    /// [`handle_alloc_error`] if the allocation fails.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use closed_hash::HashTable;
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.reserve(10);
    /// assert_eq!(table.capacity(), 17);
    /// ```
    pub fn reserve(&mut self, additional: usize) {
        if let Err(err) = self.try_reserve(additional) {
            handle_reserve_error(err);
        }
    }

    /// Tries to reserve capacity for at least `additional` more elements.
    ///
    /// On error the table is left unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use closed_hash::HashTable;
    /// # use closed_hash::TryReserveError;
    /// let mut table: HashTable<u64> = HashTable::new();
    /// assert_eq!(table.try_reserve(5), Ok(()));
    /// assert_eq!(
    ///     table.try_reserve(usize::MAX),
    ///     Err(TryReserveError::CapacityOverflow)
    /// );
    /// assert_eq!(table.capacity(), 7);
    /// ```
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        let required = self
            .populated
            .checked_add(additional)
            .ok_or(TryReserveError::CapacityOverflow)?;
        if required <= self.capacity {
            return Ok(());
        }

        let capacity =
            capacity::capacity_for(required).ok_or(TryReserveError::CapacityOverflow)?;
        self.resize(capacity)
    }

    /// Inserts `value`, overwriting the stored value if `eq` matches one.
    ///
    /// Returns a handle to the stored value and the value it replaced, if any.
    /// If the table is full it grows first; `value` is owned by this call, so
    /// relocating the store cannot invalidate it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use closed_hash::HashTable;
    /// let mut table = HashTable::new();
    /// let (_, old) = table.insert(1, (1u64, "a"), |v| v.0 == 1);
    /// assert_eq!(old, None);
    ///
    /// let (handle, old) = table.insert(1, (1u64, "b"), |v| v.0 == 1);
    /// assert_eq!(old, Some((1, "a")));
    /// assert_eq!(table.get_at(handle), Some(&(1, "b")));
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn insert(&mut self, hash: u64, value: V, eq: impl Fn(&V) -> bool) -> (Handle, Option<V>) {
        self.reserve(1);

        if let Some(at) = self.find_index(hash, eq) {
            let old = core::mem::replace(&mut self.item_mut(at).value, value);
            return (self.handle(at), Some(old));
        }

        let at = self.place(hash, value);
        (self.handle(at), None)
    }

    /// Removes and returns the value matching `eq`, if any.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use closed_hash::HashTable;
    /// let mut table = HashTable::new();
    /// table.insert(42, 42u64, |&v| v == 42);
    ///
    /// assert_eq!(table.remove(42, |&v| v == 42), Some(42));
    /// assert_eq!(table.remove(42, |&v| v == 42), None);
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        let at = self.find_index(hash, eq)?;
        Some(self.remove_index(at).0)
    }

    /// Gets the entry for the given hash and equality predicate.
    ///
    /// The table grows first if it is full, so a vacant entry can always be
    /// filled without reallocating.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use closed_hash::HashTable;
    /// let mut table: HashTable<(u64, u32)> = HashTable::new();
    /// table.entry(5, |v| v.0 == 5).or_insert((5, 0)).1 += 1;
    /// table.entry(5, |v| v.0 == 5).or_insert((5, 0)).1 += 1;
    /// assert_eq!(table.find(5, |v| v.0 == 5), Some(&(5, 2)));
    /// ```
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Entry<'_, V> {
        self.reserve(1);

        match self.find_index(hash, eq) {
            Some(index) => Entry::Occupied(OccupiedEntry { table: self, index }),
            None => Entry::Vacant(VacantEntry { table: self, hash }),
        }
    }

    /// Returns a reference to the value matching `eq`, if any.
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        let at = self.find_index(hash, eq)?;
        Some(&self.item(at).value)
    }

    /// Returns a mutable reference to the value matching `eq`, if any.
    ///
    /// Mutating the value must not change its hash or equality.
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        let at = self.find_index(hash, eq)?;
        Some(&mut self.item_mut(at).value)
    }

    /// Returns a handle to the value matching `eq`, if any.
    pub fn find_handle(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<Handle> {
        let at = self.find_index(hash, eq)?;
        Some(self.handle(at))
    }

    /// Returns the value at `handle`, or `None` if it has been removed.
    pub fn get_at(&self, handle: Handle) -> Option<&V> {
        let at = self.resolve(handle)?;
        Some(&self.item(at).value)
    }

    /// Returns the value at `handle` mutably, or `None` if it has been removed.
    pub fn get_at_mut(&mut self, handle: Handle) -> Option<&mut V> {
        let at = self.resolve(handle)?;
        Some(&mut self.item_mut(at).value)
    }

    /// Removes the value at `handle`.
    ///
    /// Returns the value and a handle to the value that now follows it in
    /// iteration order, or `None` if `handle` no longer refers to a value.
    ///
    /// Removing a value that heads a collision chain moves the next value of
    /// that chain into its slot, so the returned handle may name the same slot
    /// as `handle`. Existing handles to the moved value are stale: their slot
    /// is freed and will hold whatever value is inserted there next. Use the
    /// returned handle instead.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use closed_hash::HashTable;
    /// let mut table = HashTable::new();
    /// for n in 0..4u64 {
    ///     table.insert(n, n, |&v| v == n);
    /// }
    ///
    /// // Remove every even value while walking the table.
    /// let mut at = table.first_handle();
    /// while let Some(handle) = at {
    ///     if table.get_at(handle).is_some_and(|v| v % 2 == 0) {
    ///         at = table.remove_at(handle).and_then(|(_, next)| next);
    ///     } else {
    ///         at = table.next_handle(handle);
    ///     }
    /// }
    /// assert_eq!(table.iter().copied().collect::<Vec<_>>(), [1, 3]);
    /// ```
    pub fn remove_at(&mut self, handle: Handle) -> Option<(V, Option<Handle>)> {
        let at = self.resolve(handle)?;
        let (value, next) = self.remove_index(at);
        Some((value, next.map(|index| self.handle(index))))
    }

    /// A handle to the first value in iteration order.
    pub fn first_handle(&self) -> Option<Handle> {
        self.first_index().map(|index| self.handle(index))
    }

    /// A handle to the last value in iteration order.
    pub fn last_handle(&self) -> Option<Handle> {
        self.last_index().map(|index| self.handle(index))
    }

    /// The handle following `handle` in iteration order.
    pub fn next_handle(&self, handle: Handle) -> Option<Handle> {
        let at = self.resolve(handle)?;
        self.next_index(at).map(|index| self.handle(index))
    }

    /// The handle preceding `handle` in iteration order.
    pub fn prev_handle(&self, handle: Handle) -> Option<Handle> {
        let at = self.resolve(handle)?;
        self.prev_index(at).map(|index| self.handle(index))
    }

    /// Retains only the values for which `f` returns `true`, visiting each
    /// value once in iteration order.
    pub fn retain(&mut self, mut f: impl FnMut(&mut V) -> bool) {
        let mut at = self.first_index();
        while let Some(index) = at {
            if f(&mut self.item_mut(index).value) {
                at = self.next_index(index);
            } else {
                at = self.remove_index(index).1;
            }
        }
    }

    /// Returns occupancy statistics for the table.
    ///
    /// Only available with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn stats(&self) -> TableStats {
        let mut stats = TableStats {
            len: self.populated,
            capacity: self.capacity,
            home: 0,
            misplaced: 0,
            free: self.capacity - self.populated,
            longest_chain: 0,
            chain_lengths: alloc::vec![0],
            load_factor: if self.capacity == 0 {
                0.0
            } else {
                self.populated as f64 / self.capacity as f64
            },
        };

        let record = |length: usize, stats: &mut TableStats| {
            if length == 0 {
                return;
            }
            if stats.chain_lengths.len() <= length {
                stats.chain_lengths.resize(length + 1, 0);
            }
            stats.chain_lengths[length] += 1;
            stats.longest_chain = stats.longest_chain.max(length);
        };

        let mut chain = 0;
        let mut at = self.first_index();
        while let Some(index) = at {
            match self.nodes[index].state {
                SlotState::Home => {
                    record(chain, &mut stats);
                    stats.home += 1;
                    chain = 1;
                }
                SlotState::Misplaced => {
                    stats.misplaced += 1;
                    chain += 1;
                }
                SlotState::Free => unreachable!("free slot {index} on the used list"),
            }
            at = self.next_index(index);
        }
        record(chain, &mut stats);

        stats
    }

    /// Walks the whole table and panics if any structural invariant is broken.
    ///
    /// Checks that every slot is on exactly one of the used and free lists,
    /// that links are symmetric, that the used list holds `len()` values, that
    /// every home value sits in its own bucket, and that every misplaced value
    /// is chained behind the home value of its bucket. Intended for tests and
    /// debugging; it runs in `O(capacity)`.
    pub fn check_invariants(&self) {
        if self.capacity == 0 {
            assert!(self.nodes.is_empty(), "zero-capacity table owns a store");
            assert_eq!(self.populated, 0, "zero-capacity table is populated");
            return;
        }
        assert_eq!(self.nodes.len(), self.capacity + 2, "node store size");

        let mut seen = alloc::vec![false; self.capacity];

        let used = self.used_sentinel();
        let mut chain_home = None;
        let mut count = 0;
        let mut prior = used;
        let mut at = list::next(&self.nodes, used);
        while at != used {
            assert!(at < self.capacity, "used list reaches slot {at}");
            assert!(!seen[at], "slot {at} is linked twice");
            seen[at] = true;

            let node = &self.nodes[at];
            assert_eq!(node.link.prior, prior, "broken prior link at slot {at}");
            let Some(item) = &node.item else {
                panic!("occupied slot {at} has no value");
            };

            let bucket = self.bucket(item.hash);
            match node.state {
                SlotState::Home => {
                    assert_eq!(bucket, at, "home slot {at} holds a value of bucket {bucket}");
                    chain_home = Some(at);
                }
                SlotState::Misplaced => {
                    assert_ne!(bucket, at, "misplaced slot {at} is its own bucket");
                    assert_eq!(
                        chain_home,
                        Some(bucket),
                        "misplaced slot {at} is not chained behind bucket {bucket}"
                    );
                }
                SlotState::Free => panic!("free slot {at} is on the used list"),
            }

            count += 1;
            prior = at;
            at = node.link.next;
        }
        assert_eq!(list::prior(&self.nodes, used), prior, "broken used tail");
        assert_eq!(count, self.populated, "used list length");

        let free = self.free_sentinel();
        let mut count = 0;
        let mut prior = free;
        let mut at = list::next(&self.nodes, free);
        while at != free {
            assert!(at < self.capacity, "free list reaches slot {at}");
            assert!(!seen[at], "slot {at} is linked twice");
            seen[at] = true;

            let node = &self.nodes[at];
            assert_eq!(node.link.prior, prior, "broken prior link at slot {at}");
            assert_eq!(node.state, SlotState::Free, "occupied slot {at} is on the free list");
            assert!(node.item.is_none(), "free slot {at} holds a value");

            count += 1;
            prior = at;
            at = node.link.next;
        }
        assert_eq!(list::prior(&self.nodes, free), prior, "broken free tail");
        assert_eq!(count, self.capacity - self.populated, "free list length");
    }
}

/// A view into a single entry in a [`HashTable`], which may either be vacant
/// or occupied.
///
/// This enum is constructed from the [`HashTable::entry`] method.
pub enum Entry<'a, V> {
    /// A vacant entry - no value matches.
    Vacant(VacantEntry<'a, V>),
    /// An occupied entry - a value matches.
    Occupied(OccupiedEntry<'a, V>),
}

impl<'a, V> Entry<'a, V> {
    /// Inserts `default` if the entry is vacant and returns a mutable reference
    /// to the value in the entry.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value in the entry.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Calls `f` on the value if the entry is occupied.
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Self {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }
}

impl<'a, V: Default> Entry<'a, V> {
    /// Inserts `V::default()` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(V::default)
    }
}

/// A view into a vacant entry in a [`HashTable`].
pub struct VacantEntry<'a, V> {
    table: &'a mut HashTable<V>,
    hash: u64,
}

impl<'a, V> VacantEntry<'a, V> {
    /// Inserts `value` into the table and returns a mutable reference to it.
    ///
    /// `value` must match the predicate the entry was looked up with.
    pub fn insert(self, value: V) -> &'a mut V {
        let at = self.table.place(self.hash, value);
        &mut self.table.item_mut(at).value
    }

    /// Inserts `value` into the table and returns a handle to it.
    pub fn insert_handle(self, value: V) -> Handle {
        let at = self.table.place(self.hash, value);
        self.table.handle(at)
    }
}

/// A view into an occupied entry in a [`HashTable`].
pub struct OccupiedEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<'a, V> OccupiedEntry<'a, V> {
    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        &self.table.item(self.index).value
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.table.item_mut(self.index).value
    }

    /// Converts the entry into a mutable reference bound to the table.
    pub fn into_mut(self) -> &'a mut V {
        &mut self.table.item_mut(self.index).value
    }

    /// Replaces the value in the entry, returning the old one.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    /// Returns a handle to the value in the entry.
    pub fn handle(&self) -> Handle {
        self.table.handle(self.index)
    }

    /// Removes the value from the table and returns it.
    pub fn remove(self) -> V {
        self.table.remove_index(self.index).0
    }
}

/// An iterator over the values of a [`HashTable`], in iteration order.
///
/// This struct is created by [`HashTable::iter`].
pub struct Iter<'a, V> {
    nodes: &'a [Node<V>],
    front: usize,
    back: usize,
    remaining: usize,
}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Iter {
            nodes: self.nodes,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.nodes[self.front];
        self.front = node.link.next;
        self.remaining -= 1;
        node.item.as_ref().map(|item| &item.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> DoubleEndedIterator for Iter<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.nodes[self.back];
        self.back = node.link.prior;
        self.remaining -= 1;
        node.item.as_ref().map(|item| &item.value)
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<V> FusedIterator for Iter<'_, V> {}

/// A mutable iterator over the values of a [`HashTable`], in iteration order.
///
/// This struct is created by [`HashTable::iter_mut`].
pub struct IterMut<'a, V> {
    nodes: NonNull<Node<V>>,
    front: usize,
    back: usize,
    remaining: usize,
    _marker: PhantomData<&'a mut V>,
}

// SAFETY: `IterMut` behaves like `&'a mut [Node<V>]`.
unsafe impl<V: Send> Send for IterMut<'_, V> {}
// SAFETY: `IterMut` behaves like `&'a mut [Node<V>]`.
unsafe impl<V: Sync> Sync for IterMut<'_, V> {}

impl<'a, V> IterMut<'a, V> {
    /// # Safety
    ///
    /// `at` must be one of the `remaining` nodes still to be yielded.
    #[inline(always)]
    unsafe fn node(&mut self, at: usize) -> &'a mut Node<V> {
        // SAFETY: `at` indexes the store borrowed mutably for `'a`. The used
        // list is a simple cycle, so the `remaining` nodes between `front` and
        // `back` are distinct and each one is handed out at most once.
        unsafe { self.nodes.add(at).as_mut() }
    }
}

impl<'a, V> Iterator for IterMut<'a, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        // SAFETY: `front` has not been yielded yet.
        let node = unsafe { self.node(self.front) };
        self.front = node.link.next;
        self.remaining -= 1;
        node.item.as_mut().map(|item| &mut item.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> DoubleEndedIterator for IterMut<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        // SAFETY: `back` has not been yielded yet.
        let node = unsafe { self.node(self.back) };
        self.back = node.link.prior;
        self.remaining -= 1;
        node.item.as_mut().map(|item| &mut item.value)
    }
}

impl<V> ExactSizeIterator for IterMut<'_, V> {}

impl<V> FusedIterator for IterMut<'_, V> {}

/// A draining iterator over the values of a [`HashTable`].
///
/// This struct is created by [`HashTable::drain`].
pub struct Drain<'a, V> {
    table: &'a mut HashTable<V>,
}

impl<V> Drop for Drain<'_, V> {
    fn drop(&mut self) {
        self.table.clear();
    }
}

impl<V> Iterator for Drain<'_, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        let at = self.table.first_index()?;
        Some(self.table.remove_index(at).0)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.populated, Some(self.table.populated))
    }
}

impl<V> ExactSizeIterator for Drain<'_, V> {}

impl<V> FusedIterator for Drain<'_, V> {}

/// An owning iterator over the values of a [`HashTable`], in iteration order.
pub struct IntoIter<V> {
    table: HashTable<V>,
}

impl<V> Iterator for IntoIter<V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        let at = self.table.first_index()?;
        Some(self.table.remove_index(at).0)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.populated, Some(self.table.populated))
    }
}

impl<V> DoubleEndedIterator for IntoIter<V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let at = self.table.last_index()?;
        Some(self.table.remove_index(at).0)
    }
}

impl<V> ExactSizeIterator for IntoIter<V> {}

impl<V> FusedIterator for IntoIter<V> {}

impl<V> IntoIterator for HashTable<V> {
    type IntoIter = IntoIter<V>;
    type Item = V;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { table: self }
    }
}

impl<'a, V> IntoIterator for &'a HashTable<V> {
    type IntoIter = Iter<'a, V>;
    type Item = &'a V;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, V> IntoIterator for &'a mut HashTable<V> {
    type IntoIter = IterMut<'a, V>;
    type Item = &'a mut V;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
