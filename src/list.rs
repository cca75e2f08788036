//! Index-based intrusive circular lists.
//!
//! Every node of the store carries a single [`Link`]. The same pair of
//! indices threads the node through the used list, the free list, or (because
//! bucket chains are contiguous runs of the used list) a collision chain. Each
//! list is anchored by a sentinel node that is never occupied.

/// The `next`/`prior` pair embedded in every node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Link {
    pub(crate) next: usize,
    pub(crate) prior: usize,
}

impl Link {
    /// A link for a node that forms a list on its own, e.g. an empty sentinel.
    #[inline(always)]
    pub(crate) fn detached(at: usize) -> Self {
        Link {
            next: at,
            prior: at,
        }
    }
}

pub(crate) trait Linked {
    fn link(&self) -> &Link;
    fn link_mut(&mut self) -> &mut Link;
}

#[inline(always)]
pub(crate) fn next<N: Linked>(nodes: &[N], at: usize) -> usize {
    nodes[at].link().next
}

#[inline(always)]
pub(crate) fn prior<N: Linked>(nodes: &[N], at: usize) -> usize {
    nodes[at].link().prior
}

/// Moves the run `first..=last` (linked in that order in some list) so that it
/// sits immediately before `position`, which may belong to any list.
///
/// `position` must not be a member of the run.
#[inline]
pub(crate) fn splice_range<N: Linked>(nodes: &mut [N], position: usize, first: usize, last: usize) {
    debug_assert!(position != first && position != last);

    let before = prior(nodes, first);
    let after = next(nodes, last);
    nodes[before].link_mut().next = after;
    nodes[after].link_mut().prior = before;

    let tail = prior(nodes, position);
    nodes[tail].link_mut().next = first;
    nodes[first].link_mut().prior = tail;
    nodes[last].link_mut().next = position;
    nodes[position].link_mut().prior = last;
}

/// Moves a single node to sit immediately before `position`.
#[inline(always)]
pub(crate) fn move_before<N: Linked>(nodes: &mut [N], position: usize, node: usize) {
    splice_range(nodes, position, node, node);
}

/// Moves a single node to the back of the list anchored by `sentinel`.
#[inline(always)]
pub(crate) fn push_back<N: Linked>(nodes: &mut [N], sentinel: usize, node: usize) {
    move_before(nodes, sentinel, node);
}

/// Moves a single node to the front of the list anchored by `sentinel`.
#[inline(always)]
pub(crate) fn push_front<N: Linked>(nodes: &mut [N], sentinel: usize, node: usize) {
    let head = next(nodes, sentinel);
    if head != node {
        move_before(nodes, head, node);
    }
}

/// Moves every member of the list anchored by `from` to the back of the list
/// anchored by `to`, leaving `from` empty.
#[inline]
pub(crate) fn append<N: Linked>(nodes: &mut [N], to: usize, from: usize) {
    let first = next(nodes, from);
    if first == from {
        return;
    }
    let last = prior(nodes, from);
    splice_range(nodes, to, first, last);
}
