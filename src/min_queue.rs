//! Minimum priority queue used by the witness searches.

use hashbrown::hash_map::DefaultHashBuilder;
use priority_queue::PriorityQueue;
use std::cmp::Reverse;
use std::hash::{BuildHasher, Hash};

/// Trait representing a priority queue of (key, value) items that are popped
/// in increasing order of their values.
pub trait MinPriorityQueue {
    /// Type of the keys.
    type Key;
    /// Type of the values.
    type Value;
    /// Reset the priority queue.
    fn reset(&mut self);
    /// Push a new item to the priority queue.
    fn push(&mut self, key: Self::Key, value: Self::Value);
    /// Decrease the value of a key, inserting the key if it is absent.
    fn decrease_value(&mut self, key: Self::Key, new_value: Self::Value);
    /// Pop the item with the smallest value.
    fn pop(&mut self) -> Option<(Self::Key, Self::Value)>;
}

/// Wrapper deriving a total order from a `PartialOrd` value.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct ImplOrd<T>(T);

impl<T: PartialEq> Eq for ImplOrd<T> {}

#[allow(clippy::derive_ord_xor_partial_ord)]
impl<T: PartialOrd> Ord for ImplOrd<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.partial_cmp(other).expect("Invalid comparison")
    }
}

/// Minimum priority queue over values of type `P`.
///
/// The witness searches use `P = (Weight, NodeId)` so that equal-distance
/// pops settle the smaller node id first.
pub type MinPQ<I, P> = PriorityQueue<I, Reverse<ImplOrd<P>>, DefaultHashBuilder>;

impl<I, P, H> MinPriorityQueue for PriorityQueue<I, Reverse<ImplOrd<P>>, H>
where
    I: Copy + Hash + Eq,
    P: Copy + PartialOrd,
    H: BuildHasher,
{
    type Key = I;
    type Value = P;
    fn reset(&mut self) {
        self.clear();
    }
    fn push(&mut self, key: I, value: P) {
        self.push(key, Reverse(ImplOrd(value)));
    }
    fn decrease_value(&mut self, key: I, value: P) {
        // Decreasing the value = increasing the priority.
        self.push_increase(key, Reverse(ImplOrd(value)));
    }
    fn pop(&mut self) -> Option<(I, P)> {
        self.pop().map(|(key, rev_value)| (key, rev_value.0 .0))
    }
}
