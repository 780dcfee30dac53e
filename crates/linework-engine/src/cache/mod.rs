//! Ordered keyed cache.
//!
//! A red-black tree ordered by an injected comparator. It backs the material
//! cache: lookups are exact-match through the comparator, iteration is in
//! ascending key order, and there is no removal other than clearing.

mod rb_tree;

pub use rb_tree::{DuplicateKey, OrderedKeyedCache};
