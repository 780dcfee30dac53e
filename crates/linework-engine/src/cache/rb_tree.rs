use core::cmp::Ordering;
use std::fmt;

/// Returned by [`OrderedKeyedCache::insert`] when the key is already present.
///
/// Callers are expected to `find` before `insert`; the rejected entry is
/// handed back untouched.
pub struct DuplicateKey<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> fmt::Debug for DuplicateKey<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DuplicateKey")
    }
}

impl<K, V> fmt::Display for DuplicateKey<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("key already present in ordered cache")
    }
}

impl<K, V> std::error::Error for DuplicateKey<K, V> {}

type NodeIdx = u32;

/// Index of the shared black leaf.
const NIL: NodeIdx = 0;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Color {
    Red,
    Black,
}

#[derive(Debug)]
struct Node<K, V> {
    entry: Option<(K, V)>,
    color: Color,
    parent: NodeIdx,
    left: NodeIdx,
    right: NodeIdx,
}

impl<K, V> Node<K, V> {
    const fn nil() -> Self {
        Self {
            entry: None,
            color: Color::Black,
            parent: NIL,
            left: NIL,
            right: NIL,
        }
    }
}

/// Balanced binary search tree keyed through a user comparator.
///
/// Invariants (red-black discipline):
/// - the root is black
/// - a red node never has a red child
/// - every root-to-leaf path has the same number of black nodes
///
/// Nodes live in a `Vec` and refer to each other by index; slot `0` is the
/// shared black leaf. The comparator must be a strict total order consistent
/// with equality, otherwise lookups silently miss.
pub struct OrderedKeyedCache<K, V, C = fn(&K, &K) -> Ordering> {
    nodes: Vec<Node<K, V>>,
    root: NodeIdx,
    len: usize,
    cmp: C,
}

impl<K: Ord, V> Default for OrderedKeyedCache<K, V> {
    fn default() -> Self {
        Self::new(K::cmp)
    }
}

impl<K, V, C> OrderedKeyedCache<K, V, C>
where
    C: Fn(&K, &K) -> Ordering,
{
    pub fn new(cmp: C) -> Self {
        Self {
            nodes: vec![Node::nil()],
            root: NIL,
            len: 0,
            cmp,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every entry. Allocated node capacity is kept.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[NIL as usize] = Node::nil();
        self.root = NIL;
        self.len = 0;
    }

    /// Exact-match lookup. O(log n).
    pub fn find(&self, probe: &K) -> Option<&V> {
        let idx = self.find_node(probe)?;
        self.entry(idx).map(|(_, v)| v)
    }

    /// Inserts a new entry. O(log n).
    ///
    /// Inserting a key that already compares equal to a stored key is rejected.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), DuplicateKey<K, V>> {
        let mut parent = NIL;
        let mut cur = self.root;
        let mut went_left = false;

        while cur != NIL {
            parent = cur;
            let Some((stored, _)) = self.entry(cur) else { break };
            match (self.cmp)(&key, stored) {
                Ordering::Less => {
                    went_left = true;
                    cur = self.node(cur).left;
                }
                Ordering::Greater => {
                    went_left = false;
                    cur = self.node(cur).right;
                }
                Ordering::Equal => return Err(DuplicateKey { key, value }),
            }
        }

        let idx = self.nodes.len() as NodeIdx;
        self.nodes.push(Node {
            entry: Some((key, value)),
            color: Color::Red,
            parent,
            left: NIL,
            right: NIL,
        });

        if parent == NIL {
            self.root = idx;
        } else if went_left {
            self.node_mut(parent).left = idx;
        } else {
            self.node_mut(parent).right = idx;
        }

        self.len += 1;
        self.insert_fixup(idx);
        Ok(())
    }

    /// Visits every entry in ascending key order.
    pub fn each<F>(&self, mut visitor: F)
    where
        F: FnMut(&K, &V),
    {
        for (k, v) in self.iter() {
            visitor(k, v);
        }
    }

    /// In-order iterator over entries.
    pub fn iter(&self) -> Iter<'_, K, V, C> {
        let mut it = Iter {
            cache: self,
            stack: Vec::new(),
        };
        it.push_left_spine(self.root);
        it
    }

    // ── internals ────────────────────────────────────────────────────────

    #[inline]
    fn node(&self, idx: NodeIdx) -> &Node<K, V> {
        &self.nodes[idx as usize]
    }

    #[inline]
    fn node_mut(&mut self, idx: NodeIdx) -> &mut Node<K, V> {
        &mut self.nodes[idx as usize]
    }

    #[inline]
    fn entry(&self, idx: NodeIdx) -> Option<&(K, V)> {
        self.node(idx).entry.as_ref()
    }

    fn find_node(&self, probe: &K) -> Option<NodeIdx> {
        let mut cur = self.root;
        while cur != NIL {
            let (stored, _) = self.entry(cur)?;
            cur = match (self.cmp)(probe, stored) {
                Ordering::Less => self.node(cur).left,
                Ordering::Greater => self.node(cur).right,
                Ordering::Equal => return Some(cur),
            };
        }
        None
    }

    fn rotate_left(&mut self, x: NodeIdx) {
        let y = self.node(x).right;
        let y_left = self.node(y).left;

        self.node_mut(x).right = y_left;
        if y_left != NIL {
            self.node_mut(y_left).parent = x;
        }

        let x_parent = self.node(x).parent;
        self.node_mut(y).parent = x_parent;
        if x_parent == NIL {
            self.root = y;
        } else if self.node(x_parent).left == x {
            self.node_mut(x_parent).left = y;
        } else {
            self.node_mut(x_parent).right = y;
        }

        self.node_mut(y).left = x;
        self.node_mut(x).parent = y;
    }

    fn rotate_right(&mut self, x: NodeIdx) {
        let y = self.node(x).left;
        let y_right = self.node(y).right;

        self.node_mut(x).left = y_right;
        if y_right != NIL {
            self.node_mut(y_right).parent = x;
        }

        let x_parent = self.node(x).parent;
        self.node_mut(y).parent = x_parent;
        if x_parent == NIL {
            self.root = y;
        } else if self.node(x_parent).right == x {
            self.node_mut(x_parent).right = y;
        } else {
            self.node_mut(x_parent).left = y;
        }

        self.node_mut(y).right = x;
        self.node_mut(x).parent = y;
    }

    fn insert_fixup(&mut self, mut z: NodeIdx) {
        while self.node(self.node(z).parent).color == Color::Red {
            let parent = self.node(z).parent;
            let grand = self.node(parent).parent;

            if parent == self.node(grand).left {
                let uncle = self.node(grand).right;
                if self.node(uncle).color == Color::Red {
                    self.node_mut(parent).color = Color::Black;
                    self.node_mut(uncle).color = Color::Black;
                    self.node_mut(grand).color = Color::Red;
                    z = grand;
                } else {
                    if z == self.node(parent).right {
                        z = parent;
                        self.rotate_left(z);
                    }
                    let parent = self.node(z).parent;
                    let grand = self.node(parent).parent;
                    self.node_mut(parent).color = Color::Black;
                    self.node_mut(grand).color = Color::Red;
                    self.rotate_right(grand);
                }
            } else {
                let uncle = self.node(grand).left;
                if self.node(uncle).color == Color::Red {
                    self.node_mut(parent).color = Color::Black;
                    self.node_mut(uncle).color = Color::Black;
                    self.node_mut(grand).color = Color::Red;
                    z = grand;
                } else {
                    if z == self.node(parent).left {
                        z = parent;
                        self.rotate_right(z);
                    }
                    let parent = self.node(z).parent;
                    let grand = self.node(parent).parent;
                    self.node_mut(parent).color = Color::Black;
                    self.node_mut(grand).color = Color::Red;
                    self.rotate_left(grand);
                }
            }
        }

        let root = self.root;
        self.node_mut(root).color = Color::Black;
        // Rotations may have written a parent link into the shared leaf.
        self.node_mut(NIL).parent = NIL;
    }

    /// Verifies the red-black invariants and returns the black height.
    #[cfg(test)]
    fn check_invariants(&self) -> Result<usize, String> {
        if self.node(self.root).color != Color::Black {
            return Err("root is red".into());
        }
        self.check_subtree(self.root)
    }

    #[cfg(test)]
    fn check_subtree(&self, idx: NodeIdx) -> Result<usize, String> {
        if idx == NIL {
            return Ok(1);
        }
        let node = self.node(idx);
        if node.color == Color::Red
            && (self.node(node.left).color == Color::Red
                || self.node(node.right).color == Color::Red)
        {
            return Err(format!("red node {idx} has a red child"));
        }
        for child in [node.left, node.right] {
            if child != NIL && self.node(child).parent != idx {
                return Err(format!("broken parent link under node {idx}"));
            }
        }
        let lh = self.check_subtree(node.left)?;
        let rh = self.check_subtree(node.right)?;
        if lh != rh {
            return Err(format!("black height mismatch at node {idx}: {lh} vs {rh}"));
        }
        Ok(lh + usize::from(node.color == Color::Black))
    }
}

/// In-order iterator returned by [`OrderedKeyedCache::iter`].
pub struct Iter<'a, K, V, C> {
    cache: &'a OrderedKeyedCache<K, V, C>,
    stack: Vec<NodeIdx>,
}

impl<K, V, C> Iter<'_, K, V, C> {
    fn push_left_spine(&mut self, mut idx: NodeIdx) {
        while idx != NIL {
            self.stack.push(idx);
            idx = self.cache.nodes[idx as usize].left;
        }
    }
}

impl<'a, K, V, C> Iterator for Iter<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.stack.pop()?;
        let cache = self.cache;
        let node = &cache.nodes[idx as usize];
        self.push_left_spine(node.right);
        node.entry.as_ref().map(|(k, v)| (k, v))
    }
}
