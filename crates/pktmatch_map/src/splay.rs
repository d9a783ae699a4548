use std::cmp::Ordering;

use crate::OrderedMap;

struct SplayNode<K, V> {
    key: K,
    value: V,
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
}

/// Splay tree with arena-allocated nodes.
///
/// Every insert and every lookup, hit or miss, splays the touched node to the root. On a miss
/// the touched node is the last one visited by the descent.
pub struct SplayTree<K, V> {
    nodes: Vec<SplayNode<K, V>>,
    root: Option<usize>,
}

impl<K: Ord, V> Default for SplayTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> SplayTree<K, V> {
    #[inline]
    pub fn new() -> Self {
        SplayTree {
            nodes: Vec::new(),
            root: None,
        }
    }

    #[inline]
    pub fn root_key(&self) -> Option<&K> {
        self.root.map(|idx| &self.nodes[idx].key)
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack: Vec<(usize, usize)> = self.root.map(|r| (r, 1)).into_iter().collect();
        while let Some((idx, depth)) = stack.pop() {
            height = height.max(depth);
            let node = &self.nodes[idx];
            stack.extend(node.left.map(|l| (l, depth + 1)));
            stack.extend(node.right.map(|r| (r, depth + 1)));
        }
        height
    }

    // Returns the node holding `key`, or the last node visited when the key is absent.
    fn descend(&self, key: &K) -> Option<(usize, Ordering)> {
        let mut cur = self.root?;
        loop {
            let node = &self.nodes[cur];
            let ord = key.cmp(&node.key);
            let next = match ord {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => None,
            };
            match next {
                Some(next) => cur = next,
                None => return Some((cur, ord)),
            }
        }
    }

    #[inline]
    fn is_left_child(&self, child: usize, parent: usize) -> bool {
        self.nodes[parent].left == Some(child)
    }

    /// Promotes `x` above its parent. In-order sequence is preserved, only the links of `x`,
    /// its parent, its grandparent and the subtree that changes sides are touched.
    fn rotate(&mut self, x: usize) {
        let Some(p) = self.nodes[x].parent else {
            return;
        };
        let g = self.nodes[p].parent;
        if self.is_left_child(x, p) {
            let b = self.nodes[x].right;
            self.nodes[p].left = b;
            if let Some(b) = b {
                self.nodes[b].parent = Some(p);
            }
            self.nodes[x].right = Some(p);
        } else {
            let b = self.nodes[x].left;
            self.nodes[p].right = b;
            if let Some(b) = b {
                self.nodes[b].parent = Some(p);
            }
            self.nodes[x].left = Some(p);
        }
        self.nodes[p].parent = Some(x);
        self.nodes[x].parent = g;
        match g {
            Some(g) if self.nodes[g].left == Some(p) => self.nodes[g].left = Some(x),
            Some(g) => self.nodes[g].right = Some(x),
            None => self.root = Some(x),
        }
    }

    fn splay(&mut self, x: usize) {
        while let Some(p) = self.nodes[x].parent {
            match self.nodes[p].parent {
                // zig
                None => self.rotate(x),
                Some(g) => {
                    if self.is_left_child(x, p) == self.is_left_child(p, g) {
                        // zig-zig: parent over grandparent first
                        self.rotate(p);
                        self.rotate(x);
                    } else {
                        // zig-zag
                        self.rotate(x);
                        self.rotate(x);
                    }
                }
            }
        }
    }
}

impl<K: Ord, V> OrderedMap for SplayTree<K, V> {
    type Key = K;
    type Value = V;

    fn insert(&mut self, key: K, value: V) {
        let Some((at, ord)) = self.descend(&key) else {
            self.nodes.push(SplayNode {
                key,
                value,
                parent: None,
                left: None,
                right: None,
            });
            self.root = Some(self.nodes.len() - 1);
            return;
        };
        let target = match ord {
            Ordering::Equal => {
                self.nodes[at].value = value;
                at
            }
            _ => {
                let idx = self.nodes.len();
                self.nodes.push(SplayNode {
                    key,
                    value,
                    parent: Some(at),
                    left: None,
                    right: None,
                });
                if ord == Ordering::Less {
                    self.nodes[at].left = Some(idx);
                } else {
                    self.nodes[at].right = Some(idx);
                }
                idx
            }
        };
        self.splay(target);
    }

    fn find(&mut self, key: &K) -> Option<&V> {
        let (at, ord) = self.descend(key)?;
        self.splay(at);
        match ord {
            Ordering::Equal => Some(&self.nodes[at].value),
            _ => None,
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    fn iter<'a>(&'a self) -> impl Iterator<Item = (&'a K, &'a V)>
    where
        Self::Key: 'a,
        Self::Value: 'a,
    {
        let mut iter = SplayTreeIter {
            tree: self,
            stack: Vec::new(),
        };
        iter.push_left(self.root);
        iter
    }
}

struct SplayTreeIter<'a, K, V> {
    tree: &'a SplayTree<K, V>,
    stack: Vec<usize>,
}

impl<'a, K, V> SplayTreeIter<'a, K, V> {
    fn push_left(&mut self, mut cur: Option<usize>) {
        while let Some(idx) = cur {
            self.stack.push(idx);
            cur = self.tree.nodes[idx].left;
        }
    }
}

impl<'a, K, V> Iterator for SplayTreeIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.stack.pop()?;
        let node = &self.tree.nodes[idx];
        self.push_left(node.right);
        Some((&node.key, &node.value))
    }
}
