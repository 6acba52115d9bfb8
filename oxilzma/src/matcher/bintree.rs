//! Binary-tree match finder.
//!
//! Every window position that starts a complete 4-byte word gets a node in
//! an unbalanced binary search tree keyed by the big-endian value of that
//! word. Nodes live in a fixed arena with one slot per dictionary byte;
//! links are arena indices with [`NULL`] standing in for "no node". When a
//! slot is reused, the node of the evicted position is unlinked first.
//!
//! A search probes the three most recent distances, then either walks all
//! nodes whose key equals the lookahead's fingerprint or, without an exact
//! key, walks outward from the insertion point through successors and then
//! predecessors while the candidates keep matching.

use super::{Best, MatchFinder, acceptable};
use crate::dict::Window;
use crate::model::MATCH_LEN_MAX;
use crate::operation::Operation;
use oxilzma_core::error::{OxiLzmaError, Result};
use std::iter;

/// Length of the word a node key is built from.
const WORD_LEN: i64 = 4;

/// Sentinel index for a missing node.
pub const NULL: u32 = u32::MAX;

/// Candidate nodes checked per search.
const CHECK_BUDGET: usize = 32;

/// Distances probed directly before the tree is consulted.
const SHORT_DISTANCES: usize = 3;

#[derive(Debug, Clone, Copy)]
struct Node {
    /// Key: big-endian value of the 4 bytes at the node's position.
    x: u32,
    /// Parent.
    p: u32,
    /// Left child (keys less than or equal).
    l: u32,
    /// Right child (keys greater).
    r: u32,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            x: 0,
            p: NULL,
            l: NULL,
            r: NULL,
        }
    }
}

/// Big-endian fingerprint of the first four bytes of `p`, zero padded.
fn fingerprint(p: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    let n = p.len().min(4);
    word[..n].copy_from_slice(&p[..n]);
    u32::from_be_bytes(word)
}

/// Binary-tree match finder.
#[derive(Debug)]
pub struct BinaryTree {
    nodes: Vec<Node>,
    root: u32,
    /// Arena slot of the next node.
    front: u32,
    /// Stream position of the word completed by the last byte written.
    hoff: i64,
    /// The last four bytes written.
    x: u32,
    lookahead: [u8; MATCH_LEN_MAX],
}

/// Outcome of scanning one candidate sequence.
enum Scan {
    /// Stop searching; the best match so far is final.
    Accepted,
    /// The sequence ran out or stopped matching.
    Exhausted,
}

impl BinaryTree {
    /// Create a tree with one node per dictionary byte.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(OxiLzmaError::invalid_config(
                "binary tree capacity must be larger than zero",
            ));
        }
        if capacity as u64 >= NULL as u64 {
            return Err(OxiLzmaError::invalid_config(format!(
                "binary tree capacity must be less than {NULL}"
            )));
        }

        Ok(Self {
            nodes: vec![Node::default(); capacity],
            root: NULL,
            front: 0,
            hoff: -WORD_LEN,
            x: 0,
            lookahead: [0; MATCH_LEN_MAX],
        })
    }

    /// Number of nodes in the arena.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    fn write_byte(&mut self, c: u8) {
        self.x = (self.x << 8) | c as u32;
        self.hoff += 1;
        if self.hoff < 0 {
            return;
        }

        let v = self.front;
        if (v as i64) < self.hoff {
            // slot still holds the oldest position
            self.remove(v);
        }
        self.nodes[v as usize].x = self.x;
        self.add(v);

        self.front += 1;
        if self.front as usize == self.nodes.len() {
            self.front = 0;
        }
    }

    /// Insert node `v`; equal keys go left.
    fn add(&mut self, v: u32) {
        let x = self.nodes[v as usize].x;
        self.nodes[v as usize].l = NULL;
        self.nodes[v as usize].r = NULL;

        if self.root == NULL {
            self.root = v;
            self.nodes[v as usize].p = NULL;
            return;
        }

        let mut p = self.root;
        loop {
            let pn = &mut self.nodes[p as usize];
            let next = if x <= pn.x { &mut pn.l } else { &mut pn.r };
            if *next == NULL {
                *next = v;
                self.nodes[v as usize].p = p;
                return;
            }
            p = *next;
        }
    }

    /// Point the link of `parent` that refers to `old` at `new`.
    fn replace_child(&mut self, parent: u32, old: u32, new: u32) {
        if parent == NULL {
            self.root = new;
        } else if self.nodes[parent as usize].l == old {
            self.nodes[parent as usize].l = new;
        } else {
            self.nodes[parent as usize].r = new;
        }
    }

    /// Unlink node `v`.
    fn remove(&mut self, v: u32) {
        let Node { p, l, r, .. } = self.nodes[v as usize];

        if l == NULL {
            self.replace_child(p, v, r);
            if r != NULL {
                self.nodes[r as usize].p = p;
            }
            return;
        }
        if r == NULL {
            self.replace_child(p, v, l);
            self.nodes[l as usize].p = p;
            return;
        }

        let lr = self.nodes[l as usize].r;
        if lr == NULL {
            // left child takes v's place
            self.nodes[l as usize].r = r;
            self.nodes[r as usize].p = l;
            self.nodes[l as usize].p = p;
            self.replace_child(p, v, l);
            return;
        }

        // in-order predecessor: rightmost node of the left subtree
        let u = self.max(lr);
        let Node { l: ul, p: up, .. } = self.nodes[u as usize];
        self.nodes[up as usize].r = ul;
        if ul != NULL {
            self.nodes[ul as usize].p = up;
        }

        let un = &mut self.nodes[u as usize];
        un.l = l;
        un.r = r;
        un.p = p;
        self.nodes[l as usize].p = u;
        self.nodes[r as usize].p = u;
        self.replace_child(p, v, u);
    }

    /// Search the subtree at `v` for key `x`.
    ///
    /// Returns `(v, v)` for a node with key `x`, otherwise the nearest
    /// nodes on the search path with smaller and larger keys, either of
    /// which may be [`NULL`].
    fn search(&self, mut v: u32, x: u32) -> (u32, u32) {
        let (mut a, mut b) = (NULL, NULL);
        while v != NULL {
            let vn = &self.nodes[v as usize];
            if x == vn.x {
                return (v, v);
            }
            if x < vn.x {
                b = v;
                v = vn.l;
            } else {
                a = v;
                v = vn.r;
            }
        }
        (a, b)
    }

    fn min(&self, mut v: u32) -> u32 {
        if v == NULL {
            return NULL;
        }
        while self.nodes[v as usize].l != NULL {
            v = self.nodes[v as usize].l;
        }
        v
    }

    fn max(&self, mut v: u32) -> u32 {
        if v == NULL {
            return NULL;
        }
        while self.nodes[v as usize].r != NULL {
            v = self.nodes[v as usize].r;
        }
        v
    }

    /// In-order successor of `v`.
    fn succ(&self, mut v: u32) -> u32 {
        let u = self.min(self.nodes[v as usize].r);
        if u != NULL {
            return u;
        }
        loop {
            let p = self.nodes[v as usize].p;
            if p == NULL || self.nodes[p as usize].l == v {
                return p;
            }
            v = p;
        }
    }

    /// In-order predecessor of `v`.
    fn pred(&self, mut v: u32) -> u32 {
        let u = self.max(self.nodes[v as usize].l);
        if u != NULL {
            return u;
        }
        loop {
            let p = self.nodes[v as usize].p;
            if p == NULL || self.nodes[p as usize].r == v {
                return p;
            }
            v = p;
        }
    }

    /// Match distance of the position stored in node `v`.
    ///
    /// `front` is the slot of the word starting three bytes before the
    /// lookahead, so the ring distance is offset by three.
    fn distance(&self, v: u32) -> usize {
        let cap = self.nodes.len();
        let d = (self.front as usize + cap - v as usize) % cap;
        let d = if d == 0 { cap } else { d };
        d + (WORD_LEN as usize - 1)
    }

    /// Walk the successors of `v` in key order, `v` included.
    fn successors(&self, v: u32) -> impl Iterator<Item = u32> + '_ {
        iter::successors((v != NULL).then_some(v), |&w| {
            let s = self.succ(w);
            (s != NULL).then_some(s)
        })
    }

    /// Walk the predecessors of `v` in reverse key order, `v` included.
    fn predecessors(&self, v: u32) -> impl Iterator<Item = u32> + '_ {
        iter::successors((v != NULL).then_some(v), |&w| {
            let s = self.pred(w);
            (s != NULL).then_some(s)
        })
    }

    /// Walk all nodes with key `x`, starting at the exact hit `v`.
    fn equal_keys(&self, v: u32, x: u32) -> impl Iterator<Item = u32> + '_ {
        iter::successors(Some(v), move |&w| {
            let (a, b) = self.search(self.nodes[w as usize].l, x);
            (a == b && a != NULL).then_some(a)
        })
    }

    /// Check tree linkage and key order. Test helper.
    #[cfg(test)]
    fn check_tree(&self) -> usize {
        fn walk(t: &BinaryTree, v: u32, parent: u32, lo: Option<u32>, hi: Option<u32>) -> usize {
            if v == NULL {
                return 0;
            }
            let n = t.nodes[v as usize];
            assert_eq!(n.p, parent, "bad parent link at {v}");
            if let Some(lo) = lo {
                assert!(n.x > lo, "key order violated at {v}");
            }
            if let Some(hi) = hi {
                assert!(n.x <= hi, "key order violated at {v}");
            }
            1 + walk(t, n.l, v, lo, Some(n.x)) + walk(t, n.r, v, Some(n.x), hi)
        }
        walk(self, self.root, NULL, None, None)
    }
}

/// Scan candidate distances, updating `best`.
///
/// Every candidate drawn costs one unit of `budget`; an empty budget
/// accepts the current best. With `stop_shorter` the scan ends at the first
/// candidate that cannot improve on the current best, since candidates come
/// in order of decreasing similarity.
fn scan(
    window: &Window<'_>,
    data: &[u8],
    rep0: u32,
    best: &mut Best,
    mut candidates: impl Iterator<Item = usize>,
    stop_shorter: bool,
    budget: &mut usize,
) -> Scan {
    loop {
        if *budget == 0 {
            return Scan::Accepted;
        }
        let Some(dist) = candidates.next() else {
            return Scan::Exhausted;
        };
        *budget -= 1;

        if dist > window.dict_len() {
            continue;
        }
        if best.len > 0 && window.byte_behind(dist, best.len - 1) != data[best.len - 1] {
            if stop_shorter {
                return Scan::Exhausted;
            }
            continue;
        }

        let n = window.match_len(dist, data);
        if n == 0 && stop_shorter {
            return Scan::Exhausted;
        }
        if !acceptable(dist, n, rep0) {
            continue;
        }
        if n < best.len || (n == best.len && dist >= best.distance) {
            continue;
        }

        *best = Best {
            distance: dist,
            len: n,
        };
        if n >= MATCH_LEN_MAX {
            return Scan::Accepted;
        }
    }
}

impl MatchFinder for BinaryTree {
    fn write(&mut self, p: &[u8]) {
        for &c in p {
            self.write_byte(c);
        }
    }

    fn next_op(&mut self, window: &Window<'_>, rep: &[u32; 4]) -> Operation {
        let n = window.peek(&mut self.lookahead);
        assert!(n > 0, "no data in buffer");
        let data = &self.lookahead[..n];

        let mut best = Best::default();
        let mut budget = CHECK_BUDGET;

        let short = (1..=SHORT_DISTANCES).rev();
        if let Scan::Accepted = scan(window, data, rep[0], &mut best, short, false, &mut budget) {
            return best.into_op(data);
        }

        let x = fingerprint(data);
        let (u, v) = self.search(self.root, x);

        if u == v && u != NULL && data.len() >= WORD_LEN as usize {
            let candidates = self.equal_keys(u, x).map(|w| self.distance(w));
            scan(window, data, rep[0], &mut best, candidates, false, &mut budget);
            return best.into_op(data);
        }

        let above = self.successors(v).map(|w| self.distance(w));
        if let Scan::Accepted = scan(window, data, rep[0], &mut best, above, true, &mut budget) {
            return best.into_op(data);
        }

        let start = if u != NULL && u == v { self.pred(u) } else { u };
        let below = self.predecessors(start).map(|w| self.distance(w));
        scan(window, data, rep[0], &mut best, below, true, &mut budget);

        best.into_op(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::tests::{expand, parse};

    fn lcg_bytes(seed: u64, len: usize, alphabet: u8) -> Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                b'a' + ((state >> 33) % alphabet as u64) as u8
            })
            .collect()
    }

    #[test]
    fn test_fingerprint() {
        assert_eq!(fingerprint(b"ABCD"), 0x4142_4344);
        assert_eq!(fingerprint(b"ABCDE"), 0x4142_4344);
        assert_eq!(fingerprint(b"AB"), 0x4142_0000);
        assert_eq!(fingerprint(b"A"), 0x4100_0000);
    }

    #[test]
    fn test_tree_stays_ordered_under_eviction() {
        let mut tree = BinaryTree::new(64).unwrap();
        let input = lcg_bytes(1, 5000, 4);
        for (i, chunk) in input.chunks(37).enumerate() {
            tree.write(chunk);
            let expected = ((i + 1) * 37).min(input.len()).saturating_sub(3).min(64);
            assert_eq!(tree.check_tree(), expected);
        }
    }

    #[test]
    fn test_node_distance_matches_position() {
        let mut tree = BinaryTree::new(16).unwrap();
        let input = lcg_bytes(9, 100, 26);
        tree.write(&input);
        // node of position 90 (word input[90..94]) is 10 bytes behind head 100
        let slot = 90 % 16;
        assert_eq!(tree.nodes[slot].x, fingerprint(&input[90..94]));
        assert_eq!(tree.distance(slot as u32), 10);
        // newest complete word starts 4 bytes back
        assert_eq!(tree.distance(96 % 16), 4);
        // oldest position still in the tree is 16 + 3 bytes back
        assert_eq!(tree.distance(81 % 16), 19);
    }

    #[test]
    fn test_succ_pred_walk_in_order() {
        let mut tree = BinaryTree::new(256).unwrap();
        tree.write(&lcg_bytes(3, 200, 8));
        let first = tree.min(tree.root);
        let keys: Vec<u32> = tree.successors(first).map(|v| tree.nodes[v as usize].x).collect();
        assert_eq!(keys.len(), 197);
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));

        let last = tree.max(tree.root);
        let back: Vec<u32> = tree.predecessors(last).map(|v| tree.nodes[v as usize].x).collect();
        let mut forward = keys.clone();
        forward.reverse();
        assert_eq!(back, forward);
    }

    #[test]
    fn test_parse_reproduces_input() {
        for (seed, alphabet) in [(1, 2), (2, 4), (3, 26)] {
            let input = lcg_bytes(seed, 20_000, alphabet);
            let ops = parse(BinaryTree::new(4096).unwrap(), 4096, &input);
            assert_eq!(expand(&ops), input);
            if alphabet < 26 {
                assert!(ops.len() < input.len() / 2);
            }
        }
    }

    #[test]
    fn test_small_dictionary_never_exceeds_capacity() {
        let input = lcg_bytes(5, 30_000, 3);
        let ops = parse(BinaryTree::new(4096).unwrap(), 4096, &input);
        for op in &ops {
            if let Operation::Match { distance, .. } = op {
                assert!(*distance <= 4096);
            }
        }
        assert_eq!(expand(&ops), input);
    }

    #[test]
    fn test_abababab() {
        let ops = parse(BinaryTree::new(4096).unwrap(), 4096, b"ABABABAB");
        assert_eq!(
            ops,
            vec![
                Operation::Literal(b'A'),
                Operation::Literal(b'B'),
                Operation::new_match(2, 6),
            ]
        );
    }

    #[test]
    fn test_prefers_smaller_distance_on_tie() {
        // "abcd" occurs at distances 10 and 5 before "abcdZ"
        let ops = parse(BinaryTree::new(4096).unwrap(), 4096, b"abcdXabcdYabcdZ");
        assert_eq!(
            ops,
            vec![
                Operation::Literal(b'a'),
                Operation::Literal(b'b'),
                Operation::Literal(b'c'),
                Operation::Literal(b'd'),
                Operation::Literal(b'X'),
                Operation::new_match(5, 4),
                Operation::Literal(b'Y'),
                Operation::new_match(5, 4),
                Operation::Literal(b'Z'),
            ]
        );
    }

    #[test]
    fn test_long_run_reaches_max_len() {
        let input = vec![b'z'; 2000];
        let ops = parse(BinaryTree::new(4096).unwrap(), 4096, &input);
        assert_eq!(ops[0], Operation::Literal(b'z'));
        assert_eq!(ops[1], Operation::new_match(1, MATCH_LEN_MAX));
        assert_eq!(expand(&ops), input);
    }

    #[test]
    fn test_invalid_capacity() {
        assert!(BinaryTree::new(0).is_err());
    }
}
