//!
//! Symbol interning for the Tern runtime.
//!
//! Byte strings are resolved through a variable-arity trie to a [`NameId`]
//! that is stable for the lifetime of the namespace: resolving the same
//! bytes always yields the same id, and an id issued before a trie
//! restructuring (edge split) remains valid afterwards. All symbol
//! equality in the runtime is id equality; the bytes are compared at most
//! once, here.

use std::cmp::Ordering;
use std::fmt;

/// An interned name.
///
/// This is fast to move, clone and compare. Equal ids mean equal byte
/// strings; distinct ids mean distinct byte strings.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct NameId(pub u32);

impl fmt::Display for NameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An outgoing edge: the labelling segment and the node it leads to.
///
/// A child's full name is its parent's full name followed by `seg`.
struct Edge {
    seg: Box<[u8]>,
    child: u32,
}

/// One trie node, owning the complete byte string it stands for.
///
/// Children are kept sorted by segment so lookup can binary-search them.
/// Intermediate nodes created by edge splits are names in their own right
/// and may be handed out by a later resolve of their prefix.
struct Node {
    bytes: Box<[u8]>,
    children: Vec<Edge>,
}

/// The interning trie. Node 0 is the root and stands for the empty name.
pub struct Namespace {
    nodes: Vec<Node>,
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl Namespace {
    pub fn new() -> Self {
        Namespace {
            nodes: vec![Node {
                bytes: Box::new([]),
                children: Vec::new(),
            }],
        }
    }

    /// Resolves `name` to its id, interning it if it was never seen.
    ///
    /// Idempotent: the id for a given byte string never changes, even when
    /// later insertions split edges around its node.
    pub fn resolve(&mut self, name: &[u8]) -> NameId {
        let mut cur: u32 = 0;
        let mut rest = name;
        loop {
            if rest.is_empty() {
                return NameId(cur);
            }
            let node = &self.nodes[cur as usize];
            let probe = node.children.binary_search_by(|edge| {
                let n = edge.seg.len().min(rest.len());
                edge.seg[..n].cmp(&rest[..n])
            });
            match probe {
                Ok(pos) => {
                    let seg_len = self.nodes[cur as usize].children[pos].seg.len();
                    if rest.len() < seg_len {
                        // Exact prefix of an existing edge: split it and
                        // land on the intermediate node.
                        return NameId(self.split(cur, pos, rest.len()));
                    }
                    cur = self.nodes[cur as usize].children[pos].child;
                    rest = &rest[seg_len..];
                }
                Err(low) => {
                    // The binary search compares whole segments, so an edge
                    // sharing only a partial first-byte prefix lands beside
                    // the insertion point. Check both neighbours.
                    if let Some((pos, matching)) = self.partial_neighbor(cur, low, rest) {
                        let seg_len = self.nodes[cur as usize].children[pos].seg.len();
                        if matching == seg_len {
                            cur = self.nodes[cur as usize].children[pos].child;
                        } else {
                            cur = self.split(cur, pos, matching);
                        }
                        rest = &rest[matching..];
                    } else {
                        return NameId(self.insert_child(cur, low, rest, name));
                    }
                }
            }
        }
    }

    /// The byte string `id` was interned from.
    pub fn bytes(&self, id: NameId) -> &[u8] {
        &self.nodes[id.0 as usize].bytes
    }

    /// Lossy UTF-8 view of a name, for diagnostics and printing.
    pub fn display(&self, id: NameId) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(self.bytes(id))
    }

    /// Shortlex order: shorter names sort first, ties fall back to bytes.
    pub fn cmp_names(&self, a: NameId, b: NameId) -> Ordering {
        let (a, b) = (self.bytes(a), self.bytes(b));
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    }

    /// Number of nodes, counting the root and split intermediates.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Visits every name in the trie, split intermediates included.
    pub fn for_each_name<F: FnMut(NameId, &[u8])>(&self, mut f: F) {
        for (idx, node) in self.nodes.iter().enumerate() {
            f(NameId(idx as u32), &node.bytes);
        }
    }

    /// Looks at the edges adjacent to insertion point `low` for one that
    /// shares a leading prefix with `rest`; returns its position and the
    /// shared length.
    fn partial_neighbor(&self, cur: u32, low: usize, rest: &[u8]) -> Option<(usize, usize)> {
        let children = &self.nodes[cur as usize].children;
        for pos in [Some(low), low.checked_sub(1)].into_iter().flatten() {
            if pos >= children.len() {
                continue;
            }
            let seg = &children[pos].seg;
            let matching = seg
                .iter()
                .zip(rest.iter())
                .take_while(|(a, b)| a == b)
                .count();
            if matching > 0 {
                return Some((pos, matching));
            }
        }
        None
    }

    /// Splits the edge at `pos` under `cur` after `len` bytes, inserting an
    /// intermediate node that owns the common prefix. The old child keeps
    /// its node (and therefore its id); only its incoming segment shrinks.
    fn split(&mut self, cur: u32, pos: usize, len: usize) -> u32 {
        let (old_child, old_seg) = {
            let edge = &self.nodes[cur as usize].children[pos];
            (edge.child, edge.seg.clone())
        };
        debug_assert!(len > 0 && len < old_seg.len());
        let old_full = &self.nodes[old_child as usize].bytes;
        let mid_len = old_full.len() - old_seg.len() + len;
        let mid_bytes: Box<[u8]> = old_full[..mid_len].into();
        let mid = self.nodes.len() as u32;
        // Allocate the intermediate fully before relinking so a failure
        // cannot leave the edge half rewritten.
        self.nodes.push(Node {
            bytes: mid_bytes,
            children: vec![Edge {
                seg: old_seg[len..].into(),
                child: old_child,
            }],
        });
        let edge = &mut self.nodes[cur as usize].children[pos];
        edge.seg = old_seg[..len].into();
        edge.child = mid;
        mid
    }

    /// Inserts a fresh leaf for translating the remaining `rest` bytes,
    /// keeping the child vector sorted.
    fn insert_child(&mut self, cur: u32, low: usize, rest: &[u8], whole: &[u8]) -> u32 {
        let id = self.nodes.len() as u32;
        self.nodes.push(Node {
            bytes: whole.into(),
            children: Vec::new(),
        });
        self.nodes[cur as usize].children.insert(
            low,
            Edge {
                seg: rest.into(),
                child: id,
            },
        );
        id
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_is_idempotent() {
        let mut ns = Namespace::new();
        let a = ns.resolve(b"lambda");
        let b = ns.resolve(b"lambda");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_names_get_distinct_ids() {
        let mut ns = Namespace::new();
        let a = ns.resolve(b"car");
        let b = ns.resolve(b"cdr");
        let c = ns.resolve(b"caar");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn bytes_round_trip() {
        let mut ns = Namespace::new();
        let names: &[&[u8]] = &[b"x", b"xy", b"xyz", b"ab", b"a", b"", b"longer-name"];
        let ids: Vec<NameId> = names.iter().map(|n| ns.resolve(n)).collect();
        for (id, name) in ids.iter().zip(names) {
            assert_eq!(ns.bytes(*id), *name);
        }
    }

    #[test]
    fn split_preserves_existing_ids() {
        let mut ns = Namespace::new();
        let foobar = ns.resolve(b"foobar");
        // Interning a strict prefix splits the foobar edge.
        let foo = ns.resolve(b"foo");
        assert_ne!(foo, foobar);
        assert_eq!(ns.bytes(foobar), b"foobar");
        assert_eq!(ns.bytes(foo), b"foo");
        assert_eq!(ns.resolve(b"foobar"), foobar);
        assert_eq!(ns.resolve(b"foo"), foo);
    }

    #[test]
    fn diverging_edges_split_on_common_prefix() {
        let mut ns = Namespace::new();
        let abc = ns.resolve(b"abc");
        let abd = ns.resolve(b"abd");
        let ab = ns.resolve(b"ab");
        assert_ne!(abc, abd);
        assert_eq!(ns.bytes(abc), b"abc");
        assert_eq!(ns.bytes(abd), b"abd");
        assert_eq!(ns.bytes(ab), b"ab");
        assert_eq!(ns.resolve(b"abc"), abc);
        assert_eq!(ns.resolve(b"abd"), abd);
    }

    #[test]
    fn empty_name_is_the_root() {
        let mut ns = Namespace::new();
        let empty = ns.resolve(b"");
        assert_eq!(empty, ns.resolve(b""));
        assert_eq!(ns.bytes(empty), b"");
    }

    #[test]
    fn many_siblings_stay_sorted_and_distinct() {
        let mut ns = Namespace::new();
        let mut ids = Vec::new();
        for b in 0u8..=255 {
            ids.push(ns.resolve(&[b]));
        }
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(ns.bytes(*id), &[i as u8]);
            assert_eq!(ns.resolve(&[i as u8]), *id);
        }
    }

    #[test]
    fn shortlex_ordering() {
        let mut ns = Namespace::new();
        let a = ns.resolve(b"a");
        let b = ns.resolve(b"b");
        let aa = ns.resolve(b"aa");
        let zz = ns.resolve(b"zz");
        assert_eq!(ns.cmp_names(a, b), Ordering::Less);
        assert_eq!(ns.cmp_names(b, aa), Ordering::Less);
        assert_eq!(ns.cmp_names(aa, zz), Ordering::Less);
        assert_eq!(ns.cmp_names(zz, zz), Ordering::Equal);
        assert_eq!(ns.cmp_names(aa, a), Ordering::Greater);
    }

    #[test]
    fn enumeration_visits_interned_names() {
        let mut ns = Namespace::new();
        ns.resolve(b"one");
        ns.resolve(b"two");
        ns.resolve(b"three");
        let mut seen = Vec::new();
        ns.for_each_name(|_, bytes| seen.push(bytes.to_vec()));
        assert!(seen.iter().any(|n| n == b"one"));
        assert!(seen.iter().any(|n| n == b"two"));
        assert!(seen.iter().any(|n| n == b"three"));
    }
}
