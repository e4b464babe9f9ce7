use crate::boxes::{BoxId, FourCC};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Key of one box in the [`FullBoxIndex`]: its dotted ancestor path plus a
/// sequence number distinguishing boxes that share the same path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct IndexedBoxEntry {
    pub path: String,
    pub seq: usize,
}

impl IndexedBoxEntry {
    pub fn new(path: impl Into<String>, seq: usize) -> Self {
        Self {
            path: path.into(),
            seq,
        }
    }
}

impl fmt::Display for IndexedBoxEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.path, self.seq)
    }
}

/// Every built box of one parse, keyed by `(path, seq)`.
///
/// Append-only while the tree is being built. Entries for the same path get
/// sequence numbers 0, 1, 2... in parse order.
#[derive(Debug, Default)]
pub struct FullBoxIndex {
    map: BTreeMap<IndexedBoxEntry, BoxId>,
    order: Vec<IndexedBoxEntry>,
}

impl FullBoxIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `id` under `path` at the first unused sequence number.
    pub fn add(&mut self, path: &str, id: BoxId) -> IndexedBoxEntry {
        let mut seq = 0;
        loop {
            let entry = IndexedBoxEntry::new(path, seq);
            if !self.map.contains_key(&entry) {
                self.map.insert(entry.clone(), id);
                self.order.push(entry.clone());
                return entry;
            }
            seq += 1;
        }
    }

    pub fn get(&self, path: &str, seq: usize) -> Option<BoxId> {
        self.map.get(&IndexedBoxEntry::new(path, seq)).copied()
    }

    /// All boxes indexed under `path`, in sequence order.
    pub fn all(&self, path: &str) -> Vec<BoxId> {
        let mut out = Vec::new();
        let mut seq = 0;
        while let Some(id) = self.get(path, seq) {
            out.push(id);
            seq += 1;
        }
        out
    }

    /// Entry/id pairs sorted by path then sequence number.
    pub fn iter(&self) -> impl Iterator<Item = (&IndexedBoxEntry, BoxId)> {
        self.map.iter().map(|(k, v)| (k, *v))
    }

    /// Entries in the order they were added.
    pub fn insertion_order(&self) -> &[IndexedBoxEntry] {
        &self.order
    }

    /// Position of `entry` in insertion order.
    pub fn position(&self, entry: &IndexedBoxEntry) -> Option<usize> {
        self.order.iter().position(|e| e == entry)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Sorted listing, one `path#seq -> id` per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (entry, id) in self.iter() {
            out.push_str(&format!("{entry} -> {}\n", id.0));
        }
        out
    }
}

/// Children of one parent, in file order and grouped by type.
#[derive(Debug, Default, Clone)]
pub struct LoadedBoxIndex {
    ordered: Vec<BoxId>,
    by_type: HashMap<FourCC, Vec<BoxId>>,
}

impl LoadedBoxIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, typ: FourCC, id: BoxId) {
        self.ordered.push(id);
        self.by_type.entry(typ).or_default().push(id);
    }

    /// Children of type `typ`, in file order.
    pub fn get(&self, typ: FourCC) -> &[BoxId] {
        self.by_type.get(&typ).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, typ: FourCC) -> Option<BoxId> {
        self.get(typ).first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = BoxId> + '_ {
        self.ordered.iter().copied()
    }

    pub fn types(&self) -> impl Iterator<Item = FourCC> + '_ {
        self.by_type.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
