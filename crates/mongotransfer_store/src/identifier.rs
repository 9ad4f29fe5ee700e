//! Document identifiers and identifier sets.

use bson::{Bson, Document};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::hash_set;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Name of the field that identifies a document within its collection.
pub const ID_FIELD: &str = "_id";

/// The `_id` value of a document.
///
/// BSON values are neither `Eq` nor `Hash` (doubles), so an identifier keeps
/// a canonical extended JSON key next to the value and compares on that.
/// Numbers compare by value the way the server's `_id` index does:
/// `Int32(1)`, `Int64(1)` and `Double(1.0)` are the same identifier, while
/// `"1"` is not. Decimal128 values are keyed as they are.
#[derive(Debug, Clone)]
pub struct Identifier {
    value: Bson,
    key: String,
}

impl Identifier {
    /// Creates an identifier from any BSON value.
    pub fn new(value: impl Into<Bson>) -> Self {
        let value = value.into();
        let key = canonical_key(&value);
        Self { value, key }
    }

    /// Extracts the identifier of a document, if it has one.
    pub fn of(document: &Document) -> Option<Self> {
        document.get(ID_FIELD).cloned().map(Self::new)
    }

    /// Returns the BSON value.
    pub fn value(&self) -> &Bson {
        &self.value
    }

    /// Returns the `{ _id: <value> }` filter selecting this identifier.
    pub fn filter(&self) -> Document {
        let mut filter = Document::new();
        filter.insert(ID_FIELD, self.value.clone());
        filter
    }
}

fn canonical_key(value: &Bson) -> String {
    let normalized = match value {
        Bson::Int32(n) => Bson::Int64(i64::from(*n)),
        Bson::Double(f)
            if f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(f) =>
        {
            Bson::Int64(*f as i64)
        }
        other => other.clone(),
    };
    normalized.into_canonical_extjson().to_string()
}

impl From<Bson> for Identifier {
    fn from(value: Bson) -> Self {
        Self::new(value)
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value.clone().into_relaxed_extjson())
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.clone().into_relaxed_extjson().serialize(serializer)
    }
}

/// A set of identifiers.
///
/// Seeded from a destination snapshot, drained while the source is copied.
/// Whatever is left afterwards exists only in the destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierSet {
    ids: HashSet<Identifier>,
}

impl IdentifierSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an identifier. Returns false if it was already present.
    pub fn insert(&mut self, id: Identifier) -> bool {
        self.ids.insert(id)
    }

    /// Removes an identifier. Removing an absent identifier is a no-op
    /// that returns false.
    pub fn remove(&mut self, id: &Identifier) -> bool {
        self.ids.remove(id)
    }

    /// Returns true if the identifier is in the set.
    pub fn contains(&self, id: &Identifier) -> bool {
        self.ids.contains(id)
    }

    /// Number of identifiers in the set.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterates the identifiers in no particular order.
    pub fn iter(&self) -> hash_set::Iter<'_, Identifier> {
        self.ids.iter()
    }

    /// Returns the identifiers ordered by canonical key.
    pub fn sorted(&self) -> Vec<&Identifier> {
        let mut ids: Vec<_> = self.ids.iter().collect();
        ids.sort();
        ids
    }
}

impl FromIterator<Identifier> for IdentifierSet {
    fn from_iter<I: IntoIterator<Item = Identifier>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a IdentifierSet {
    type Item = &'a Identifier;
    type IntoIter = hash_set::Iter<'a, Identifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

impl IntoIterator for IdentifierSet {
    type Item = Identifier;
    type IntoIter = hash_set::IntoIter<Identifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.into_iter()
    }
}

// Sorted so that two audits of the same set are byte-identical.
impl Serialize for IdentifierSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.sorted())
    }
}
