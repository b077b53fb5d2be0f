//! The value model.
//!
//! [`Value`] is a closed enum over every storable kind. Serialization is the
//! single source of truth: equality compares encodings, the content hash is
//! computed over the encoding, and nothing is derived any other way.

use std::cmp::Ordering;
use std::sync::Arc;

use tessera_types::{Format, Hash, Kind};

use crate::codec::{Reader, Writer};
use crate::error::{ValueError, ValueResult};
use crate::sequence::{LeafItems, Sequence};
use crate::store::ValueStore;

/// A typed reference to a value stored elsewhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Ref {
    target: Hash,
    target_kind: Kind,
    height: u64,
}

impl Ref {
    pub fn new(target: Hash, target_kind: Kind, height: u64) -> Self {
        Self {
            target,
            target_kind,
            height,
        }
    }

    /// Address of the referenced value.
    pub fn target(&self) -> Hash {
        self.target
    }

    /// Kind of the referenced value.
    pub fn target_kind(&self) -> Kind {
        self.target_kind
    }

    /// Height of the referenced value: 1 for scalars, tree level + 1 for
    /// collections.
    pub fn height(&self) -> u64 {
        self.height
    }
}

/// An immutable database value.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Ref(Ref),
    Blob(Arc<Sequence>),
    List(Arc<Sequence>),
    Map(Arc<Sequence>),
    Set(Arc<Sequence>),
}

impl Value {
    /// The null singleton.
    pub const NULL: Value = Value::Null;

    pub fn kind(&self) -> Kind {
        match self {
            Self::Null => Kind::Null,
            Self::Bool(_) => Kind::Bool,
            Self::Int(_) => Kind::Int,
            Self::Uint(_) => Kind::Uint,
            Self::Float(_) => Kind::Float,
            Self::String(_) => Kind::String,
            Self::Ref(_) => Kind::Ref,
            Self::Blob(_) => Kind::Blob,
            Self::List(_) => Kind::List,
            Self::Map(_) => Kind::Map,
            Self::Set(_) => Kind::Set,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Wrap a tree root as the collection value of its kind.
    pub fn from_sequence(sequence: Arc<Sequence>) -> Self {
        match sequence.kind() {
            Kind::Blob => Self::Blob(sequence),
            Kind::List => Self::List(sequence),
            Kind::Map => Self::Map(sequence),
            Kind::Set => Self::Set(sequence),
            other => unreachable!("sequence of non-collection kind {other}"),
        }
    }

    /// An in-memory single-chunk list.
    pub fn list(values: Vec<Value>) -> Self {
        Self::from_leaf(LeafItems::List(values))
    }

    /// An in-memory single-chunk set; `values` are sorted and deduplicated.
    pub fn set(values: Vec<Value>) -> Self {
        Self::from_leaf(LeafItems::set(values))
    }

    /// An in-memory single-chunk map; entries are sorted by key and the last
    /// entry for a key wins.
    pub fn map(entries: Vec<(Value, Value)>) -> Self {
        Self::from_leaf(LeafItems::map(entries))
    }

    /// An in-memory single-chunk blob.
    pub fn blob(bytes: Vec<u8>) -> Self {
        Self::from_leaf(LeafItems::Blob(bytes))
    }

    fn from_leaf(items: LeafItems) -> Self {
        Self::from_sequence(Arc::new(Sequence::leaf(Format::default(), items)))
    }

    /// The root sequence of a collection value.
    pub fn as_sequence(&self) -> Option<&Arc<Sequence>> {
        match self {
            Self::Blob(s) | Self::List(s) | Self::Map(s) | Self::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_sequence(self) -> Option<Arc<Sequence>> {
        match self {
            Self::Blob(s) | Self::List(s) | Self::Map(s) | Self::Set(s) => Some(s),
            _ => None,
        }
    }

    /// Height of this value in the chunk graph.
    pub fn height(&self) -> u64 {
        match self.as_sequence() {
            Some(seq) => seq.tree_level() + 1,
            None => 1,
        }
    }

    /// True iff both values have identical encodings.
    pub fn equals(&self, other: &Value) -> bool {
        self.kind() == other.kind() && self.canonical_bytes() == other.canonical_bytes()
    }

    /// The encoding under the value's own format: that of its tree for
    /// collections, the default for everything else.
    fn canonical_bytes(&self) -> Vec<u8> {
        let format = self.as_sequence().map(|s| s.format()).unwrap_or_default();
        self.value_bytes(format)
    }

    /// Strict total order: by kind tag, then kind-specific comparison.
    pub fn less(&self, other: &Value) -> bool {
        self.compare(other) == Ordering::Less
    }

    fn compare(&self, other: &Value) -> Ordering {
        let by_kind = self.kind().cmp(&other.kind());
        if by_kind != Ordering::Equal {
            return by_kind;
        }
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Uint(a), Self::Uint(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::String(a), Self::String(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Self::Ref(a), Self::Ref(b)) => a
                .target
                .cmp(&b.target)
                .then(a.target_kind.cmp(&b.target_kind))
                .then(a.height.cmp(&b.height)),
            // Collections order by content address.
            _ => Hash::of(Format::default(), &self.canonical_bytes())
                .cmp(&Hash::of(Format::default(), &other.canonical_bytes())),
        }
    }

    /// Content address of this value under `format`.
    ///
    /// A collection is always addressed under the format of its own tree,
    /// which is the address a store of that format gives its root chunk.
    /// Writing it to a store of another format is a
    /// [`FormatMismatch`](ValueError::FormatMismatch).
    pub fn hash(&self, format: Format) -> Hash {
        let format = self.as_sequence().map_or(format, |s| s.format());
        Hash::of(format, &self.value_bytes(format))
    }

    /// Visit the immediate child values held inline by this value.
    ///
    /// Scalars and refs visit nothing. A collection visits the values of its
    /// root chunk when that chunk is a leaf; interior roots and blobs visit
    /// nothing.
    pub fn walk_values(&self, cb: &mut dyn FnMut(&Value)) {
        if let Some(seq) = self.as_sequence() {
            seq.walk_values(cb);
        }
    }

    /// Visit the immediate content references of this value.
    pub fn walk_refs(&self, cb: &mut dyn FnMut(&Ref)) {
        match self {
            Self::Ref(r) => cb(r),
            other => {
                if let Some(seq) = other.as_sequence() {
                    seq.walk_refs(cb);
                }
            }
        }
    }

    /// Serialize kind tag and payload into `w`.
    pub fn write_to(&self, w: &mut Writer) {
        w.write_byte(self.kind().tag());
        match self {
            Self::Null => {}
            Self::Bool(b) => w.write_byte(u8::from(*b)),
            Self::Int(i) => w.write_signed_varint(*i),
            Self::Uint(u) => w.write_varint(*u),
            Self::Float(f) => w.write_f64(*f),
            Self::String(s) => w.write_string(s),
            Self::Ref(r) => {
                w.write_hash(&r.target);
                w.write_byte(r.target_kind.tag());
                w.write_varint(r.height);
            }
            Self::Blob(seq) | Self::List(seq) | Self::Map(seq) | Self::Set(seq) => seq.write_body(w),
        }
    }

    /// The full encoding: kind tag plus payload.
    pub fn value_bytes(&self, format: Format) -> Vec<u8> {
        let mut w = Writer::new(format);
        self.write_to(&mut w);
        w.into_bytes()
    }

    /// Decode one value from `r`.
    ///
    /// Collection values get `store` attached so their interior chunks can be
    /// resolved later.
    pub fn read_from(r: &mut Reader<'_>, store: Option<&ValueStore>) -> ValueResult<Value> {
        let kind = Kind::from_tag(r.read_byte("kind")?)?;
        Ok(match kind {
            Kind::Null => Self::Null,
            Kind::Bool => match r.read_byte("bool")? {
                0 => Self::Bool(false),
                1 => Self::Bool(true),
                other => return Err(ValueError::Decode(format!("invalid bool byte {other}"))),
            },
            Kind::Int => Self::Int(r.read_signed_varint("int")?),
            Kind::Uint => Self::Uint(r.read_varint("uint")?),
            Kind::Float => Self::Float(r.read_f64("float")?),
            Kind::String => Self::String(r.read_string("string")?),
            Kind::Ref => {
                let target = r.read_hash("ref.target")?;
                let target_kind = Kind::from_tag(r.read_byte("ref.kind")?)?;
                let height = r.read_varint("ref.height")?;
                Self::Ref(Ref::new(target, target_kind, height))
            }
            Kind::Blob | Kind::List | Kind::Map | Kind::Set => {
                r.enter_nested()?;
                let seq = Sequence::read_body(kind, r, store)?;
                r.leave_nested();
                Self::from_sequence(Arc::new(seq))
            }
        })
    }

    /// Decode a complete encoding; trailing bytes are an error.
    pub fn decode(bytes: &[u8], format: Format, store: Option<&ValueStore>) -> ValueResult<Value> {
        let mut r = Reader::new(bytes, format);
        let value = Self::read_from(&mut r, store)?;
        if !r.is_empty() {
            return Err(ValueError::Decode(format!(
                "{} trailing bytes after {} value",
                r.remaining_len(),
                value.kind()
            )));
        }
        Ok(value)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::hash::Hash::hash(&self.canonical_bytes(), state);
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Ref> for Value {
    fn from(v: Ref) -> Self {
        Self::Ref(v)
    }
}
