//! Typed attribute storage.
//!
//! Attributes are named, typed, resizable arrays attached to the items of a
//! mesh (vertices, polygons, cells). The set of supported element kinds is
//! closed: storage is a tagged variant dispatched by pattern matching, and
//! every attribute carries an explicit [`AttributeKind`] tag instead of any
//! runtime type-name reflection.
//!
//! Two storage layouts exist:
//! - vector storage: one value per item (times the attribute dimension),
//! - constant storage: a single value logically repeated for every item,
//!   materialized into vector storage on first mutable element access.

use log::warn;
use rustc_hash::FxHashMap;

use crate::NO_ID;

/// The closed set of element kinds an attribute can store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// `usize` indices (e.g. the model vertex map).
    Index,
    /// `f64` scalars.
    Float64,
    /// Boolean flags.
    Bool,
}

/// A single attribute value of any supported kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeValue {
    /// An index value.
    Index(usize),
    /// A scalar value.
    Float64(f64),
    /// A flag value.
    Bool(bool),
}

impl AttributeValue {
    /// The kind tag of this value.
    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeValue::Index(_) => AttributeKind::Index,
            AttributeValue::Float64(_) => AttributeKind::Float64,
            AttributeValue::Bool(_) => AttributeKind::Bool,
        }
    }
}

/// Storage for one attribute.
#[derive(Debug, Clone)]
pub enum AttributeData {
    /// Vector storage of indices.
    Index(Vec<usize>),
    /// Vector storage of scalars.
    Float64(Vec<f64>),
    /// Vector storage of flags.
    Bool(Vec<bool>),
    /// Constant storage: `value` repeated `len` times.
    Constant {
        /// The repeated value.
        value: AttributeValue,
        /// The logical element count.
        len: usize,
    },
}

impl AttributeData {
    /// Create vector storage of `len` copies of `value`.
    pub fn filled(value: AttributeValue, len: usize) -> Self {
        match value {
            AttributeValue::Index(v) => AttributeData::Index(vec![v; len]),
            AttributeValue::Float64(v) => AttributeData::Float64(vec![v; len]),
            AttributeValue::Bool(v) => AttributeData::Bool(vec![v; len]),
        }
    }

    /// Create vector storage of `len` default values of `kind`.
    pub fn with_kind(kind: AttributeKind, len: usize) -> Self {
        Self::filled(default_value(kind), len)
    }

    /// The kind tag of the stored elements.
    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeData::Index(_) => AttributeKind::Index,
            AttributeData::Float64(_) => AttributeKind::Float64,
            AttributeData::Bool(_) => AttributeKind::Bool,
            AttributeData::Constant { value, .. } => value.kind(),
        }
    }

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        match self {
            AttributeData::Index(v) => v.len(),
            AttributeData::Float64(v) => v.len(),
            AttributeData::Bool(v) => v.len(),
            AttributeData::Constant { len, .. } => *len,
        }
    }

    /// Whether the storage holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one element as an [`AttributeValue`].
    pub fn value(&self, i: usize) -> AttributeValue {
        debug_assert!(i < self.len(), "attribute element {} out of range", i);
        match self {
            AttributeData::Index(v) => AttributeValue::Index(v[i]),
            AttributeData::Float64(v) => AttributeValue::Float64(v[i]),
            AttributeData::Bool(v) => AttributeValue::Bool(v[i]),
            AttributeData::Constant { value, .. } => *value,
        }
    }

    /// Resize the storage, padding with `value`.
    pub fn resize(&mut self, new_len: usize, value: AttributeValue) {
        debug_assert_eq!(self.kind(), value.kind());
        match (self, value) {
            (AttributeData::Index(v), AttributeValue::Index(x)) => v.resize(new_len, x),
            (AttributeData::Float64(v), AttributeValue::Float64(x)) => v.resize(new_len, x),
            (AttributeData::Bool(v), AttributeValue::Bool(x)) => v.resize(new_len, x),
            (AttributeData::Constant { len, .. }, _) => *len = new_len,
            _ => unreachable!("attribute kind mismatch"),
        }
    }

    /// Overwrite every element with `value`.
    pub fn fill(&mut self, value: AttributeValue) {
        debug_assert_eq!(self.kind(), value.kind());
        match (self, value) {
            (AttributeData::Index(v), AttributeValue::Index(x)) => v.fill(x),
            (AttributeData::Float64(v), AttributeValue::Float64(x)) => v.fill(x),
            (AttributeData::Bool(v), AttributeValue::Bool(x)) => v.fill(x),
            (AttributeData::Constant { value: v, .. }, x) => *v = x,
            _ => unreachable!("attribute kind mismatch"),
        }
    }

    /// Replace constant storage with equivalent vector storage.
    ///
    /// No-op for storage that is already a vector.
    pub fn materialize(&mut self) {
        if let AttributeData::Constant { value, len } = *self {
            *self = Self::filled(value, len);
        }
    }

    /// Reorder elements so that element `i` moves to slot `permutation[i]`.
    pub fn apply_permutation(&mut self, permutation: &[usize]) {
        debug_assert_eq!(permutation.len(), self.len());
        fn permute<T: Copy>(v: &mut Vec<T>, permutation: &[usize]) {
            let mut out = v.clone();
            for (from, &to) in permutation.iter().enumerate() {
                out[to] = v[from];
            }
            *v = out;
        }
        match self {
            AttributeData::Index(v) => permute(v, permutation),
            AttributeData::Float64(v) => permute(v, permutation),
            AttributeData::Bool(v) => permute(v, permutation),
            // Every slot holds the same value.
            AttributeData::Constant { .. } => {}
        }
    }

    /// Compact the storage: element `i` survives iff `new_index[i] != NO_ID`,
    /// in which case it moves to slot `new_index[i]`.
    pub fn compact(&mut self, new_index: &[usize], new_len: usize) {
        debug_assert_eq!(new_index.len(), self.len());
        fn shrink<T: Copy + Default>(v: &mut Vec<T>, new_index: &[usize], new_len: usize) {
            let mut out = vec![T::default(); new_len];
            for (from, &to) in new_index.iter().enumerate() {
                if to != NO_ID {
                    out[to] = v[from];
                }
            }
            *v = out;
        }
        match self {
            AttributeData::Index(v) => shrink(v, new_index, new_len),
            AttributeData::Float64(v) => shrink(v, new_index, new_len),
            AttributeData::Bool(v) => shrink(v, new_index, new_len),
            AttributeData::Constant { len, .. } => *len = new_len,
        }
    }
}

/// The default element value of a kind.
pub fn default_value(kind: AttributeKind) -> AttributeValue {
    match kind {
        AttributeKind::Index => AttributeValue::Index(NO_ID),
        AttributeKind::Float64 => AttributeValue::Float64(0.0),
        AttributeKind::Bool => AttributeValue::Bool(false),
    }
}

/// Rust element types that can live in an attribute.
///
/// The implementations form the closed set matching [`AttributeKind`].
pub trait AttributeElement: Copy + 'static {
    /// The kind tag of this element type.
    const KIND: AttributeKind;

    /// View the storage as a typed slice. `None` for constant storage or a
    /// kind mismatch.
    fn slice(data: &AttributeData) -> Option<&[Self]>;

    /// View the storage as a typed mutable vector, materializing constant
    /// storage first. `None` on a kind mismatch.
    fn vec_mut(data: &mut AttributeData) -> Option<&mut Vec<Self>>;
}

macro_rules! impl_attribute_element {
    ($ty:ty, $kind:expr, $variant:ident) => {
        impl AttributeElement for $ty {
            const KIND: AttributeKind = $kind;

            fn slice(data: &AttributeData) -> Option<&[Self]> {
                match data {
                    AttributeData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn vec_mut(data: &mut AttributeData) -> Option<&mut Vec<Self>> {
                data.materialize();
                match data {
                    AttributeData::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_attribute_element!(usize, AttributeKind::Index, Index);
impl_attribute_element!(f64, AttributeKind::Float64, Float64);
impl_attribute_element!(bool, AttributeKind::Bool, Bool);

/// Explicit registry of attribute kinds creatable by runtime name.
///
/// The registry replaces any process-wide static factory map: it is
/// constructed once by the caller, populated with explicit [`register`]
/// calls, and passed to whatever code needs to create attributes from a
/// stored name (e.g. when replaying a model description).
///
/// [`register`]: AttributeTypeRegistry::register
#[derive(Debug, Default)]
pub struct AttributeTypeRegistry {
    kinds: FxHashMap<&'static str, AttributeKind>,
}

impl AttributeTypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the built-in kinds
    /// (`"index"`, `"float64"`, `"bool"`).
    pub fn with_builtin_kinds() -> Self {
        let mut registry = Self::new();
        registry.register("index", AttributeKind::Index);
        registry.register("float64", AttributeKind::Float64);
        registry.register("bool", AttributeKind::Bool);
        registry
    }

    /// Register `kind` under `name`.
    ///
    /// Re-registering a known name is advisory: a warning is logged and the
    /// first registration wins.
    pub fn register(&mut self, name: &'static str, kind: AttributeKind) {
        if let Some(existing) = self.kinds.get(name) {
            warn!(
                "attribute type {:?} already registered as {:?}, ignoring re-registration as {:?}",
                name, existing, kind
            );
            return;
        }
        self.kinds.insert(name, kind);
    }

    /// Look up the kind registered under `name`.
    pub fn kind_of(&self, name: &str) -> Option<AttributeKind> {
        self.kinds.get(name).copied()
    }

    /// Create default-filled storage for `len` elements of the kind
    /// registered under `name`.
    pub fn create(&self, name: &str, len: usize) -> Option<AttributeData> {
        self.kind_of(name)
            .map(|kind| AttributeData::with_kind(kind, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_and_value() {
        let data = AttributeData::filled(AttributeValue::Float64(1.5), 3);
        assert_eq!(data.len(), 3);
        assert_eq!(data.value(2), AttributeValue::Float64(1.5));
    }

    #[test]
    fn test_typed_access() {
        let mut data = AttributeData::with_kind(AttributeKind::Index, 4);
        assert_eq!(usize::slice(&data).unwrap(), &[NO_ID; 4]);
        usize::vec_mut(&mut data).unwrap()[1] = 7;
        assert_eq!(data.value(1), AttributeValue::Index(7));
        // Kind mismatch is visible, not a crash.
        assert!(f64::slice(&data).is_none());
    }

    #[test]
    fn test_constant_materializes_on_write() {
        let mut data = AttributeData::Constant {
            value: AttributeValue::Bool(true),
            len: 5,
        };
        assert!(bool::slice(&data).is_none());
        assert_eq!(data.value(4), AttributeValue::Bool(true));

        bool::vec_mut(&mut data).unwrap()[0] = false;
        assert_eq!(data.value(0), AttributeValue::Bool(false));
        assert_eq!(data.value(4), AttributeValue::Bool(true));
    }

    #[test]
    fn test_permutation() {
        let mut data = AttributeData::Index(vec![10, 11, 12]);
        // Element 0 -> slot 2, 1 -> 0, 2 -> 1.
        data.apply_permutation(&[2, 0, 1]);
        assert_eq!(usize::slice(&data).unwrap(), &[11, 12, 10]);
    }

    #[test]
    fn test_compact() {
        let mut data = AttributeData::Float64(vec![0.0, 1.0, 2.0, 3.0]);
        data.compact(&[0, NO_ID, 1, NO_ID], 2);
        assert_eq!(f64::slice(&data).unwrap(), &[0.0, 2.0]);
    }

    #[test]
    fn test_registry_first_registration_wins() {
        let mut registry = AttributeTypeRegistry::with_builtin_kinds();
        registry.register("index", AttributeKind::Bool);
        assert_eq!(registry.kind_of("index"), Some(AttributeKind::Index));
        assert!(registry.create("float64", 2).is_some());
        assert!(registry.create("unknown", 2).is_none());
    }
}
