//! Per-entity attribute management.
//!
//! An [`AttributesManager`] couples a set of named attributes to one item
//! count (e.g. the vertex count of an entity mesh). Every structural change
//! to the items — resize, permutation, compaction — goes through the manager
//! so that all attached attributes stay in sync.

use std::collections::BTreeMap;

use log::warn;

use super::store::{default_value, AttributeData, AttributeElement, AttributeValue};
use crate::NO_ID;

/// One named attribute: storage plus a per-item dimension.
///
/// `data.len() == nb_items * dim`; `dim > 1` makes the attribute
/// vector-valued, with the components of item `i` stored contiguously at
/// `[i * dim, (i + 1) * dim)`.
#[derive(Debug, Clone)]
pub struct Attribute {
    dim: usize,
    data: AttributeData,
}

impl Attribute {
    /// The per-item dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The underlying storage.
    pub fn data(&self) -> &AttributeData {
        &self.data
    }
}

/// Named, typed, resizable attribute arrays bound to one item count.
#[derive(Debug, Clone, Default)]
pub struct AttributesManager {
    nb_items: usize,
    // BTreeMap keeps iteration (and thus transfer warnings) deterministic.
    attributes: BTreeMap<String, Attribute>,
}

impl AttributesManager {
    /// Create a manager for `nb_items` items with no attributes.
    pub fn new(nb_items: usize) -> Self {
        Self {
            nb_items,
            attributes: BTreeMap::new(),
        }
    }

    /// The item count all attributes are sized to.
    pub fn nb_items(&self) -> usize {
        self.nb_items
    }

    /// Whether an attribute named `name` is bound.
    pub fn is_defined(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Names of all bound attributes, in sorted order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Bind a new scalar attribute of element type `T`, filled with `value`.
    ///
    /// Binding an already-bound name is a contract violation.
    pub fn bind<T: AttributeElement>(&mut self, name: &str, value: AttributeValue) {
        self.bind_vector::<T>(name, 1, value);
    }

    /// Bind a new vector-valued attribute with `dim` components per item.
    pub fn bind_vector<T: AttributeElement>(
        &mut self,
        name: &str,
        dim: usize,
        value: AttributeValue,
    ) {
        assert!(
            !self.is_defined(name),
            "attribute {:?} is already bound",
            name
        );
        debug_assert_eq!(value.kind(), T::KIND);
        let data = AttributeData::filled(value, self.nb_items * dim);
        self.attributes.insert(name.to_owned(), Attribute { dim, data });
    }

    /// Bind a constant-storage attribute: `value` logically repeated for
    /// every item, materialized on first mutable access.
    pub fn bind_constant(&mut self, name: &str, value: AttributeValue) {
        assert!(
            !self.is_defined(name),
            "attribute {:?} is already bound",
            name
        );
        let data = AttributeData::Constant {
            value,
            len: self.nb_items,
        };
        self.attributes.insert(name.to_owned(), Attribute { dim: 1, data });
    }

    /// Remove an attribute. Returns whether it existed.
    pub fn unbind(&mut self, name: &str) -> bool {
        self.attributes.remove(name).is_some()
    }

    /// Typed read access to a bound attribute.
    ///
    /// `None` if the name is unbound, the element type mismatches, or the
    /// storage is still constant.
    pub fn get<T: AttributeElement>(&self, name: &str) -> Option<&[T]> {
        T::slice(&self.attributes.get(name)?.data)
    }

    /// Typed write access to a bound attribute, materializing constant
    /// storage. `None` if the name is unbound or the element type mismatches.
    pub fn get_mut<T: AttributeElement>(&mut self, name: &str) -> Option<&mut [T]> {
        T::vec_mut(&mut self.attributes.get_mut(name)?.data).map(Vec::as_mut_slice)
    }

    /// Typed write access, binding a default-filled attribute first if
    /// `name` is unbound.
    pub fn bind_or_get<T: AttributeElement>(&mut self, name: &str) -> &mut [T] {
        if !self.is_defined(name) {
            self.bind::<T>(name, default_value(T::KIND));
        }
        self.get_mut::<T>(name)
            .expect("attribute bound with mismatched element type")
    }

    /// Untyped access to one attribute record.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Overwrite every element of an attribute with `value`.
    pub fn fill(&mut self, name: &str, value: AttributeValue) {
        if let Some(attribute) = self.attributes.get_mut(name) {
            attribute.data.fill(value);
        }
    }

    /// Change the per-item dimension of a vector-valued attribute, keeping
    /// the first `min(old_dim, new_dim)` components of every item.
    pub fn set_dimension(&mut self, name: &str, new_dim: usize) {
        let nb_items = self.nb_items;
        let Some(attribute) = self.attributes.get_mut(name) else {
            return;
        };
        if attribute.dim == new_dim {
            return;
        }
        let old_dim = attribute.dim;
        let kind = attribute.data.kind();
        let mut new_data = AttributeData::with_kind(kind, nb_items * new_dim);
        let kept = old_dim.min(new_dim);
        for item in 0..nb_items {
            for c in 0..kept {
                let value = attribute.data.value(item * old_dim + c);
                write_value(&mut new_data, item * new_dim + c, value);
            }
        }
        attribute.dim = new_dim;
        attribute.data = new_data;
    }

    /// Resize every attribute to a new item count, padding with defaults.
    pub fn resize(&mut self, nb_items: usize) {
        self.nb_items = nb_items;
        for attribute in self.attributes.values_mut() {
            let value = default_value(attribute.data.kind());
            attribute.data.resize(nb_items * attribute.dim, value);
        }
    }

    /// Drop all attributes, keeping the item count.
    pub fn clear_attributes(&mut self) {
        self.attributes.clear();
    }

    /// Reorder items so that item `i` moves to slot `permutation[i]`.
    pub fn apply_permutation(&mut self, permutation: &[usize]) {
        debug_assert_eq!(permutation.len(), self.nb_items);
        for attribute in self.attributes.values_mut() {
            if attribute.dim == 1 {
                attribute.data.apply_permutation(permutation);
            } else {
                let element_perm = expand_per_component(permutation, attribute.dim);
                attribute.data.apply_permutation(&element_perm);
            }
        }
    }

    /// Compact items: item `i` survives iff `new_index[i] != NO_ID`, moving
    /// to slot `new_index[i]`. `new_nb_items` is the survivor count.
    pub fn compact(&mut self, new_index: &[usize], new_nb_items: usize) {
        debug_assert_eq!(new_index.len(), self.nb_items);
        for attribute in self.attributes.values_mut() {
            if attribute.dim == 1 {
                attribute.data.compact(new_index, new_nb_items);
            } else {
                let element_map = expand_per_component(new_index, attribute.dim);
                attribute.data.compact(&element_map, new_nb_items * attribute.dim);
            }
        }
        self.nb_items = new_nb_items;
    }

    /// Copy attributes from `source` through an item mapping: item `i` of
    /// `self` takes the value of item `mapping[i]` of `source` (`NO_ID`
    /// leaves the default).
    ///
    /// An attribute whose name is already bound on `self` is skipped with a
    /// warning; transfer of the others proceeds.
    pub fn transfer_from(&mut self, source: &AttributesManager, mapping: &[usize]) {
        debug_assert_eq!(mapping.len(), self.nb_items);
        for (name, src) in &source.attributes {
            if self.is_defined(name) {
                warn!(
                    "attribute {:?} already present on destination, skipping transfer",
                    name
                );
                continue;
            }
            let dim = src.dim;
            let mut data = AttributeData::with_kind(src.data.kind(), self.nb_items * dim);
            for (item, &src_item) in mapping.iter().enumerate() {
                if src_item == NO_ID {
                    continue;
                }
                debug_assert!(src_item < source.nb_items);
                for c in 0..dim {
                    let value = src.data.value(src_item * dim + c);
                    write_value(&mut data, item * dim + c, value);
                }
            }
            self.attributes.insert(name.clone(), Attribute { dim, data });
        }
    }
}

/// Expand a per-item index map into a per-element map for dimension `dim`.
fn expand_per_component(item_map: &[usize], dim: usize) -> Vec<usize> {
    let mut out = Vec::with_capacity(item_map.len() * dim);
    for &to in item_map {
        for c in 0..dim {
            out.push(if to == NO_ID { NO_ID } else { to * dim + c });
        }
    }
    out
}

fn write_value(data: &mut AttributeData, i: usize, value: AttributeValue) {
    match value {
        AttributeValue::Index(v) => usize::vec_mut(data).expect("kind mismatch")[i] = v,
        AttributeValue::Float64(v) => f64::vec_mut(data).expect("kind mismatch")[i] = v,
        AttributeValue::Bool(v) => bool::vec_mut(data).expect("kind mismatch")[i] = v,
    }
}
