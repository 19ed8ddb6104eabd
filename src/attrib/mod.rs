//! Named, typed, resizable attribute storage.
//!
//! Every mesh entity owns an [`AttributesManager`] for its vertices; the
//! aggregation layer stores its bookkeeping (notably the model vertex map)
//! as attributes so that structural edits — resize, permutation, compaction —
//! update the bookkeeping and any user data through one code path.

mod manager;
mod store;

pub use manager::{Attribute, AttributesManager};
pub use store::{
    default_value, AttributeData, AttributeElement, AttributeKind, AttributeTypeRegistry,
    AttributeValue,
};
