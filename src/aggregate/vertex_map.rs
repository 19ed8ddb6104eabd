//! Bidirectional mapping between entity-local and global vertices.
//!
//! The forward direction lives *on the entities*: every entity carries a
//! vertex attribute named [`MODEL_VERTEX_MAP`] holding, for each local
//! vertex, the id of the corresponding global vertex (or [`NO_ID`] before
//! initialization). The inverse direction is a dense table indexed by global
//! vertex id, each slot listing the `(entity, local vertex)` mentions of
//! that global vertex.
//!
//! Bijection invariant: `(e, v)` appears in `inverse_lookup(g)` exactly when
//! the forward map of `e` sends `v` to `g`, and never twice.

use crate::model::{EntityId, GeoModel, GmeVertex};
use crate::NO_ID;

/// Name of the per-entity forward-map vertex attribute.
pub const MODEL_VERTEX_MAP: &str = "model_vertex_map";

/// The forward/inverse vertex mapping tables.
#[derive(Debug, Default)]
pub struct VertexMap {
    inverse: Vec<Vec<GmeVertex>>,
}

impl VertexMap {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Forward map ====================

    /// Ensure every entity of the model carries a forward-map attribute
    /// sized to its vertex count and filled with [`NO_ID`].
    pub fn bind_all_vertex_maps(&self, model: &mut GeoModel) {
        let ids: Vec<EntityId> = model.entity_ids_in_order().collect();
        for id in ids {
            let attributes = model.entity_mut(id).vertex_attributes_mut();
            let map = attributes.bind_or_get::<usize>(MODEL_VERTEX_MAP);
            map.fill(NO_ID);
        }
    }

    /// Set the global id of local vertex `vertex` of `entity`, binding the
    /// forward map lazily if needed.
    pub fn set_map_value(
        &self,
        model: &mut GeoModel,
        entity: EntityId,
        vertex: usize,
        global: usize,
    ) {
        let mesh_entity = model.entity_mut(entity);
        debug_assert!(vertex < mesh_entity.nb_vertices());
        mesh_entity
            .vertex_attributes_mut()
            .bind_or_get::<usize>(MODEL_VERTEX_MAP)[vertex] = global;
    }

    /// The global id of local vertex `vertex` of `entity`.
    ///
    /// Reading an unbound map or an out-of-range local vertex is a contract
    /// violation.
    pub fn get_map_value(&self, model: &GeoModel, entity: EntityId, vertex: usize) -> usize {
        let mesh_entity = model.entity(entity);
        debug_assert!(vertex < mesh_entity.nb_vertices());
        mesh_entity
            .vertex_attributes()
            .get::<usize>(MODEL_VERTEX_MAP)
            .expect("model_vertex_map is not bound")[vertex]
    }

    // ==================== Inverse map ====================

    /// Number of global vertex slots in the inverse table.
    pub fn nb_inverse_slots(&self) -> usize {
        self.inverse.len()
    }

    /// Resize the inverse table; new slots start empty.
    pub fn resize_inverse(&mut self, nb_global_vertices: usize) {
        self.inverse.resize(nb_global_vertices, Vec::new());
    }

    /// All mentions of global vertex `global`.
    pub fn inverse_lookup(&self, global: usize) -> &[GmeVertex] {
        &self.inverse[global]
    }

    /// Record a mention of `global`. Used on the initial fill, where
    /// uniqueness holds by construction.
    pub fn add_to_inverse(&mut self, gme: GmeVertex, global: usize) {
        self.inverse[global].push(gme);
    }

    /// Record a mention of `global` unless already present. Used on merge
    /// paths, where distinct old slots may carry the same mention target.
    pub fn add_to_inverse_checked(&mut self, gme: GmeVertex, global: usize) {
        let slot = &mut self.inverse[global];
        if !slot.contains(&gme) {
            slot.push(gme);
        }
    }

    /// Drop all inverse slots.
    pub fn clear_inverse(&mut self) {
        self.inverse.clear();
    }

    // ==================== Consistency maintenance ====================

    /// Patch both directions after global vertex deletion.
    ///
    /// `old_to_new` is the compacted new-index array (see
    /// [`compute_compaction`](super::compact::compute_compaction)):
    /// `old_to_new[g]` is the new id of old global vertex `g`, or [`NO_ID`]
    /// for an outright-removed id. Every entity's forward values are
    /// rewritten through it; the inverse table is rebuilt to
    /// `nb_global_vertices` slots from the rewritten forward maps, merging
    /// without duplicate insertion.
    pub fn update_after_deletion(
        &mut self,
        model: &mut GeoModel,
        old_to_new: &[usize],
        nb_global_vertices: usize,
    ) {
        self.clear_inverse();
        self.resize_inverse(nb_global_vertices);

        let ids: Vec<EntityId> = model.entity_ids_in_order().collect();
        for id in ids {
            let attributes = model.entity_mut(id).vertex_attributes_mut();
            let Some(map) = attributes.get_mut::<usize>(MODEL_VERTEX_MAP) else {
                continue;
            };
            let mut mentions = Vec::with_capacity(map.len());
            for (v, global) in map.iter_mut().enumerate() {
                if *global == NO_ID {
                    continue;
                }
                debug_assert!(*global < old_to_new.len());
                *global = old_to_new[*global];
                if *global != NO_ID {
                    mentions.push((v, *global));
                }
            }
            for (v, global) in mentions {
                self.add_to_inverse_checked(GmeVertex::new(id, v), global);
            }
        }
    }

    /// Drop both directions: unbind every entity's forward map and clear
    /// the inverse table.
    pub fn clear(&mut self, model: &mut GeoModel) {
        let ids: Vec<EntityId> = model.entity_ids_in_order().collect();
        for id in ids {
            model
                .entity_mut(id)
                .vertex_attributes_mut()
                .unbind(MODEL_VERTEX_MAP);
        }
        self.clear_inverse();
    }
}
