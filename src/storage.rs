//! Registry storage for the container
//!
//! A [`RegistryLayer`] is the frozen set of registrations built by one
//! [`ContainerBuilder`](crate::ContainerBuilder). Layers form a chain: a
//! layer built for a child scope points at its parent, and lookups walk
//! that chain from the nearest layer outwards.

use crate::factory::Plan;
use crate::registration::{Registration, RegistrationCollection};
use crate::{Key, Result};
use ahash::RandomState;
use dashmap::DashMap;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

/// Frozen registrations for one container layer.
pub(crate) struct RegistryLayer {
    /// Registrations grouped by key
    collections: HashMap<Key, RegistrationCollection, RandomState>,
    /// Every registration in binding order
    order: Vec<Arc<Registration>>,
    /// Plans for unregistered types built through `Container::create`
    implicit: DashMap<TypeId, Plan, RandomState>,
    /// Optional parent layer for hierarchical resolution
    parent: Option<Arc<RegistryLayer>>,
}

impl RegistryLayer {
    /// Create an empty layer.
    ///
    /// The implicit plan cache rarely holds more than a handful of
    /// entries, so it gets a small shard count.
    pub fn new(parent: Option<Arc<RegistryLayer>>, capacity: usize) -> Self {
        Self {
            collections: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
            order: Vec::with_capacity(capacity),
            implicit: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                4,
            ),
            parent,
        }
    }

    /// Add a registration. Only called while the layer is being built.
    pub fn insert(&mut self, registration: Registration) -> Result<()> {
        let registration = Arc::new(registration);
        self.collections
            .entry(registration.key().clone())
            .or_insert_with(|| RegistrationCollection::new(registration.key().clone()))
            .push(Arc::clone(&registration))?;
        self.order.push(registration);
        Ok(())
    }

    /// Registrations for `key` in this layer only.
    #[inline]
    pub fn local(&self, key: &Key) -> Option<&RegistrationCollection> {
        self.collections.get(key)
    }

    /// Find the registrations for `key`, together with the layer that owns
    /// them.
    ///
    /// Returns the collection from the nearest layer that has the key.
    pub fn lookup<'a>(
        self: &'a Arc<Self>,
        key: &Key,
        search_parents: bool,
    ) -> Option<(&'a RegistrationCollection, &'a Arc<RegistryLayer>)> {
        if let Some(collection) = self.local(key) {
            return Some((collection, self));
        }
        if !search_parents {
            return None;
        }

        // Walk parent chain
        let mut current = self.parent.as_ref();
        while let Some(layer) = current {
            if let Some(collection) = layer.local(key) {
                return Some((collection, layer));
            }
            current = layer.parent.as_ref();
        }

        None
    }

    /// Check if a key is registered in this layer or any parent.
    pub fn contains_in_chain(&self, key: &Key) -> bool {
        if self.collections.contains_key(key) {
            return true;
        }

        let mut current = self.parent.as_ref();
        while let Some(layer) = current {
            if layer.collections.contains_key(key) {
                return true;
            }
            current = layer.parent.as_ref();
        }

        false
    }

    /// Registrations of this layer, in binding order.
    #[inline]
    pub fn registrations(&self) -> &[Arc<Registration>] {
        &self.order
    }

    /// Distinct keys of this layer, in first-binding order.
    pub fn keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = Vec::with_capacity(self.collections.len());
        for registration in &self.order {
            if !keys.contains(registration.key()) {
                keys.push(registration.key().clone());
            }
        }
        keys
    }

    #[inline]
    pub fn implicit_plan(&self, type_id: &TypeId) -> Option<Plan> {
        self.implicit.get(type_id).map(|plan| Arc::clone(plan.value()))
    }

    /// Cache an implicit plan. The first plan cached for a type wins.
    pub fn publish_implicit_plan(&self, type_id: TypeId, plan: Plan) -> Plan {
        Arc::clone(self.implicit.entry(type_id).or_insert(plan).value())
    }

    #[inline]
    pub fn parent(&self) -> Option<&Arc<RegistryLayer>> {
        self.parent.as_ref()
    }

    /// Number of registrations in this layer
    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl std::fmt::Debug for RegistryLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryLayer")
            .field("registrations", &self.order.len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
