//! Compatibility index over the types registered so far.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use seqgen_types::{Type, TypeHierarchy};

/// Tracks registered types and caches, per queried type, which registered
/// types are usable as it. Lookups after the first cost time proportional to
/// the number of matches.
#[derive(Debug, Clone)]
pub struct SubTypeIndex {
    hierarchy: Arc<TypeHierarchy>,
    types: Vec<Type>,
    registered: HashSet<Type>,
    compatible: HashMap<Type, Vec<Type>>,
}

impl SubTypeIndex {
    pub fn new(hierarchy: Arc<TypeHierarchy>) -> Self {
        Self {
            hierarchy,
            types: Vec::new(),
            registered: HashSet::new(),
            compatible: HashMap::new(),
        }
    }

    pub fn hierarchy(&self) -> &Arc<TypeHierarchy> {
        &self.hierarchy
    }

    /// Register `ty`. Returns `false` if it was already known.
    pub fn add(&mut self, ty: &Type) -> bool {
        if ty.is_void() || !self.registered.insert(ty.clone()) {
            return false;
        }
        self.types.push(ty.clone());
        for (query, matches) in self.compatible.iter_mut() {
            if self.hierarchy.is_assignable(query, ty) {
                matches.push(ty.clone());
            }
        }
        if !self.compatible.contains_key(ty) {
            let matches = self.compute(ty);
            self.compatible.insert(ty.clone(), matches);
        }
        true
    }

    pub fn contains(&self, ty: &Type) -> bool {
        self.registered.contains(ty)
    }

    /// Registered types in registration order.
    pub fn types(&self) -> &[Type] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered types usable as `ty`: itself if registered, plus every
    /// registered subtype for reference types. Order follows registration.
    pub fn get_compatible(&mut self, ty: &Type) -> &[Type] {
        if !self.compatible.contains_key(ty) {
            let matches = self.compute(ty);
            self.compatible.insert(ty.clone(), matches);
        }
        self.compatible.get(ty).map(Vec::as_slice).unwrap_or(&[])
    }

    fn compute(&self, ty: &Type) -> Vec<Type> {
        self.types
            .iter()
            .filter(|candidate| self.hierarchy.is_assignable(ty, candidate))
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.types.clear();
        self.registered.clear();
        self.compatible.clear();
    }
}
