//! Type-indexed store of accepted sequences.
//!
//! Each bucket holds, in insertion order, the sequences with an active
//! output of exactly that type. A sequence appears once per active position
//! it contributes. Compatible lookups go through the [`SubTypeIndex`] and
//! return a [`PoolView`] over the matching buckets without copying them.

pub mod subtype;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::debug;

use seqgen_types::{Type, TypeHierarchy};

use crate::execution::ExecutableSequence;

pub use subtype::SubTypeIndex;

/// Lazily concatenated view over one or more pool buckets.
#[derive(Debug, Clone, Default)]
pub struct PoolView<'a> {
    parts: SmallVec<[&'a [Arc<ExecutableSequence>]; 4]>,
    len: usize,
}

impl<'a> PoolView<'a> {
    fn push(&mut self, part: &'a [Arc<ExecutableSequence>]) {
        if !part.is_empty() {
            self.len += part.len();
            self.parts.push(part);
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, mut index: usize) -> Option<&'a Arc<ExecutableSequence>> {
        for part in &self.parts {
            if index < part.len() {
                return part.get(index);
            }
            index -= part.len();
        }
        None
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Arc<ExecutableSequence>> + '_ {
        self.parts.iter().flat_map(|part| part.iter())
    }
}

#[derive(Debug, Clone)]
pub struct ComponentPool {
    buckets: HashMap<Type, Vec<Arc<ExecutableSequence>>>,
    types: SubTypeIndex,
    entries: usize,
}

impl ComponentPool {
    pub fn new(hierarchy: Arc<TypeHierarchy>) -> Self {
        Self {
            buckets: HashMap::new(),
            types: SubTypeIndex::new(hierarchy),
            entries: 0,
        }
    }

    /// Add `seq` under the type of each of its active positions. Returns the
    /// number of entries added.
    pub fn put(&mut self, seq: Arc<ExecutableSequence>) -> usize {
        let mut added = 0;
        for position in seq.sequence().active_positions() {
            let Some(ty) = seq.sequence().output_type(position) else {
                continue;
            };
            self.types.add(ty);
            self.buckets
                .entry(ty.clone())
                .or_default()
                .push(Arc::clone(&seq));
            added += 1;
        }
        self.entries += added;
        debug!(statements = seq.len(), added, "pooled sequence");
        added
    }

    /// Sequences able to supply a value of type `ty`. With `exact_match`,
    /// only the bucket for `ty` itself; otherwise the buckets of every
    /// registered type usable as `ty`. Unknown types yield an empty view.
    pub fn get(&mut self, ty: &Type, exact_match: bool) -> PoolView<'_> {
        let mut view = PoolView::default();
        if exact_match {
            if let Some(bucket) = self.buckets.get(ty) {
                view.push(bucket);
            }
            return view;
        }
        for compatible in self.types.get_compatible(ty) {
            if let Some(bucket) = self.buckets.get(compatible) {
                view.push(bucket);
            }
        }
        view
    }

    /// Registered types, in registration order.
    pub fn types(&self) -> &[Type] {
        self.types.types()
    }

    pub fn num_entries(&self) -> usize {
        self.entries
    }

    /// Every pooled sequence once, in first-insertion order per type.
    pub fn sequences(&self) -> Vec<Arc<ExecutableSequence>> {
        let mut seen: HashSet<*const ExecutableSequence> = HashSet::new();
        let mut out = Vec::new();
        for ty in self.types.types() {
            for seq in self.buckets.get(ty).into_iter().flatten() {
                if seen.insert(Arc::as_ptr(seq)) {
                    out.push(Arc::clone(seq));
                }
            }
        }
        out
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.types.clear();
        self.entries = 0;
    }

    /// Verify that the type index and the bucket keys agree and that every
    /// bucket member has an active output of the bucket's type.
    pub fn check_rep(&self) -> Result<(), String> {
        if self.buckets.len() != self.types.len() {
            return Err(format!(
                "{} buckets but {} registered types",
                self.buckets.len(),
                self.types.len()
            ));
        }
        for (ty, bucket) in &self.buckets {
            if !self.types.contains(ty) {
                return Err(format!("bucket for unregistered type {ty}"));
            }
            for seq in bucket {
                let s = seq.sequence();
                if !s.active_positions().any(|p| s.output_type(p) == Some(ty)) {
                    return Err(format!("sequence in bucket {ty} has no active output of that type"));
                }
            }
        }
        Ok(())
    }
}
