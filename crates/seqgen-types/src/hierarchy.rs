//! Declared subtype relation between reference types.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::types::{Type, TypeName, OBJECT_TYPE_NAME};

/// Direct supertype declarations supplied alongside the operation catalog.
///
/// Subtyping is reflexive and transitive, and every reference type is a
/// subtype of `Object`. Cycles in the declarations are tolerated.
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    supertypes: HashMap<TypeName, Vec<TypeName>>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `sub` as a direct subtype of `sup`.
    pub fn declare(&mut self, sub: &str, sup: &str) {
        let parents = self.supertypes.entry(Arc::from(sub)).or_default();
        if !parents.iter().any(|p| p.as_ref() == sup) {
            parents.push(Arc::from(sup));
        }
    }

    /// Builder form of [`declare`](Self::declare).
    pub fn with_subtype(mut self, sub: &str, sup: &str) -> Self {
        self.declare(sub, sup);
        self
    }

    pub fn direct_supertypes(&self, name: &str) -> &[TypeName] {
        self.supertypes.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == OBJECT_TYPE_NAME {
            return true;
        }
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = vec![sub];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            for parent in self.direct_supertypes(current) {
                if parent.as_ref() == sup {
                    return true;
                }
                stack.push(parent);
            }
        }
        false
    }

    /// Whether a value of declared type `source` may be used where `target`
    /// is required.
    pub fn is_assignable(&self, target: &Type, source: &Type) -> bool {
        match (target, source) {
            (Type::Void, _) | (_, Type::Void) => false,
            (Type::Primitive(t), Type::Primitive(s)) => t == s,
            (Type::Reference(t), Type::Reference(s)) => self.is_subtype(s, t),
            _ => false,
        }
    }

    /// All transitive supertypes of `name`, excluding itself, in discovery order.
    pub fn ancestors(&self, name: &str) -> Vec<TypeName> {
        let mut seen: HashSet<TypeName> = HashSet::new();
        let mut order = Vec::new();
        let mut stack: Vec<TypeName> = self.direct_supertypes(name).to_vec();
        while let Some(current) = stack.pop() {
            if current.as_ref() == name || !seen.insert(current.clone()) {
                continue;
            }
            stack.extend(self.direct_supertypes(&current).iter().cloned());
            order.push(current);
        }
        order
    }
}
