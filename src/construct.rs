//! Runtime constructs populated from converted documents: entity instances,
//! relationships and the registry that keeps them for the duration of one
//! load cycle.
//!
//! The registry follows a keeper pattern: instances are owned here and
//! shared through `Arc`, relationships live in an append-only list whose
//! positions double as stable identifiers, and a reverse-index lookup
//! answers "which relationships targeting this field have this instance as
//! a target".

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{BuildHasher, BuildHasherDefault, Hash};
use std::sync::Arc;

use seahash::SeaHasher;
use tracing::debug;

use crate::descriptor::{AttributeValue, Cardinality, RelationshipSpec, TypeDescriptor};
use crate::error::{Result, RulegraphError};

pub type OtherHasher = BuildHasherDefault<SeaHasher>;

// ------------- EntityInstance -------------
/// One named entity of some kind. Scalar and child fields are set at
/// construction; relationship fields hold the position of the corresponding
/// [`Relationship`] in the registry's creation-ordered list.
#[derive(Debug)]
pub struct EntityInstance {
    kind: Arc<TypeDescriptor>,
    name: String,
    attributes: HashMap<String, AttributeValue, OtherHasher>,
    children: HashMap<String, EntityInstance, OtherHasher>,
    relationships: HashMap<String, usize, OtherHasher>,
}
impl EntityInstance {
    /// A fresh instance with every declared attribute at its default.
    pub fn new(kind: Arc<TypeDescriptor>, name: &str) -> Self {
        let mut attributes = HashMap::default();
        for spec in kind.attributes() {
            attributes.insert(spec.name().to_string(), spec.default().clone());
        }
        Self {
            kind,
            name: name.to_string(),
            attributes,
            children: HashMap::default(),
            relationships: HashMap::default(),
        }
    }
    pub fn kind(&self) -> &Arc<TypeDescriptor> {
        &self.kind
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn attribute(&self, field: &str) -> Option<&AttributeValue> {
        self.attributes.get(field)
    }
    pub fn child(&self, field: &str) -> Option<&EntityInstance> {
        self.children.get(field)
    }
    pub fn children(&self) -> &HashMap<String, EntityInstance, OtherHasher> {
        &self.children
    }
    /// Position of the relationship on this field within the registry.
    pub fn relationship_position(&self, field: &str) -> Option<usize> {
        self.relationships.get(field).copied()
    }
    pub fn relationship_fields(&self) -> impl Iterator<Item = &str> {
        self.relationships.keys().map(String::as_str)
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }
    pub(crate) fn set_attribute(&mut self, field: &str, value: AttributeValue) {
        self.attributes.insert(field.to_string(), value);
    }
    pub(crate) fn insert_child(&mut self, field: &str, child: EntityInstance) {
        self.children.insert(field.to_string(), child);
    }
    pub(crate) fn link_relationship(&mut self, field: &str, position: usize) {
        self.relationships.insert(field.to_string(), position);
    }
}
impl fmt::Display for EntityInstance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}::<{}>", self.name, self.kind.name())
    }
}

// ------------- Relationship -------------
/// A directed edge from one entity towards named entities of a target kind.
/// Raw reference data is set at creation, resolved targets are populated in
/// phase 2 and never mutated afterwards.
#[derive(Debug)]
pub struct Relationship {
    from_kind: &'static str,
    from_name: String,
    field: &'static str,
    target_kind: &'static str,
    cardinality: Cardinality,
    raw_references: Vec<(String, i64)>,
    resolved_targets: Vec<(Arc<EntityInstance>, i64)>,
}
impl Relationship {
    /// Creates an unresolved relationship. A one-to-many relationship
    /// carrying more than one raw reference is a cardinality violation and
    /// registers nothing.
    pub fn new(
        from_kind: &'static str,
        from_name: &str,
        spec: &RelationshipSpec,
        raw_references: Vec<(String, i64)>,
    ) -> Result<Self> {
        if spec.cardinality() == Cardinality::OneToMany && raw_references.len() > 1 {
            return Err(RulegraphError::Cardinality {
                kind: from_kind,
                name: from_name.to_string(),
                field: spec.field(),
                count: raw_references.len(),
            });
        }
        Ok(Self {
            from_kind,
            from_name: from_name.to_string(),
            field: spec.field(),
            target_kind: spec.target(),
            cardinality: spec.cardinality(),
            raw_references,
            resolved_targets: Vec::new(),
        })
    }
    pub fn from_kind(&self) -> &'static str {
        self.from_kind
    }
    pub fn from_name(&self) -> &str {
        &self.from_name
    }
    pub fn field(&self) -> &'static str {
        self.field
    }
    pub fn target_kind(&self) -> &'static str {
        self.target_kind
    }
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }
    pub fn raw_references(&self) -> &[(String, i64)] {
        &self.raw_references
    }
    pub fn resolved_targets(&self) -> &[(Arc<EntityInstance>, i64)] {
        &self.resolved_targets
    }
}
impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}::<{}> -[{}]-> <{}>",
            self.from_name, self.from_kind, self.field, self.target_kind
        )
    }
}

// ------------- Lookup -------------
#[derive(Debug)]
pub struct Lookup<K, V, H = std::collections::hash_map::RandomState> {
    index: HashMap<K, HashSet<V>, H>,
}
impl<K: Eq + Hash, V: Eq + Hash, H: BuildHasher + Default> Lookup<K, V, H> {
    pub fn new() -> Self {
        Self {
            index: HashMap::default(),
        }
    }
    pub fn insert(&mut self, key: K, value: V) {
        let set = self.index.entry(key).or_insert(HashSet::<V>::new());
        set.insert(value);
    }
    pub fn lookup(&self, key: &K) -> Option<&HashSet<V>> {
        self.index.get(key)
    }
}
impl<K: Eq + Hash, V: Eq + Hash, H: BuildHasher + Default> Default for Lookup<K, V, H> {
    fn default() -> Self {
        Self::new()
    }
}

// Reverse index keys: (target kind, target name, relationship field).
type TargetKey = (String, String, String);

// ------------- Registry -------------
/// Process-scoped store for one load cycle: all registered instances,
/// partitioned by kind and unique by name within it, and all relationships
/// in creation order. Discarded wholesale after the graph is written; reuse
/// across loads would leave stale forward-reference state behind.
pub struct Registry {
    instances: HashMap<&'static str, HashMap<String, Arc<EntityInstance>, OtherHasher>>,
    relationships: Vec<Relationship>,
    targeted: Lookup<TargetKey, usize, OtherHasher>,
}
impl Registry {
    pub fn new() -> Self {
        Self {
            instances: HashMap::new(),
            relationships: Vec::new(),
            targeted: Lookup::new(),
        }
    }
    /// Registers an instance under (kind, name). A later registration with
    /// the same name replaces the earlier one, matching source semantics.
    pub fn register(&mut self, instance: EntityInstance) -> Arc<EntityInstance> {
        let kind = instance.kind().name();
        let name = instance.name().to_string();
        let kept = Arc::new(instance);
        match self.instances.entry(kind) {
            Entry::Vacant(e) => {
                let mut partition: HashMap<String, Arc<EntityInstance>, OtherHasher> =
                    HashMap::default();
                partition.insert(name, Arc::clone(&kept));
                e.insert(partition);
            }
            Entry::Occupied(mut e) => {
                e.get_mut().insert(name, Arc::clone(&kept));
            }
        }
        kept
    }
    /// Appends a relationship, returning its position. Positions are stable
    /// identifiers since the list is append-only.
    pub fn append_relationship(&mut self, relationship: Relationship) -> usize {
        self.relationships.push(relationship);
        self.relationships.len() - 1
    }
    pub fn relationship(&self, position: usize) -> Option<&Relationship> {
        self.relationships.get(position)
    }
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }
    pub fn instance(&self, kind: &str, name: &str) -> Option<Arc<EntityInstance>> {
        self.instances
            .get(kind)
            .and_then(|partition| partition.get(name))
            .map(Arc::clone)
    }
    pub fn instances_of(&self, kind: &str) -> Vec<Arc<EntityInstance>> {
        match self.instances.get(kind) {
            Some(partition) => partition.values().map(Arc::clone).collect(),
            None => Vec::new(),
        }
    }
    pub fn instance_count(&self, kind: &str) -> usize {
        self.instances.get(kind).map_or(0, HashMap::len)
    }

    /// Phase 2 over every relationship in creation order. Resolution order
    /// must match creation order for deterministic reverse-index numbering.
    pub(crate) fn resolve_all(&mut self) -> Result<()> {
        for position in 0..self.relationships.len() {
            let (target_kind, field, from_kind, from_name, raw) = {
                let r = &self.relationships[position];
                (
                    r.target_kind,
                    r.field,
                    r.from_kind,
                    r.from_name.clone(),
                    r.raw_references.clone(),
                )
            };
            let mut resolved = Vec::with_capacity(raw.len());
            for (reference, weight) in raw {
                match self.instance(target_kind, &reference) {
                    Some(target) => resolved.push((target, weight)),
                    None => {
                        return Err(RulegraphError::UnresolvedReference {
                            kind: from_kind,
                            name: from_name,
                            field,
                            target_kind,
                            reference,
                        });
                    }
                }
            }
            for (target, _) in &resolved {
                self.targeted.insert(
                    (
                        target_kind.to_string(),
                        target.name().to_string(),
                        field.to_string(),
                    ),
                    position,
                );
            }
            debug!(
                relationship = %self.relationships[position],
                targets = resolved.len(),
                "resolved"
            );
            self.relationships[position].resolved_targets = resolved;
        }
        Ok(())
    }

    /// The relationships acting on `field` in which the named instance is a
    /// resolved target. An empty result is surfaced as an explicit error so
    /// callers can tell "never related" apart from an empty collection.
    pub fn relationships_targeting(
        &self,
        kind: &str,
        name: &str,
        field: &str,
    ) -> Result<Vec<&Relationship>> {
        let key = (kind.to_string(), name.to_string(), field.to_string());
        let mut found = Vec::new();
        if let Some(positions) = self.targeted.lookup(&key) {
            let mut ordered: Vec<usize> = positions.iter().copied().collect();
            ordered.sort_unstable();
            for position in ordered {
                let relationship = &self.relationships[position];
                if relationship
                    .resolved_targets
                    .iter()
                    .any(|(target, _)| target.name() == name)
                {
                    found.push(relationship);
                }
            }
        }
        if found.is_empty() {
            return Err(RulegraphError::NoRelationshipFound {
                name: name.to_string(),
                field: field.to_string(),
            });
        }
        Ok(found)
    }
}
impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
