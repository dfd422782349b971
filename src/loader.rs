//! Two-phase load protocol over a [`Registry`].
//!
//! Phase 1 (instantiate) converts documents and constructs entity instances
//! kind by kind; relationships are created with raw reference data only.
//! Phase 2 (resolve) runs once, after every loadable kind has been
//! instantiated and the injection queue has drained, and looks every raw
//! reference up in the registry. The split is what makes forward references
//! across files work: resolution never races ahead of registration.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::construct::{EntityInstance, Registry, Relationship};
use crate::convert::convert;
use crate::descriptor::{AttributeValue, Catalog, TypeDescriptor};
use crate::error::{Result, RulegraphError};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum LoadState {
    Instantiate,
    Resolved,
}

pub struct Loader {
    catalog: Catalog,
    registry: Registry,
    injection_queue: Vec<EntityInstance>,
    state: LoadState,
}

impl Loader {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            registry: Registry::new(),
            injection_queue: Vec::new(),
            state: LoadState::Instantiate,
        }
    }
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Phase 1 for one loadable kind: converts each document and registers
    /// an instance for every named entry under an accepted header. A
    /// document that fails conversion is logged and skipped; the load goes
    /// on with the remaining documents. Returns the number of instances
    /// registered.
    pub fn instantiate(&mut self, kind: &str, documents: &[String]) -> Result<usize> {
        if self.state != LoadState::Instantiate {
            return Err(RulegraphError::Invariant(
                "instantiate called after resolve".to_string(),
            ));
        }
        let descriptor = self.catalog.get(kind)?;
        if !descriptor.loadable() {
            return Err(RulegraphError::Invariant(format!(
                "kind '{}' is not loadable from files",
                kind
            )));
        }
        let mut registered = 0;
        for document in documents {
            let converted = match convert(document) {
                Ok(value) => value,
                Err(e) => {
                    warn!(kind, error = %e, "skipping malformed document");
                    continue;
                }
            };
            let Value::Object(top) = converted else {
                continue;
            };
            for header in descriptor.headers() {
                let Some(Value::Object(entries)) = top.get(*header) else {
                    continue;
                };
                for (name, body) in entries {
                    let Value::Object(fields) = body else {
                        continue;
                    };
                    let instance = self.build_instance(&descriptor, name, fields)?;
                    self.registry.register(instance);
                    registered += 1;
                }
            }
        }
        info!(kind, registered, "instantiated");
        Ok(registered)
    }

    // Constructs one instance from a converted document fragment. Declared
    // attributes start at their defaults and take scalar document values
    // only; a nested object on a subtype field of one of the declared child
    // kinds becomes an owned child instance. Relationship fields become
    // registered relationships carrying raw reference data only. The
    // relationships are staged locally and appended to the registry only
    // once every field of the entity constructed cleanly, so a violation on
    // any field registers nothing.
    fn build_instance(
        &mut self,
        descriptor: &Arc<TypeDescriptor>,
        name: &str,
        fields: &Map<String, Value>,
    ) -> Result<EntityInstance> {
        let mut instance = EntityInstance::new(Arc::clone(descriptor), name);
        let mut staged = Vec::new();
        for spec in descriptor.relationships() {
            if let Some(value) = fields.get(spec.field()) {
                let raw = raw_references(value);
                staged.push((spec.field(), Relationship::new(descriptor.name(), name, spec, raw)?));
            }
        }
        for child_name in descriptor.child_kinds() {
            let child_kind = self.catalog.get(child_name)?;
            for field in child_kind.subtypes().to_vec() {
                let Some(Value::Object(nested)) = fields.get(field) else {
                    continue;
                };
                let child = self.build_instance(&child_kind, "", nested)?;
                instance.insert_child(field, child);
            }
        }
        for attribute in descriptor.attributes() {
            let Some(value) = fields.get(attribute.name()) else {
                continue;
            };
            if let Some(scalar) = AttributeValue::from_document(value) {
                instance.set_attribute(attribute.name(), scalar);
            }
        }
        for (field, relationship) in staged {
            let position = self.registry.append_relationship(relationship);
            instance.link_relationship(field, position);
        }
        Ok(instance)
    }

    /// Queues an entity not sourced from files. The queue is consumed after
    /// all instantiation and before any relationship resolves.
    pub fn enqueue(&mut self, kind: &str, name: &str, mut instance: EntityInstance) -> Result<()> {
        if self.state != LoadState::Instantiate {
            return Err(RulegraphError::Invariant(
                "enqueue called after resolve".to_string(),
            ));
        }
        if instance.kind().name() != kind {
            return Err(RulegraphError::Invariant(format!(
                "queued instance is of kind '{}', not '{}'",
                instance.kind().name(),
                kind
            )));
        }
        instance.set_name(name);
        self.injection_queue.push(instance);
        Ok(())
    }

    /// Phase 2. Drains the injection queue, then resolves every
    /// relationship in creation order. May be invoked exactly once; the
    /// resolved state is terminal.
    pub fn resolve(&mut self) -> Result<()> {
        if self.state == LoadState::Resolved {
            return Err(RulegraphError::Invariant(
                "resolve may only be invoked once per load".to_string(),
            ));
        }
        for instance in self.injection_queue.drain(..) {
            self.registry.register(instance);
        }
        self.registry.resolve_all()?;
        self.state = LoadState::Resolved;
        info!(
            relationships = self.registry.relationships().len(),
            "resolved all relationships"
        );
        Ok(())
    }

    // --- query surface for downstream collaborators ---
    pub fn instances_of(&self, kind: &str) -> Vec<Arc<EntityInstance>> {
        self.registry.instances_of(kind)
    }
    pub fn instance(&self, kind: &str, name: &str) -> Option<Arc<EntityInstance>> {
        self.registry.instance(kind, name)
    }
    pub fn relationships_targeting(
        &self,
        kind: &str,
        name: &str,
        field: &str,
    ) -> Result<Vec<&Relationship>> {
        self.registry.relationships_targeting(kind, name, field)
    }
}

// Raw reference data from a document value: a nested object is a
// name-to-weight map, a bare scalar is a single reference with weight 0.
fn raw_references(value: &Value) -> Vec<(String, i64)> {
    match value {
        Value::Object(entries) => entries
            .iter()
            .map(|(name, weight)| (name.clone(), weight_of(weight)))
            .collect(),
        Value::String(name) => vec![(name.clone(), 0)],
        other => vec![(other.to_string(), 0)],
    }
}

fn weight_of(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .unwrap_or_else(|| n.as_f64().map_or(0, |f| f as i64)),
        _ => 0,
    }
}
