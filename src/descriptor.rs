//! The declarative metadata model: one immutable [`TypeDescriptor`] per
//! entity kind, built at process start and consumed by the loader and the
//! schema synthesizer alike. Field sets are explicit enumerations with
//! defaults, relationship fields name their target kind and cardinality,
//! and subtype dispatch goes through the parent's declared child kinds.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rusqlite::types::{ToSql, ToSqlOutput};
use serde_json::Value;

use crate::error::{Result, RulegraphError};

// ------------- Cardinality -------------
/// How many raw references a relationship field may carry. Note that
/// `OneToMany` permits at most ONE raw reference per referencing entity,
/// an inherited naming quirk preserved for compatibility.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Cardinality {
    OneToMany,
    ManyToMany,
}

// ------------- Scalars -------------
/// The scalar shapes an attribute can take, mapped one-to-one onto the
/// column types of the synthesized schema.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ScalarKind {
    Integer,
    Real,
    Text,
    Boolean,
}
impl ScalarKind {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ScalarKind::Integer => "integer",
            ScalarKind::Real => "real",
            ScalarKind::Text => "text",
            ScalarKind::Boolean => "boolean",
        }
    }
}

/// A scalar attribute value as it appears on an entity instance.
#[derive(Clone, PartialEq, Debug)]
pub enum AttributeValue {
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
}
impl AttributeValue {
    /// Lifts a converted document scalar. Nested structures yield `None`,
    /// the loader decides what to do with those.
    pub fn from_document(value: &Value) -> Option<AttributeValue> {
        match value {
            Value::Bool(b) => Some(AttributeValue::Boolean(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(AttributeValue::Integer(i)),
                None => n.as_f64().map(AttributeValue::Real),
            },
            Value::String(s) => Some(AttributeValue::Text(s.clone())),
            _ => None,
        }
    }
}
impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::Real(r) => write!(f, "{}", r),
            AttributeValue::Text(t) => write!(f, "{}", t),
            AttributeValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}
impl ToSql for AttributeValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            AttributeValue::Integer(i) => Ok(ToSqlOutput::from(*i)),
            AttributeValue::Real(r) => Ok(ToSqlOutput::from(*r)),
            AttributeValue::Text(t) => Ok(ToSqlOutput::from(t.as_str())),
            AttributeValue::Boolean(b) => Ok(ToSqlOutput::from(*b)),
        }
    }
}

// ------------- Field specifications -------------
#[derive(Clone, Debug)]
pub struct AttributeSpec {
    name: &'static str,
    kind: ScalarKind,
    default: AttributeValue,
}
impl AttributeSpec {
    pub fn name(&self) -> &'static str {
        self.name
    }
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }
    pub fn default(&self) -> &AttributeValue {
        &self.default
    }
}

#[derive(Clone, Debug)]
pub struct RelationshipSpec {
    field: &'static str,
    target: &'static str,
    cardinality: Cardinality,
}
impl RelationshipSpec {
    pub fn field(&self) -> &'static str {
        self.field
    }
    pub fn target(&self) -> &'static str {
        self.target
    }
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }
}

// ------------- TypeDescriptor -------------
/// Static metadata for one entity kind. Immutable once sealed; the loader
/// reads document values by the names declared here, never by iterating
/// live object state.
#[derive(Clone, Debug)]
pub struct TypeDescriptor {
    name: &'static str,
    headers: Vec<&'static str>,
    subtypes: Vec<&'static str>,
    child_kinds: Vec<&'static str>,
    attributes: Vec<AttributeSpec>,
    relationships: Vec<RelationshipSpec>,
    loadable: bool,
}
impl TypeDescriptor {
    pub fn build(name: &'static str) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder {
            descriptor: TypeDescriptor {
                name,
                headers: Vec::new(),
                subtypes: Vec::new(),
                child_kinds: Vec::new(),
                attributes: Vec::new(),
                relationships: Vec::new(),
                loadable: false,
            },
        }
    }
    pub fn name(&self) -> &'static str {
        self.name
    }
    pub fn headers(&self) -> &[&'static str] {
        &self.headers
    }
    pub fn subtypes(&self) -> &[&'static str] {
        &self.subtypes
    }
    pub fn child_kinds(&self) -> &[&'static str] {
        &self.child_kinds
    }
    pub fn attributes(&self) -> &[AttributeSpec] {
        &self.attributes
    }
    pub fn relationships(&self) -> &[RelationshipSpec] {
        &self.relationships
    }
    pub fn relationship(&self, field: &str) -> Option<&RelationshipSpec> {
        self.relationships.iter().find(|r| r.field == field)
    }
    pub fn loadable(&self) -> bool {
        self.loadable
    }
}

pub struct TypeDescriptorBuilder {
    descriptor: TypeDescriptor,
}
impl TypeDescriptorBuilder {
    pub fn header(mut self, header: &'static str) -> Self {
        self.descriptor.headers.push(header);
        self
    }
    pub fn subtype(mut self, field: &'static str) -> Self {
        self.descriptor.subtypes.push(field);
        self
    }
    pub fn child(mut self, kind: &'static str) -> Self {
        self.descriptor.child_kinds.push(kind);
        self
    }
    pub fn loadable(mut self) -> Self {
        self.descriptor.loadable = true;
        self
    }
    pub fn integer(mut self, name: &'static str, default: i64) -> Self {
        self.descriptor.attributes.push(AttributeSpec {
            name,
            kind: ScalarKind::Integer,
            default: AttributeValue::Integer(default),
        });
        self
    }
    pub fn real(mut self, name: &'static str, default: f64) -> Self {
        self.descriptor.attributes.push(AttributeSpec {
            name,
            kind: ScalarKind::Real,
            default: AttributeValue::Real(default),
        });
        self
    }
    pub fn text(mut self, name: &'static str, default: &str) -> Self {
        self.descriptor.attributes.push(AttributeSpec {
            name,
            kind: ScalarKind::Text,
            default: AttributeValue::Text(default.to_string()),
        });
        self
    }
    pub fn boolean(mut self, name: &'static str, default: bool) -> Self {
        self.descriptor.attributes.push(AttributeSpec {
            name,
            kind: ScalarKind::Boolean,
            default: AttributeValue::Boolean(default),
        });
        self
    }
    pub fn one_to_many(mut self, field: &'static str, target: &'static str) -> Self {
        self.descriptor.relationships.push(RelationshipSpec {
            field,
            target,
            cardinality: Cardinality::OneToMany,
        });
        self
    }
    pub fn many_to_many(mut self, field: &'static str, target: &'static str) -> Self {
        self.descriptor.relationships.push(RelationshipSpec {
            field,
            target,
            cardinality: Cardinality::ManyToMany,
        });
        self
    }
    pub fn seal(self) -> TypeDescriptor {
        self.descriptor
    }
}

// ------------- Catalog -------------
/// The ordered set of descriptors one load works against. Order is
/// preserved so schema synthesis and the write path stay deterministic.
#[derive(Clone, Debug)]
pub struct Catalog {
    kinds: Vec<Arc<TypeDescriptor>>,
    by_name: HashMap<&'static str, Arc<TypeDescriptor>>,
}
impl Catalog {
    pub fn new() -> Self {
        Self {
            kinds: Vec::new(),
            by_name: HashMap::new(),
        }
    }
    pub fn add(&mut self, descriptor: TypeDescriptor) -> Arc<TypeDescriptor> {
        let kept = Arc::new(descriptor);
        self.kinds.push(Arc::clone(&kept));
        self.by_name.insert(kept.name(), Arc::clone(&kept));
        kept
    }
    pub fn get(&self, name: &str) -> Result<Arc<TypeDescriptor>> {
        self.by_name
            .get(name)
            .map(Arc::clone)
            .ok_or_else(|| RulegraphError::Invariant(format!("unknown kind '{}'", name)))
    }
    pub fn kinds(&self) -> &[Arc<TypeDescriptor>] {
        &self.kinds
    }
    pub fn len(&self) -> usize {
        self.kinds.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
