//! SQLite persistence: synthesizes a relational schema from the type
//! descriptors and writes resolved entity instances into it.
//!
//! One primary table per kind (the entity name as key column, one column
//! per declared attribute, one nullable text column with a foreign key per
//! one-to-many relationship field) and one association table per distinct
//! many-to-many relationship field. Primary tables are created before
//! association tables so foreign keys always have something to point at.
//! The store is created once and written once; a failure during schema
//! creation invalidates the whole store, which is destroyed so the next
//! run starts clean.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::sync::Arc;

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params, params_from_iter};
use tracing::{debug, info};

use crate::construct::{EntityInstance, Registry};
use crate::descriptor::{Catalog, Cardinality};
use crate::error::{Result, RulegraphError};

// ------------- Schema definitions -------------
#[derive(Debug, Clone)]
pub struct ColumnDefinition {
    pub name: String,
    pub sql_type: &'static str,
}

#[derive(Debug, Clone)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    // (column, referenced table); every reference points at the target's
    // name column
    pub foreign_keys: Vec<(String, String)>,
}
impl TableDefinition {
    fn ddl(&self) -> String {
        let mut parts = vec!["name text not null primary key".to_string()];
        for column in &self.columns {
            parts.push(format!("{} {}", column.name, column.sql_type));
        }
        for (column, target) in &self.foreign_keys {
            parts.push(format!("foreign key({}) references {}(name)", column, target));
        }
        format!("create table {} ({});", self.name, parts.join(", "))
    }
}

/// A junction table for one many-to-many relationship field, named
/// deterministically from the owning kind and the field.
#[derive(Debug, Clone)]
pub struct AssociationDefinition {
    pub name: String,
    pub from_kind: &'static str,
    pub to_kind: &'static str,
    pub field: &'static str,
}
impl AssociationDefinition {
    fn from_column(&self) -> String {
        self.from_kind.to_string()
    }
    fn to_column(&self) -> String {
        if self.from_kind == self.to_kind {
            format!("{}_to", self.to_kind)
        } else {
            self.to_kind.to_string()
        }
    }
    fn ddl(&self) -> String {
        let mut ddl = String::new();
        let _ = write!(
            ddl,
            "create table {} ({} text not null, {} text not null, ",
            self.name,
            self.from_column(),
            self.to_column()
        );
        let _ = write!(
            ddl,
            "foreign key({}) references {}(name), foreign key({}) references {}(name));",
            self.from_column(),
            self.from_kind,
            self.to_column(),
            self.to_kind
        );
        ddl
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    pub tables: Vec<TableDefinition>,
    pub associations: Vec<AssociationDefinition>,
}

/// Derives the full schema from the catalog. Association tables that come
/// out structurally identical across kinds are deduplicated by name.
pub fn synthesize(catalog: &Catalog) -> Schema {
    let mut tables = Vec::new();
    let mut associations: Vec<AssociationDefinition> = Vec::new();
    let mut seen_associations: HashSet<String> = HashSet::new();
    for kind in catalog.kinds() {
        let mut columns = Vec::new();
        let mut foreign_keys = Vec::new();
        for attribute in kind.attributes() {
            columns.push(ColumnDefinition {
                name: attribute.name().to_string(),
                sql_type: attribute.kind().sql_type(),
            });
        }
        for spec in kind.relationships() {
            match spec.cardinality() {
                Cardinality::OneToMany => {
                    columns.push(ColumnDefinition {
                        name: spec.field().to_string(),
                        sql_type: "text",
                    });
                    foreign_keys.push((spec.field().to_string(), spec.target().to_string()));
                }
                Cardinality::ManyToMany => {
                    let name =
                        format!("{}{}", kind.name().to_uppercase(), spec.field().to_uppercase());
                    if seen_associations.insert(name.clone()) {
                        associations.push(AssociationDefinition {
                            name,
                            from_kind: kind.name(),
                            to_kind: spec.target(),
                            field: spec.field(),
                        });
                    }
                }
            }
        }
        tables.push(TableDefinition {
            name: kind.name().to_string(),
            columns,
            foreign_keys,
        });
    }
    Schema {
        tables,
        associations,
    }
}

// ------------- Persistence -------------
#[derive(Debug, Clone)]
pub enum PersistenceMode {
    InMemory,
    File(String),
}

pub struct Persistor {
    mode: PersistenceMode,
    schema: Schema,
    db: Connection,
}
impl Persistor {
    /// Opens the backing store and creates the synthesized schema, primary
    /// tables first. A rejected statement destroys the store before the
    /// error surfaces; partial schemas are not supported.
    pub fn create(mode: PersistenceMode, catalog: &Catalog) -> Result<Persistor> {
        let db = match &mode {
            PersistenceMode::InMemory => Connection::open_in_memory()?,
            PersistenceMode::File(path) => Connection::open(path)?,
        };
        let schema = synthesize(catalog);
        let mut statements = Vec::new();
        for table in &schema.tables {
            statements.push(table.ddl());
        }
        for association in &schema.associations {
            statements.push(association.ddl());
        }
        for statement in &statements {
            debug!(%statement, "creating table");
            if let Err(e) = db.execute_batch(statement) {
                Self::destroy(db, &mode);
                return Err(RulegraphError::SchemaCreation(e.to_string()));
            }
        }
        info!(
            tables = schema.tables.len(),
            associations = schema.associations.len(),
            "schema created"
        );
        Ok(Persistor { mode, schema, db })
    }

    // Drops the store so the next attempt starts clean.
    fn destroy(db: Connection, mode: &PersistenceMode) {
        drop(db);
        if let PersistenceMode::File(path) = mode {
            let _ = fs::remove_file(path);
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
    pub fn connection(&self) -> &Connection {
        &self.db
    }

    /// Writes every resolved instance of every kind: one row per instance
    /// into its primary table, interleaved with one association row per
    /// resolved many-to-many pair. All writes commit as a single batch.
    pub fn write_all(&mut self, catalog: &Catalog, registry: &Registry) -> Result<()> {
        let transaction = self.db.transaction()?;
        for kind in catalog.kinds() {
            let mut instances = registry.instances_of(kind.name());
            if instances.is_empty() {
                continue;
            }
            instances.sort_by(|a, b| a.name().cmp(b.name()));
            info!(table = kind.name(), rows = instances.len(), "inserting rows");

            let mut columns = vec!["name".to_string()];
            for attribute in kind.attributes() {
                columns.push(attribute.name().to_string());
            }
            let one_to_many: Vec<_> = kind
                .relationships()
                .iter()
                .filter(|spec| spec.cardinality() == Cardinality::OneToMany)
                .collect();
            for spec in &one_to_many {
                columns.push(spec.field().to_string());
            }
            let placeholders = vec!["?"; columns.len()].join(", ");
            let insert = format!(
                "insert into {} ({}) values ({})",
                kind.name(),
                columns.join(", "),
                placeholders
            );
            let mut insert_row = transaction.prepare(&insert)?;

            // one prepared statement per many-to-many field, reused for
            // every instance of the kind
            let mut pair_inserts = Vec::new();
            for spec in kind.relationships() {
                if spec.cardinality() != Cardinality::ManyToMany {
                    continue;
                }
                let association = self
                    .schema
                    .associations
                    .iter()
                    .find(|a| a.from_kind == kind.name() && a.field == spec.field())
                    .ok_or_else(|| {
                        RulegraphError::Invariant(format!(
                            "no association table for {}.{}",
                            kind.name(),
                            spec.field()
                        ))
                    })?;
                let pair_insert = format!(
                    "insert into {} ({}, {}) values (?, ?)",
                    association.name,
                    association.from_column(),
                    association.to_column()
                );
                pair_inserts.push((spec.field(), transaction.prepare(&pair_insert)?));
            }

            for instance in &instances {
                let mut values: Vec<SqlValue> = vec![SqlValue::Text(instance.name().to_string())];
                for attribute in kind.attributes() {
                    let value = instance
                        .attribute(attribute.name())
                        .cloned()
                        .unwrap_or_else(|| attribute.default().clone());
                    values.push(sql_value(&value));
                }
                for spec in &one_to_many {
                    values.push(single_target(registry, instance, spec.field()));
                }
                insert_row.execute(params_from_iter(values))?;

                for (field, insert_pair) in &mut pair_inserts {
                    let Some(position) = instance.relationship_position(field) else {
                        continue;
                    };
                    let Some(relationship) = registry.relationship(position) else {
                        continue;
                    };
                    // the per-edge weight is carried in memory only and is
                    // not part of the persisted shape
                    for (target, _weight) in relationship.resolved_targets() {
                        insert_pair.execute(params![instance.name(), target.name()])?;
                    }
                }
            }
        }
        transaction.commit()?;
        Ok(())
    }
}

fn sql_value(value: &crate::descriptor::AttributeValue) -> SqlValue {
    use crate::descriptor::AttributeValue;
    match value {
        AttributeValue::Integer(i) => SqlValue::Integer(*i),
        AttributeValue::Real(r) => SqlValue::Real(*r),
        AttributeValue::Text(t) => SqlValue::Text(t.clone()),
        AttributeValue::Boolean(b) => SqlValue::Integer(i64::from(*b)),
    }
}

// The column value for a one-to-many relationship field: the single
// resolved target's name, or null when nothing resolved.
fn single_target(registry: &Registry, instance: &Arc<EntityInstance>, field: &str) -> SqlValue {
    let Some(position) = instance.relationship_position(field) else {
        return SqlValue::Null;
    };
    let Some(relationship) = registry.relationship(position) else {
        return SqlValue::Null;
    };
    match relationship.resolved_targets() {
        [(target, _)] => SqlValue::Text(target.name().to_string()),
        _ => SqlValue::Null,
    }
}
