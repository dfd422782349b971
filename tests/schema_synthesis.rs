use rulegraph::descriptor::{Cardinality, Catalog, TypeDescriptor};
use rulegraph::kinds::builtin_catalog;
use rulegraph::persist::synthesize;

#[test]
fn every_kind_gets_a_primary_table() {
    let schema = synthesize(&builtin_catalog());
    let names: Vec<&str> = schema.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["terrain", "resources", "equipment", "unit"]);
}

#[test]
fn columns_carry_the_declared_scalar_types() {
    let schema = synthesize(&builtin_catalog());
    let equipment = schema
        .tables
        .iter()
        .find(|t| t.name == "equipment")
        .expect("equipment table");
    let type_of = |column: &str| {
        equipment
            .columns
            .iter()
            .find(|c| c.name == column)
            .unwrap_or_else(|| panic!("missing column {column}"))
            .sql_type
    };
    assert_eq!(type_of("year"), "integer");
    assert_eq!(type_of("is_archetype"), "boolean");
    assert_eq!(type_of("type"), "text");
    assert_eq!(type_of("reliability"), "real");
}

#[test]
fn one_to_many_fields_become_foreign_key_columns() {
    let schema = synthesize(&builtin_catalog());
    let equipment = schema
        .tables
        .iter()
        .find(|t| t.name == "equipment")
        .expect("equipment table");
    assert!(equipment.columns.iter().any(|c| c.name == "archetype" && c.sql_type == "text"));
    assert!(
        equipment
            .foreign_keys
            .iter()
            .any(|(column, target)| column == "archetype" && target == "equipment")
    );
    let unit = schema.tables.iter().find(|t| t.name == "unit").expect("unit table");
    assert!(
        unit.foreign_keys
            .iter()
            .any(|(column, target)| column == "need_equipment" && target == "equipment")
    );
}

#[test]
fn many_to_many_fields_become_association_tables() {
    let schema = synthesize(&builtin_catalog());
    let names: Vec<&str> = schema.associations.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["EQUIPMENTRESOURCES", "UNITNEED"]);
    let need = &schema.associations[1];
    assert_eq!(need.from_kind, "unit");
    assert_eq!(need.to_kind, "equipment");
    assert_eq!(need.field, "need");
}

#[test]
fn duplicate_association_shapes_collapse_to_one_table() {
    let mut catalog = Catalog::new();
    catalog.add(
        TypeDescriptor::build("node")
            .many_to_many("peer", "node")
            .seal(),
    );
    catalog.add(
        TypeDescriptor::build("node")
            .many_to_many("peer", "node")
            .seal(),
    );
    let schema = synthesize(&catalog);
    assert_eq!(schema.associations.len(), 1);
}

#[test]
fn catalog_descriptors_are_reachable_by_name() {
    let catalog = builtin_catalog();
    assert_eq!(catalog.len(), 4);
    let terrain = catalog.get("terrain").expect("terrain");
    assert!(!terrain.loadable());
    assert_eq!(terrain.subtypes(), ["forest", "jungle"]);
    let equipment = catalog.get("equipment").expect("equipment");
    assert!(equipment.loadable());
    assert_eq!(equipment.headers(), ["equipments", "duplicate_archetypes"]);
    let archetype = equipment.relationship("archetype").expect("archetype");
    assert_eq!(archetype.cardinality(), Cardinality::OneToMany);
    assert_eq!(archetype.target(), "equipment");
    let unit = catalog.get("unit").expect("unit");
    assert_eq!(unit.child_kinds(), ["terrain"]);
    assert!(catalog.get("starship").is_err());
}
