use rulegraph::descriptor::{Catalog, TypeDescriptor};
use rulegraph::kinds::builtin_catalog;
use rulegraph::loader::Loader;
use rulegraph::persist::{PersistenceMode, Persistor};

const RESOURCES: &str = r#"
resources = {
	steel = {
		icon_frame = 1
	}
	chromium = {
		icon_frame = 6
	}
}
"#;

const EQUIPMENT: &str = r#"
equipments = {
	infantry_equipment = {
		year = 1918
		is_archetype = yes
		resources = {
			steel = 2
			chromium = 1
		}
	}
	infantry_equipment_0 = {
		year = 1936
		archetype = infantry_equipment
	}
}
"#;

fn loaded() -> Loader {
    let mut loader = Loader::new(builtin_catalog());
    loader.instantiate("resources", &[RESOURCES.to_string()]).expect("resources");
    loader.instantiate("equipment", &[EQUIPMENT.to_string()]).expect("equipment");
    loader.resolve().expect("resolve");
    loader
}

#[test]
fn rows_carry_document_values_and_defaults() {
    let loader = loaded();
    let mut persistor = Persistor::create(PersistenceMode::InMemory, loader.catalog()).expect("create");
    persistor.write_all(loader.catalog(), loader.registry()).expect("write");
    let (year, is_archetype, reliability): (i64, i64, f64) = persistor
        .connection()
        .query_row(
            "select year, is_archetype, reliability from equipment where name = 'infantry_equipment'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .expect("row");
    assert_eq!(year, 1918);
    assert_eq!(is_archetype, 1);
    // never set in the file, written from the descriptor default
    assert!((reliability - 0.9).abs() < f64::EPSILON);
}

#[test]
fn one_to_many_targets_land_in_the_foreign_key_column() {
    let loader = loaded();
    let mut persistor = Persistor::create(PersistenceMode::InMemory, loader.catalog()).expect("create");
    persistor.write_all(loader.catalog(), loader.registry()).expect("write");
    let archetype: Option<String> = persistor
        .connection()
        .query_row(
            "select archetype from equipment where name = 'infantry_equipment_0'",
            [],
            |row| row.get(0),
        )
        .expect("row");
    assert_eq!(archetype.as_deref(), Some("infantry_equipment"));
    // the archetype itself references nothing
    let archetype: Option<String> = persistor
        .connection()
        .query_row(
            "select archetype from equipment where name = 'infantry_equipment'",
            [],
            |row| row.get(0),
        )
        .expect("row");
    assert_eq!(archetype, None);
}

#[test]
fn many_to_many_pairs_land_in_the_association_table() {
    let loader = loaded();
    let mut persistor = Persistor::create(PersistenceMode::InMemory, loader.catalog()).expect("create");
    persistor.write_all(loader.catalog(), loader.registry()).expect("write");
    let mut rows = Vec::new();
    let mut statement = persistor
        .connection()
        .prepare("select equipment, resources from EQUIPMENTRESOURCES order by resources")
        .expect("prepare");
    let mut result = statement.query([]).expect("query");
    while let Some(row) = result.next().expect("next") {
        let from: String = row.get(0).expect("from");
        let to: String = row.get(1).expect("to");
        rows.push((from, to));
    }
    assert_eq!(
        rows,
        vec![
            ("infantry_equipment".to_string(), "chromium".to_string()),
            ("infantry_equipment".to_string(), "steel".to_string()),
        ]
    );
}

#[test]
fn association_rows_cover_every_referencing_instance() {
    let mut loader = Loader::new(builtin_catalog());
    let equipment = r#"
equipments = {
	a_guns = {
		resources = {
			steel = 1
		}
	}
	b_guns = {
		resources = {
			steel = 1
			chromium = 2
		}
	}
}
"#;
    loader.instantiate("resources", &[RESOURCES.to_string()]).expect("resources");
    loader.instantiate("equipment", &[equipment.to_string()]).expect("equipment");
    loader.resolve().expect("resolve");
    let mut persistor = Persistor::create(PersistenceMode::InMemory, loader.catalog()).expect("create");
    persistor.write_all(loader.catalog(), loader.registry()).expect("write");
    let mut statement = persistor
        .connection()
        .prepare("select equipment, resources from EQUIPMENTRESOURCES order by equipment, resources")
        .expect("prepare");
    let mut result = statement.query([]).expect("query");
    let mut rows = Vec::new();
    while let Some(row) = result.next().expect("next") {
        let from: String = row.get(0).expect("from");
        let to: String = row.get(1).expect("to");
        rows.push((from, to));
    }
    assert_eq!(
        rows,
        vec![
            ("a_guns".to_string(), "steel".to_string()),
            ("b_guns".to_string(), "chromium".to_string()),
            ("b_guns".to_string(), "steel".to_string()),
        ]
    );
}

#[test]
fn self_referencing_associations_suffix_the_target_column() {
    let mut catalog = Catalog::new();
    catalog.add(
        TypeDescriptor::build("node")
            .many_to_many("peer", "node")
            .seal(),
    );
    let persistor = Persistor::create(PersistenceMode::InMemory, &catalog).expect("create");
    let mut statement = persistor
        .connection()
        .prepare("select name from pragma_table_info('NODEPEER') order by cid")
        .expect("prepare");
    let mut result = statement.query([]).expect("query");
    let mut columns = Vec::new();
    while let Some(row) = result.next().expect("next") {
        let column: String = row.get(0).expect("column");
        columns.push(column);
    }
    assert_eq!(columns, vec!["node".to_string(), "node_to".to_string()]);
}

#[test]
fn file_backed_stores_survive_the_writer() {
    let directory = tempfile::tempdir().expect("tempdir");
    let path = directory.path().join("rules.db");
    let loader = loaded();
    {
        let mut persistor = Persistor::create(
            PersistenceMode::File(path.to_string_lossy().into_owned()),
            loader.catalog(),
        )
        .expect("create");
        persistor.write_all(loader.catalog(), loader.registry()).expect("write");
    }
    let db = rusqlite::Connection::open(&path).expect("reopen");
    let count: i64 = db
        .query_row("select count(*) from equipment", [], |row| row.get(0))
        .expect("count");
    assert_eq!(count, 2);
}

#[test]
fn rejected_schemas_destroy_the_store() {
    let directory = tempfile::tempdir().expect("tempdir");
    let path = directory.path().join("broken.db");
    // two kinds with the same name collide on the create table statement
    let mut catalog = Catalog::new();
    catalog.add(TypeDescriptor::build("twin").seal());
    catalog.add(TypeDescriptor::build("twin").seal());
    let result = Persistor::create(
        PersistenceMode::File(path.to_string_lossy().into_owned()),
        &catalog,
    );
    assert!(result.is_err());
    assert!(!path.exists(), "a failed creation leaves no store behind");
}
