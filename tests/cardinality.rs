use rulegraph::error::RulegraphError;
use rulegraph::kinds::builtin_catalog;
use rulegraph::loader::Loader;

#[test]
fn one_to_many_accepts_a_single_reference() {
    let mut loader = Loader::new(builtin_catalog());
    let file = r#"
equipments = {
	rifle_archetype = {
		is_archetype = yes
	}
	rifle_1 = {
		archetype = rifle_archetype
	}
}
"#;
    loader.instantiate("equipment", &[file.to_string()]).expect("equipment");
    loader.resolve().expect("resolve");
}

#[test]
fn one_to_many_rejects_multiple_references() {
    let mut loader = Loader::new(builtin_catalog());
    let file = r#"
equipments = {
	confused_rifle = {
		archetype = {
			one_archetype = 1
			another_archetype = 2
		}
	}
}
"#;
    let err = loader
        .instantiate("equipment", &[file.to_string()])
        .expect_err("two references on a one-to-many field");
    match err {
        RulegraphError::Cardinality {
            kind,
            name,
            field,
            count,
        } => {
            assert_eq!(kind, "equipment");
            assert_eq!(name, "confused_rifle");
            assert_eq!(field, "archetype");
            assert_eq!(count, 2);
        }
        other => panic!("expected cardinality violation, got {other}"),
    }
    // the violation registers nothing
    assert!(loader.registry().relationships().is_empty());
}

#[test]
fn violation_on_a_later_field_registers_no_earlier_relationship() {
    let mut loader = Loader::new(builtin_catalog());
    // the need map is valid on its own; the entity must still register
    // nothing once need_equipment overflows
    let file = r#"
sub_units = {
	confused_unit = {
		need = {
			infantry_equipment = 100
		}
		need_equipment = {
			foo_gun = 1
			bar_gun = 2
		}
	}
}
"#;
    let err = loader
        .instantiate("unit", &[file.to_string()])
        .expect_err("two references on a one-to-many field");
    match err {
        RulegraphError::Cardinality { field, count, .. } => {
            assert_eq!(field, "need_equipment");
            assert_eq!(count, 2);
        }
        other => panic!("expected cardinality violation, got {other}"),
    }
    assert!(loader.registry().relationships().is_empty());
}

#[test]
fn many_to_many_accepts_any_number_of_references() {
    let mut loader = Loader::new(builtin_catalog());
    let resources = r#"
resources = {
	steel = {
		icon_frame = 1
	}
	tungsten = {
		icon_frame = 3
	}
	chromium = {
		icon_frame = 6
	}
}
"#;
    let equipment = r#"
equipments = {
	heavy_guns = {
		resources = {
			steel = 3
			tungsten = 2
			chromium = 1
		}
	}
}
"#;
    loader.instantiate("resources", &[resources.to_string()]).expect("resources");
    loader.instantiate("equipment", &[equipment.to_string()]).expect("equipment");
    loader.resolve().expect("resolve");
    let guns = loader.instance("equipment", "heavy_guns").expect("guns");
    let position = guns.relationship_position("resources").expect("resources");
    let relationship = loader.registry().relationship(position).expect("kept");
    assert_eq!(relationship.resolved_targets().len(), 3);
}
