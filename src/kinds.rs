//! The built-in catalog: declarative data only, no engine logic. The
//! descriptors mirror the rule set of the simulation this crate ingests:
//! resource pools, equipment archetypes, sub-units and the terrain
//! modifiers embedded within them.

use crate::descriptor::{Catalog, TypeDescriptor};

pub fn builtin_catalog() -> Catalog {
    let mut catalog = Catalog::new();

    // embedded only, never discovered from files
    catalog.add(
        TypeDescriptor::build("terrain")
            .subtype("forest")
            .subtype("jungle")
            .real("attack", 0.0)
            .real("movement", 0.0)
            .seal(),
    );

    catalog.add(
        TypeDescriptor::build("resources")
            .header("resources")
            .loadable()
            .seal(),
    );

    catalog.add(
        TypeDescriptor::build("equipment")
            .header("equipments")
            .header("duplicate_archetypes")
            .loadable()
            .integer("year", 1918)
            .boolean("is_archetype", false)
            .boolean("is_buildable", false)
            .text("type", "")
            .boolean("active", false)
            // misc abilities
            .real("reliability", 0.9)
            .real("maximum_speed", 4.0)
            // defensive abilities
            .real("defense", 20.0)
            .real("breakthrough", 2.0)
            .real("hardness", 0.0)
            .real("armor_value", 0.0)
            // offensive abilities
            .real("soft_attack", 3.0)
            .real("hard_attack", 0.5)
            .real("ap_attack", 1.0)
            .real("air_attack", 0.0)
            // space taken in convoy
            .real("lend_lease_cost", 1.0)
            .real("build_cost_ic", 0.43)
            .one_to_many("archetype", "equipment")
            .many_to_many("resources", "resources")
            .seal(),
    );

    catalog.add(
        TypeDescriptor::build("unit")
            .header("sub_units")
            .loadable()
            .child("terrain")
            .text("abbreviation", "")
            .real("max_strength", 0.0)
            .real("max_organisation", 0.0)
            .real("default_morale", 0.0)
            .real("manpower", 0.0)
            .many_to_many("need", "equipment")
            .one_to_many("need_equipment", "equipment")
            .seal(),
    );

    catalog
}
