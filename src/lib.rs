//! Rulegraph – ingests rule files written in a compact block-structured
//! configuration language and turns them into a typed entity graph backed
//! by a relational store.
//!
//! The pipeline is a strictly ordered batch job:
//! * [`convert`] rewrites the domain language into generic structured
//!   documents (maps, ordered lists, scalars).
//! * [`descriptor`] holds the declarative metadata per entity kind:
//!   accepted headers, attribute enumerations with defaults, child kinds
//!   and subtype fields, relationship fields with target kind and
//!   cardinality.
//! * [`construct`] provides the runtime objects — entity instances,
//!   relationships and the [`construct::Registry`] keeping them, including
//!   the reverse index for "what references me" queries.
//! * [`loader`] runs the two-phase protocol: instantiate everything first,
//!   resolve relationships second, so forward references across files work
//!   regardless of discovery order.
//! * [`persist`] synthesizes a relational schema straight from the
//!   descriptors (association tables included) and writes the resolved
//!   graph to SQLite.
//! * [`kinds`] is the built-in catalog of entity kinds; declarative data
//!   only.
//!
//! ## Quick Start
//! ```
//! use rulegraph::kinds::builtin_catalog;
//! use rulegraph::loader::Loader;
//!
//! let mut loader = Loader::new(builtin_catalog());
//! let file = r#"
//! sub_units = {
//!     infantry = {
//!         abbreviation = "INF"
//!         max_strength = 25
//!     }
//! }
//! "#;
//! loader.instantiate("unit", &[file.to_string()]).unwrap();
//! loader.resolve().unwrap();
//! assert!(loader.instance("unit", "infantry").is_some());
//! ```
//!
//! ## Error Policy
//! A malformed file is logged and skipped — one bad document must not
//! abort the batch. Construction and resolution errors abort the load;
//! a schema creation error destroys the target store so the next run
//! starts clean.

pub mod construct;
pub mod convert;
pub mod descriptor;
pub mod error;
pub mod kinds;
pub mod loader;
pub mod persist;
