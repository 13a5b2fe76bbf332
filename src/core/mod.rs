//! Pipeline stages: identifier derivation, workspace staging, engine
//! invocation, product assembly and cataloging. These are the building
//! blocks consumed by the high-level `api` module.
pub mod assemble;
pub mod catalog;
pub mod engine;
pub mod identifiers;
pub mod params;
pub mod processing;
pub mod workspace;
