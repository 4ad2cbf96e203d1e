#![warn(missing_docs)]
//! # vision-flow-contract-tests
//!
//! ## Purpose
//! Keeps the frozen wire schemas in `contracts/` and the client parsers in
//! agreement.
//!
//! ## Responsibilities
//! - Locate schema and fixture files under the workspace `contracts/` tree.
//! - Load them as JSON and compile schemas into validators.
//!
//! ## Data flow
//! Fixture file -> JSON value -> schema validator; the same file is also fed
//! to the analysis-contract parsers by the integration tests.
//!
//! ## Ownership and lifetimes
//! Every helper returns owned values; nothing is cached between calls.
//!
//! ## Error model
//! Helpers panic with the offending path, since a missing or broken fixture
//! is a test failure rather than a runtime condition.
//!
//! ## Security and privacy notes
//! Fixtures hold synthetic data only; no real identities or images.

use std::path::PathBuf;

use jsonschema::JSONSchema;
use serde_json::Value;

/// Absolute path of `relative` under the workspace `contracts/` directory.
pub fn contract_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../contracts")
        .join(relative)
}

/// Reads and parses a JSON file under `contracts/`.
///
/// # Panics
/// Panics when the file is missing or not JSON; fixtures are test inputs.
pub fn load_json(relative: &str) -> Value {
    let path = contract_path(relative);
    let raw = std::fs::read_to_string(&path)
        .unwrap_or_else(|error| panic!("{} should be readable: {error}", path.display()));
    serde_json::from_str(&raw)
        .unwrap_or_else(|error| panic!("{} should be valid json: {error}", path.display()))
}

/// Compiles the schema stored at `relative`.
///
/// # Panics
/// Panics when the schema does not compile.
pub fn compile_validator(relative: &str) -> JSONSchema {
    let schema = load_json(relative);
    JSONSchema::compile(&schema).unwrap_or_else(|error| panic!("{relative} should compile: {error}"))
}
