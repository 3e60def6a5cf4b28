/// Backend compilers turn one IR function into source variants.
///
/// The trait mirrors the shape every backend shares: a compile step that
/// produces the variant registry, followed by an introspection surface that
/// describes how to call what was just compiled.
pub mod emit;
pub mod reference;

pub use reference::ReferenceBackend;

use crate::ir::Function;
use crate::manifest::VariantRegistry;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("backend was scoped to '{expected}' but received function '{found}'")]
    EntryPointMismatch { expected: String, found: String },
    #[error("entry point name is empty")]
    EmptyName,
    #[error("'{0}' is a reserved word in a generated language")]
    ReservedName(String),
    #[error("generated name '{0}' is already used by a parameter")]
    NameClash(String),
}

/// Interface each backend compiler must implement.
///
/// The introspection methods describe the most recent successful
/// [`BackendCompiler::compile`] call; before that they return empty values.
pub trait BackendCompiler {
    fn compile(&mut self, function: &Function) -> Result<VariantRegistry, BackendError>;

    /// Content-derived fingerprint of the compiled output.
    fn identity_hash(&self) -> String;

    fn result_type(&self) -> String;

    fn result_name(&self) -> String;

    /// Ordered `(type, name)` pairs, one per parameter.
    fn argument_types_and_names(&self) -> Vec<(String, String)>;
}
