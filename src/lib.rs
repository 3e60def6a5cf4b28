//! cusp compiles one scalar function into interpreted, native and
//! accelerator source variants and persists them as a small artifact tree.

/// AST module - front-end s-expression reader
pub mod ast;
pub mod backend;
pub mod cli;
/// Compilation orchestrator
pub mod compiler;
pub mod config;
pub mod evaluator;
pub mod ir;
/// AST to IR conversion
pub mod lowering;
pub mod manifest;
pub mod writer;

pub use backend::{BackendCompiler, BackendError, ReferenceBackend};
pub use compiler::{compile, Compilation, CompileError, Diagnostic};
pub use config::{BuildConfig, ConfigError};
pub use lowering::{AstConverter, LoweringError, SexpLowering};
pub use manifest::{
    CompiledCallable, CompiledFunction, Manifest, MergeError, Tag, TypedName, VariantBundle, VariantRegistry, VariantTag,
    WrapInfo,
};
pub use writer::{persist, ArtifactWriter};
