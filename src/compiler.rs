//! Compilation orchestrator.
//!
//! Drives one entry point through the AST converter and a backend compiler
//! and packages the outcome as an immutable [`Compilation`]. Nothing here
//! touches the filesystem; persisting is the artifact writer's job.

use crate::backend::{BackendCompiler, BackendError};
use crate::lowering::{AstConverter, LoweringError};
use crate::manifest::{Manifest, Tag, TypedName, VariantRegistry, WrapInfo};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("expected exactly one entry point, found {found}")]
    EntryPointCount { found: usize },
    #[error("backend reported {found} arguments but the entry point takes {expected}")]
    SignatureMismatch { expected: usize, found: usize },
    #[error(transparent)]
    Lowering(#[from] LoweringError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Non-fatal finding recorded during a compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning: {}", self.message)
    }
}

/// Result of compiling one entry point, ready to be merged into its manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Compilation {
    pub(crate) entry_point: String,
    pub(crate) compiler_output: VariantRegistry,
    pub(crate) wrap_info: WrapInfo,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn compiler_output(&self) -> &VariantRegistry {
        &self.compiler_output
    }

    pub fn wrap_info(&self) -> &WrapInfo {
        &self.wrap_info
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Compile the single entry point of `manifest`.
///
/// Fails with [`CompileError::EntryPointCount`] before the converter or the
/// backend factory is touched unless the manifest names exactly one entry
/// point. `make_backend` receives the entry point and the manifest tag.
pub fn compile<C, B, F>(converter: &C, ast: &C::Ast, manifest: &Manifest, make_backend: F) -> Result<Compilation, CompileError>
where
    C: AstConverter,
    B: BackendCompiler,
    F: FnOnce(&str, Tag) -> B,
{
    let [entry_point] = manifest.entry_points.as_slice() else {
        return Err(CompileError::EntryPointCount {
            found: manifest.entry_points.len(),
        });
    };

    debug!(entry_point = %entry_point, tag = %manifest.tag, "lowering entry point");
    let function = converter.convert(ast)?;

    let mut backend = make_backend(entry_point, manifest.tag);
    let compiler_output = backend.compile(&function)?;
    debug!(entry_point = %entry_point, variants = compiler_output.len(), "backend compile finished");

    let arguments: Vec<TypedName> = backend
        .argument_types_and_names()
        .into_iter()
        .map(|(ty, name)| TypedName { ty, name })
        .collect();
    if arguments.len() != function.arity() {
        return Err(CompileError::SignatureMismatch {
            expected: function.arity(),
            found: arguments.len(),
        });
    }

    let wrap_info = WrapInfo {
        identity_hash: backend.identity_hash(),
        result: TypedName::new(backend.result_type(), backend.result_name()),
        arguments,
    };

    let mut diagnostics = Vec::new();
    if compiler_output.is_empty() {
        diagnostics.push(Diagnostic {
            message: format!("backend produced no variants for '{}'; nothing will be persisted", entry_point),
        });
    }

    info!(entry_point = %entry_point, hash = %wrap_info.identity_hash, "compiled");
    Ok(Compilation {
        entry_point: entry_point.clone(),
        compiler_output,
        wrap_info,
        diagnostics,
    })
}
