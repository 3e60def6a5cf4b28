//! Reference backend: plain scalar source text for all three targets.
//!
//! Each compile produces a single variant keyed by the backend's tag. The
//! native source is wrapped in a namespace derived from the identity hash
//! and exported through an `extern "C"` forwarder, so several compiled
//! versions of the same function can be linked side by side.

use super::emit::{c_expr, c_signature, indent, is_reserved, python_cast, python_expr};
use super::{BackendCompiler, BackendError};
use crate::config::BuildConfig;
use crate::ir::Function;
use crate::manifest::{Tag, VariantBundle, VariantRegistry};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt::Write;
use tracing::debug;

/// Length of the hash prefix used for the native namespace.
const NAMESPACE_HASH_LEN: usize = 16;

#[derive(Debug, Default)]
struct Introspection {
    identity_hash: String,
    result_type: String,
    result_name: String,
    arguments: Vec<(String, String)>,
}

pub struct ReferenceBackend<'cfg> {
    entry_point: String,
    tag: Tag,
    config: &'cfg BuildConfig,
    last: Introspection,
}

impl<'cfg> ReferenceBackend<'cfg> {
    pub fn new(entry_point: &str, tag: Tag, config: &'cfg BuildConfig) -> Self {
        Self {
            entry_point: entry_point.to_string(),
            tag,
            config,
            last: Introspection::default(),
        }
    }

    fn check_names(&self, function: &Function) -> Result<(), BackendError> {
        if function.name.is_empty() {
            return Err(BackendError::EmptyName);
        }
        if function.name != self.entry_point {
            return Err(BackendError::EntryPointMismatch {
                expected: self.entry_point.clone(),
                found: function.name.clone(),
            });
        }

        let names = std::iter::once(&function.name)
            .chain(function.params.iter().map(|p| &p.name))
            .chain(function.locals.iter().map(|l| &l.name));
        for name in names {
            if is_reserved(name) {
                return Err(BackendError::ReservedName(name.clone()));
            }
        }

        let params: HashSet<&str> = function.params.iter().map(|p| p.name.as_str()).collect();
        if let Some(local) = function.locals.iter().find(|l| params.contains(l.name.as_str())) {
            return Err(BackendError::NameClash(local.name.clone()));
        }
        Ok(())
    }

    fn header(&self, function: &Function) -> String {
        format!("// cusp {} variant of {}\n", self.tag, function.name)
    }

    fn emit_python(&self, function: &Function) -> String {
        let names: Vec<&str> = function.params.iter().map(|p| p.name.as_str()).collect();
        let mut out = format!("# cusp {} variant of {}\n", self.tag, function.name);
        let _ = writeln!(out, "def {}({}):", function.name, names.join(", "));
        for param in &function.params {
            let _ = writeln!(out, "{}{} = {}({})", indent(1), param.name, python_cast(param.ty), param.name);
        }
        for local in &function.locals {
            let _ = writeln!(out, "{}{} = {}", indent(1), local.name, python_expr(function, &local.value));
        }
        let _ = writeln!(
            out,
            "{}return {}({})",
            indent(1),
            python_cast(function.result),
            python_expr(function, &function.body)
        );
        out
    }

    /// Scalar C++ function body, shared by the native and accelerator forms.
    fn emit_c_function(&self, function: &Function, qualifier: Option<&str>) -> String {
        let mut out = c_signature(
            qualifier,
            function.result.c_name(),
            &function.name,
            &self.c_params(function),
        );
        out.push_str(" {\n");
        for local in &function.locals {
            let _ = writeln!(
                out,
                "{}const {} {} = {};",
                indent(1),
                local.ty.c_name(),
                local.name,
                c_expr(function, &local.value)
            );
        }
        let _ = writeln!(out, "{}return {};", indent(1), c_expr(function, &function.body));
        out.push_str("}\n");
        out
    }

    fn c_params(&self, function: &Function) -> Vec<(String, String)> {
        function
            .params
            .iter()
            .map(|p| (p.ty.c_name().to_string(), p.name.clone()))
            .collect()
    }

    /// `__global__` element-wise map of the device function over argument arrays.
    fn emit_kernel(&self, function: &Function) -> String {
        let mut params: Vec<(String, String)> = function
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| (format!("const {}*", p.ty.c_name()), format!("_arg{}", i)))
            .collect();
        params.push((format!("{}*", function.result.c_name()), "_result".to_string()));
        params.push(("int".to_string(), "_n".to_string()));

        let args = (0..function.arity())
            .map(|i| format!("_arg{}[_i]", i))
            .collect::<Vec<_>>()
            .join(", ");

        let mut out = c_signature(Some("__global__"), "void", &format!("{}_kernel", function.name), &params);
        out.push_str(" {\n");
        let _ = writeln!(out, "{}int _i = blockIdx.x * blockDim.x + threadIdx.x;", indent(1));
        let _ = writeln!(out, "{}if (_i < _n) {{", indent(1));
        let _ = writeln!(out, "{}_result[_i] = {}({});", indent(2), function.name, args);
        let _ = writeln!(out, "{}}}", indent(1));
        out.push_str("}\n");
        out
    }

    fn identity(&self, sources: [&str; 3]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.entry_point.as_bytes());
        hasher.update([0]);
        hasher.update(self.tag.as_str().as_bytes());
        hasher.update([0]);
        for line in self.config.fingerprint() {
            hasher.update(line.as_bytes());
            hasher.update([0]);
        }
        for source in sources {
            hasher.update(source.as_bytes());
            hasher.update([0]);
        }
        hex::encode(hasher.finalize())
    }

    fn wrap_native(&self, function: &Function, body: &str, namespace: &str) -> String {
        let params = self.c_params(function);
        let forward = params.iter().map(|(_, name)| name.as_str()).collect::<Vec<_>>().join(", ");

        let mut out = self.header(function);
        let _ = writeln!(out, "// host compiler: {}", self.config.cxx);
        if self.tag == Tag::Tbb {
            if let Some(dir) = &self.config.tbb_inc_dir {
                let _ = writeln!(out, "// tbb include: {}", dir.display());
            }
        }
        let _ = writeln!(out, "namespace {} {{", namespace);
        out.push_str(body);
        out.push_str("}\n\n");
        let _ = writeln!(
            out,
            "extern \"C\" {} {{",
            c_signature(None, function.result.c_name(), &format!("{}_wrap", function.name), &params)
        );
        let _ = writeln!(out, "{}return {}::{}({});", indent(1), namespace, function.name, forward);
        out.push_str("}\n");
        out
    }

    fn wrap_accelerator(&self, function: &Function, body: &str, namespace: &str) -> String {
        let mut out = self.header(function);
        if let Some(dir) = &self.config.cuda_inc_dir {
            let _ = writeln!(out, "// cuda include: {}", dir.display());
        }
        if let Some(dir) = &self.config.thrust_dir {
            let _ = writeln!(out, "// thrust: {}", dir.display());
        }
        let _ = writeln!(out, "namespace {} {{", namespace);
        out.push_str(body);
        out.push_str("}\n");
        out
    }
}

impl BackendCompiler for ReferenceBackend<'_> {
    fn compile(&mut self, function: &Function) -> Result<VariantRegistry, BackendError> {
        self.check_names(function)?;

        let interpreted = self.emit_python(function);
        let native_body = self.emit_c_function(function, None);
        let accelerator_body = format!(
            "{}\n{}",
            self.emit_c_function(function, Some("__device__")),
            self.emit_kernel(function)
        );

        let identity_hash = self.identity([&interpreted, &native_body, &accelerator_body]);
        let namespace = format!("_{}", &identity_hash[..NAMESPACE_HASH_LEN]);
        debug!(function = %function.name, tag = %self.tag, %namespace, "emitted reference variant");

        let bundle = VariantBundle::new(
            interpreted,
            self.wrap_native(function, &native_body, &namespace),
            self.wrap_accelerator(function, &accelerator_body, &namespace),
        );

        self.last = Introspection {
            identity_hash,
            result_type: function.result.c_name().to_string(),
            result_name: function.name.clone(),
            arguments: self.c_params(function),
        };

        let mut registry = VariantRegistry::new();
        registry.insert(self.tag, bundle);
        Ok(registry)
    }

    fn identity_hash(&self) -> String {
        self.last.identity_hash.clone()
    }

    fn result_type(&self) -> String {
        self.last.result_type.clone()
    }

    fn result_name(&self) -> String {
        self.last.result_name.clone()
    }

    fn argument_types_and_names(&self) -> Vec<(String, String)> {
        self.last.arguments.clone()
    }
}
