//! Compilation manifests and the variant registry.
//!
//! A [`Manifest`] is the aggregate record for one compilation unit. It is
//! filled exactly once by merging a [`Compilation`] and can then be handed
//! to the artifact writer as often as needed.

use crate::compiler::{Compilation, Diagnostic};
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Execution system a function is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    #[default]
    Cpp,
    Omp,
    Tbb,
    Cuda,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("unknown tag '{0}', expected one of: cpp, omp, tbb, cuda")]
pub struct UnknownTag(String);

impl Tag {
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Cpp => "cpp",
            Tag::Omp => "omp",
            Tag::Tbb => "tbb",
            Tag::Cuda => "cuda",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tag {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpp" => Ok(Tag::Cpp),
            "omp" => Ok(Tag::Omp),
            "tbb" => Ok(Tag::Tbb),
            "cuda" => Ok(Tag::Cuda),
            other => Err(UnknownTag(other.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    #[error("compilation of '{found}' does not belong to a manifest for '{expected}'")]
    ForeignEntryPoint { expected: String, found: String },
    #[error("manifest for '{0}' has already been merged")]
    AlreadyMerged(String),
}

/// Name of one compiled variant (a specialization) of a function.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariantTag(String);

impl VariantTag {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VariantTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VariantTag {
    fn from(value: &str) -> Self {
        VariantTag(value.to_string())
    }
}

impl From<String> for VariantTag {
    fn from(value: String) -> Self {
        VariantTag(value)
    }
}

impl From<Tag> for VariantTag {
    fn from(value: Tag) -> Self {
        VariantTag(value.as_str().to_string())
    }
}

/// Source text of one variant: interpreted, native and accelerator forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantBundle {
    interpreted: String,
    native: String,
    accelerator: String,
}

impl VariantBundle {
    /// File extensions, positionally aligned with [`VariantBundle::sources`].
    pub const EXTENSIONS: [&'static str; 3] = [".py", ".cpp", ".cu"];

    pub fn new(interpreted: impl Into<String>, native: impl Into<String>, accelerator: impl Into<String>) -> Self {
        Self {
            interpreted: interpreted.into(),
            native: native.into(),
            accelerator: accelerator.into(),
        }
    }

    pub fn interpreted(&self) -> &str {
        &self.interpreted
    }

    pub fn native(&self) -> &str {
        &self.native
    }

    pub fn accelerator(&self) -> &str {
        &self.accelerator
    }

    pub fn sources(&self) -> [&str; 3] {
        [&self.interpreted, &self.native, &self.accelerator]
    }

    /// `(extension, source)` pairs in fixed order.
    pub fn files(&self) -> impl Iterator<Item = (&'static str, &str)> {
        Self::EXTENSIONS.into_iter().zip(self.sources())
    }
}

/// Compiled variants of one callable, ordered by tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantRegistry {
    variants: BTreeMap<VariantTag, VariantBundle>,
}

impl VariantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: impl Into<VariantTag>, bundle: VariantBundle) -> Option<VariantBundle> {
        self.variants.insert(tag.into(), bundle)
    }

    pub fn get(&self, tag: &str) -> Option<&VariantBundle> {
        self.variants.get(&VariantTag::from(tag))
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn tags(&self) -> impl Iterator<Item = &VariantTag> {
        self.variants.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, VariantTag, VariantBundle> {
        self.variants.iter()
    }

    /// Pick the variant to export.
    ///
    /// The preferred tag wins when it is present; otherwise the
    /// lexicographically smallest tag is chosen. Returns `None` only for an
    /// empty registry.
    pub fn select(&self, preferred: Option<&VariantTag>) -> Option<(&VariantTag, &VariantBundle)> {
        preferred
            .and_then(|tag| self.variants.get_key_value(tag))
            .or_else(|| self.variants.iter().next())
    }
}

impl<T: Into<VariantTag>> FromIterator<(T, VariantBundle)> for VariantRegistry {
    fn from_iter<I: IntoIterator<Item = (T, VariantBundle)>>(iter: I) -> Self {
        Self {
            variants: iter.into_iter().map(|(tag, bundle)| (tag.into(), bundle)).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a VariantRegistry {
    type Item = (&'a VariantTag, &'a VariantBundle);
    type IntoIter = btree_map::Iter<'a, VariantTag, VariantBundle>;

    fn into_iter(self) -> Self::IntoIter {
        self.variants.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedName {
    #[serde(rename = "type")]
    pub ty: String,
    pub name: String,
}

impl TypedName {
    pub fn new(ty: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            name: name.into(),
        }
    }
}

/// Calling-convention descriptor needed to invoke a compiled variant from host code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapInfo {
    pub identity_hash: String,
    pub result: TypedName,
    pub arguments: Vec<TypedName>,
}

/// Anything that can hand out compiled variants; the artifact writer only
/// accepts these.
pub trait CompiledCallable {
    fn code(&self) -> &VariantRegistry;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFunction {
    name: String,
    code: VariantRegistry,
    wrap_info: WrapInfo,
}

impl CompiledFunction {
    pub fn new(name: impl Into<String>, code: VariantRegistry, wrap_info: WrapInfo) -> Self {
        Self {
            name: name.into(),
            code,
            wrap_info,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wrap_info(&self) -> &WrapInfo {
        &self.wrap_info
    }
}

impl CompiledCallable for CompiledFunction {
    fn code(&self) -> &VariantRegistry {
        &self.code
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub entry_points: Vec<String>,
    pub tag: Tag,
    compiler_output: Option<VariantRegistry>,
    wrap_info: Option<WrapInfo>,
    callables: BTreeMap<String, CompiledFunction>,
}

impl Manifest {
    pub fn new(entry_points: Vec<String>, tag: Tag) -> Self {
        Self {
            entry_points,
            tag,
            compiler_output: None,
            wrap_info: None,
            callables: BTreeMap::new(),
        }
    }

    pub fn compiler_output(&self) -> Option<&VariantRegistry> {
        self.compiler_output.as_ref()
    }

    pub fn wrap_info(&self) -> Option<&WrapInfo> {
        self.wrap_info.as_ref()
    }

    pub fn callables(&self) -> &BTreeMap<String, CompiledFunction> {
        &self.callables
    }

    pub fn into_callables(self) -> BTreeMap<String, CompiledFunction> {
        self.callables
    }

    /// Record a finished compilation and return its diagnostics.
    ///
    /// Sets `compiler_output` and `wrap_info` and registers the entry point
    /// as a compiled callable under its own name. A manifest accepts one
    /// compilation, and only one of its own single entry point.
    pub fn merge(&mut self, compilation: Compilation) -> Result<Vec<Diagnostic>, MergeError> {
        let expected = match self.entry_points.as_slice() {
            [entry_point] => entry_point,
            _ => {
                return Err(MergeError::ForeignEntryPoint {
                    expected: self.entry_points.join(", "),
                    found: compilation.entry_point,
                })
            }
        };
        if *expected != compilation.entry_point {
            return Err(MergeError::ForeignEntryPoint {
                expected: expected.clone(),
                found: compilation.entry_point,
            });
        }
        if self.compiler_output.is_some() {
            return Err(MergeError::AlreadyMerged(compilation.entry_point));
        }

        let Compilation {
            entry_point,
            compiler_output,
            wrap_info,
            diagnostics,
        } = compilation;

        let callable = CompiledFunction::new(entry_point.clone(), compiler_output.clone(), wrap_info.clone());
        self.callables.insert(entry_point, callable);
        self.compiler_output = Some(compiler_output);
        self.wrap_info = Some(wrap_info);
        Ok(diagnostics)
    }
}
