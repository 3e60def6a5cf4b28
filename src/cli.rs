/// CLI commands for function files
///
/// A file holds one or more `defn` forms. Every definition gets its own
/// manifest with itself as the single entry point; the compiled callables
/// of all definitions are persisted together.
use crate::ast::{parse_file, Node};
use crate::backend::ReferenceBackend;
use crate::compiler::compile;
use crate::config::BuildConfig;
use crate::evaluator::{eval_function, Value};
use crate::lowering::{definition_name, AstConverter, SexpLowering};
use crate::manifest::{CompiledFunction, Manifest, Tag, WrapInfo};
use crate::writer::ArtifactWriter;
use anyhow::{anyhow, bail, Context, Result};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::warn;

fn read_definitions(input: &Path) -> Result<Vec<Node>> {
    let source = fs::read_to_string(input).with_context(|| format!("Failed to read file '{}'", input.display()))?;
    let definitions = parse_file(&source).with_context(|| format!("Failed to parse '{}'", input.display()))?;
    if definitions.is_empty() {
        bail!("'{}' contains no definitions", input.display());
    }
    Ok(definitions)
}

/// Compile every definition in `source`, one manifest per definition.
pub fn compile_source(source: &str, tag: Tag, config: &BuildConfig) -> Result<Vec<Manifest>> {
    let definitions = parse_file(source)?;
    compile_definitions(&definitions, tag, config)
}

fn compile_definitions(definitions: &[Node], tag: Tag, config: &BuildConfig) -> Result<Vec<Manifest>> {
    let mut manifests = Vec::with_capacity(definitions.len());
    let mut seen = HashSet::new();
    for node in definitions {
        let name = definition_name(node)?;
        if !seen.insert(name.clone()) {
            bail!("duplicate definition '{}'", name);
        }
        let mut manifest = Manifest::new(vec![name.clone()], tag);

        let compilation = compile(&SexpLowering, node, &manifest, |entry, tag| {
            ReferenceBackend::new(entry, tag, config)
        })
        .with_context(|| format!("Failed to compile '{}'", name))?;

        for diagnostic in manifest.merge(compilation)? {
            warn!(function = %name, "{}", diagnostic);
        }
        manifests.push(manifest);
    }
    Ok(manifests)
}

/// Compile `input` and persist the variants.
///
/// With `here` set the artifacts go to the writer's working directory;
/// otherwise they go next to the input (`<input minus extension>/`) together
/// with a copy of the input. Returns the persisted function names.
pub fn compile_file(
    input: &Path,
    tag: Tag,
    config: &BuildConfig,
    writer: &ArtifactWriter,
    here: bool,
) -> Result<Vec<String>> {
    let definitions = read_definitions(input)?;
    let manifests = compile_definitions(&definitions, tag, config)?;

    let callables: BTreeMap<String, CompiledFunction> =
        manifests.into_iter().flat_map(Manifest::into_callables).collect();

    let source_path = if here { None } else { Some(input) };
    writer
        .persist(&callables, source_path)
        .with_context(|| format!("Failed to write artifacts under '{}'", writer.destination_root(source_path).display()))?;

    Ok(callables.into_keys().collect())
}

/// Wrap info of every definition in `input`, as pretty JSON keyed by name.
pub fn wrap_info_for_file(input: &Path, tag: Tag, config: &BuildConfig) -> Result<String> {
    let definitions = read_definitions(input)?;
    let manifests = compile_definitions(&definitions, tag, config)?;

    let mut infos: BTreeMap<String, WrapInfo> = BTreeMap::new();
    for manifest in &manifests {
        for (name, callable) in manifest.callables() {
            infos.insert(name.clone(), callable.wrap_info().clone());
        }
    }
    Ok(serde_json::to_string_pretty(&infos)?)
}

/// Evaluate a definition from `input` on `args`.
///
/// `function` picks a definition by name; it may be omitted when the file
/// holds exactly one.
pub fn eval_file(input: &Path, function: Option<&str>, args: &[f64]) -> Result<Value> {
    let definitions = read_definitions(input)?;

    let node = match function {
        Some(wanted) => definitions
            .iter()
            .find(|node| definition_name(node).map_or(false, |name| name == wanted))
            .ok_or_else(|| anyhow!("no definition named '{}' in '{}'", wanted, input.display()))?,
        None => match definitions.as_slice() {
            [only] => only,
            _ => bail!(
                "'{}' holds {} definitions, pick one with --function",
                input.display(),
                definitions.len()
            ),
        },
    };

    let lowered = SexpLowering.convert(node)?;
    Ok(eval_function(&lowered, args)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_file(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cusp_cli_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}.cusp", name));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_compile_source_one_manifest_per_definition() {
        let manifests = compile_source(
            "(defn f [x] (* x 2))\n; second\n(defn g:int [n:int] (+ n 1))",
            Tag::Omp,
            &BuildConfig::default(),
        )
        .unwrap();

        assert_eq!(manifests.len(), 2);
        assert_eq!(manifests[0].entry_points, vec!["f".to_string()]);
        assert_eq!(manifests[1].wrap_info().unwrap().result.ty, "int");
        assert!(manifests[1].compiler_output().unwrap().get("omp").is_some());
    }

    #[test]
    fn test_duplicate_definitions_are_rejected() {
        let input = scratch_file("twice", "(defn f [x] (* x 2))\n(defn f [x] (* x 3))");
        let out = input.parent().unwrap().join("out");
        let writer = ArtifactWriter::in_dir(&out);

        let err = compile_file(&input, Tag::Cpp, &BuildConfig::default(), &writer, true).unwrap_err();
        assert_eq!(err.to_string(), "duplicate definition 'f'");
        assert!(!out.join("f").exists());

        assert!(wrap_info_for_file(&input, Tag::Cpp, &BuildConfig::default()).is_err());

        let _ = fs::remove_dir_all(input.parent().unwrap());
    }

    #[test]
    fn test_compile_file_next_to_source() {
        let input = scratch_file("axpy", "(defn axpy [a x y] (+ (* a x) y))");
        let writer = ArtifactWriter::new();

        let names = compile_file(&input, Tag::Cpp, &BuildConfig::default(), &writer, false).unwrap();
        assert_eq!(names, vec!["axpy".to_string()]);

        let root = input.with_extension("");
        assert!(root.join("axpy.cusp").is_file());
        for extension in ["py", "cpp", "cu"] {
            assert!(root.join(format!("axpy/axpy.{}", extension)).is_file());
        }

        let _ = fs::remove_dir_all(input.parent().unwrap());
    }

    #[test]
    fn test_compile_file_here() {
        let input = scratch_file("here", "(defn here [x] x)");
        let out = input.parent().unwrap().join("out");
        let writer = ArtifactWriter::in_dir(&out);

        compile_file(&input, Tag::Cuda, &BuildConfig::default(), &writer, true).unwrap();
        assert!(out.join("here/here.cu").is_file());
        assert!(!out.join("here.cusp").exists());

        let _ = fs::remove_dir_all(input.parent().unwrap());
    }

    #[test]
    fn test_wrap_info_json() {
        let input = scratch_file("wrap", "(defn scale:float [n:int x:float] (* n x))");
        let json = wrap_info_for_file(&input, Tag::Cpp, &BuildConfig::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["scale"]["result"]["type"], "float");
        assert_eq!(value["scale"]["arguments"][1]["name"], "x");
        assert_eq!(value["scale"]["identity_hash"].as_str().unwrap().len(), 64);

        let _ = fs::remove_dir_all(input.parent().unwrap());
    }

    #[test]
    fn test_eval_file() {
        let input = scratch_file("eval", "(defn f [x] (* x 2))\n(defn g:int [n:int] (/ n 2))");

        assert_eq!(eval_file(&input, Some("f"), &[1.5]).unwrap(), Value::Real(3.0));
        assert_eq!(eval_file(&input, Some("g"), &[7.0]).unwrap(), Value::Integer(3));
        assert!(eval_file(&input, None, &[1.0]).is_err());
        assert!(eval_file(&input, Some("h"), &[1.0]).is_err());

        let _ = fs::remove_dir_all(input.parent().unwrap());
    }

    #[test]
    fn test_compile_errors_carry_context() {
        let input = scratch_file("broken", "(defn broken [x] (pow x 2))");
        let err = compile_file(&input, Tag::Cpp, &BuildConfig::default(), &ArtifactWriter::new(), true).unwrap_err();
        assert_eq!(err.to_string(), "Failed to compile 'broken'");
        assert_eq!(err.root_cause().to_string(), "unsupported operation 'pow'");

        let _ = fs::remove_dir_all(input.parent().unwrap());
    }
}
