use cusp::ast::{parse_file, AstParser, Node};
use cusp::ir::Function;
use cusp::{
    compile, AstConverter, ArtifactWriter, BackendCompiler, BackendError, BuildConfig, CompileError,
    CompiledCallable, LoweringError, Manifest, ReferenceBackend, SexpLowering, Tag, VariantBundle,
    VariantRegistry,
};
use std::fs;
use std::path::PathBuf;

const PY: &str = "def f(x):\n    return x\n";
const CPP: &str = "double f(double x) { return x; }\n";
const CU: &str = "__device__ double f(double x) { return x; }\n";

/// Backend that always returns a single `default` variant with fixed sources.
struct FixedBackend {
    entry_point: String,
    arguments: Vec<(String, String)>,
}

impl BackendCompiler for FixedBackend {
    fn compile(&mut self, function: &Function) -> Result<VariantRegistry, BackendError> {
        self.arguments = function
            .params
            .iter()
            .map(|p| (p.ty.c_name().to_string(), p.name.clone()))
            .collect();
        Ok([("default", VariantBundle::new(PY, CPP, CU))].into_iter().collect())
    }

    fn identity_hash(&self) -> String {
        format!("fixed-{}", self.entry_point)
    }

    fn result_type(&self) -> String {
        "double".to_string()
    }

    fn result_name(&self) -> String {
        self.entry_point.clone()
    }

    fn argument_types_and_names(&self) -> Vec<(String, String)> {
        self.arguments.clone()
    }
}

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cusp_pipeline_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn definition(source: &str) -> Node {
    AstParser::parse_expression(source.as_bytes(), &mut 0).unwrap()
}

#[test]
fn test_end_to_end_default_variant() {
    let root = scratch("default");
    let ast = definition("(defn f [x] x)");
    let mut manifest = Manifest::new(vec!["f".to_string()], Tag::Cpp);

    let compilation = compile(&SexpLowering, &ast, &manifest, |entry, _| FixedBackend {
        entry_point: entry.to_string(),
        arguments: vec![],
    })
    .unwrap();
    assert!(manifest.merge(compilation).unwrap().is_empty());

    let expected: VariantRegistry = [("default", VariantBundle::new(PY, CPP, CU))].into_iter().collect();
    assert_eq!(manifest.callables()["f"].code(), &expected);
    assert_eq!(manifest.wrap_info().unwrap().arguments.len(), 1);

    ArtifactWriter::in_dir(&root).persist(manifest.callables(), None).unwrap();

    assert_eq!(fs::read_to_string(root.join("f/f.py")).unwrap(), PY);
    assert_eq!(fs::read_to_string(root.join("f/f.cpp")).unwrap(), CPP);
    assert_eq!(fs::read_to_string(root.join("f/f.cu")).unwrap(), CU);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_reference_pipeline_with_provenance() {
    let base = scratch("reference");
    fs::create_dir_all(&base).unwrap();
    let source_path = base.join("relu.src");
    let source = "; rectifier\n(defn relu [x] (if (< x 0) 0.0 x))\n";
    fs::write(&source_path, source).unwrap();

    let config = BuildConfig::default();
    let ast = parse_file(source).unwrap().remove(0);
    let mut manifest = Manifest::new(vec!["relu".to_string()], Tag::Cuda);
    let compilation = compile(&SexpLowering, &ast, &manifest, |entry, tag| {
        ReferenceBackend::new(entry, tag, &config)
    })
    .unwrap();
    manifest.merge(compilation).unwrap();

    let wrap_info = manifest.wrap_info().unwrap().clone();
    assert_eq!(wrap_info.result.name, "relu");
    assert_eq!(wrap_info.arguments.len(), 1);

    let writer = ArtifactWriter::new();
    writer.persist(manifest.callables(), Some(&source_path)).unwrap();

    let root = base.join("relu");
    assert_eq!(fs::read_to_string(root.join("relu.src")).unwrap(), source);
    let native = fs::read_to_string(root.join("relu/relu.cpp")).unwrap();
    assert!(native.contains(&format!("namespace _{}", &wrap_info.identity_hash[..16])));
    assert!(fs::read_to_string(root.join("relu/relu.cu")).unwrap().contains("__global__ void relu_kernel"));

    let _ = fs::remove_dir_all(&base);
}

#[test]
fn test_entry_point_count_is_checked_first() {
    struct Unreachable;

    impl AstConverter for Unreachable {
        type Ast = Node;

        fn convert(&self, _ast: &Node) -> Result<Function, LoweringError> {
            panic!("converter must not run");
        }
    }

    let manifest = Manifest::new(vec!["f".to_string(), "g".to_string()], Tag::Cpp);
    let result = compile(&Unreachable, &definition("(defn f [x] x)"), &manifest, |_, _| -> FixedBackend {
        panic!("backend must not be built")
    });

    assert_eq!(result.unwrap_err(), CompileError::EntryPointCount { found: 2 });
    assert!(manifest.compiler_output().is_none());
    assert!(manifest.callables().is_empty());
}
