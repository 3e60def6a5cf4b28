// Changes the process working directory, so it lives alone in its own test binary.

use cusp::{persist, CompiledCallable, VariantBundle, VariantRegistry};
use std::collections::BTreeMap;
use std::fs;

struct Callable(VariantRegistry);

impl CompiledCallable for Callable {
    fn code(&self) -> &VariantRegistry {
        &self.0
    }
}

#[test]
fn test_persist_without_source_uses_working_directory() {
    let dir = std::env::temp_dir().join(format!("cusp_working_dir_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    std::env::set_current_dir(&dir).unwrap();

    let registry: VariantRegistry = [("v1", VariantBundle::new("A", "B", "C"))].into_iter().collect();
    let callables = BTreeMap::from([("name".to_string(), Callable(registry))]);
    persist(&callables, None).unwrap();

    assert_eq!(fs::read_to_string(dir.join("name/name.py")).unwrap(), "A");
    assert_eq!(fs::read_to_string(dir.join("name/name.cpp")).unwrap(), "B");
    assert_eq!(fs::read_to_string(dir.join("name/name.cu")).unwrap(), "C");

    let _ = fs::remove_dir_all(&dir);
}
