use jade_ir::{EffectSet, Span};
use jade_resolve::{CallSite, ConflictPolicy, ImportMode, Version, Visibility};
use jade_types::TypeKind;
use pretty_assertions::assert_eq;

use crate::{Compilation, Phase};

fn version() -> Version {
    Version::new(1, 0, 0)
}

#[test]
fn registration_failures_do_not_halt() {
    let mut compilation = Compilation::new();
    let int = compilation
        .register_type("int", TypeKind::Primitive, &[])
        .unwrap_or_else(|| panic!("int"));

    // Duplicate type: fatal for this statement only.
    assert!(compilation.register_type("int", TypeKind::Primitive, &[]).is_none());

    // The rest of the build keeps going.
    let module = compilation
        .register_module("main", "src/main.jade", version(), Vec::new())
        .unwrap_or_else(|| panic!("module"));
    let impl_id = compilation.register_implementation(
        "f",
        module,
        vec![int],
        int,
        EffectSet::PURE,
        Span::new(0, 10),
    );
    assert!(impl_id.is_some());

    let diagnostics = compilation.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn phases_transition_on_finish() {
    let mut compilation = Compilation::new();
    assert_eq!(compilation.phase(), Phase::Registering);
    compilation.finish_registration();
    assert_eq!(compilation.phase(), Phase::Analyzing);
}

#[test]
fn conflicts_become_warnings_not_errors() {
    let mut compilation = Compilation::new();
    let int = compilation
        .register_type("int", TypeKind::Primitive, &[])
        .unwrap_or_else(|| panic!("int"));
    let module_a = compilation
        .register_module("a", "src/a.jade", version(), Vec::new())
        .unwrap_or_else(|| panic!("a"));
    let module_b = compilation
        .register_module("b", "src/b.jade", version(), Vec::new())
        .unwrap_or_else(|| panic!("b"));
    let main = compilation
        .register_module("main", "src/main.jade", version(), vec![module_a, module_b])
        .unwrap_or_else(|| panic!("main"));

    for module in [module_a, module_b] {
        let impl_id = compilation
            .register_implementation("f", module, vec![int], int, EffectSet::PURE, Span::DUMMY)
            .unwrap_or_else(|| panic!("impl"));
        assert!(compilation.export_signature(module, "f", vec![impl_id], Visibility::Public, version()));
        assert!(compilation.import_signature(
            module,
            main,
            "f",
            None,
            ImportMode::Unqualified,
            ConflictPolicy::Merge,
        ));
    }

    compilation.finish_registration();
    let stats = compilation.stats();
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.warnings, 1);
}

#[test]
fn cancellation_skips_table_generation() {
    let mut compilation = Compilation::new();
    let int = compilation
        .register_type("int", TypeKind::Primitive, &[])
        .unwrap_or_else(|| panic!("int"));
    let module = compilation
        .register_module("main", "src/main.jade", version(), Vec::new())
        .unwrap_or_else(|| panic!("module"));
    for name in ["f", "g"] {
        for params in [vec![int], vec![int, int]] {
            compilation
                .register_implementation(name, module, params, int, EffectSet::PURE, Span::DUMMY)
                .unwrap_or_else(|| panic!("impl"));
        }
    }
    compilation.finish_registration();

    compilation.cancel();
    assert_eq!(compilation.generate_tables(), 0);
}

#[test]
fn stats_count_everything() {
    let mut compilation = Compilation::new();
    let int = compilation
        .register_type("int", TypeKind::Primitive, &[])
        .unwrap_or_else(|| panic!("int"));
    let module = compilation
        .register_module("main", "src/main.jade", version(), Vec::new())
        .unwrap_or_else(|| panic!("module"));
    compilation
        .register_implementation("f", module, vec![int], int, EffectSet::PURE, Span::DUMMY)
        .unwrap_or_else(|| panic!("impl"));
    compilation
        .register_implementation("f", module, vec![int, int], int, EffectSet::PURE, Span::DUMMY)
        .unwrap_or_else(|| panic!("impl"));
    compilation.finish_registration();

    let call = CallSite::new(
        compilation.intern("f"),
        [int],
        compilation.intern("src/main.jade"),
        Span::new(0, 4),
        module,
    );
    let result = compilation.resolve(&call);
    assert!(result.is_success());

    compilation.generate_tables();

    let stats = compilation.stats();
    assert_eq!(stats.types, 2); // any + int
    assert_eq!(stats.modules, 1);
    assert_eq!(stats.implementations, 2);
    assert_eq!(stats.call_sites, 1);
    assert_eq!(stats.tables, 1);
    assert_eq!(stats.errors, 0);
}
