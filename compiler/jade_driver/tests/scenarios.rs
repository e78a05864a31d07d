//! End-to-end scenarios over the whole dispatch core.

use jade_diagnostic::ErrorCode;
use jade_dispatch::binary::encode_table;
use jade_dispatch::optimize::{FrequencyProfile, OptimizerConfig, PassKind, TableOptimizer};
use jade_dispatch::{hash_arg_tuple, signature_hash};
use jade_driver::Compilation;
use jade_incr::{CacheConfig, DependencyTracker, IncrementalBuilder, TableCache};
use jade_ir::{EffectSet, ModuleId, Span};
use jade_resolve::{
    CallSite, ConflictPolicy, ImplId, ImportMode, ResolutionResult, Version, Visibility,
};
use jade_types::{TypeId, TypeKind};
use pretty_assertions::assert_eq;

fn version() -> Version {
    Version::new(1, 0, 0)
}

fn call(
    compilation: &Compilation,
    name: &str,
    args: &[TypeId],
    scope: ModuleId,
) -> CallSite {
    CallSite::new(
        compilation.intern(name),
        args.iter().copied(),
        compilation.intern("src/main.jade"),
        Span::new(50, 60),
        scope,
    )
}

/// Scenario 1: disjoint primitives, no conversion policy.
#[test]
fn scenario_disjoint_primitives() {
    let mut compilation = Compilation::new();
    let int = compilation
        .register_type("i32", TypeKind::Primitive, &[])
        .unwrap_or_else(|| panic!("i32"));
    let float = compilation
        .register_type("f64", TypeKind::Primitive, &[])
        .unwrap_or_else(|| panic!("f64"));
    let module = compilation
        .register_module("main", "src/main.jade", version(), Vec::new())
        .unwrap_or_else(|| panic!("module"));

    let add_int = compilation
        .register_implementation("add", module, vec![int, int], int, EffectSet::PURE, Span::DUMMY)
        .unwrap_or_else(|| panic!("add_int"));
    compilation
        .register_implementation("add", module, vec![float, float], float, EffectSet::PURE, Span::DUMMY)
        .unwrap_or_else(|| panic!("add_float"));
    compilation.finish_registration();

    let result = compilation.resolve(&call(&compilation, "add", &[int, int], module));
    assert_eq!(result, ResolutionResult::Success(add_int));

    let result = compilation.resolve(&call(&compilation, "add", &[int, float], module));
    assert!(matches!(result, ResolutionResult::NoMatch { .. }));
}

/// Scenarios 2 and 3: subtype dispatch over Animal/Dog/Cat.
#[test]
fn scenario_subtype_dispatch() {
    let mut compilation = Compilation::new();
    let animal = compilation
        .register_type("Animal", TypeKind::SumOpen, &[])
        .unwrap_or_else(|| panic!("Animal"));
    let dog = compilation
        .register_type("Dog", TypeKind::Primitive, &[animal])
        .unwrap_or_else(|| panic!("Dog"));
    let cat = compilation
        .register_type("Cat", TypeKind::Primitive, &[animal])
        .unwrap_or_else(|| panic!("Cat"));
    let module = compilation
        .register_module("main", "src/main.jade", version(), Vec::new())
        .unwrap_or_else(|| panic!("module"));

    let speak_animal = compilation
        .register_implementation("speak", module, vec![animal], animal, EffectSet::PURE, Span::DUMMY)
        .unwrap_or_else(|| panic!("speak_animal"));
    let speak_dog = compilation
        .register_implementation("speak", module, vec![dog], dog, EffectSet::PURE, Span::DUMMY)
        .unwrap_or_else(|| panic!("speak_dog"));
    compilation.finish_registration();

    // Scenario 2: the more specific overload wins for Dog; Cat takes the
    // general one.
    let result = compilation.resolve(&call(&compilation, "speak", &[dog], module));
    assert_eq!(result, ResolutionResult::Success(speak_dog));
    let result = compilation.resolve(&call(&compilation, "speak", &[cat], module));
    assert_eq!(result, ResolutionResult::Success(speak_animal));

    // Scenario 3: subtype-only overloads reject the supertype.
    let mut scenario3 = Compilation::new();
    let animal = scenario3
        .register_type("Animal", TypeKind::SumOpen, &[])
        .unwrap_or_else(|| panic!("Animal"));
    let dog = scenario3
        .register_type("Dog", TypeKind::Primitive, &[animal])
        .unwrap_or_else(|| panic!("Dog"));
    let cat = scenario3
        .register_type("Cat", TypeKind::Primitive, &[animal])
        .unwrap_or_else(|| panic!("Cat"));
    let module = scenario3
        .register_module("main", "src/main.jade", version(), Vec::new())
        .unwrap_or_else(|| panic!("module"));
    scenario3
        .register_implementation("m", module, vec![dog], dog, EffectSet::PURE, Span::DUMMY)
        .unwrap_or_else(|| panic!("m_dog"));
    scenario3
        .register_implementation("m", module, vec![cat], cat, EffectSet::PURE, Span::DUMMY)
        .unwrap_or_else(|| panic!("m_cat"));
    scenario3.finish_registration();

    let result = scenario3.resolve(&call(&scenario3, "m", &[animal], module));
    let ResolutionResult::NoMatch { rejected, .. } = result else {
        panic!("expected NoMatch");
    };
    assert_eq!(rejected.len(), 2);
}

/// Scenario 4: cross-module conflict resolves ambiguous with a
/// qualification fix.
#[test]
fn scenario_cross_module_ambiguity() {
    let mut compilation = Compilation::new();
    let int = compilation
        .register_type("i32", TypeKind::Primitive, &[])
        .unwrap_or_else(|| panic!("i32"));
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

    let result = compilation.resolve(&call(&compilation, "f", &[int], main));
    let ResolutionResult::Ambiguous { candidates, .. } = &result else {
        panic!("expected Ambiguous, got {result:?}");
    };
    assert_eq!(candidates.len(), 2);

    let diagnostics = compilation.take_diagnostics();
    let ambiguity = diagnostics
        .iter()
        .find(|d| d.code == ErrorCode::S1101)
        .unwrap_or_else(|| panic!("ambiguity diagnostic expected"));

    assert_eq!(ambiguity.fixes[0].id, "qualify-call");
    let descriptions: Vec<&str> = ambiguity
        .fixes
        .iter()
        .filter(|f| f.id == "qualify-call")
        .map(|f| f.description.as_str())
        .collect();
    assert_eq!(descriptions.len(), 2);
    assert!(descriptions.iter().any(|d| d.contains("a::f(i32)")));
    assert!(descriptions.iter().any(|d| d.contains("b::f(i32)")));
}

/// Table lookups agree with direct resolution on every resolvable tuple.
#[test]
fn tables_agree_with_resolver() {
    let mut compilation = Compilation::new();
    let animal = compilation
        .register_type("Animal", TypeKind::SumOpen, &[])
        .unwrap_or_else(|| panic!("Animal"));
    let dog = compilation
        .register_type("Dog", TypeKind::Primitive, &[animal])
        .unwrap_or_else(|| panic!("Dog"));
    let cat = compilation
        .register_type("Cat", TypeKind::Primitive, &[animal])
        .unwrap_or_else(|| panic!("Cat"));
    let module = compilation
        .register_module("main", "src/main.jade", version(), Vec::new())
        .unwrap_or_else(|| panic!("module"));

    compilation
        .register_implementation("speak", module, vec![animal], animal, EffectSet::PURE, Span::DUMMY)
        .unwrap_or_else(|| panic!("impl"));
    compilation
        .register_implementation("speak", module, vec![dog], dog, EffectSet::PURE, Span::DUMMY)
        .unwrap_or_else(|| panic!("impl"));
    compilation.finish_registration();

    assert_eq!(compilation.generate_tables(), 1);

    let args = [animal, dog, cat];
    let direct: Vec<Option<ImplId>> = args
        .iter()
        .map(|&arg| {
            compilation
                .resolve(&call(&compilation, "speak", &[arg], module))
                .implementation()
        })
        .collect();

    let mut engine = compilation.new_engine();
    let sig = signature_hash("speak");
    for (&arg, &expected) in args.iter().zip(&direct) {
        assert_eq!(engine.dispatch(sig, &[arg]), expected, "arg {arg:?}");
    }
}

/// Re-running generation with unchanged inputs yields byte-identical
/// tables.
#[test]
fn generation_is_idempotent() {
    let build = || {
        let mut compilation = Compilation::new();
        let animal = compilation
            .register_type("Animal", TypeKind::SumOpen, &[])
            .unwrap_or_else(|| panic!("Animal"));
        let dog = compilation
            .register_type("Dog", TypeKind::Primitive, &[animal])
            .unwrap_or_else(|| panic!("Dog"));
        let module = compilation
            .register_module("main", "src/main.jade", version(), Vec::new())
            .unwrap_or_else(|| panic!("module"));
        compilation
            .register_implementation("speak", module, vec![animal], animal, EffectSet::PURE, Span::DUMMY)
            .unwrap_or_else(|| panic!("impl"));
        compilation
            .register_implementation("speak", module, vec![dog], dog, EffectSet::PURE, Span::DUMMY)
            .unwrap_or_else(|| panic!("impl"));
        compilation.finish_registration();
        compilation.generate_tables();
        let table = compilation
            .dispatch_table("speak")
            .unwrap_or_else(|| panic!("table"));
        encode_table(table)
    };

    assert_eq!(build(), build());
}

/// Scenario 5, logic level: a hot prefix over concentrated traffic covers
/// most lookups and projects a ≥ 40% speedup.
#[test]
fn scenario_hot_prefix_optimization() {
    // A 1000-entry table where 50 entries take 95% of a large sample.
    let mut table = jade_dispatch::DispatchTable::empty(1);
    table.exact_matches = (0..1000u64)
        .map(|i| jade_dispatch::ExactEntry {
            arg_hash: i * 7919,
            implementation: ImplId::from_raw(0),
        })
        .collect();
    table.refresh_metadata();

    let mut freq = FrequencyProfile::new();
    let total_calls: u64 = 1_000_000;
    let hot_share = total_calls * 95 / 100;
    for i in 0..50u64 {
        freq.record(i * 7919, hot_share / 50);
    }
    for i in 50..1000u64 {
        freq.record(i * 7919, (total_calls - hot_share) / 950);
    }

    let optimizer = TableOptimizer::new(OptimizerConfig {
        hot_prefix_len: 64,
        ..OptimizerConfig::default()
    });
    let outcomes = optimizer.optimize(&mut table, &freq);

    let reorder = outcomes
        .iter()
        .find(|o| o.pass == PassKind::FrequencyReordering)
        .unwrap_or_else(|| panic!("reorder outcome"));
    assert!(reorder.applied);
    assert!(
        reorder.estimated_speedup >= 0.4,
        "estimated speedup {}",
        reorder.estimated_speedup
    );

    // Hit rate of the prefix over the sampled traffic.
    let covered: u64 = table
        .hot_prefix
        .iter()
        .map(|entry| freq.get(entry.arg_hash))
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let hit_rate = covered as f64 / freq.total() as f64;
    assert!(hit_rate > 0.85, "hit rate {hit_rate}");

    // The sorted layer still answers everything correctly.
    assert!(table.is_well_formed());
    assert_eq!(
        table.lookup_exact(999 * 7919),
        Some(ImplId::from_raw(0))
    );
}

/// Scenario 6: modify one file; only its signature regenerates and the
/// final bytes equal a full rebuild.
#[test]
fn scenario_incremental_rebuild() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
    let file_f = dir.path().join("f.jade");
    let file_g = dir.path().join("g.jade");
    std::fs::write(&file_f, "overload set f v1").unwrap_or_else(|e| panic!("{e}"));
    std::fs::write(&file_g, "overload set g v1").unwrap_or_else(|e| panic!("{e}"));
    let cache_dir = dir.path().join("cache");

    let generate = |name: &str| {
        let mut compilation = Compilation::new();
        let int = compilation
            .register_type("i32", TypeKind::Primitive, &[])
            .unwrap_or_else(|| panic!("i32"));
        let module = compilation
            .register_module("main", "src/main.jade", version(), Vec::new())
            .unwrap_or_else(|| panic!("module"));
        compilation
            .register_implementation(name, module, vec![int], int, EffectSet::PURE, Span::DUMMY)
            .unwrap_or_else(|| panic!("impl"));
        compilation
            .register_implementation(name, module, vec![int, int], int, EffectSet::PURE, Span::DUMMY)
            .unwrap_or_else(|| panic!("impl"));
        compilation.finish_registration();
        compilation.generate_tables();
        compilation
            .dispatch_table(name)
            .map(|table| (**table).clone())
            .unwrap_or_else(|| panic!("table for {name}"))
    };

    let make_builder = || {
        let mut tracker = DependencyTracker::new();
        tracker.record(&file_f, "f");
        tracker.record(&file_g, "g");
        let cache = TableCache::new(CacheConfig::new(&cache_dir)).unwrap_or_else(|e| panic!("{e}"));
        IncrementalBuilder::new(cache, tracker)
    };

    // Full build.
    let mut builder = make_builder();
    let (table_f, _) = builder
        .get_or_generate("f", || generate("f"))
        .unwrap_or_else(|e| panic!("{e}"));
    let (table_g, _) = builder
        .get_or_generate("g", || generate("g"))
        .unwrap_or_else(|e| panic!("{e}"));

    // Modify only f's source.
    std::fs::write(&file_f, "overload set f v2").unwrap_or_else(|e| panic!("{e}"));

    let mut builder = make_builder();
    let plan = builder.tracker().plan([file_f.as_path()]);
    assert_eq!(plan.regenerate.iter().collect::<Vec<_>>(), vec!["f"]);
    assert_eq!(plan.from_cache.iter().collect::<Vec<_>>(), vec!["g"]);

    let (table_f2, outcome_f) = builder
        .get_or_generate("f", || generate("f"))
        .unwrap_or_else(|e| panic!("{e}"));
    let (table_g2, outcome_g) = builder
        .get_or_generate("g", || panic!("g must load from cache"))
        .unwrap_or_else(|e| panic!("{e}"));

    assert_eq!(outcome_f, jade_incr::BuildOutcome::Regenerated);
    assert_eq!(outcome_g, jade_incr::BuildOutcome::FromCache);

    // Byte-identical to a full rebuild.
    assert_eq!(encode_table(&table_f2), encode_table(&table_f));
    assert_eq!(encode_table(&table_g2), encode_table(&table_g));
}

/// Boundary: an arity-0 family's table has at most one exact entry.
#[test]
fn nullary_family_has_single_entry() {
    let mut compilation = Compilation::new();
    let int = compilation
        .register_type("i32", TypeKind::Primitive, &[])
        .unwrap_or_else(|| panic!("i32"));
    let module = compilation
        .register_module("main", "src/main.jade", version(), Vec::new())
        .unwrap_or_else(|| panic!("module"));
    let nullary = compilation
        .register_implementation("init", module, vec![], int, EffectSet::PURE, Span::DUMMY)
        .unwrap_or_else(|| panic!("impl"));
    compilation.finish_registration();

    // Observed calls push the family over the generation threshold.
    for _ in 0..4 {
        let result = compilation.resolve(&call(&compilation, "init", &[], module));
        assert_eq!(result, ResolutionResult::Success(nullary));
    }
    assert_eq!(compilation.generate_tables(), 1);

    let table = compilation
        .dispatch_table("init")
        .unwrap_or_else(|| panic!("table"));
    assert_eq!(table.exact_matches.len(), 1);
    assert_eq!(table.lookup_exact(hash_arg_tuple(&[])), Some(nullary));
}
