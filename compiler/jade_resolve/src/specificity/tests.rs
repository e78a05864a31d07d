use jade_ir::{EffectSet, ModuleId, Name, Span};
use jade_types::{TypeId, TypeKind, TypeRegistry};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::{find_most_specific, FunctionDecl, ImplPool, Implementation, Outcome, Rejection};

fn name(raw: u32) -> Name {
    Name::from_raw(raw)
}

fn register(
    pool: &mut ImplPool,
    registry: &TypeRegistry,
    module: u32,
    params: Vec<TypeId>,
    ret: TypeId,
) -> crate::ImplId {
    pool.register(
        registry,
        FunctionDecl {
            simple_name: name(100),
            module: ModuleId::from_raw(module),
            param_types: params,
            return_type: ret,
            effects: EffectSet::PURE,
            span: Span::DUMMY,
        },
    )
    .unwrap_or_else(|e| panic!("{e}"))
}

fn refs<'a>(pool: &'a ImplPool) -> Vec<&'a Implementation> {
    pool.iter().collect()
}

/// Scenario 1: disjoint primitives, exact matches only.
#[test]
fn disjoint_primitives_exact_match() {
    let mut registry = TypeRegistry::new();
    let int = registry
        .register_type(name(1), TypeKind::Primitive, &[])
        .unwrap_or_else(|e| panic!("{e}"));
    let float = registry
        .register_type(name(2), TypeKind::Primitive, &[])
        .unwrap_or_else(|e| panic!("{e}"));

    let mut pool = ImplPool::new();
    let add_int = register(&mut pool, &registry, 0, vec![int, int], int);
    let _add_float = register(&mut pool, &registry, 0, vec![float, float], float);

    assert_eq!(
        find_most_specific(&registry, &refs(&pool), &[int, int]),
        Outcome::Unique(add_int)
    );

    // Mixed tuple: no conversion policy in this core.
    let outcome = find_most_specific(&registry, &refs(&pool), &[int, float]);
    let Outcome::NoMatch(rejected) = outcome else {
        panic!("expected NoMatch, got {outcome:?}");
    };
    assert_eq!(rejected.len(), 2);
    assert!(rejected
        .iter()
        .all(|(_, r)| matches!(r, Rejection::TypeMismatchAt { .. })));
}

/// Scenario 2: subtype chain prefers the more specific overload.
#[test]
fn subtype_prefers_specific() {
    let mut registry = TypeRegistry::new();
    let animal = registry
        .register_type(name(1), TypeKind::SumOpen, &[])
        .unwrap_or_else(|e| panic!("{e}"));
    let dog = registry
        .register_type(name(2), TypeKind::Primitive, &[animal])
        .unwrap_or_else(|e| panic!("{e}"));
    let cat = registry
        .register_type(name(3), TypeKind::Primitive, &[animal])
        .unwrap_or_else(|e| panic!("{e}"));

    let mut pool = ImplPool::new();
    let speak_animal = register(&mut pool, &registry, 0, vec![animal], animal);
    let speak_dog = register(&mut pool, &registry, 0, vec![dog], dog);

    assert_eq!(
        find_most_specific(&registry, &refs(&pool), &[dog]),
        Outcome::Unique(speak_dog)
    );
    assert_eq!(
        find_most_specific(&registry, &refs(&pool), &[cat]),
        Outcome::Unique(speak_animal)
    );
}

/// Scenario 3: calling with the supertype matches neither subtype overload.
#[test]
fn supertype_argument_matches_nothing() {
    let mut registry = TypeRegistry::new();
    let animal = registry
        .register_type(name(1), TypeKind::SumOpen, &[])
        .unwrap_or_else(|e| panic!("{e}"));
    let dog = registry
        .register_type(name(2), TypeKind::Primitive, &[animal])
        .unwrap_or_else(|e| panic!("{e}"));
    let cat = registry
        .register_type(name(3), TypeKind::Primitive, &[animal])
        .unwrap_or_else(|e| panic!("{e}"));

    let mut pool = ImplPool::new();
    register(&mut pool, &registry, 0, vec![dog], dog);
    register(&mut pool, &registry, 0, vec![cat], cat);

    let outcome = find_most_specific(&registry, &refs(&pool), &[animal]);
    assert!(matches!(outcome, Outcome::NoMatch(rejected) if rejected.len() == 2));
}

/// Scenario 4 core: identical parameter tuples in different modules tie.
#[test]
fn identical_signatures_are_ambiguous() {
    let mut registry = TypeRegistry::new();
    let int = registry
        .register_type(name(1), TypeKind::Primitive, &[])
        .unwrap_or_else(|e| panic!("{e}"));

    let mut pool = ImplPool::new();
    let from_a = register(&mut pool, &registry, 0, vec![int], int);
    let from_b = register(&mut pool, &registry, 1, vec![int], int);

    let outcome = find_most_specific(&registry, &refs(&pool), &[int]);
    assert_eq!(outcome, Outcome::Ambiguous(vec![from_a, from_b]));
}

/// Incomparable maxima on different parameters stay ambiguous.
#[test]
fn crossed_specificity_is_ambiguous() {
    let mut registry = TypeRegistry::new();
    let animal = registry
        .register_type(name(1), TypeKind::SumOpen, &[])
        .unwrap_or_else(|e| panic!("{e}"));
    let dog = registry
        .register_type(name(2), TypeKind::Primitive, &[animal])
        .unwrap_or_else(|e| panic!("{e}"));

    let mut pool = ImplPool::new();
    // f(Dog, Animal) vs f(Animal, Dog): neither dominates for (Dog, Dog).
    let left = register(&mut pool, &registry, 0, vec![dog, animal], animal);
    let right = register(&mut pool, &registry, 0, vec![animal, dog], animal);

    let outcome = find_most_specific(&registry, &refs(&pool), &[dog, dog]);
    assert_eq!(outcome, Outcome::Ambiguous(vec![left, right]));
}

#[test]
fn wrong_arity_is_reported() {
    let mut registry = TypeRegistry::new();
    let int = registry
        .register_type(name(1), TypeKind::Primitive, &[])
        .unwrap_or_else(|e| panic!("{e}"));

    let mut pool = ImplPool::new();
    let only = register(&mut pool, &registry, 0, vec![int, int], int);

    let outcome = find_most_specific(&registry, &refs(&pool), &[int]);
    assert_eq!(
        outcome,
        Outcome::NoMatch(vec![(
            only,
            Rejection::WrongArity {
                expected: 2,
                actual: 1
            }
        )])
    );
}

#[test]
fn empty_candidate_set_is_no_match() {
    let registry = TypeRegistry::new();
    assert_eq!(
        find_most_specific(&registry, &[], &[TypeId::ANY]),
        Outcome::NoMatch(Vec::new())
    );
}

#[test]
fn any_parameter_loses_to_nominal() {
    let mut registry = TypeRegistry::new();
    let animal = registry
        .register_type(name(1), TypeKind::SumOpen, &[])
        .unwrap_or_else(|e| panic!("{e}"));
    let dog = registry
        .register_type(name(2), TypeKind::Primitive, &[animal])
        .unwrap_or_else(|e| panic!("{e}"));

    let mut pool = ImplPool::new();
    let catch_all = register(&mut pool, &registry, 0, vec![TypeId::ANY], TypeId::ANY);
    let nominal = register(&mut pool, &registry, 0, vec![animal], animal);

    assert_eq!(
        find_most_specific(&registry, &refs(&pool), &[dog]),
        Outcome::Unique(nominal)
    );
    // Only the catch-all admits an unrelated root type's supertype chain.
    assert_eq!(
        find_most_specific(&registry, &refs(&pool), &[TypeId::ANY]),
        Outcome::Unique(catch_all)
    );
}

/// Nullary calls resolve against the single nullary candidate.
#[test]
fn nullary_call_resolves() {
    let registry = TypeRegistry::new();
    let mut pool = ImplPool::new();
    let nullary = register(&mut pool, &registry, 0, vec![], TypeId::ANY);

    assert_eq!(
        find_most_specific(&registry, &refs(&pool), &[]),
        Outcome::Unique(nullary)
    );
}

/// The outcome must not depend on candidate input order.
proptest! {
    #[test]
    fn outcome_is_order_independent(seed in any::<u64>()) {
        let mut registry = TypeRegistry::new();
        let animal = registry
            .register_type(name(1), TypeKind::SumOpen, &[])
            .unwrap_or_else(|e| panic!("{e}"));
        let dog = registry
            .register_type(name(2), TypeKind::Primitive, &[animal])
            .unwrap_or_else(|e| panic!("{e}"));
        let cat = registry
            .register_type(name(3), TypeKind::Primitive, &[animal])
            .unwrap_or_else(|e| panic!("{e}"));

        let mut pool = ImplPool::new();
        register(&mut pool, &registry, 0, vec![animal, animal], animal);
        register(&mut pool, &registry, 0, vec![dog, animal], animal);
        register(&mut pool, &registry, 0, vec![animal, cat], animal);
        register(&mut pool, &registry, 0, vec![dog, cat], animal);

        let mut impls = refs(&pool);
        let baseline = find_most_specific(&registry, &impls, &[dog, cat]);

        // Deterministic shuffle driven by the seed.
        let len = impls.len();
        let mut state = seed;
        for i in (1..len).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            #[allow(clippy::cast_possible_truncation)]
            let j = (state % (i as u64 + 1)) as usize;
            impls.swap(i, j);
        }

        prop_assert_eq!(find_most_specific(&registry, &impls, &[dog, cat]), baseline);
    }
}
