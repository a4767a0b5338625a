use num_bigint::BigUint;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use test_log::test;

use bdd_kernel::bdd::Bdd;
use bdd_kernel::config::KernelConfig;
use bdd_kernel::error::BddError;
use bdd_kernel::formula::{Formula, VariableRegistry};
use bdd_kernel::reference::Ref;
use bdd_kernel::reorder::ReorderMethod;

const VARS: u32 = 7;

fn random_formula(rng: &mut ChaCha8Rng, depth: u32) -> Formula {
    if depth == 0 || rng.gen_ratio(1, 5) {
        let var = rng.gen_range(0..VARS);
        return Formula::lit(format!("v{}", var), rng.gen_bool(0.5));
    }
    match rng.gen_range(0..5) {
        0 => Formula::not(random_formula(rng, depth - 1)),
        1 => {
            let n = rng.gen_range(2..4);
            Formula::and((0..n).map(|_| random_formula(rng, depth - 1)).collect())
        }
        2 => {
            let n = rng.gen_range(2..4);
            Formula::or((0..n).map(|_| random_formula(rng, depth - 1)).collect())
        }
        3 => Formula::implies(random_formula(rng, depth - 1), random_formula(rng, depth - 1)),
        _ => Formula::equiv(random_formula(rng, depth - 1), random_formula(rng, depth - 1)),
    }
}

fn registry() -> VariableRegistry {
    let mut registry = VariableRegistry::new();
    for i in 0..VARS {
        registry.register(&format!("v{}", i));
    }
    registry
}

/// Check `r` against `formula` on every assignment.
fn assert_represents(bdd: &Bdd, r: Ref, formula: &Formula, registry: &VariableRegistry) {
    for bits in 0..1u32 << VARS {
        let assignment: Vec<bool> = (0..VARS).map(|i| bits & (1 << i) != 0).collect();
        let expected = formula.evaluate(&|name: &str| assignment[registry.index_of(name).unwrap() as usize]);
        assert_eq!(bdd.eval(r, &assignment).unwrap(), expected, "{} at {:b}", formula, bits);
    }
}

#[test]
fn test_every_method_preserves_functions() {
    for method in ReorderMethod::ALL {
        for seed in 0..4 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut registry = registry();
            let mut bdd = Bdd::new(KernelConfig::default().with_var_num(VARS).with_random_seed(seed)).unwrap();

            let formulas: Vec<Formula> = (0..5).map(|_| random_formula(&mut rng, 5)).collect();
            let mut roots = Vec::new();
            let mut counts = Vec::new();
            for formula in &formulas {
                let r = bdd.build(formula, &mut registry).unwrap();
                counts.push(bdd.sat_count(r).unwrap());
                roots.push(r);
            }

            let stats = bdd.reorder(method).unwrap();
            if method != ReorderMethod::Random {
                assert!(stats.final_size <= stats.initial_size, "{} grew the table", method);
            }

            for ((formula, &r), count) in formulas.iter().zip(&roots).zip(&counts) {
                assert_represents(&bdd, r, formula, &registry);
                assert_eq!(&bdd.sat_count(r).unwrap(), count);
                // Canonicity: building the formula again yields the same node.
                let again = bdd.build(formula, &mut registry).unwrap();
                assert_eq!(again, r, "{} is not canonical after {}", formula, method);
                bdd.del_ref(again).unwrap();
            }
        }
    }
}

#[test]
fn test_unreferenced_functions_are_dropped() {
    let mut bdd = Bdd::with_vars(VARS).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut registry = registry();
    let kept = random_formula(&mut rng, 5);
    let r = bdd.build(&kept, &mut registry).unwrap();
    for _ in 0..10 {
        let garbage = bdd.build(&random_formula(&mut rng, 5), &mut registry).unwrap();
        bdd.del_ref(garbage).unwrap();
    }

    bdd.reorder(ReorderMethod::Sift).unwrap();
    let stats = bdd.statistics();
    // Terminals, the variables and their negations, and the kept function.
    let live = 2 + 2 * VARS as usize + bdd.node_count(r).unwrap();
    assert!(stats.used_nodes <= live);
    assert_represents(&bdd, r, &kept, &registry);
}

#[test]
fn test_sifting_never_grows() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let mut registry = registry();
    let mut bdd = Bdd::with_vars(VARS).unwrap();
    let roots: Vec<Ref> = (0..6)
        .map(|_| bdd.build(&random_formula(&mut rng, 6), &mut registry).unwrap())
        .collect();

    for method in [ReorderMethod::Sift, ReorderMethod::SiftIte, ReorderMethod::Sift] {
        let stats = bdd.reorder(method).unwrap();
        assert!(stats.final_size <= stats.initial_size, "{:?}", stats);
        assert!(bdd.node_count_many(&roots).unwrap() <= stats.final_size);
    }
}

#[test]
fn test_and_of_two_variables() {
    let mut bdd = Bdd::with_vars(2).unwrap();
    let a = bdd.ith_var(0).unwrap();
    let b = bdd.ith_var(1).unwrap();
    let f = bdd.apply_and(a, b).unwrap();

    assert_eq!(bdd.node_count(f).unwrap(), 2);
    assert_eq!(bdd.var_profile(f).unwrap(), vec![1, 1]);
    assert_eq!(bdd.sat_count(f).unwrap(), BigUint::from(1u32));
    assert_eq!(bdd.all_sat(f).unwrap(), vec![vec![1, 1]]);

    let not_f = bdd.apply_not(f).unwrap();
    assert_eq!(bdd.apply_and(not_f, f).unwrap(), Ref::ZERO);

    for method in ReorderMethod::ALL {
        bdd.reorder(method).unwrap();
        assert_eq!(bdd.node_count(f).unwrap(), 2);
        assert_eq!(bdd.sat_count(f).unwrap(), BigUint::from(1u32));
        assert_eq!(bdd.all_sat(f).unwrap(), vec![vec![1, 1]]);
    }
}

#[test]
fn test_win3_over_disjunction_block() {
    // Every starting permutation of a, b, c.
    let permutations = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
    for target in permutations {
        let mut bdd = Bdd::with_vars(3).unwrap();
        for (level, &var) in target.iter().enumerate() {
            let current = bdd.var_at_level(level as u32).unwrap();
            bdd.swap_variables(current, var).unwrap();
        }
        assert_eq!(bdd.order(), target.to_vec());

        let vars: Vec<Ref> = (0..3).map(|v| bdd.ith_var(v).unwrap()).collect();
        let f = bdd.apply_or_many(vars).unwrap();
        bdd.add_variable_block(0, 2, false).unwrap();

        bdd.reorder(ReorderMethod::Win3).unwrap();
        assert_eq!(bdd.sat_count(f).unwrap(), BigUint::from(7u32));
        bdd.reorder(ReorderMethod::Win3Ite).unwrap();
        assert_eq!(bdd.sat_count(f).unwrap(), BigUint::from(7u32));
        assert_eq!(bdd.node_count(f).unwrap(), 3);
    }
}

#[test]
fn test_fixed_blocks_keep_internal_order() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut registry = registry();
    let mut bdd = Bdd::with_vars(VARS).unwrap();
    let formula = random_formula(&mut rng, 6);
    let f = bdd.build(&formula, &mut registry).unwrap();

    bdd.add_variable_block(0, 2, true).unwrap();
    bdd.add_variable_block(3, 6, false).unwrap();
    bdd.add_variable_block(4, 5, true).unwrap();

    for method in ReorderMethod::ALL {
        bdd.reorder(method).unwrap();
        let level = |v: u32| bdd.level_of(v).unwrap();
        assert_eq!((level(1), level(2)), (level(0) + 1, level(0) + 2));
        assert_eq!(level(5), level(4) + 1);
        let outer: Vec<u32> = (3..7).map(level).collect();
        assert_eq!(outer.iter().max().unwrap() - outer.iter().min().unwrap(), 3);
        assert_represents(&bdd, f, &formula, &registry);
    }
}

#[test]
fn test_overlapping_blocks_are_rejected() {
    let mut bdd = Bdd::with_vars(6).unwrap();
    bdd.add_variable_block(0, 3, false).unwrap();
    assert_eq!(
        bdd.add_variable_block(2, 5, false),
        Err(BddError::PartialBlockOverlap { first: 2, last: 5 })
    );
    bdd.add_variable_block(0, 5, false).unwrap();
    bdd.add_variable_block(1, 2, false).unwrap();
    assert_eq!(
        bdd.add_variable_block(2, 3, false),
        Err(BddError::PartialBlockOverlap { first: 2, last: 3 })
    );
    assert!(bdd.add_variable_block(3, 3, false).is_ok());
    assert!(matches!(
        bdd.add_variable_block(5, 6, false),
        Err(BddError::VariableOutOfRange { var: 6, .. })
    ));
}

#[test]
fn test_swap_variables_round_trip() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut registry = registry();
    let mut bdd = Bdd::with_vars(VARS).unwrap();
    let formula = random_formula(&mut rng, 6);
    let f = bdd.build(&formula, &mut registry).unwrap();
    let size = bdd.node_count(f).unwrap();

    bdd.swap_variables(0, VARS - 1).unwrap();
    assert_eq!(bdd.level_of(0).unwrap(), VARS - 1);
    assert_eq!(bdd.level_of(VARS - 1).unwrap(), 0);
    assert_represents(&bdd, f, &formula, &registry);

    bdd.swap_variables(VARS - 1, 0).unwrap();
    assert_eq!(bdd.order(), (0..VARS).collect::<Vec<_>>());
    assert_eq!(bdd.node_count(f).unwrap(), size);
}

#[test]
fn test_auto_reorder_during_construction() {
    let config = KernelConfig::default()
        .with_node_size(64)
        .with_var_num(VARS)
        .with_auto_reorder(ReorderMethod::Win2Ite, 3);
    let mut bdd = Bdd::new(config).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(13);
    let mut registry = registry();

    let formulas: Vec<Formula> = (0..8).map(|_| random_formula(&mut rng, 6)).collect();
    let roots: Vec<Ref> = formulas
        .iter()
        .map(|f| bdd.build(f, &mut registry).unwrap())
        .collect();

    assert!(bdd.statistics().reorderings <= 3);
    for (formula, &r) in formulas.iter().zip(&roots) {
        assert_represents(&bdd, r, formula, &registry);
    }
}
