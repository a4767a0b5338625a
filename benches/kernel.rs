//! Kernel benchmarks: construction, counting and reordering.
//!
//! Run with:
//! ```bash
//! cargo bench --bench kernel
//! ```

use bdd_kernel::bdd::Bdd;
use bdd_kernel::config::KernelConfig;
use bdd_kernel::reference::Ref;
use bdd_kernel::reorder::ReorderMethod;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

// ============================================================================
// Helpers
// ============================================================================

/// N-Queens over `n * n` variables, `var(i, j) = i * n + j`.
fn solve_queens(bdd: &mut Bdd, n: usize) -> Ref {
    let var = |i: usize, j: usize| (i * n + j) as u32;
    let mut result = bdd.add_ref(Ref::ONE).unwrap();

    let conjoin = |bdd: &mut Bdd, result: &mut Ref, f: Ref| {
        let next = bdd.apply_and(*result, f).unwrap();
        bdd.del_ref(*result).unwrap();
        bdd.del_ref(f).unwrap();
        *result = next;
    };

    for i in 0..n {
        let row: Vec<Ref> = (0..n).map(|j| bdd.ith_var(var(i, j)).unwrap()).collect();
        let at_least_one = bdd.apply_or_many(row).unwrap();
        conjoin(bdd, &mut result, at_least_one);
    }

    for i1 in 0..n {
        for j1 in 0..n {
            for i2 in i1..n {
                for j2 in 0..n {
                    if (i2, j2) <= (i1, j1) {
                        continue;
                    }
                    let attacks = i1 == i2 || j1 == j2 || i1 + j2 == i2 + j1 || i1 + j1 == i2 + j2;
                    if attacks {
                        let a = bdd.nith_var(var(i1, j1)).unwrap();
                        let b = bdd.nith_var(var(i2, j2)).unwrap();
                        let not_both = bdd.apply_or(a, b).unwrap();
                        conjoin(bdd, &mut result, not_both);
                    }
                }
            }
        }
    }

    result
}

/// `(x0 & y0) | ... | (xn & yn)` with all `x` above all `y`.
fn separated_pairs(bdd: &mut Bdd, n: u32) -> Ref {
    let terms: Vec<Ref> = (0..n)
        .map(|i| {
            let x = bdd.ith_var(i).unwrap();
            let y = bdd.ith_var(n + i).unwrap();
            bdd.apply_and(x, y).unwrap()
        })
        .collect();
    bdd.apply_or_many(terms).unwrap()
}

/// Random 3-CNF with `clauses` clauses over `vars` variables.
fn random_cnf(bdd: &mut Bdd, rng: &mut ChaCha8Rng, vars: u32, clauses: usize) -> Ref {
    let mut result = bdd.add_ref(Ref::ONE).unwrap();
    for _ in 0..clauses {
        let literals: Vec<Ref> = (0..3)
            .map(|_| {
                let v = rng.gen_range(0..vars);
                if rng.gen_bool(0.5) {
                    bdd.ith_var(v).unwrap()
                } else {
                    bdd.nith_var(v).unwrap()
                }
            })
            .collect();
        let clause = bdd.apply_or_many(literals).unwrap();
        let next = bdd.apply_and(result, clause).unwrap();
        bdd.del_ref(result).unwrap();
        bdd.del_ref(clause).unwrap();
        result = next;
    }
    result
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_queens(c: &mut Criterion) {
    let mut group = c.benchmark_group("queens");
    group.sample_size(10);
    for n in [5, 6, 7] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let config = KernelConfig::default()
                    .with_node_size(1 << 16)
                    .with_var_num((n * n) as u32);
                let mut bdd = Bdd::new(config).unwrap();
                let res = solve_queens(&mut bdd, n);
                black_box(bdd.sat_count(res).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_sat_count(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut bdd = Bdd::with_vars(40).unwrap();
    let f = random_cnf(&mut bdd, &mut rng, 40, 60);

    c.bench_function("sat_count/cnf40", |b| {
        b.iter(|| {
            // The count cache would answer everything after the first iteration.
            bdd.gc();
            black_box(bdd.sat_count(f).unwrap())
        })
    });
}

fn bench_reorder(c: &mut Criterion) {
    let mut group = c.benchmark_group("reorder");
    group.sample_size(10);
    for method in [
        ReorderMethod::Win2Ite,
        ReorderMethod::Win3,
        ReorderMethod::Sift,
        ReorderMethod::SiftIte,
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(method), &method, |b, &method| {
            b.iter(|| {
                let mut bdd = Bdd::with_vars(24).unwrap();
                separated_pairs(&mut bdd, 12);
                black_box(bdd.reorder(method).unwrap())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_queens, bench_sat_count, bench_reorder);
criterion_main!(benches);
