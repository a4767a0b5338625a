use clap::Parser;

use bdd_kernel::bdd::Bdd;
use bdd_kernel::config::KernelConfig;
use bdd_kernel::reference::Ref;
use bdd_kernel::reorder::ReorderMethod;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Number of queens.
    #[arg(value_name = "INT", default_value = "8")]
    n: usize,

    /// Initial number of node slots.
    #[clap(long, value_name = "INT", default_value = "100000")]
    node_size: usize,

    /// Automatic reordering method (none, win2, win2ite, win3, win3ite, sift, siftite, random).
    #[clap(long, value_name = "METHOD", default_value = "none")]
    reorder: ReorderMethod,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let n = args.n;
    let config = KernelConfig::default()
        .with_node_size(args.node_size)
        .with_var_num((n * n) as u32)
        .with_auto_reorder(args.reorder, usize::MAX);
    let mut bdd = Bdd::new(config)?;
    println!("bdd = {:?}", bdd);

    // Encode N-queens problem:
    // - N queens on an NxN board
    // - At least one queen per row
    // - No two queens attack each other
    println!("Encoding n-queens problem with n = {}", n);
    let var = |i: usize, j: usize| (i * n + j) as u32;

    let mut constraints: Vec<Ref> = vec![];

    // At least one queen per row
    for i in 0..n {
        let row: Vec<Ref> = (0..n).map(|j| bdd.ith_var(var(i, j))).collect::<Result<_, _>>()?;
        constraints.push(bdd.apply_or_many(row)?);
    }

    // A queen on (i, j) excludes every cell it attacks
    for i in 0..n {
        for j in 0..n {
            let mut attacked = vec![];
            for k in 0..n {
                for l in 0..n {
                    let same = i == k && j == l;
                    let row_or_col = i == k || j == l;
                    let diag = i + l == k + j || i + j == k + l;
                    if !same && (row_or_col || diag) {
                        attacked.push(bdd.nith_var(var(k, l))?);
                    }
                }
            }
            let free = bdd.apply_and_many(attacked)?;
            let queen = bdd.ith_var(var(i, j))?;
            constraints.push(bdd.apply_imply(queen, free)?);
            bdd.del_ref(free)?;
        }
    }

    println!(
        "Total {} constraints of total size {}",
        constraints.len(),
        bdd.node_count_many(&constraints)?
    );

    println!("Merging constraints...");
    let res = bdd.apply_and_many(constraints.iter().copied())?;
    for f in constraints {
        bdd.del_ref(f)?;
    }
    println!("res of size {}", bdd.node_count(res)?);
    println!("solutions: {}", bdd.sat_count(res)?);

    let stats = bdd.statistics();
    println!("stats = {:?}", stats);
    if let Some(last) = bdd.last_reorder_stats() {
        println!("last reordering: {:?}", last);
    }

    let time_total = time_total.elapsed();
    println!("Done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
