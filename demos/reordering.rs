//! Variable reordering example.
//!
//! Builds `(x1 ∧ y1) ∨ ... ∨ (xn ∧ yn)` with all `x` variables above all `y`
//! variables, an order in which the BDD is exponentially large, and lets each
//! reordering method try to recover the interleaved order.
//!
//! Run with:
//! ```bash
//! cargo run --example reordering -- --pairs 8
//! ```

use clap::Parser;

use bdd_kernel::bdd::Bdd;
use bdd_kernel::config::KernelConfig;
use bdd_kernel::reference::Ref;
use bdd_kernel::reorder::ReorderMethod;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Number of `(x, y)` pairs.
    #[clap(long, value_name = "INT", default_value = "8")]
    pairs: u32,

    /// Run only this method instead of all of them.
    #[clap(long, value_name = "METHOD")]
    method: Option<ReorderMethod>,

    /// Seed for the random method.
    #[clap(long, value_name = "INT", default_value = "42")]
    seed: u64,

    /// Group each pair into a variable block before reordering.
    #[clap(long)]
    blocks: bool,
}

fn build(bdd: &mut Bdd, pairs: u32) -> color_eyre::Result<Ref> {
    let mut terms = vec![];
    for i in 0..pairs {
        let x = bdd.ith_var(i)?;
        let y = bdd.ith_var(pairs + i)?;
        terms.push(bdd.apply_and(x, y)?);
    }
    let f = bdd.apply_or_many(terms.iter().copied())?;
    for t in terms {
        bdd.del_ref(t)?;
    }
    Ok(f)
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let args = Cli::parse();
    println!("args = {:?}", args);

    let methods: Vec<ReorderMethod> = match args.method {
        Some(method) => vec![method],
        None => ReorderMethod::ALL.to_vec(),
    };

    for method in methods {
        let config = KernelConfig::default()
            .with_var_num(2 * args.pairs)
            .with_random_seed(args.seed);
        let mut bdd = Bdd::new(config)?;
        let f = build(&mut bdd, args.pairs)?;
        let before = bdd.node_count(f)?;

        if args.blocks && args.pairs > 0 {
            // Keep the x variables together, and the y variables together.
            bdd.add_variable_block(0, args.pairs - 1, false)?;
            bdd.add_variable_block(args.pairs, 2 * args.pairs - 1, false)?;
        }

        let time = std::time::Instant::now();
        let stats = bdd.reorder(method)?;
        let time = time.elapsed();

        println!(
            "{:>8}: {:>6} -> {:>6} nodes in f, {:>6} -> {:>6} live nodes, {:>6} swaps, {:.3} s",
            method.to_string(),
            before,
            bdd.node_count(f)?,
            stats.initial_size,
            stats.final_size,
            stats.swaps,
            time.as_secs_f64()
        );
        println!("          order: {:?}", bdd.order());
    }

    Ok(())
}
