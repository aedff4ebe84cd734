use std::env;
use std::hint::black_box;
use std::process;
use std::time::{Duration, Instant};

use eytzinger_search::{Alignment, EytzingerArray, SearchStrategy};
use tracing_subscriber::EnvFilter;

const DEFAULT_SEED: u64 = 0x1234_5678_9ABC_DEF0;
const DEFAULT_LEN: usize = 1_000_000;
const DEFAULT_ITERS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bench {
    PartitionPoint,
    Eytzinger(SearchStrategy),
}

#[derive(Clone, Copy, Debug)]
struct Config {
    bench: Bench,
    len: usize,
    iters: usize,
    seed: u64,
    alignment: Alignment,
    verify: bool,
    report: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match parse_args() {
        Ok(result) => result,
        Err(err) => {
            eprintln!("error: {err}");
            print_usage(&program_name());
            process::exit(2);
        }
    };
    tracing::info!(?config, "starting perf harness");

    let values = make_sorted_values(config.len);
    let array = match EytzingerArray::<u32, u32>::build_with(
        values.iter().copied(),
        values.len(),
        config.alignment,
    ) {
        Ok(array) => array,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(2);
        }
    };

    if config.verify {
        if let Err(err) = verify(&values, &array, config.seed) {
            eprintln!("verify failed: {err}");
            process::exit(1);
        }
        tracing::info!("verification passed");
    }

    let queries = make_queries(&values, config.seed);
    let start = Instant::now();
    match config.bench {
        Bench::PartitionPoint => run_partition_point(&values, &queries, config.iters),
        Bench::Eytzinger(strategy) => run_eytzinger(&array, strategy, &queries, config.iters),
    }
    let elapsed = start.elapsed();
    if config.report {
        print_report(&config, queries.len(), elapsed);
    }
}

fn parse_args() -> Result<Config, String> {
    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "perf_harness".to_string());

    let mut bench = None;
    let mut len = DEFAULT_LEN;
    let mut iters = DEFAULT_ITERS;
    let mut seed = DEFAULT_SEED;
    let mut alignment = Alignment::Unaligned;
    let mut verify = false;
    let mut report = true;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--bench" => {
                let name = args.next().ok_or("--bench requires a value")?;
                bench = Some(parse_bench(&name)?);
            }
            "--len" => {
                let value = args.next().ok_or("--len requires a value")?;
                len = parse_usize(&value, "--len")?;
            }
            "--iters" => {
                let value = args.next().ok_or("--iters requires a value")?;
                iters = parse_usize(&value, "--iters")?;
            }
            "--seed" => {
                let value = args.next().ok_or("--seed requires a value")?;
                seed = parse_u64(&value, "--seed")?;
            }
            "--aligned" => alignment = Alignment::CacheLine,
            "--unaligned" => alignment = Alignment::Unaligned,
            "--verify" => verify = true,
            "--report" => report = true,
            "--no-report" => report = false,
            "--list" => {
                list_benches();
                process::exit(0);
            }
            "-h" | "--help" => {
                print_usage(&program);
                process::exit(0);
            }
            _ => return Err(format!("unknown argument: {arg}")),
        }
    }

    let bench = bench.ok_or("missing --bench")?;
    Ok(Config {
        bench,
        len,
        iters,
        seed,
        alignment,
        verify,
        report,
    })
}

fn program_name() -> String {
    env::args()
        .next()
        .unwrap_or_else(|| "perf_harness".to_string())
}

fn print_usage(program: &str) {
    eprintln!(
        "\
Usage:
  {program} --bench <name> [--len N] [--iters N] [--seed N] [--aligned] [--verify]
  {program} --list

Options:
  --bench <name>   Benchmark to run (see --list)
  --len N          Number of stored keys (default: 1000000)
  --iters N        Passes over the query set (default: 5)
  --seed N         RNG seed (default: 0x123456789ABCDEF0)
  --aligned        Cache-line aligned buffer with one element of headroom
  --unaligned      Plain heap buffer (default)
  --verify         Check every strategy against a sorted-slice lower bound first
  --report         Print throughput summary after the run (default)
  --no-report      Disable throughput summary
  --list           Show available benches

Set RUST_LOG=debug to see build details."
    );
}

fn list_benches() {
    println!("partition_point");
    for strategy in SearchStrategy::ALL {
        println!("{}", strategy.name());
    }
}

fn parse_bench(name: &str) -> Result<Bench, String> {
    if name == "partition_point" {
        return Ok(Bench::PartitionPoint);
    }
    name.parse::<SearchStrategy>()
        .map(Bench::Eytzinger)
        .map_err(|err| err.to_string())
}

impl Bench {
    fn name(self) -> &'static str {
        match self {
            Bench::PartitionPoint => "partition_point",
            Bench::Eytzinger(strategy) => strategy.name(),
        }
    }
}

fn parse_usize(value: &str, flag: &str) -> Result<usize, String> {
    value
        .parse::<usize>()
        .map_err(|_| format!("{flag} expects a non-negative integer"))
}

fn parse_u64(value: &str, flag: &str) -> Result<u64, String> {
    value
        .parse::<u64>()
        .map_err(|_| format!("{flag} expects a non-negative integer"))
}

#[inline]
fn next_u64(state: &mut u64) -> u64 {
    let mut x = *state;
    x ^= x >> 12;
    x ^= x << 25;
    x ^= x >> 27;
    *state = x;
    x.wrapping_mul(0x2545_F491_4F6C_DD1D)
}

fn make_sorted_values(len: usize) -> Vec<u32> {
    (0..len).map(|i| (i as u32).wrapping_mul(2)).collect()
}

/// Uniform queries over the stored range plus one past it, half of them misses.
fn make_queries(values: &[u32], seed: u64) -> Vec<u32> {
    let mut state = seed;
    let span = values.last().map_or(1, |&max| u64::from(max) + 2);
    (0..values.len().max(1))
        .map(|_| (next_u64(&mut state) % span) as u32)
        .collect()
}

fn verify(values: &[u32], array: &EytzingerArray<u32, u32>, seed: u64) -> Result<(), String> {
    for q in make_queries(values, seed ^ 0x9E37_79B9_7F4A_7C15) {
        let expected = values.get(values.partition_point(|&v| v < q));
        for strategy in SearchStrategy::ALL {
            let found = array.get(array.search_with(strategy, q));
            if found != expected {
                return Err(format!(
                    "{strategy} on query {q}: got {found:?}, expected {expected:?}"
                ));
            }
        }
    }
    Ok(())
}

fn run_partition_point(values: &[u32], queries: &[u32], iters: usize) {
    let mut acc = 0usize;
    for _ in 0..iters {
        let values = black_box(values);
        for &q in queries {
            acc ^= values.partition_point(|&v| v < black_box(q));
        }
    }
    black_box(acc);
}

fn run_eytzinger(
    array: &EytzingerArray<u32, u32>,
    strategy: SearchStrategy,
    queries: &[u32],
    iters: usize,
) {
    let mut acc = 0u32;
    for _ in 0..iters {
        let array = black_box(array);
        for &q in queries {
            acc ^= array.search_with(strategy, black_box(q));
        }
    }
    black_box(acc);
}

fn print_report(config: &Config, queries: usize, elapsed: Duration) {
    let total = (queries as u128) * (config.iters as u128);
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 { total as f64 / secs } else { 0.0 };
    let ns_per_query = if total > 0 {
        elapsed.as_nanos() as f64 / total as f64
    } else {
        0.0
    };
    println!(
        "{} len={} alignment={:?} iters={} queries={} time={:.3}s rate={:.2}M query/s ({:.2} ns/query)",
        config.bench.name(),
        config.len,
        config.alignment,
        config.iters,
        total,
        secs,
        rate / 1e6,
        ns_per_query,
    );
}
