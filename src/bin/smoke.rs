//! Smoke test for the matching layer
//!
//! Builds a layer from a configuration file (or defaults), runs it on random
//! encodings and checks the output shape.

use anyhow::{ensure, Result};
use clap::Parser;
use ndarray::Array3;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::StandardNormal;
use tracing::info;

use bimpm_matching::{setup_logging, Config, MatchingLayer};

#[derive(Parser)]
#[command(name = "bimpm-smoke")]
#[command(about = "Run the matching layer on random inputs and check output shapes")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Length of sequence P
    #[arg(long, default_value = "5")]
    p_len: usize,

    /// Length of sequence Q
    #[arg(long, default_value = "5")]
    q_len: usize,

    /// Batch size
    #[arg(short, long, default_value = "128")]
    batch: usize,

    /// Override the number of perspectives
    #[arg(short, long)]
    perspectives: Option<usize>,

    /// Random seed for weights and inputs
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Also match Q against P
    #[arg(long)]
    bilateral: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load_if_exists(&args.config)?;
    setup_logging(&config.logging.level)?;

    if let Some(perspectives) = args.perspectives {
        config.layer.perspectives = perspectives;
    }

    let layer = MatchingLayer::with_seed(config.layer.clone(), args.seed)?;
    let hidden_dim = config.layer.hidden_dim;

    info!(
        hidden_dim,
        perspectives = config.layer.perspectives,
        strategies = ?config.layer.enabled_strategies(),
        parameters = layer.num_parameters(),
        "matching layer ready"
    );

    let mut rng = StdRng::seed_from_u64(args.seed.wrapping_add(1));
    let p: Array3<f64> = Array3::random_using((args.p_len, args.batch, hidden_dim), StandardNormal, &mut rng);
    let q: Array3<f64> = Array3::random_using((args.q_len, args.batch, hidden_dim), StandardNormal, &mut rng);

    let out = layer.forward(&p, &q)?;
    let expected = (args.p_len, args.batch, layer.output_dim());
    ensure!(
        out.dim() == expected,
        "P against Q: expected shape {:?}, got {:?}",
        expected,
        out.dim()
    );
    ensure!(out.iter().all(|x| x.is_finite()), "P against Q produced non-finite values");
    info!(shape = ?out.dim(), "P against Q ok");

    if args.bilateral {
        let (_, reverse) = layer.forward_bilateral(&p, &q)?;
        let expected = (args.q_len, args.batch, layer.output_dim());
        ensure!(
            reverse.dim() == expected,
            "Q against P: expected shape {:?}, got {:?}",
            expected,
            reverse.dim()
        );
        info!(shape = ?reverse.dim(), "Q against P ok");
    }

    println!("Smoke test passed");
    Ok(())
}
