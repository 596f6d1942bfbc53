use linfa_bss::metrics::{amari_distance, match_sources};
use linfa_bss::prelude::*;
use ndarray::{stack, Array, Array1, Array2, Axis};
use ndarray_rand::{rand::SeedableRng, rand_distr::Uniform, RandomExt};
use rand_xoshiro::Xoshiro256Plus;
use std::error::Error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> std::result::Result<(), Box<dyn Error>> {
    // RUST_LOG=linfa_bss=debug shows the whitening and per-direction events
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    // Create four sources and mix them with a random matrix
    // Shape of the observations will be (4 x 1000)
    let (sources_original, mixing) = create_data();
    let observations = mixing.dot(&sources_original);

    // Fitting the model
    // We set the G function used in the approximation of neg-entropy as logcosh
    // with its alpha value as 1, `ncomponents` is not set so every channel yields one
    let params = Ica::params().gfunc(GFunc::Logcosh(1.0)).random_state(42);
    let separation = ica(&observations, &params)?;

    if let Some(warning) = separation.convergence().warning() {
        println!("{}", warning);
    }

    let matching = match_sources(separation.sources(), &sources_original);
    for (name, (estimated, corr)) in ["sine", "square", "sawtooth", "noise"].iter().zip(
        matching
            .assignment()
            .iter()
            .zip(matching.correlations().iter()),
    ) {
        println!(
            "{:>8} -> component {} (|corr| = {:.4}, {:?})",
            name,
            estimated,
            corr,
            separation.model().source_kinds()[*estimated]
        );
    }
    println!(
        "Amari distance: {:.4}",
        amari_distance(separation.unmixing(), &mixing)
    );

    Ok(())
}

// Helper function to create four sources (sine, square, sawtooth and uniform noise) and the
// matrix mixing them
fn create_data() -> (Array2<f64>, Array2<f64>) {
    let nsamples = 1000;
    let t: Array1<f64> = Array::linspace(-10., 10., nsamples);

    let sine = t.mapv(f64::sin);
    let square = t.mapv(|x| x.cos().signum());
    let sawtooth = t.mapv(|x| x - x.floor());

    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let noise = Array::random_using(nsamples, Uniform::new(0.0, 1.0), &mut rng);

    let sources = stack![Axis(0), sine, square, sawtooth, noise];
    let mixing = Array::random_using((4, 4), Uniform::new(0.0, 1.0), &mut rng);

    (sources, mixing)
}
