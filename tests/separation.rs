use approx::assert_abs_diff_eq;
use linfa_bss::metrics::{amari_distance, match_sources};
use linfa_bss::prelude::*;
use linfa_bss::whitening::{covariance, whiten};
use ndarray::{array, stack, Array, Array1, Array2, Axis};
use ndarray_rand::{rand::SeedableRng, rand_distr::Uniform, RandomExt};
use rand_xoshiro::Xoshiro256Plus;

// sine, square, sawtooth and uniform noise sampled on [-10, 10]
fn four_sources(nsamples: usize, rng: &mut Xoshiro256Plus) -> Array2<f64> {
    let t: Array1<f64> = Array::linspace(-10., 10., nsamples);

    stack![
        Axis(0),
        t.mapv(f64::sin),
        t.mapv(|x| x.cos().signum()),
        t.mapv(|x| x - x.floor()),
        Array::random_using(nsamples, Uniform::new(0.0, 1.0), rng)
    ]
}

fn square_and_noise(nsamples: usize) -> Array2<f64> {
    let t: Array1<f64> = Array::linspace(0., 50., nsamples);
    let mut rng = Xoshiro256Plus::seed_from_u64(17);

    stack![
        Axis(0),
        t.mapv(|x| if x.sin() > 0. { 1. } else { -1. }),
        Array::random_using(nsamples, Uniform::new(-1.0, 1.0), &mut rng)
    ]
}

#[test]
fn four_source_scenario() {
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let sources = four_sources(1000, &mut rng);
    let mixing = Array::random_using((4, 4), Uniform::new(0.0, 1.0), &mut rng);
    let observations = mixing.dot(&sources);

    for scheme in [Orthogonalization::Symmetric, Orthogonalization::Deflation].iter() {
        let params = Ica::params().orthogonalization(*scheme).random_state(42);
        let separation = ica(&observations, &params).unwrap();

        assert_eq!(separation.sources().dim(), (4, 1000));
        assert_eq!(separation.unmixing().dim(), (4, 4));

        let matching = match_sources(separation.sources(), &sources);
        for corr in matching.correlations().iter() {
            assert!(*corr >= 0.9, "{:?}: {}", scheme, matching.correlations());
        }
    }
}

#[test]
fn independent_sources_are_recovered() {
    let nsamples = 2000;
    let t: Array1<f64> = Array::linspace(0., 30., nsamples);
    let mut rng = Xoshiro256Plus::seed_from_u64(3);
    let sources = stack![
        Axis(0),
        t.mapv(|x| (1.3 * x).sin()),
        t.mapv(|x| 2. * (x / 3. - (x / 3.).floor()) - 1.),
        Array::random_using(nsamples, Uniform::new(-1.0, 1.0), &mut rng)
    ];
    let mixing = array![[1., 0.4, 0.2], [0.3, 1., 0.6], [0.5, 0.2, 1.]];
    let observations = mixing.dot(&sources);

    for gfunc in [GFunc::Logcosh(1.), GFunc::Exp, GFunc::Cube].iter() {
        let separation = ica(
            &observations,
            &Ica::params().gfunc(*gfunc).random_state(11),
        )
        .unwrap();

        let matching = match_sources(separation.sources(), &sources);
        assert!(
            matching.min_correlation() >= 0.95,
            "{:?}: {}",
            gfunc,
            matching.correlations()
        );
    }
}

#[test]
fn fixed_seed_is_reproducible() {
    let mut rng = Xoshiro256Plus::seed_from_u64(5);
    let sources = four_sources(800, &mut rng);
    let mixing = Array::random_using((4, 4), Uniform::new(0.0, 1.0), &mut rng);
    let observations = mixing.dot(&sources);

    let params = Ica::params().random_state(1234);
    let first = ica(&observations, &params).unwrap();
    let second = ica(&observations, &params).unwrap();

    assert_eq!(first.sources(), second.sources());
    assert_eq!(first.unmixing(), second.unmixing());
    assert_eq!(first.convergence(), second.convergence());
}

#[test]
fn unmixing_inverts_mixing_up_to_permutation_and_scale() {
    let sources = square_and_noise(5000);
    let mixing = array![[1., 1.], [0.5, 2.]];
    let observations = mixing.dot(&sources);

    let separation = ica(&observations, &Ica::params().random_state(8)).unwrap();
    let product = separation.unmixing().dot(&mixing).mapv(f64::abs);

    assert!(amari_distance(separation.unmixing(), &mixing) < 0.1);
    // exactly one dominant entry per row and per column
    for row in product.outer_iter() {
        let mut row = row.to_vec();
        row.sort_by(|a, b| b.partial_cmp(a).unwrap());
        assert!(row[1] < 0.1 * row[0]);
    }
    for col in product.axis_iter(Axis(1)) {
        let mut col = col.to_vec();
        col.sort_by(|a, b| b.partial_cmp(a).unwrap());
        assert!(col[1] < 0.1 * col[0]);
    }
}

#[test]
fn as_many_samples_as_channels_is_degenerate() {
    let mut rng = Xoshiro256Plus::seed_from_u64(0);
    let observations = Array::random_using((4, 4), Uniform::new(-1.0, 1.0), &mut rng);

    for _ in 0..3 {
        match ica(&observations, &Ica::params().random_state(0)) {
            Err(IcaError::DegenerateInput {
                channels, samples, ..
            }) => assert_eq!((channels, samples), (4, 4)),
            other => panic!("expected degenerate input, got {:?}", other.map(|_| ())),
        }
    }
}

#[test]
fn rotation_stays_orthonormal() {
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let sources = four_sources(1000, &mut rng);
    let mixing = Array::random_using((4, 4), Uniform::new(0.0, 1.0), &mut rng);
    let observations = mixing.dot(&sources);

    for scheme in [Orthogonalization::Symmetric, Orthogonalization::Deflation].iter() {
        let model = Ica::params()
            .orthogonalization(*scheme)
            .random_state(2)
            .fit(&observations)
            .unwrap();

        assert!(model.convergence().max_orthogonality_error() < 1e-10);
        let w = model.rotation();
        assert_abs_diff_eq!(w.dot(&w.t()), Array2::eye(4), epsilon = 1e-10);
    }
}

#[test]
fn whitened_data_has_identity_covariance() {
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let sources = four_sources(1000, &mut rng);
    let mixing = Array::random_using((4, 4), Uniform::new(0.0, 1.0), &mut rng);

    let whitened = whiten(&mixing.dot(&sources), 4, 1e-10).unwrap();

    assert_abs_diff_eq!(covariance(&whitened.data), Array2::eye(4), epsilon = 1e-8);
}

#[test]
fn exhausted_budget_returns_best_estimate() {
    let observations = array![[1., 1.], [0.5, 2.]].dot(&square_and_noise(1000));

    let symmetric = ica(
        &observations,
        &Ica::params().max_sweeps(1).tol(0.).random_state(4),
    )
    .unwrap();
    let conv = symmetric.convergence();
    assert!(!conv.converged());
    assert_eq!(conv.iterations(), 1);
    let warning = conv.warning().unwrap();
    assert_eq!(warning.iterations, 1);
    assert!(symmetric.sources().iter().all(|x| x.is_finite()));

    let deflation = ica(
        &observations,
        &Ica::params()
            .orthogonalization(Orthogonalization::Deflation)
            .max_iter(1)
            .tol(0.)
            .random_state(4),
    )
    .unwrap();
    assert!(deflation.convergence().warning().is_some());
    assert_eq!(deflation.convergence().iterations(), 2);
}

#[test]
fn transform_applies_unmixing_to_new_observations() {
    let sources = square_and_noise(3000);
    let mixing = array![[1., 1.], [0.5, 2.]];
    let observations = mixing.dot(&sources);

    let train = observations.slice(ndarray::s![.., ..2000]);
    let test = observations.slice(ndarray::s![.., 2000..]);

    let model = Ica::params().random_state(6).fit(&train).unwrap();
    let recovered = model.transform(&test);

    let centered = &test - &model.mean().view().insert_axis(Axis(1));
    assert_abs_diff_eq!(recovered, model.unmixing().dot(&centered), epsilon = 1e-12);

    let matching = match_sources(&recovered, &sources.slice(ndarray::s![.., 2000..]));
    assert!(matching.min_correlation() > 0.95);
}

#[test]
fn single_precision() {
    let sources = square_and_noise(2000).mapv(|x| x as f32);
    let mixing = array![[1f32, 1.], [0.5, 2.]];
    let observations = mixing.dot(&sources);

    let separation = ica(&observations, &Ica::params().tol(1e-4).random_state(9)).unwrap();
    let matching = match_sources(separation.sources(), &sources);

    assert!(matching.min_correlation() > 0.9);
}
