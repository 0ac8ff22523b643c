use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

/// Points below this last coordinate are dropped from bounded samples.
pub const BOUND_LAST_COORDINATE: f64 = -0.3;

/// Uniformly distributed random point on the unit sphere in N dimensions.
pub fn random_on_sphere<const N: usize, R: Rng>(rng: &mut R) -> [f64; N] {
    loop {
        let v: [f64; N] = std::array::from_fn(|_| rng.sample(StandardNormal));
        let len = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if len > 1e-12 {
            return v.map(|x| x / len);
        }
    }
}

fn random_on_sphere_bounded<const N: usize, R: Rng>(rng: &mut R, bounded: bool) -> [f64; N] {
    loop {
        let v = random_on_sphere::<N, R>(rng);
        if !bounded || v[N - 1] >= BOUND_LAST_COORDINATE {
            return v;
        }
    }
}

/// Unit sphere pressed in around the positive end of the last axis.
///
/// With `bounded`, a cap around the negative end of the last axis is left
/// empty, so the sample is a manifold with boundary.
pub fn sphere_with_notch<const N: usize>(count: usize, bounded: bool, seed: u64) -> Vec<[f32; N]> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let mut v = random_on_sphere_bounded::<N, _>(&mut rng, bounded);
            let dot_z = v[N - 1];
            if dot_z > 0.0 {
                v[N - 1] *= 1.0 - (0.5 * dot_z.powi(5)).abs();
            }
            v.map(|x| x as f32)
        })
        .collect()
}

/// Ellipsoid with semi-axes `axes`, sampled by scaling uniform sphere points.
pub fn ellipsoid<const N: usize>(count: usize, axes: [f64; N], seed: u64) -> Vec<[f32; N]> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let v = random_on_sphere::<N, _>(&mut rng);
            std::array::from_fn(|i| (v[i] * axes[i]) as f32)
        })
        .collect()
}

/// The object followed by `copies` translated copies of it. Copy `k` is
/// shifted by `+shift` along axis `n` when bit `n` of `k` is set and by
/// `-shift` otherwise.
pub fn clone_object<const N: usize>(points: &[[f32; N]], copies: usize, shift: f32) -> Vec<[f32; N]> {
    assert!(
        copies >= 1 && copies <= 1 << N,
        "copy count {} out of range for {} dimensions",
        copies,
        N
    );

    let mut clones = Vec::with_capacity(points.len() * (1 + copies));
    clones.extend_from_slice(points);
    for copy in 0..copies {
        let offset: [f32; N] =
            std::array::from_fn(|n| if copy & (1 << n) != 0 { shift } else { -shift });
        clones.extend(points.iter().map(|p| std::array::from_fn(|i| p[i] + offset[i])));
    }
    clones
}
