//! Seeded parameter initialisation.
//!
//! candle's CPU backend draws initial weights from an unseeded thread RNG,
//! so runs are not reproducible out of the box. [`seeded_uniform_init`]
//! overwrites every variable in a [`VarMap`] with the classic affine-layer
//! scheme `U(-1/√fan_in, 1/√fan_in)` for weights and biases alike, drawing
//! from a [`StdRng`] in sorted-name order.

use candle_core::{Result, Tensor};
use candle_nn::VarMap;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Re-initialise all variables of `varmap` deterministically from `seed`.
///
/// Weights are `[out, in]` so `fan_in = in`; a bias `<prefix>.bias` takes
/// the fan-in of `<prefix>.weight`.
pub fn seeded_uniform_init(varmap: &VarMap, seed: u64) -> Result<()> {
    let data = varmap
        .data()
        .lock()
        .map_err(|_| candle_core::Error::Msg("varmap lock poisoned".to_string()))?;

    let mut names: Vec<&String> = data.keys().collect();
    names.sort();

    let mut rng = StdRng::seed_from_u64(seed);
    for name in names {
        let var = &data[name];
        let fan_in = match name.strip_suffix(".bias") {
            Some(prefix) => data
                .get(&format!("{prefix}.weight"))
                .and_then(|w| w.as_tensor().dims().last().copied())
                .unwrap_or_else(|| var.as_tensor().elem_count()),
            None => var.as_tensor().dims().last().copied().unwrap_or(1),
        };
        let bound = 1.0 / (fan_in.max(1) as f32).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        let values: Vec<f32> = (0..var.as_tensor().elem_count())
            .map(|_| dist.sample(&mut rng))
            .collect();
        let t = Tensor::from_vec(values, var.as_tensor().dims(), var.as_tensor().device())?;
        var.set(&t)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarBuilder;

    fn build(varmap: &VarMap) {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, &Device::Cpu);
        candle_nn::linear(16, 3, vb.pp("fc")).unwrap();
    }

    fn flat(varmap: &VarMap, name: &str) -> Vec<f32> {
        varmap.data().lock().unwrap()[name]
            .as_tensor()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap()
    }

    #[test]
    fn same_seed_same_parameters() {
        let (a, b) = (VarMap::new(), VarMap::new());
        build(&a);
        build(&b);
        seeded_uniform_init(&a, 5).unwrap();
        seeded_uniform_init(&b, 5).unwrap();
        assert_eq!(flat(&a, "fc.weight"), flat(&b, "fc.weight"));
        assert_eq!(flat(&a, "fc.bias"), flat(&b, "fc.bias"));
    }

    #[test]
    fn values_respect_fan_in_bound() {
        let varmap = VarMap::new();
        build(&varmap);
        seeded_uniform_init(&varmap, 1).unwrap();
        let bound = 1.0 / 16f32.sqrt();
        for name in ["fc.weight", "fc.bias"] {
            assert!(flat(&varmap, name).iter().all(|v| v.abs() <= bound + 1e-7));
        }
    }

    #[test]
    fn different_seeds_differ() {
        let (a, b) = (VarMap::new(), VarMap::new());
        build(&a);
        build(&b);
        seeded_uniform_init(&a, 1).unwrap();
        seeded_uniform_init(&b, 2).unwrap();
        assert_ne!(flat(&a, "fc.weight"), flat(&b, "fc.weight"));
    }
}
