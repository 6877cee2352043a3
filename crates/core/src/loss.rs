//! Binary cross-entropy with sum reduction, plus real/fake label helpers.
//!
//! The networks emit probabilities (sigmoid already applied), so the loss is
//! taken on probabilities, not logits:
//!
//! ```text
//! BCE(p, t) = -Σ [ t·ln p + (1 - t)·ln(1 - p) ]
//! ```
//!
//! Both `p` and `1 - p` are clamped to `[PROB_EPS, 1]` before the log and the
//! log itself is floored at [`LOG_FLOOR`]. A saturated element therefore adds
//! exactly `100` to the loss, with zero gradient instead of `inf`/`NaN`.

use candle_core::{DType, Device, Result, Tensor};

/// Lower clamp for probabilities inside the log. Small enough that its log
/// lies below [`LOG_FLOOR`].
pub const PROB_EPS: f64 = 1e-44;

/// Lower bound of each log term.
pub const LOG_FLOOR: f64 = -100.0;

/// Binary cross-entropy, summed over every element. Returns a scalar tensor.
pub fn bce_sum(pred: &Tensor, target: &Tensor) -> Result<Tensor> {
    let log_p = pred.clamp(PROB_EPS, 1.0)?.log()?.maximum(LOG_FLOOR)?;
    let log_not_p = pred
        .affine(-1.0, 1.0)?
        .clamp(PROB_EPS, 1.0)?
        .log()?
        .maximum(LOG_FLOOR)?;
    let not_target = target.affine(-1.0, 1.0)?;
    let per_elem = ((target * log_p)? + (not_target * log_not_p)?)?;
    per_elem.sum_all()?.neg()
}

/// `[n, 1]` tensor of ones (label "real").
pub fn real_labels(n: usize, device: &Device) -> Result<Tensor> {
    Tensor::ones((n, 1), DType::F32, device)
}

/// `[n, 1]` tensor of zeros (label "fake").
pub fn fake_labels(n: usize, device: &Device) -> Result<Tensor> {
    Tensor::zeros((n, 1), DType::F32, device)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(values: &[f32]) -> Tensor {
        Tensor::from_slice(values, (values.len(), 1), &Device::Cpu).unwrap()
    }

    #[test]
    fn matches_hand_computation() {
        let pred = col(&[0.9, 0.2]);
        let ones = real_labels(2, &Device::Cpu).unwrap();
        let zeros = fake_labels(2, &Device::Cpu).unwrap();

        let real = bce_sum(&pred, &ones).unwrap().to_scalar::<f32>().unwrap();
        let fake = bce_sum(&pred, &zeros).unwrap().to_scalar::<f32>().unwrap();

        let expect_real = -(0.9f32.ln() + 0.2f32.ln());
        let expect_fake = -(0.1f32.ln() + 0.8f32.ln());
        assert!((real - expect_real).abs() < 1e-5, "{real} vs {expect_real}");
        assert!((fake - expect_fake).abs() < 1e-5, "{fake} vs {expect_fake}");
    }

    #[test]
    fn non_negative_on_open_interval() {
        let preds = [1e-6f32, 0.01, 0.3, 0.5, 0.7, 0.99, 1.0 - 1e-6];
        let pred = col(&preds);
        let n = preds.len();
        for target in [real_labels(n, &Device::Cpu), fake_labels(n, &Device::Cpu)] {
            let loss = bce_sum(&pred, &target.unwrap())
                .unwrap()
                .to_scalar::<f32>()
                .unwrap();
            assert!(loss >= 0.0, "loss {loss}");
        }
    }

    #[test]
    fn saturated_element_costs_one_hundred() {
        let pred = col(&[0.0, 1.0]);
        let ones = real_labels(2, &Device::Cpu).unwrap();
        let zeros = fake_labels(2, &Device::Cpu).unwrap();

        let real = bce_sum(&pred, &ones).unwrap().to_scalar::<f32>().unwrap();
        assert!((real - 100.0).abs() < 1e-3, "{real}");
        let fake = bce_sum(&pred, &zeros).unwrap().to_scalar::<f32>().unwrap();
        assert!((fake - 100.0).abs() < 1e-3, "{fake}");

        let both = bce_sum(&col(&[0.0, 0.0]), &ones)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!((both - 200.0).abs() < 1e-3, "{both}");
    }

    #[test]
    fn saturated_element_has_finite_gradient() {
        let var = candle_core::Var::from_tensor(&col(&[0.0, 0.5])).unwrap();
        let loss = bce_sum(var.as_tensor(), &real_labels(2, &Device::Cpu).unwrap()).unwrap();
        let grads = loss.backward().unwrap();
        let g = grads
            .get(var.as_tensor())
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();
        assert!(g.iter().all(|v| v.is_finite()), "{g:?}");
        // d/dp of -ln p at 0.5
        assert!((g[1] + 2.0).abs() < 1e-4, "{g:?}");
    }

    #[test]
    fn perfect_prediction_is_near_zero() {
        let pred = col(&[1.0, 1.0, 1.0]);
        let ones = real_labels(3, &Device::Cpu).unwrap();
        let loss = bce_sum(&pred, &ones).unwrap().to_scalar::<f32>().unwrap();
        assert!(loss.abs() < 1e-6);
    }

    #[test]
    fn sum_not_mean() {
        let one = bce_sum(&col(&[0.5]), &real_labels(1, &Device::Cpu).unwrap())
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        let four = bce_sum(&col(&[0.5; 4]), &real_labels(4, &Device::Cpu).unwrap())
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!((four - 4.0 * one).abs() < 1e-5);
    }
}
