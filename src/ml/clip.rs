// ============================================================
// Layer 5 — Global Gradient-Norm Clipping
// ============================================================
// burn's GradientClippingConfig::Norm clips each parameter
// tensor on its own. The training loop needs the global form:
// every gradient of the model is treated as one vector, and if
// its L2 norm exceeds max_norm all gradients are scaled by
//
//   max_norm / (total_norm + 1e-6)
//
// so the clipped global norm never exceeds max_norm.

use std::marker::PhantomData;

use burn::{
    module::{ModuleVisitor, ParamId},
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

const CLIP_EPS: f64 = 1e-6;

/// Scale factor to apply, or None when no clipping is needed.
pub fn clip_coefficient(total_norm: f64, max_norm: f64) -> Option<f64> {
    (max_norm > 0.0 && total_norm > max_norm).then(|| max_norm / (total_norm + CLIP_EPS))
}

struct NormVisitor<'a, B: AutodiffBackend> {
    grads:  &'a GradientsParams,
    sum_sq: f64,
    _b:     PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for NormVisitor<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(g) = self.grads.get::<B::InnerBackend, D>(id) {
            self.sum_sq += g.powf_scalar(2.0).sum().into_scalar().elem::<f64>();
        }
    }
}

struct ScaleVisitor<'a, B: AutodiffBackend> {
    grads: &'a mut GradientsParams,
    scale: f64,
    _b:    PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for ScaleVisitor<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(g) = self.grads.remove::<B::InnerBackend, D>(id) {
            self.grads.register::<B::InnerBackend, D>(id, g.mul_scalar(self.scale));
        }
    }
}

/// L2 norm of all gradients of `module`, taken together.
pub fn global_grad_norm<B: AutodiffBackend, M: Module<B>>(module: &M, grads: &GradientsParams) -> f64 {
    let mut visitor = NormVisitor::<B> { grads, sum_sq: 0.0, _b: PhantomData };
    module.visit(&mut visitor);
    visitor.sum_sq.sqrt()
}

/// Clip the global gradient norm in place. Returns the norm before clipping.
pub fn clip_grad_norm<B: AutodiffBackend, M: Module<B>>(
    module:   &M,
    grads:    &mut GradientsParams,
    max_norm: f64,
) -> f64 {
    let total = global_grad_norm::<B, M>(module, grads);
    if let Some(scale) = clip_coefficient(total, max_norm) {
        let mut visitor = ScaleVisitor::<B> { grads, scale, _b: PhantomData };
        module.visit(&mut visitor);
        tracing::trace!("clipped gradient norm {:.4} → {:.4}", total, max_norm);
    }
    total
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::nn::{Linear, LinearConfig};

    type TestBackend = Autodiff<NdArray>;

    fn large_grads() -> (Linear<TestBackend>, GradientsParams) {
        let device = Default::default();
        let linear: Linear<TestBackend> = LinearConfig::new(3, 2).init(&device);
        let x = Tensor::<TestBackend, 2>::ones([4, 3], &device);
        let loss = linear.forward(x).sum().mul_scalar(100.0);
        let grads = GradientsParams::from_grads(loss.backward(), &linear);
        (linear, grads)
    }

    #[test]
    fn test_coefficient() {
        assert_eq!(clip_coefficient(0.5, 1.0), None);
        assert_eq!(clip_coefficient(5.0, 0.0), None);
        let c = clip_coefficient(4.0, 2.0).unwrap();
        assert!(c < 0.5 && c > 0.4999);
    }

    #[test]
    fn test_clipped_norm_never_exceeds_bound() {
        let (linear, mut grads) = large_grads();
        let before = clip_grad_norm::<TestBackend, _>(&linear, &mut grads, 1.0);
        assert!(before > 1.0);

        let after = global_grad_norm::<TestBackend, _>(&linear, &grads);
        assert!(after <= 1.0, "norm after clipping was {after}");
        assert!(after > 0.99);
    }

    #[test]
    fn test_zero_bound_leaves_gradients_untouched() {
        let (linear, mut grads) = large_grads();
        let before = global_grad_norm::<TestBackend, _>(&linear, &grads);
        clip_grad_norm::<TestBackend, _>(&linear, &mut grads, 0.0);
        let after = global_grad_norm::<TestBackend, _>(&linear, &grads);
        assert!((before - after).abs() < 1e-9);
    }
}
