use ndarray::{Array, Array1, Array2, Dimension, Zip};
use planefit_helpers::Float;

/// Hyper-parameters of the Adam optimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdamConfig<F: Float> {
    pub learning_rate: F,
    pub beta1: F,
    pub beta2: F,
    pub epsilon: F,
}

impl<F: Float> Default for AdamConfig<F> {
    fn default() -> Self {
        Self {
            learning_rate: F::lit(0.001),
            beta1: F::lit(0.9),
            beta2: F::lit(0.999),
            epsilon: F::lit(1e-7),
        }
    }
}

impl<F: Float> AdamConfig<F> {
    /// Default moments with a custom step size.
    pub fn with_learning_rate(learning_rate: F) -> Self {
        Self {
            learning_rate,
            ..Default::default()
        }
    }
}

/// First and second moment estimates for every parameter of a model.
#[derive(Debug, Clone)]
pub(crate) struct AdamState<F: Float> {
    config: AdamConfig<F>,
    m_weights: Vec<Array2<F>>,
    v_weights: Vec<Array2<F>>,
    m_bias: Vec<Array1<F>>,
    v_bias: Vec<Array1<F>>,
    t: i32,
}

impl<F: Float> AdamState<F> {
    pub(crate) fn new(config: AdamConfig<F>, shapes: &[(usize, usize)]) -> Self {
        Self {
            config,
            m_weights: shapes.iter().map(|&s| Array2::zeros(s)).collect(),
            v_weights: shapes.iter().map(|&s| Array2::zeros(s)).collect(),
            m_bias: shapes.iter().map(|&(_, out)| Array1::zeros(out)).collect(),
            v_bias: shapes.iter().map(|&(_, out)| Array1::zeros(out)).collect(),
            t: 0,
        }
    }

    pub(crate) fn config(&self) -> &AdamConfig<F> {
        &self.config
    }

    /// Advances the step counter and returns the bias-corrected step size.
    pub(crate) fn begin_step(&mut self) -> F {
        self.t += 1;
        let c = &self.config;
        let correction1 = F::one() - c.beta1.powi(self.t);
        let correction2 = F::one() - c.beta2.powi(self.t);
        c.learning_rate * correction2.sqrt() / correction1
    }

    pub(crate) fn update_layer(
        &mut self,
        layer: usize,
        weights: &mut Array2<F>,
        bias: &mut Array1<F>,
        grad_weights: &Array2<F>,
        grad_bias: &Array1<F>,
        step: F,
    ) {
        let c = self.config;
        apply(
            &c,
            weights,
            grad_weights,
            &mut self.m_weights[layer],
            &mut self.v_weights[layer],
            step,
        );
        apply(
            &c,
            bias,
            grad_bias,
            &mut self.m_bias[layer],
            &mut self.v_bias[layer],
            step,
        );
    }
}

fn apply<F: Float, D: Dimension>(
    c: &AdamConfig<F>,
    param: &mut Array<F, D>,
    grad: &Array<F, D>,
    m: &mut Array<F, D>,
    v: &mut Array<F, D>,
    step: F,
) {
    let one = F::one();
    Zip::from(param)
        .and(m)
        .and(v)
        .and(grad)
        .for_each(|p, m, v, &g| {
            *m = c.beta1 * *m + (one - c.beta1) * g;
            *v = c.beta2 * *v + (one - c.beta2) * g * g;
            *p = *p - step * *m / (v.sqrt() + c.epsilon);
        });
}
