use ndarray::{Array1, Array2, ArrayView2, Axis};
use planefit_helpers::Float;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use thiserror::Error;

mod optimizer;

pub use optimizer::AdamConfig;
use optimizer::AdamState;

/// Probability clip used by binary cross-entropy, so `ln` never sees 0.
const BCE_EPSILON: f64 = 1e-7;

/// Errors that can occur while building, training or evaluating a model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MlpError {
    /// The layer stack cannot be built (no layers, zero units, zero inputs).
    #[error("Invalid architecture: {0}")]
    InvalidArchitecture(String),
    /// `fit` or `evaluate` was called without samples.
    #[error("Training data is empty")]
    EmptyDataSet,
    /// Inputs and targets disagree on the number of samples.
    #[error("Got {inputs} input rows but {targets} target rows")]
    SampleCountMismatch { inputs: usize, targets: usize },
    /// Input rows have the wrong width for the first layer.
    #[error("Expected {expected} input features, got {found}")]
    InputDimension { expected: usize, found: usize },
    /// Target rows have the wrong width for the last layer.
    #[error("Expected {expected} target columns, got {found}")]
    OutputDimension { expected: usize, found: usize },
    /// Fit options that cannot drive a training loop.
    #[error("Invalid fit options: {0}")]
    InvalidOptions(String),
}

/// Element-wise non-linearity applied after a dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Linear,
    Relu,
    Sigmoid,
}

impl Activation {
    fn apply<F: Float>(self, z: &Array2<F>) -> Array2<F> {
        match self {
            Activation::Linear => z.clone(),
            Activation::Relu => z.mapv(|v| v.max(F::zero())),
            Activation::Sigmoid => z.mapv(sigmoid),
        }
    }

    /// Derivative with respect to the pre-activation `z`, given `a = f(z)`.
    fn derivative<F: Float>(self, z: &Array2<F>, a: &Array2<F>) -> Array2<F> {
        match self {
            Activation::Linear => Array2::ones(z.raw_dim()),
            Activation::Relu => z.mapv(|v| if v > F::zero() { F::one() } else { F::zero() }),
            Activation::Sigmoid => a.mapv(|s| s * (F::one() - s)),
        }
    }
}

fn sigmoid<F: Float>(v: F) -> F {
    F::one() / (F::one() + (-v).exp())
}

/// Objective minimised by `fit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    BinaryCrossEntropy,
    MeanSquaredError,
}

impl Loss {
    /// Mean loss over every element of the batch.
    fn value<F: Float>(self, predicted: &Array2<F>, target: ArrayView2<F>) -> F {
        let n = F::from_count(predicted.len().max(1));
        match self {
            Loss::BinaryCrossEntropy => {
                let eps = F::lit(BCE_EPSILON);
                let total: F = predicted
                    .iter()
                    .zip(target.iter())
                    .map(|(&p, &y)| {
                        let p = p.max(eps).min(F::one() - eps);
                        -(y * p.ln() + (F::one() - y) * (F::one() - p).ln())
                    })
                    .sum();
                total / n
            }
            Loss::MeanSquaredError => {
                let total: F = predicted
                    .iter()
                    .zip(target.iter())
                    .map(|(&p, &y)| (p - y) * (p - y))
                    .sum();
                total / n
            }
        }
    }

    /// Gradient of the mean loss with respect to the predictions.
    fn gradient<F: Float>(self, predicted: &Array2<F>, target: ArrayView2<F>) -> Array2<F> {
        let n = F::from_count(predicted.len().max(1));
        match self {
            Loss::BinaryCrossEntropy => {
                let eps = F::lit(BCE_EPSILON);
                let mut grad = predicted.clone();
                grad.zip_mut_with(&target, |p, &y| {
                    let c = p.max(eps).min(F::one() - eps);
                    *p = (c - y) / (c * (F::one() - c)) / n;
                });
                grad
            }
            Loss::MeanSquaredError => {
                let two = F::lit(2.0);
                let mut grad = predicted.clone();
                grad.zip_mut_with(&target, |p, &y| *p = two * (*p - y) / n);
                grad
            }
        }
    }
}

/// A fully connected layer: `activation(x · weights + bias)`.
#[derive(Debug, Clone)]
pub struct Dense<F: Float> {
    /// Kernel of shape `(inputs, units)`.
    pub weights: Array2<F>,
    pub bias: Array1<F>,
    pub activation: Activation,
}

impl<F: Float> Dense<F> {
    /// Glorot-uniform kernel, zero bias.
    fn glorot<R: Rng>(inputs: usize, units: usize, activation: Activation, rng: &mut R) -> Self {
        let limit = (F::lit(6.0) / F::from_count(inputs + units)).sqrt();
        let weights = Array2::from_shape_simple_fn((inputs, units), || {
            rng.random_range(-limit..limit)
        });
        Dense {
            weights,
            bias: Array1::zeros(units),
            activation,
        }
    }

    pub fn inputs(&self) -> usize {
        self.weights.nrows()
    }

    pub fn units(&self) -> usize {
        self.weights.ncols()
    }

    fn pre_activation(&self, x: &ArrayView2<F>) -> Array2<F> {
        x.dot(&self.weights) + &self.bias
    }
}

/// Options for one call to [`Sequential::fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub shuffle: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            epochs: 1,
            batch_size: 32,
            shuffle: true,
        }
    }
}

/// Mean training loss recorded at the end of each epoch.
#[derive(Debug, Clone, Default)]
pub struct History<F: Float> {
    pub loss: Vec<F>,
}

impl<F: Float> History<F> {
    pub fn last_loss(&self) -> Option<F> {
        self.loss.last().copied()
    }
}

/// Starts a layer stack that takes `input_dim` features per sample.
///
/// ```
/// use mlp::{sequential, Activation, AdamConfig, Loss, Sequential};
///
/// let model: Sequential<f64> = sequential(2)
///     .dense(4, Activation::Relu)
///     .dense(1, Activation::Sigmoid)
///     .build(AdamConfig::default(), Loss::BinaryCrossEntropy, 42)
///     .unwrap();
/// assert_eq!(model.output_dim(), 1);
/// ```
pub fn sequential(input_dim: usize) -> SequentialBuilder {
    SequentialBuilder {
        input_dim,
        layers: Vec::new(),
    }
}

/// Collects layer sizes before any weights exist.
#[derive(Debug, Clone)]
pub struct SequentialBuilder {
    input_dim: usize,
    layers: Vec<(usize, Activation)>,
}

impl SequentialBuilder {
    pub fn dense(mut self, units: usize, activation: Activation) -> Self {
        self.layers.push((units, activation));
        self
    }

    /// Initializes the weights and attaches optimizer and loss.
    ///
    /// # Errors
    ///
    /// Returns `MlpError::InvalidArchitecture` when there are no inputs, no
    /// layers, or a layer with zero units.
    pub fn build<F: Float>(
        self,
        optimizer: AdamConfig<F>,
        loss: Loss,
        seed: u64,
    ) -> Result<Sequential<F>, MlpError> {
        if self.input_dim == 0 {
            return Err(MlpError::InvalidArchitecture(
                "input dimension must be positive".into(),
            ));
        }
        if self.layers.is_empty() {
            return Err(MlpError::InvalidArchitecture(
                "model needs at least one layer".into(),
            ));
        }
        if let Some(pos) = self.layers.iter().position(|&(units, _)| units == 0) {
            return Err(MlpError::InvalidArchitecture(format!(
                "layer {pos} has zero units"
            )));
        }

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut layers = Vec::with_capacity(self.layers.len());
        let mut inputs = self.input_dim;
        for (units, activation) in self.layers {
            layers.push(Dense::glorot(inputs, units, activation, &mut rng));
            inputs = units;
        }
        let shapes: Vec<_> = layers.iter().map(|l| l.weights.dim()).collect();

        Ok(Sequential {
            layers,
            loss,
            optimizer: AdamState::new(optimizer, &shapes),
            rng,
        })
    }
}

/// A stack of dense layers trained with Adam.
///
/// The model owns its optimizer state and shuffling RNG, so calling
/// [`fit`](Sequential::fit) repeatedly with `epochs = 1` behaves like one
/// long training run.
#[derive(Debug, Clone)]
pub struct Sequential<F: Float> {
    layers: Vec<Dense<F>>,
    loss: Loss,
    optimizer: AdamState<F>,
    rng: Xoshiro256PlusPlus,
}

/// Per-layer `(pre_activation, activation)` pairs from a forward pass.
type Trace<F> = Vec<(Array2<F>, Array2<F>)>;

impl<F: Float> Sequential<F> {
    pub fn layers(&self) -> &[Dense<F>] {
        &self.layers
    }

    pub fn input_dim(&self) -> usize {
        self.layers[0].inputs()
    }

    pub fn output_dim(&self) -> usize {
        self.layers[self.layers.len() - 1].units()
    }

    pub fn learning_rate(&self) -> F {
        self.optimizer.config().learning_rate
    }

    /// Runs the network on a batch of rows.
    ///
    /// # Errors
    ///
    /// Returns `MlpError::InputDimension` if the rows are not `input_dim` wide.
    pub fn predict(&self, xs: ArrayView2<F>) -> Result<Array2<F>, MlpError> {
        self.check_inputs(&xs)?;
        let mut trace = self.forward(&xs);
        Ok(trace
            .pop()
            .map(|(_, a)| a)
            .unwrap_or_else(|| Array2::zeros((xs.nrows(), 0))))
    }

    /// Mean loss of the current weights on `(xs, ys)`.
    pub fn evaluate(&self, xs: ArrayView2<F>, ys: ArrayView2<F>) -> Result<F, MlpError> {
        self.check_samples(&xs, &ys)?;
        let predicted = self.predict(xs)?;
        Ok(self.loss.value(&predicted, ys))
    }

    /// Trains on `(xs, ys)` in shuffled mini-batches.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is empty, the shapes do not match the
    /// model, or `options.batch_size` is zero.
    pub fn fit(
        &mut self,
        xs: ArrayView2<F>,
        ys: ArrayView2<F>,
        options: &FitOptions,
    ) -> Result<History<F>, MlpError> {
        if options.batch_size == 0 {
            return Err(MlpError::InvalidOptions("batch size must be positive".into()));
        }
        self.check_samples(&xs, &ys)?;

        let n = xs.nrows();
        let mut indices: Vec<usize> = (0..n).collect();
        let mut history = History {
            loss: Vec::with_capacity(options.epochs),
        };

        for _ in 0..options.epochs {
            if options.shuffle {
                indices.shuffle(&mut self.rng);
            }
            let mut epoch_loss = F::zero();
            for batch in indices.chunks(options.batch_size) {
                let bx = xs.select(Axis(0), batch);
                let by = ys.select(Axis(0), batch);
                let batch_loss = self.train_batch(bx.view(), by.view());
                epoch_loss += batch_loss * F::from_count(batch.len());
            }
            let mean = epoch_loss / F::from_count(n);
            tracing::trace!(loss = mean.to_f64_lossy(), samples = n, "epoch finished");
            history.loss.push(mean);
        }
        Ok(history)
    }

    fn train_batch(&mut self, xs: ArrayView2<F>, ys: ArrayView2<F>) -> F {
        let trace = self.forward(&xs);
        let grads = self.gradients(&xs, ys, &trace);
        let step = self.optimizer.begin_step();
        for (idx, (layer, (gw, gb))) in self.layers.iter_mut().zip(grads.iter()).enumerate() {
            self.optimizer
                .update_layer(idx, &mut layer.weights, &mut layer.bias, gw, gb, step);
        }
        match trace.last() {
            Some((_, out)) => self.loss.value(out, ys),
            None => F::zero(),
        }
    }

    fn forward(&self, xs: &ArrayView2<F>) -> Trace<F> {
        let mut trace: Trace<F> = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let z = match trace.last() {
                Some((_, prev)) => layer.pre_activation(&prev.view()),
                None => layer.pre_activation(xs),
            };
            let a = layer.activation.apply(&z);
            trace.push((z, a));
        }
        trace
    }

    /// Back-propagates the mean batch loss into per-layer `(dW, db)`.
    fn gradients(
        &self,
        xs: &ArrayView2<F>,
        ys: ArrayView2<F>,
        trace: &Trace<F>,
    ) -> Vec<(Array2<F>, Array1<F>)> {
        let last = self.layers.len() - 1;
        let (z_out, a_out) = &trace[last];

        // Sigmoid + BCE collapses to (a - y) / n; computing it directly
        // avoids dividing by a(1 - a) near saturation.
        let mut delta = if self.loss == Loss::BinaryCrossEntropy
            && self.layers[last].activation == Activation::Sigmoid
        {
            let n = F::from_count(a_out.len().max(1));
            (a_out - &ys).mapv(|d| d / n)
        } else {
            self.loss.gradient(a_out, ys) * self.layers[last].activation.derivative(z_out, a_out)
        };

        let mut grads = Vec::with_capacity(self.layers.len());
        for idx in (0..self.layers.len()).rev() {
            let input = if idx == 0 {
                xs.view()
            } else {
                trace[idx - 1].1.view()
            };
            let grad_w = input.t().dot(&delta);
            let grad_b = delta.sum_axis(Axis(0));
            if idx > 0 {
                let (z_prev, a_prev) = &trace[idx - 1];
                delta = delta.dot(&self.layers[idx].weights.t())
                    * self.layers[idx - 1].activation.derivative(z_prev, a_prev);
            }
            grads.push((grad_w, grad_b));
        }
        grads.reverse();
        grads
    }

    fn check_inputs(&self, xs: &ArrayView2<F>) -> Result<(), MlpError> {
        if xs.ncols() != self.input_dim() {
            return Err(MlpError::InputDimension {
                expected: self.input_dim(),
                found: xs.ncols(),
            });
        }
        Ok(())
    }

    fn check_samples(&self, xs: &ArrayView2<F>, ys: &ArrayView2<F>) -> Result<(), MlpError> {
        if xs.nrows() == 0 {
            return Err(MlpError::EmptyDataSet);
        }
        if xs.nrows() != ys.nrows() {
            return Err(MlpError::SampleCountMismatch {
                inputs: xs.nrows(),
                targets: ys.nrows(),
            });
        }
        self.check_inputs(xs)?;
        if ys.ncols() != self.output_dim() {
            return Err(MlpError::OutputDimension {
                expected: self.output_dim(),
                found: ys.ncols(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn two_clusters() -> (Array2<f64>, Array2<f64>) {
        let xs = array![
            [-0.6, -0.5],
            [-0.5, -0.7],
            [-0.7, -0.6],
            [-0.4, -0.5],
            [0.5, 0.6],
            [0.6, 0.4],
            [0.7, 0.5],
            [0.4, 0.7],
        ];
        let ys = array![[0.0], [0.0], [0.0], [0.0], [1.0], [1.0], [1.0], [1.0]];
        (xs, ys)
    }

    fn small_model(seed: u64) -> Sequential<f64> {
        sequential(2)
            .dense(8, Activation::Relu)
            .dense(1, Activation::Sigmoid)
            .build(AdamConfig::with_learning_rate(0.05), Loss::BinaryCrossEntropy, seed)
            .unwrap()
    }

    #[test]
    fn test_build_shapes() {
        let model: Sequential<f32> = sequential(2)
            .dense(4, Activation::Relu)
            .dense(1, Activation::Sigmoid)
            .build(AdamConfig::default(), Loss::BinaryCrossEntropy, 7)
            .unwrap();
        assert_eq!(model.layers().len(), 2);
        assert_eq!(model.layers()[0].weights.dim(), (2, 4));
        assert_eq!(model.layers()[1].weights.dim(), (4, 1));
        assert_eq!(model.input_dim(), 2);
        assert_eq!(model.output_dim(), 1);
        assert!(model.layers()[0].bias.iter().all(|&b| b == 0.0));

        // Glorot bound for a 2 -> 4 kernel.
        let limit = (6.0f32 / 6.0).sqrt();
        assert!(model.layers()[0].weights.iter().all(|w| w.abs() <= limit));
    }

    #[test]
    fn test_invalid_architecture() {
        let no_layers =
            sequential(2).build::<f64>(AdamConfig::default(), Loss::BinaryCrossEntropy, 0);
        assert!(matches!(no_layers, Err(MlpError::InvalidArchitecture(_))));

        let zero_units = sequential(2)
            .dense(0, Activation::Relu)
            .build::<f64>(AdamConfig::default(), Loss::BinaryCrossEntropy, 0);
        assert!(matches!(zero_units, Err(MlpError::InvalidArchitecture(_))));

        let zero_inputs = sequential(0)
            .dense(1, Activation::Sigmoid)
            .build::<f64>(AdamConfig::default(), Loss::BinaryCrossEntropy, 0);
        assert!(matches!(zero_inputs, Err(MlpError::InvalidArchitecture(_))));
    }

    #[test]
    fn test_predict_is_probability() {
        let model = small_model(1);
        let out = model.predict(array![[0.0, 0.0], [1.0, -1.0], [-3.0, 2.0]].view()).unwrap();
        assert_eq!(out.dim(), (3, 1));
        assert!(out.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_fit_separates_two_clusters() {
        let (xs, ys) = two_clusters();
        let mut model = small_model(42);
        let before = model.evaluate(xs.view(), ys.view()).unwrap();
        let options = FitOptions {
            epochs: 300,
            batch_size: 32,
            shuffle: true,
        };
        let history = model.fit(xs.view(), ys.view(), &options).unwrap();
        assert_eq!(history.loss.len(), 300);

        let after = model.evaluate(xs.view(), ys.view()).unwrap();
        assert!(after < before, "loss did not drop: {before} -> {after}");

        let out = model.predict(xs.view()).unwrap();
        for (p, y) in out.column(0).iter().zip(ys.column(0).iter()) {
            assert_eq!(*p > 0.5, *y > 0.5, "p = {p}, y = {y}");
        }
    }

    #[test]
    fn test_repeated_single_epoch_fits_match_one_long_fit() {
        let (xs, ys) = two_clusters();
        let mut a = small_model(9);
        let mut b = small_model(9);
        let single = FitOptions::default();
        for _ in 0..5 {
            a.fit(xs.view(), ys.view(), &single).unwrap();
        }
        b.fit(
            xs.view(),
            ys.view(),
            &FitOptions {
                epochs: 5,
                ..FitOptions::default()
            },
        )
        .unwrap();
        let pa = a.predict(xs.view()).unwrap();
        let pb = b.predict(xs.view()).unwrap();
        for (x, y) in pa.iter().zip(pb.iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        let xs = array![[0.3, -0.2], [-0.5, 0.8], [0.9, 0.1]];
        let ys = array![[1.0], [0.0], [1.0]];
        let model: Sequential<f64> = sequential(2)
            .dense(3, Activation::Sigmoid)
            .dense(1, Activation::Sigmoid)
            .build(AdamConfig::default(), Loss::BinaryCrossEntropy, 3)
            .unwrap();

        let trace = model.forward(&xs.view());
        let grads = model.gradients(&xs.view(), ys.view(), &trace);
        let h = 1e-6;

        for layer in 0..model.layers.len() {
            let (rows, cols) = model.layers[layer].weights.dim();
            for r in 0..rows {
                for c in 0..cols {
                    let mut plus = model.clone();
                    plus.layers[layer].weights[[r, c]] += h;
                    let mut minus = model.clone();
                    minus.layers[layer].weights[[r, c]] -= h;
                    let numeric = (plus.evaluate(xs.view(), ys.view()).unwrap()
                        - minus.evaluate(xs.view(), ys.view()).unwrap())
                        / (2.0 * h);
                    assert_abs_diff_eq!(grads[layer].0[[r, c]], numeric, epsilon = 1e-6);
                }
            }
            for c in 0..model.layers[layer].units() {
                let mut plus = model.clone();
                plus.layers[layer].bias[c] += h;
                let mut minus = model.clone();
                minus.layers[layer].bias[c] -= h;
                let numeric = (plus.evaluate(xs.view(), ys.view()).unwrap()
                    - minus.evaluate(xs.view(), ys.view()).unwrap())
                    / (2.0 * h);
                assert_abs_diff_eq!(grads[layer].1[c], numeric, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_mse_gradient_matches_finite_differences() {
        let xs = array![[0.2, 0.4], [-0.3, -0.9]];
        let ys = array![[0.5], [-0.25]];
        let model: Sequential<f64> = sequential(2)
            .dense(2, Activation::Sigmoid)
            .dense(1, Activation::Linear)
            .build(AdamConfig::default(), Loss::MeanSquaredError, 11)
            .unwrap();
        let trace = model.forward(&xs.view());
        let grads = model.gradients(&xs.view(), ys.view(), &trace);
        let h = 1e-6;
        let mut plus = model.clone();
        plus.layers[0].weights[[1, 0]] += h;
        let mut minus = model.clone();
        minus.layers[0].weights[[1, 0]] -= h;
        let numeric = (plus.evaluate(xs.view(), ys.view()).unwrap()
            - minus.evaluate(xs.view(), ys.view()).unwrap())
            / (2.0 * h);
        assert_abs_diff_eq!(grads[0].0[[1, 0]], numeric, epsilon = 1e-6);
    }

    #[test]
    fn test_fit_errors() {
        let mut model = small_model(0);
        let empty = Array2::<f64>::zeros((0, 2));
        let empty_y = Array2::<f64>::zeros((0, 1));
        assert_eq!(
            model.fit(empty.view(), empty_y.view(), &FitOptions::default()).unwrap_err(),
            MlpError::EmptyDataSet
        );

        let xs = array![[0.0, 0.0], [1.0, 1.0]];
        let ys = array![[0.0]];
        assert_eq!(
            model.fit(xs.view(), ys.view(), &FitOptions::default()).unwrap_err(),
            MlpError::SampleCountMismatch { inputs: 2, targets: 1 }
        );

        let wide = array![[0.0, 0.0, 0.0]];
        assert_eq!(
            model.predict(wide.view()).unwrap_err(),
            MlpError::InputDimension { expected: 2, found: 3 }
        );

        let ys2 = array![[0.0, 1.0], [1.0, 0.0]];
        assert_eq!(
            model.fit(xs.view(), ys2.view(), &FitOptions::default()).unwrap_err(),
            MlpError::OutputDimension { expected: 1, found: 2 }
        );

        let ys = array![[0.0], [1.0]];
        let bad = FitOptions {
            batch_size: 0,
            ..FitOptions::default()
        };
        assert!(matches!(
            model.fit(xs.view(), ys.view(), &bad),
            Err(MlpError::InvalidOptions(_))
        ));
    }
}
