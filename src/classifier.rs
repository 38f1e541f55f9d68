use mlp::{MlpError, Sequential};
use ndarray::{Array1, ArrayView2};
use planefit_helpers::Float;
use thiserror::Error;

/// Errors a classifier can report while scoring a batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifierError {
    #[error("model evaluation failed: {0}")]
    Model(#[from] MlpError),
    /// The model does not produce exactly one probability per input.
    #[error("binary classifier must have one output, got {0}")]
    NotBinary(usize),
}

/// Anything that maps 2-D points in `[-1, 1]²` to the probability of class 1.
///
/// Implementors score the whole batch in one call and return one value per
/// input row, in input order.
pub trait BinaryClassifier {
    type Scalar: Float;

    fn predict_batch(
        &self,
        inputs: ArrayView2<Self::Scalar>,
    ) -> Result<Array1<Self::Scalar>, ClassifierError>;
}

impl<F: Float> BinaryClassifier for Sequential<F> {
    type Scalar = F;

    fn predict_batch(&self, inputs: ArrayView2<F>) -> Result<Array1<F>, ClassifierError> {
        if self.output_dim() != 1 {
            return Err(ClassifierError::NotBinary(self.output_dim()));
        }
        let out = self.predict(inputs)?;
        Ok(out.column(0).to_owned())
    }
}

impl<C: BinaryClassifier + ?Sized> BinaryClassifier for &C {
    type Scalar = C::Scalar;

    fn predict_batch(
        &self,
        inputs: ArrayView2<Self::Scalar>,
    ) -> Result<Array1<Self::Scalar>, ClassifierError> {
        (**self).predict_batch(inputs)
    }
}
