/// A column of feature values for summary statistics.
///
/// Standard deviation uses the sample convention (n - 1 denominator), which
/// is what the training pipeline used when it wrote the baseline.
pub struct Sample {
    values: Vec<f64>,
}

impl Sample {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    pub fn variance(&self) -> f64 {
        // A single observation has no spread.
        if self.values.len() < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let sum_sq_diff: f64 = self
            .values
            .iter()
            .map(|&x| (x - mean).powi(2))
            .sum();
        sum_sq_diff / (self.values.len() - 1) as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}
