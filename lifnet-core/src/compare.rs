//! Exact cell-by-cell comparison of two spike-output matrices.

use std::fmt;

use tracing::debug;

use crate::error::{SnnError, SnnResult};
use crate::matrix::Matrix;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mismatch {
    pub sample: usize,
    pub neuron: usize,
    pub value_a: f64,
    pub value_b: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonReport {
    pub total_comparisons: usize,
    pub mismatches: usize,
    pub match_percentage: f64,
    pub mismatch_list: Vec<Mismatch>,
}

impl ComparisonReport {
    pub fn is_exact_match(&self) -> bool {
        self.mismatches == 0
    }
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.mismatch_list {
            writeln!(
                f,
                "Mismatch at sample {}, neuron {}: A = {}, B = {}",
                m.sample, m.neuron, m.value_a, m.value_b
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Total Comparisons: {}", self.total_comparisons)?;
        writeln!(f, "Total Mismatches: {}", self.mismatches)?;
        write!(f, "Match Percentage: {:.2}%", self.match_percentage)
    }
}

/// Compare `[samples × neurons]` matrices for exact equality. Shapes are
/// checked before any cell is read; empty matrices are rejected because the
/// match percentage would be undefined.
pub fn compare(a: &Matrix, b: &Matrix) -> SnnResult<ComparisonReport> {
    if a.shape() != b.shape() {
        let (ra, ca) = a.shape();
        let (rb, cb) = b.shape();
        return Err(SnnError::shape_mismatch("output comparison", vec![ra, ca], vec![rb, cb]));
    }
    let (rows, cols) = a.shape();
    let total = rows * cols;
    if total == 0 {
        return Err(SnnError::shape_mismatch("output comparison", vec![1, 1], vec![rows, cols]));
    }

    let mut mismatch_list = Vec::new();
    for (sample, (row_a, row_b)) in a.iter_rows().zip(b.iter_rows()).enumerate() {
        for (neuron, (&va, &vb)) in row_a.iter().zip(row_b).enumerate() {
            if va != vb {
                debug!(sample, neuron, value_a = va, value_b = vb, "output mismatch");
                mismatch_list.push(Mismatch { sample, neuron, value_a: va, value_b: vb });
            }
        }
    }

    let mismatches = mismatch_list.len();
    let match_percentage = 100.0 * (total - mismatches) as f64 / total as f64;
    Ok(ComparisonReport { total_comparisons: total, mismatches, match_percentage, mismatch_list })
}
