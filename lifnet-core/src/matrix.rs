//! Dense row-major matrix for synaptic weights and sample × neuron outputs.

use crate::error::{SnnError, SnnResult};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> SnnResult<Self> {
        if data.len() != rows * cols {
            return Err(SnnError::shape_mismatch("matrix data", vec![rows * cols], vec![data.len()]));
        }
        Ok(Self { rows, cols, data })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { rows, cols, data: vec![0.0; rows * cols] }
    }

    /// Build from row vectors; ragged input is a shape error.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> SnnResult<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let n = rows.len();
        let mut data = Vec::with_capacity(n * cols);
        for row in rows {
            if row.len() != cols {
                return Err(SnnError::shape_mismatch("matrix rows", vec![cols], vec![row.len()]));
            }
            data.extend(row);
        }
        Ok(Self { rows: n, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.rows).map(move |r| self.row(r))
    }

    /// y = A · x
    pub fn mul_vec(&self, x: &[f64]) -> SnnResult<Vec<f64>> {
        if x.len() != self.cols {
            return Err(SnnError::shape_mismatch("matrix-vector product", vec![self.cols], vec![x.len()]));
        }
        Ok(self
            .iter_rows()
            .map(|row| row.iter().zip(x).map(|(w, v)| w * v).sum())
            .collect())
    }

    /// y = Aᵀ · x
    pub fn mul_vec_transposed(&self, x: &[f64]) -> SnnResult<Vec<f64>> {
        if x.len() != self.rows {
            return Err(SnnError::shape_mismatch("transposed product", vec![self.rows], vec![x.len()]));
        }
        let mut out = vec![0.0; self.cols];
        for (row, &scale) in self.iter_rows().zip(x) {
            for (o, w) in out.iter_mut().zip(row) {
                *o += w * scale;
            }
        }
        Ok(out)
    }

    /// A += a ⊗ b  (a has `rows` entries, b has `cols`)
    pub fn add_outer(&mut self, a: &[f64], b: &[f64]) {
        debug_assert_eq!(a.len(), self.rows);
        debug_assert_eq!(b.len(), self.cols);
        for (r, &ar) in a.iter().enumerate() {
            let row = &mut self.data[r * self.cols..(r + 1) * self.cols];
            for (w, &bc) in row.iter_mut().zip(b) {
                *w += ar * bc;
            }
        }
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Matrix {
        Matrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap()
    }

    #[test]
    fn products() {
        let m = sample();
        assert_eq!(m.mul_vec(&[1.0, 0.0, -1.0]).unwrap(), vec![-2.0, -2.0]);
        assert_eq!(m.mul_vec_transposed(&[1.0, 1.0]).unwrap(), vec![5.0, 7.0, 9.0]);
        assert!(m.mul_vec(&[1.0]).is_err());
        assert!(m.mul_vec_transposed(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn outer_accumulates() {
        let mut m = Matrix::zeros(2, 2);
        m.add_outer(&[1.0, 2.0], &[3.0, 4.0]);
        m.add_outer(&[1.0, 0.0], &[1.0, 1.0]);
        assert_eq!(m.data(), &[4.0, 5.0, 6.0, 8.0]);
    }

    #[test]
    fn shape_checks() {
        assert!(Matrix::new(2, 2, vec![0.0; 3]).is_err());
        assert!(matches!(
            Matrix::from_rows(vec![vec![1.0], vec![1.0, 2.0]]),
            Err(SnnError::ShapeMismatch { .. })
        ));
        let m = sample();
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);
        assert_eq!(m.get(0, 2), 3.0);
    }
}
