//! Dense real-valued tensors in row-major order.

/// A rectangular array of reals with an ordered shape.
///
/// Data is stored flat in row-major (C) order, the same order the
/// quantization pass emits and the on-chain graph rebuilds from.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Tensor {
    /// Build a tensor, checking that `data` fills `shape` exactly.
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self, String> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(format!(
                "shape {:?} needs {} elements, got {}",
                shape,
                expected,
                data.len()
            ));
        }
        Ok(Self { shape, data })
    }

    /// Rank-1 tensor.
    pub fn vector(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// Rank-2 tensor from nested rows. Rows must have equal length.
    pub fn matrix(rows: &[Vec<f64>]) -> Result<Self, String> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|r| r.len() != cols) {
            return Err(format!(
                "row {} has {} columns, expected {}",
                bad,
                rows[bad].len(),
                cols
            ));
        }
        Ok(Self {
            shape: vec![rows.len(), cols],
            data: rows.iter().flatten().copied().collect(),
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Flat row-major view of the elements.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element at a multi-dimensional index, or `None` if out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0;
        for (&i, &dim) in index.iter().zip(&self.shape) {
            if i >= dim {
                return None;
            }
            flat = flat * dim + i;
        }
        self.data.get(flat).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_element_count() {
        assert!(Tensor::new(vec![2, 3], vec![0.0; 6]).is_ok());
        let err = Tensor::new(vec![2, 3], vec![0.0; 5]).unwrap_err();
        assert!(err.contains("needs 6 elements, got 5"));
    }

    #[test]
    fn test_matrix_is_row_major() {
        let t = Tensor::matrix(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.data(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(t.get(&[1, 0]), Some(4.0));
        assert_eq!(t.get(&[0, 2]), Some(3.0));
        assert_eq!(t.get(&[2, 0]), None);
        assert_eq!(t.get(&[0]), None);
    }

    #[test]
    fn test_ragged_matrix_rejected() {
        assert!(Tensor::matrix(&[vec![1.0, 2.0], vec![3.0]]).is_err());
    }

    #[test]
    fn test_vector() {
        let t = Tensor::vector(vec![0.5, -0.5]);
        assert_eq!(t.rank(), 1);
        assert_eq!(t.len(), 2);
        assert!(!t.is_empty());
    }
}
