use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LayerError, Result};

/// Runtime shape of a 4-D blob: (num, channels, height, width).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Shape {
    pub num: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl Shape {
    pub fn new(num: usize, channels: usize, height: usize, width: usize) -> Shape {
        Shape { num, channels, height, width }
    }

    /// Total number of elements.
    pub fn count(&self) -> usize {
        self.num * self.channels * self.height * self.width
    }

    /// Number of elements in one (height, width) plane.
    pub fn spatial(&self) -> usize {
        self.height * self.width
    }

    /// Same shape with a different batch size.
    pub fn with_num(self, num: usize) -> Shape {
        Shape { num, ..self }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.num, self.channels, self.height, self.width)
    }
}

/// Dense row-major 4-D array of `f64`, carrying a value buffer (`data`) and a
/// gradient buffer (`diff`) of the same length.
///
/// Element `(n, c, h, w)` lives at `((n * C + c) * H + h) * W + w`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Blob {
    shape: Shape,
    data: Vec<f64>,
    diff: Vec<f64>,
}

impl Blob {
    /// Zero-filled blob of the given dimensions.
    pub fn new(num: usize, channels: usize, height: usize, width: usize) -> Blob {
        Blob::with_shape(Shape::new(num, channels, height, width))
    }

    pub fn with_shape(shape: Shape) -> Blob {
        let count = shape.count();
        Blob {
            shape,
            data: vec![0.0; count],
            diff: vec![0.0; count],
        }
    }

    /// Wraps existing values. `data.len()` must equal `shape.count()`.
    pub fn from_data(shape: Shape, data: Vec<f64>) -> Result<Blob> {
        if data.len() != shape.count() {
            return Err(LayerError::Shape(format!(
                "{} values cannot fill a blob of shape {} ({} elements)",
                data.len(),
                shape,
                shape.count()
            )));
        }
        let diff = vec![0.0; data.len()];
        Ok(Blob { shape, data, diff })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn num(&self) -> usize {
        self.shape.num
    }

    pub fn channels(&self) -> usize {
        self.shape.channels
    }

    pub fn height(&self) -> usize {
        self.shape.height
    }

    pub fn width(&self) -> usize {
        self.shape.width
    }

    pub fn count(&self) -> usize {
        self.data.len()
    }

    /// Flat index of element `(n, c, h, w)`.
    pub fn offset(&self, n: usize, c: usize, h: usize, w: usize) -> usize {
        debug_assert!(n < self.shape.num && c < self.shape.channels);
        debug_assert!(h < self.shape.height && w < self.shape.width);
        ((n * self.shape.channels + c) * self.shape.height + h) * self.shape.width + w
    }

    /// Changes the shape in place. Leading elements are kept; any new
    /// elements are zero.
    pub fn reshape(&mut self, shape: Shape) {
        let count = shape.count();
        self.shape = shape;
        self.data.resize(count, 0.0);
        self.diff.resize(count, 0.0);
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn diff(&self) -> &[f64] {
        &self.diff
    }

    pub fn diff_mut(&mut self) -> &mut [f64] {
        &mut self.diff
    }

    /// Sets every data element to `value`.
    pub fn fill_data(&mut self, value: f64) {
        self.data.iter_mut().for_each(|x| *x = value);
    }

    /// Sets every diff element to `value`.
    pub fn fill_diff(&mut self, value: f64) {
        self.diff.iter_mut().for_each(|x| *x = value);
    }
}
