//! Tensor API.
//!
//! Tensors are the inputs and outputs of neural networks. A tensor is an N-dimensional array of
//! `f32`s in row-major order.

use std::fmt;

use ndarray::{ArrayD, ArrayViewD, Axis, Dimension, IxDyn};

/// An owned N-dimensional array of `f32`s.
#[derive(Clone, PartialEq)]
pub struct Tensor {
    data: ArrayD<f32>,
}

/// A borrowed view into a [`Tensor`].
#[derive(Clone)]
pub struct TensorView<'a> {
    data: ArrayViewD<'a, f32>,
}

impl Tensor {
    /// Creates an `N`-dimensional tensor of the given shape by calling `f` for each element.
    ///
    /// `f` is called with successive indices, starting with `[0, ..., 0, 0]`, then
    /// `[0, ..., 0, 1]` and so on.
    pub fn from_array_shape_fn<const N: usize, F: FnMut([usize; N]) -> f32>(
        shape: [usize; N],
        mut f: F,
    ) -> Self {
        let data = ArrayD::from_shape_fn(IxDyn(&shape), |index| {
            let mut indices = [0; N];
            indices.copy_from_slice(index.slice());
            f(indices)
        });
        Self { data }
    }

    /// Creates a tensor of the given shape by pulling elements from an iterator.
    ///
    /// # Panics
    ///
    /// `iter` must yield exactly as many elements as specified by `shape` (by multiplying all of
    /// its entries), otherwise this method will panic.
    pub fn from_iter<I: IntoIterator<Item = f32>>(shape: &[usize], iter: I) -> Self {
        let data = iter.into_iter().collect::<Vec<_>>();
        let data = ArrayD::from_shape_vec(IxDyn(shape), data)
            .unwrap_or_else(|e| panic!("invalid data for tensor of shape {:?}: {}", shape, e));
        Self { data }
    }

    pub(super) fn from_tract(tract: &tract_onnx::prelude::Tensor) -> anyhow::Result<Self> {
        let data = tract.to_array_view::<f32>()?.to_owned();
        Ok(Self { data })
    }

    pub(super) fn into_tract(self) -> tract_onnx::prelude::Tensor {
        self.data.into()
    }

    /// Returns the shape of this tensor.
    ///
    /// A tensor's shape is the number of entries in each dimension.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Returns the number of dimensions of this tensor.
    #[inline]
    pub fn rank(&self) -> usize {
        self.data.ndim()
    }

    /// Indexes a prefix of the tensor's dimensions with `indices`.
    ///
    /// For an example, consider a tensor of shape `[2, 3, 4, 5]`. Indexing it with 2 indices
    /// `[a, b]` will return a view of shape `[4, 5]`, while indexing it with 4 indices
    /// `[a, b, c, d]` will return a view of shape `[]` (aka a single value).
    ///
    /// # Panics
    ///
    /// This method will panic if `indices` has more entries than `self` has dimensions, or if any
    /// index is out of bounds.
    #[track_caller]
    pub fn index<const N: usize>(&self, indices: [usize; N]) -> TensorView<'_> {
        self.view().index(indices)
    }

    pub fn view(&self) -> TensorView<'_> {
        TensorView {
            data: self.data.view(),
        }
    }
}

impl<'a> TensorView<'a> {
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.data.ndim()
    }

    /// Indexes a prefix of the view's dimensions with `indices`.
    ///
    /// See [`Tensor::index`].
    #[track_caller]
    pub fn index<const N: usize>(&self, indices: [usize; N]) -> TensorView<'a> {
        assert!(
            N <= self.rank() && indices.iter().zip(self.shape()).all(|(i, len)| i < len),
            "attempted to index tensor of shape {:?} with {:?}",
            self.shape(),
            indices
        );

        let mut data = self.data.clone();
        for index in indices {
            data = data.index_axis_move(Axis(0), index);
        }
        TensorView { data }
    }

    /// Copies all values of this view into a [`Vec`], in row-major order.
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    /// Returns the value stored in a 0-dimensional view.
    ///
    /// # Panics
    ///
    /// The view must have exactly 0 dimensions, otherwise this method will panic.
    #[track_caller]
    pub fn as_singular(&self) -> f32 {
        assert_eq!(
            self.rank(),
            0,
            "attempted to access tensor of shape {:?} as singular element",
            self.shape(),
        );
        self.data.iter().copied().next().unwrap_or_default()
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor {:?}", self.shape())
    }
}

impl fmt::Debug for TensorView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TensorView {:?}", self.shape())
    }
}
