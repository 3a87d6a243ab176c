//! Dense tensors tagged with their memory residency.
//!
//! The hypergraph stores feature snapshots as `|V| x d` matrices and
//! feature history as `|V| x d x H` ring buffers, both 32-bit float. Either
//! may live on the host or on the accelerator lane; [`Tensor2`] and
//! [`Tensor3`] pair the storage with a [`Residency`] tag so call sites can
//! dispatch.
//!
//! Access contract: host-resident data may be read and written directly;
//! device-resident data is touched only through [`crate::backend::launch`]
//! kernels or materialised with `ensure_host`. Residency transfer moves the
//! numeric payload and nothing else.

use ndarray::{Array2, Array3, CowArray, Ix2, Ix3};

use crate::backend::Residency;

/// Dense `rows x cols` f32 matrix with a residency tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor2 {
    data: Array2<f32>,
    residency: Residency,
}

impl Tensor2 {
    /// Allocates a zeroed host-resident matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::zeros((rows, cols)),
            residency: Residency::Host,
        }
    }

    /// Wraps an existing host array.
    pub fn from_array(data: Array2<f32>) -> Self {
        Self {
            data,
            residency: Residency::Host,
        }
    }

    /// `(rows, cols)`.
    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Where the payload lives.
    pub fn residency(&self) -> Residency {
        self.residency
    }

    /// `true` when kernels must go through the launch wrapper.
    pub fn is_device_resident(&self) -> bool {
        self.residency.is_device()
    }

    /// Moves the payload to `target`. A same-domain transfer is a no-op.
    pub fn transfer(&mut self, target: Residency) {
        self.residency = target;
    }

    /// Returns a host-resident view of the payload: a borrow for host data,
    /// a copy for device data.
    pub fn ensure_host(&self) -> CowArray<'_, f32, Ix2> {
        match self.residency {
            Residency::Host => CowArray::from(self.data.view()),
            Residency::Device => CowArray::from(self.data.clone()),
        }
    }

    /// Direct storage access. Device-resident payloads must only be touched
    /// inside launch kernels.
    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    /// Mutable storage access under the same contract as [`Self::data`].
    pub fn data_mut(&mut self) -> &mut Array2<f32> {
        &mut self.data
    }

    /// Replaces the payload, keeping the residency tag.
    pub fn replace(&mut self, data: Array2<f32>) {
        self.data = data;
    }
}

/// Dense `d0 x d1 x d2` f32 tensor with a residency tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor3 {
    data: Array3<f32>,
    residency: Residency,
}

impl Tensor3 {
    /// Allocates a zeroed host-resident tensor.
    pub fn zeros(d0: usize, d1: usize, d2: usize) -> Self {
        Self {
            data: Array3::zeros((d0, d1, d2)),
            residency: Residency::Host,
        }
    }

    /// Wraps an existing host array.
    pub fn from_array(data: Array3<f32>) -> Self {
        Self {
            data,
            residency: Residency::Host,
        }
    }

    /// `(d0, d1, d2)`.
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Where the payload lives.
    pub fn residency(&self) -> Residency {
        self.residency
    }

    /// `true` when kernels must go through the launch wrapper.
    pub fn is_device_resident(&self) -> bool {
        self.residency.is_device()
    }

    /// Moves the payload to `target`. A same-domain transfer is a no-op.
    pub fn transfer(&mut self, target: Residency) {
        self.residency = target;
    }

    /// Host-resident view: borrow for host data, copy for device data.
    pub fn ensure_host(&self) -> CowArray<'_, f32, Ix3> {
        match self.residency {
            Residency::Host => CowArray::from(self.data.view()),
            Residency::Device => CowArray::from(self.data.clone()),
        }
    }

    /// Direct storage access. Device-resident payloads must only be touched
    /// inside launch kernels.
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Mutable storage access under the same contract as [`Self::data`].
    pub fn data_mut(&mut self) -> &mut Array3<f32> {
        &mut self.data
    }

    /// Replaces the payload, keeping the residency tag.
    pub fn replace(&mut self, data: Array3<f32>) {
        self.data = data;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_zeros_is_host_resident() {
        let t = Tensor2::zeros(3, 4);
        assert_eq!(t.dim(), (3, 4));
        assert_eq!(t.residency(), Residency::Host);
        assert!(!t.is_device_resident());
    }

    #[test]
    fn test_transfer_round_trip_preserves_values() {
        let mut t = Tensor2::from_array(array![[1.0, 2.0], [3.0, 4.0]]);
        let before = t.data().clone();
        t.transfer(Residency::Device);
        assert!(t.is_device_resident());
        t.transfer(Residency::Host);
        assert_eq!(t.data(), &before);
    }

    #[test]
    fn test_ensure_host_borrows_for_host_data() {
        let t = Tensor2::from_array(array![[5.0f32]]);
        let view = t.ensure_host();
        assert!((view[[0, 0]] - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_ensure_host_copies_device_data() {
        let mut t = Tensor3::zeros(2, 2, 2);
        t.data_mut()[[1, 1, 1]] = 7.0;
        t.transfer(Residency::Device);
        let host = t.ensure_host();
        assert!((host[[1, 1, 1]] - 7.0).abs() < f32::EPSILON);
    }
}
