//! Backend selection and the unified kernel launch wrapper.
//!
//! The core runs its numeric kernels on one of two lanes:
//!
//! - [`Backend::Parallel`]: data-parallel fan-out over the rayon thread
//!   pool, scheduling fixed-size workgroups.
//! - [`Backend::Host`]: sequential execution, bitwise-reproducible.
//!
//! Detection happens once per process. Absence of a usable parallel lane is
//! never an error; execution degrades silently to the host lane. The
//! `FORCE_HOST_BACKEND` knob pins the host lane for reproducibility-critical
//! runs.
//!
//! Every launch is synchronous: [`launch`] returns only after the whole
//! range has been processed, which establishes happens-before between
//! consecutive kernels on the same storage.

use std::sync::OnceLock;

use rayon::prelude::*;
use tracing::debug;

use crate::error::BackendError;
use crate::knobs::RuntimeKnobs;

/// Number of elements per scheduled workgroup.
pub const WORKGROUP_SIZE: usize = 256;

/// Compute lane the core dispatches kernels to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Data-parallel execution over the thread pool.
    Parallel,
    /// Sequential host execution.
    Host,
}

impl Backend {
    /// Probes the environment once and returns the selected backend.
    ///
    /// The parallel lane is selected when more than one worker thread is
    /// available and `FORCE_HOST_BACKEND` is unset.
    pub fn detect() -> Backend {
        static DETECTED: OnceLock<Backend> = OnceLock::new();
        *DETECTED.get_or_init(|| {
            if RuntimeKnobs::global().force_host_backend {
                debug!("FORCE_HOST_BACKEND set, using host backend");
                return Backend::Host;
            }
            let threads = rayon::current_num_threads();
            if threads > 1 {
                debug!(threads, "parallel backend available");
                Backend::Parallel
            } else {
                debug!("single worker thread, using host backend");
                Backend::Host
            }
        })
    }

    /// Returns `true` for the parallel lane.
    #[must_use]
    pub fn is_parallel(&self) -> bool {
        matches!(self, Backend::Parallel)
    }

    /// Lane name for diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Parallel => "parallel",
            Backend::Host => "host",
        }
    }
}

/// Memory domain owning a numeric array.
///
/// `Device` marks storage whose kernels fan out on the parallel backend;
/// `Host` storage is touched directly. String and metadata containers are
/// always host-resident regardless of this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Residency {
    /// Host memory, direct access.
    Host,
    /// Accelerator-lane memory, access through kernels only.
    Device,
}

impl Residency {
    /// Predicate used to dispatch code paths on array location.
    #[must_use]
    pub fn is_device(&self) -> bool {
        matches!(self, Residency::Device)
    }
}

/// Schedules `kernel` over `out`, partitioned into workgroups of
/// [`WORKGROUP_SIZE`] elements, and blocks until the whole range is done.
///
/// The kernel receives the base linear index of its workgroup and a mutable
/// slice covering exactly that workgroup; writes are therefore to disjoint
/// indices by construction. Multi-dimensional ranges flatten row-major
/// before launch.
///
/// # Errors
///
/// Reserved for explicitly unsupported operations; both current lanes
/// accept every kernel.
pub fn launch<T, F>(backend: Backend, out: &mut [T], kernel: F) -> Result<(), BackendError>
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync,
{
    match backend {
        Backend::Parallel => {
            out.par_chunks_mut(WORKGROUP_SIZE)
                .enumerate()
                .for_each(|(group, chunk)| kernel(group * WORKGROUP_SIZE, chunk));
        }
        Backend::Host => {
            for (group, chunk) in out.chunks_mut(WORKGROUP_SIZE).enumerate() {
                kernel(group * WORKGROUP_SIZE, chunk);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_host_covers_range() {
        let mut out = vec![0u32; 1000];
        launch(Backend::Host, &mut out, |base, chunk| {
            for (i, v) in chunk.iter_mut().enumerate() {
                *v = (base + i) as u32;
            }
        })
        .unwrap();
        for (i, v) in out.iter().enumerate() {
            assert_eq!(*v, i as u32);
        }
    }

    #[test]
    fn test_launch_parallel_matches_host() {
        let mut host = vec![0.0f32; 777];
        let mut par = vec![0.0f32; 777];
        let kernel = |base: usize, chunk: &mut [f32]| {
            for (i, v) in chunk.iter_mut().enumerate() {
                *v = ((base + i) as f32).sqrt();
            }
        };
        launch(Backend::Host, &mut host, kernel).unwrap();
        launch(Backend::Parallel, &mut par, kernel).unwrap();
        assert_eq!(host, par);
    }

    #[test]
    fn test_launch_empty_range() {
        let mut out: Vec<f32> = vec![];
        launch(Backend::Host, &mut out, |_, _| panic!("must not run")).unwrap();
    }

    #[test]
    fn test_workgroup_base_indices() {
        let mut out = vec![0usize; WORKGROUP_SIZE * 3 + 5];
        launch(Backend::Host, &mut out, |base, chunk| {
            assert!(base % WORKGROUP_SIZE == 0);
            assert!(chunk.len() <= WORKGROUP_SIZE);
            for v in chunk.iter_mut() {
                *v = base;
            }
        })
        .unwrap();
        assert_eq!(out[0], 0);
        assert_eq!(out[WORKGROUP_SIZE], WORKGROUP_SIZE);
        assert_eq!(out[WORKGROUP_SIZE * 3 + 4], WORKGROUP_SIZE * 3);
    }

    #[test]
    fn test_residency_predicate() {
        assert!(Residency::Device.is_device());
        assert!(!Residency::Host.is_device());
    }
}
