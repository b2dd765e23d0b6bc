// ============================================================
// Layer 5 — Backend Selection
// ============================================================
// CPU (NdArray) by default; build with `--features wgpu` to
// run training and inference on the GPU instead.
//
// Training wraps the inner backend in Autodiff; evaluation and
// inference call `model.valid()` and run on the inner backend
// so no gradient graph is recorded.

use burn::prelude::Backend;

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

pub type TrainBackend = burn::backend::Autodiff<InferBackend>;

pub type Device = <InferBackend as Backend>::Device;

pub fn default_device() -> Device {
    let device = Device::default();
    tracing::info!("Using device: {:?}", device);
    device
}
