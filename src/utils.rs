/// Device selection and run utilities
use candle_core::Device;
use candle_nn::VarMap;

/// Parse a comma-separated GPU id list
pub fn parse_gpu_ids(spec: &str) -> crate::Result<Vec<usize>> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>().map_err(|_| {
                crate::QuadTuneError::Config(format!("invalid gpu id '{}'", s))
            })
        })
        .collect()
}

/// Pick the compute device and report the replica count
///
/// With CUDA available, the first listed GPU id hosts the step and the
/// list length is the replica count the loss reduction sees; otherwise a
/// single CPU device.
pub fn select_device(gpu_ids: &[usize]) -> crate::Result<(Device, usize)> {
    if candle_core::utils::cuda_is_available() && !gpu_ids.is_empty() {
        let device = Device::new_cuda(gpu_ids[0])?;
        Ok((device, gpu_ids.len()))
    } else {
        Ok((Device::Cpu, 1))
    }
}

/// Seed the device RNG; the CPU backend has no seedable RNG, which is fine
/// because nothing on the data path draws random numbers
pub fn seed_device(device: &Device, seed: u64) {
    if let Err(err) = device.set_seed(seed) {
        log::debug!("device RNG not seedable: {}", err);
    }
}

/// Count the trainable parameters registered in a `VarMap`
pub fn count_parameters(varmap: &VarMap) -> usize {
    varmap
        .all_vars()
        .iter()
        .map(|var| var.as_tensor().elem_count())
        .sum()
}
