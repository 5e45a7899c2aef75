use candle_core::Device;
use tracing::info;

/// Pick the inference device. CPU is the default; Metal is opt-in via the
/// `metal` feature and falls back to CPU when unavailable.
pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(dev) = Device::new_metal(0) {
            info!("device: Metal (MPS)");
            return dev;
        }
    }
    info!("device: CPU");
    Device::Cpu
}
