use super::ConfigError;

/// Constructor validation lifecycle shared by the spectral kernels.
///
/// A kernel checks its config once in [`KernelLifecycle::try_new`] and can
/// then be run over many inputs without repeating that work.
pub trait KernelLifecycle: Sized {
    /// Kernel config type.
    type Config;

    /// Construct a validated kernel from config.
    fn try_new(config: Self::Config) -> Result<Self, ConfigError>;
}
