use thiserror::Error;

use crate::config::ConfigError;
use crate::das::SamplerError;
use crate::genesis::GenesisError;
use crate::logging::LoggingError;
use crate::nd;
use crate::proposal::PrepareError;

/// Common result alias for the node crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level node error. Each module keeps its own detailed enum and
/// converts into this one at the crate boundary.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    // ---- Protocol ----------------------------------------------------------
    #[error(transparent)]
    Nd(#[from] nd::Error),

    #[error("sampler: {0}")]
    Sampler(#[from] SamplerError),

    // ---- Consensus ---------------------------------------------------------
    /// Proposal preparation failed on locally trusted input.
    #[error("prepare proposal: {0}")]
    Prepare(#[from] PrepareError),

    #[error(transparent)]
    Native(#[from] dasquare_native::NativeError),

    // ---- Startup -----------------------------------------------------------
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("genesis: {0}")]
    Genesis(#[from] GenesisError),

    #[error("logging: {0}")]
    Logging(#[from] LoggingError),
}

impl Error {
    /// Whether asking again (possibly another peer) may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Nd(e) => matches!(
                e,
                nd::Error::NotFound
                    | nd::Error::RateLimited
                    | nd::Error::DeadlineExceeded
                    | nd::Error::OpenStream(_)
                    | nd::Error::SendRequest(_)
                    | nd::Error::ReadResponse(_)
            ),
            Error::Sampler(_)
            | Error::Prepare(_)
            | Error::Native(_)
            | Error::Config(_)
            | Error::Genesis(_)
            | Error::Logging(_) => false,
        }
    }
}
