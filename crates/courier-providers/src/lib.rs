//! # courier-providers
//!
//! AI backend adapters for Courier. Both backends drive a locally installed
//! CLI as a subprocess: `claude` runs in batch mode, `qwen` is streamed.

pub mod batch;
pub mod process;
pub mod streaming;

use courier_core::config::{BackendConfig, BackendKind};
use courier_core::traits::Backend;
use std::sync::Arc;

pub use batch::BatchBackend;
pub use streaming::StreamingBackend;

/// Build the adapter for one backend kind.
pub fn build_backend(kind: BackendKind, config: &BackendConfig) -> Arc<dyn Backend> {
    let cli = config.cli(kind).clone();
    match kind {
        BackendKind::Claude => Arc::new(BatchBackend::from_config(kind.name(), cli)),
        BackendKind::Qwen => Arc::new(StreamingBackend::from_config(kind.name(), cli)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_backend_names() {
        let config = BackendConfig::default();
        for kind in BackendKind::ALL {
            assert_eq!(build_backend(kind, &config).name(), kind.name());
        }
    }
}
