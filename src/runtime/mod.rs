//! # Runtime
//!
//! Harness bootstrap: rustls crypto provider, tracing subscriber, and the
//! environment-driven settings a scenario run needs.

use crate::constants;

/// Install the rustls crypto provider.
///
/// Required for rustls 0.23+ when no default provider is set via features.
/// Must run before any client (Kubernetes or MongoDB) negotiates TLS; safe
/// to call more than once, later calls are ignored.
pub fn init_crypto() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Initialize a tracing subscriber suitable for test binaries.
///
/// Honors `RUST_LOG`, defaulting to harness-level info; ignores the error
/// when a subscriber is already installed so every test can call it.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mongodb_cluster_e2e=info,kube=warn".into()),
        )
        .with_test_writer()
        .try_init();
}

/// The namespace scenarios run in, from `E2E_NAMESPACE` or the default.
pub fn test_namespace() -> String {
    std::env::var(constants::ENV_E2E_NAMESPACE)
        .unwrap_or_else(|_| constants::DEFAULT_E2E_NAMESPACE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_falls_back_to_default() {
        std::env::remove_var(constants::ENV_E2E_NAMESPACE);
        assert_eq!(test_namespace(), constants::DEFAULT_E2E_NAMESPACE);
    }
}
