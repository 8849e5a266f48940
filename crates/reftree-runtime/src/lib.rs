//! reftree-runtime: configuration and wiring for the reference resolver
//!
//! This crate turns loaded settings into a ready-to-use
//! [`ReferenceResolver`] and installs the process-wide logging subscriber.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               reftree-runtime               │
//! ├─────────────────────────────────────────────┤
//! │  config.rs   - YAML + env configuration     │
//! │  logging.rs  - tracing subscriber setup     │
//! └─────────────────────────────────────────────┘
//!                       │
//!                       ▼
//!                reftree-domain
//! ```

pub mod config;
pub mod logging;

use std::sync::Arc;

use reftree_domain::{register_resolver_metrics, ReferenceResolver, ReferenceStore};

// Re-exports for convenience
pub use config::{ConfigLoadError, ReftreeConfig};
pub use logging::{init_logging, LoggingConfig};

/// Builds a resolver with its own store from loaded settings.
pub fn build_resolver(config: &ReftreeConfig) -> Result<ReferenceResolver, ConfigLoadError> {
    config.validate()?;
    Ok(ReferenceResolver::with_config(config.resolver_config()))
}

/// Builds a resolver over a store shared with other resolvers.
pub fn build_resolver_with_store(
    config: &ReftreeConfig,
    store: Arc<ReferenceStore>,
) -> Result<ReferenceResolver, ConfigLoadError> {
    config.validate()?;
    Ok(ReferenceResolver::with_store(store, config.resolver_config()))
}

/// Process startup: installs logging, describes metrics, and returns a resolver.
pub fn init(config: &ReftreeConfig) -> Result<ReferenceResolver, ConfigLoadError> {
    config.validate()?;
    init_logging(LoggingConfig::from_settings(&config.logging)?);
    if config.metrics.enabled {
        register_resolver_metrics();
    }
    let resolver = build_resolver(config)?;
    tracing::info!(
        dedup_in_flight = config.resolver.dedup_in_flight,
        max_concurrent_fetches = config.resolver.max_concurrent_fetches,
        failed_id_scope = ?config.resolver.failed_id_scope,
        "reference resolver initialised"
    );
    Ok(resolver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reftree_domain::FailedIdScope;

    #[test]
    fn test_build_resolver_applies_settings() {
        let mut config = ReftreeConfig::default();
        config.resolver.dedup_in_flight = false;
        config.resolver.max_concurrent_fetches = 4;
        config.resolver.failed_id_scope = FailedIdScope::PerEntityType;

        let resolver = build_resolver(&config).unwrap();

        assert!(!resolver.config().dedup_in_flight);
        assert_eq!(resolver.config().max_concurrent_fetches, 4);
        assert_eq!(resolver.config().failed_id_scope, FailedIdScope::PerEntityType);
    }

    #[test]
    fn test_build_resolver_rejects_invalid_settings() {
        let mut config = ReftreeConfig::default();
        config.resolver.max_concurrent_fetches = 0;

        let err = build_resolver(&config).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Invalid { .. }));
    }

    #[test]
    fn test_resolvers_built_over_one_store_share_it() {
        let config = ReftreeConfig::default();
        let store = Arc::new(ReferenceStore::new(FailedIdScope::Global));

        let first = build_resolver_with_store(&config, Arc::clone(&store)).unwrap();
        let second = build_resolver_with_store(&config, Arc::clone(&store)).unwrap();

        assert!(Arc::ptr_eq(first.store(), second.store()));
    }

    #[test]
    fn test_init_rejects_invalid_config_before_installing_logging() {
        let mut config = ReftreeConfig::default();
        config.resolver.max_concurrent_fetches = 0;

        assert!(init(&config).is_err());
    }
}
