//! Handler state: the data provider behind every endpoint.
//!
//! Provider calls do network and disk I/O, so handlers take an owned
//! [`AppState::provider`] handle into `spawn_blocking`.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use f1data_lib::{DataProvider, Error as LibError, LiveProvider, LiveProviderConfig, ResponseCache};

#[derive(Debug, thiserror::Error)]
pub enum AppStateError {
    #[error("failed to enable response cache: {0}")]
    CacheInit(#[source] LibError),
}

/// Cloning shares the provider.
///
/// ```ignore
/// async fn provider(State(state): State<AppState>) -> String {
///     state.provider_name().to_string()
/// }
///
/// let state = AppState::live(LiveProviderConfig::from_env(), Some(&cache_dir))?;
/// let app = Router::new().route("/provider", get(provider)).with_state(state);
/// ```
#[derive(Clone)]
pub struct AppState {
    provider: Arc<dyn DataProvider>,
}

impl AppState {
    /// The Ergast/OpenF1 provider, with the response cache in `cache_dir`
    /// when one is given.
    pub fn live(
        config: LiveProviderConfig,
        cache_dir: Option<&Path>,
    ) -> Result<Self, AppStateError> {
        let cache = cache_dir
            .map(ResponseCache::enable)
            .transpose()
            .map_err(AppStateError::CacheInit)?;
        if cache.is_none() {
            tracing::warn!("response cache disabled, every request goes upstream");
        }

        tracing::info!(
            ergast_url = %config.ergast_url,
            openf1_url = %config.openf1_url,
            "live provider configured"
        );
        Ok(AppState::from_provider(LiveProvider::new(config, cache)))
    }

    pub fn from_provider(provider: impl DataProvider + 'static) -> Self {
        AppState {
            provider: Arc::new(provider),
        }
    }

    pub fn provider(&self) -> Arc<dyn DataProvider> {
        self.provider.clone()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn provider_version(&self) -> &str {
        self.provider.version()
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AppState({} {})", self.provider_name(), self.provider_version())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FixtureProvider;

    #[test]
    fn clones_share_one_provider() {
        let state = AppState::from_provider(FixtureProvider::new());
        let copy = state.clone();
        assert!(Arc::ptr_eq(&state.provider(), &copy.provider()));
        assert_eq!(copy.provider_name(), "fixture");
    }

    #[test]
    fn debug_names_the_provider() {
        let state = AppState::from_provider(FixtureProvider::new());
        assert!(format!("{state:?}").starts_with("AppState(fixture "));
    }

    #[test]
    fn live_state_without_cache() {
        let state = AppState::live(LiveProviderConfig::default(), None).unwrap();
        assert_eq!(state.provider_name(), "f1data-live");
    }

    #[test]
    fn cache_path_that_is_a_file_is_rejected() {
        let file = std::env::temp_dir().join(format!("f1data-state-{}", std::process::id()));
        std::fs::write(&file, b"not a directory").unwrap();

        let result = AppState::live(LiveProviderConfig::default(), Some(&file));
        std::fs::remove_file(&file).unwrap();

        assert!(matches!(result, Err(AppStateError::CacheInit(_))));
    }
}
