//! Configuration for tests running against a local mock API

use std::path::Path;
use std::time::Duration;

use vsco_dl::Config;
use vsco_dl::config::RetryConfig;

/// Config pointing at `base_url`, mirroring into `dir/downloads` with state in `dir/state`
pub fn test_config(base_url: &str, dir: &Path) -> Config {
    let mut config = Config::default();
    config.api.base_url = base_url.to_string();
    config.download.download_dir = dir.join("downloads");
    config.download.request_timeout = Duration::from_secs(5);
    config.persistence.state_dir = dir.join("state");
    config.retry = RetryConfig {
        max_attempts: 2,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    config
}
