//! JSON Cache quickstart
//!
//! Builds a cache from the `SERVICES_CACHING_*` environment section, stores a
//! value, reads it back and shows get-or-set.
//!
//! ```text
//! SERVICES_CACHING_STRATEGY=memory cargo run
//! SERVICES_CACHING_STRATEGY=distributed \
//!     SERVICES_CACHING_CONNECTION_STRING=redis://127.0.0.1:6379/ cargo run
//! ```

use std::time::Duration;

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use json_cache::{build_cache, CacheConfig, EntryOptions};

const SECTION: &str = "SERVICES_CACHING";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Example {
    a: String,
    b: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "json_cache=info,json_cache_quickstart=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_section(SECTION).context("failed to load cache configuration")?;
    let cache = build_cache(&config)
        .await
        .with_context(|| format!("failed to build cache from the {}_* variables", SECTION))?;
    info!("Cache ready ({:?} backend)", cache.backend_kind());

    let original = Example {
        a: "1".to_string(),
        b: "2".to_string(),
    };
    cache.set("foo", &original).await?;

    let fetched: Option<Example> = cache.get("foo").await?;
    ensure!(
        fetched.as_ref() == Some(&original),
        "read back {:?}, expected {:?}",
        fetched,
        original
    );
    info!("Read back {:?}", original);

    let options = EntryOptions::new().with_sliding_expiration(Duration::from_secs(300));
    let computed = cache
        .get_or_set("bar", &options, || async {
            info!("Computing value for 'bar'");
            Some(Example {
                a: "3".to_string(),
                b: "4".to_string(),
            })
        })
        .await?;
    let again = cache
        .get_or_set_with("bar", &options, || -> Option<Example> { None })
        .await?;
    ensure!(computed == again, "second get_or_set did not hit the cache");
    info!("get_or_set returned {:?} twice, computed once", again);

    cache.remove("foo").await?;
    cache.remove("bar").await?;
    Ok(())
}
