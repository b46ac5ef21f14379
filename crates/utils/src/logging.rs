//! Process-wide tracing setup.

use sentry_tracing::EventFilter;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the fmt subscriber filtered by `RUST_LOG` (falling back to
/// `default_filter`). When `SENTRY_DSN` is set, errors are also reported to
/// Sentry and warnings are kept as breadcrumbs.
///
/// The returned guard must be held for the lifetime of the process.
pub fn init(default_filter: &str) -> Option<sentry::ClientInitGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let guard = std::env::var("SENTRY_DSN")
        .ok()
        .filter(|dsn| !dsn.trim().is_empty())
        .map(|dsn| {
            sentry::init((
                dsn,
                sentry::ClientOptions {
                    release: sentry::release_name!(),
                    attach_stacktrace: true,
                    ..Default::default()
                },
            ))
        });

    let sentry_layer = guard.as_ref().map(|_| {
        sentry_tracing::layer().event_filter(|md| match *md.level() {
            Level::ERROR => EventFilter::Event,
            Level::WARN => EventFilter::Breadcrumb,
            _ => EventFilter::Ignore,
        })
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(sentry_layer)
        .init();

    guard
}
