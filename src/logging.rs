use crate::config::Logging;
use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Installs the global subscriber on stderr; stdout carries command output.
pub fn init(cfg: &Logging) {
    subscriber(cfg, std::io::stderr).init();
}

/// Builds the subscriber writing to `writer`. `RUST_LOG` wins over the
/// configured level.
pub fn subscriber<W>(cfg: &Logging, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Clone + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));
    let json = cfg
        .json
        .then(|| fmt::layer().json().with_target(false).with_writer(writer.clone()));
    let compact = (!cfg.json).then(|| fmt::layer().compact().with_writer(writer));
    tracing_subscriber::registry().with(filter).with(json).with(compact)
}
