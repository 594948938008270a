use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounterVec;
use prometheus::IntGaugeVec;
use prometheus::Opts;
use prometheus::Registry;
use tracing::warn;


lazy_static! {
    pub static ref REFRESH_SUCCESS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("toggle_refresh_success_total", "Successful snapshot fetches"),
        &["app_name"]
    )
    .expect("metric can not be created");

    pub static ref REFRESH_FAILURE_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("toggle_refresh_failure_total", "Failed snapshot fetches"),
        &["app_name"]
    )
    .expect("metric can not be created");

    pub static ref UPDATE_BATCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("toggle_update_batches_total", "Non-empty diff batches published"),
        &["app_name"]
    )
    .expect("metric can not be created");

    pub static ref TOGGLE_CHANGES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("toggle_changes_total", "Toggle changes applied to the cache"),
        &["app_name", "kind"]
    )
    .expect("metric can not be created");

    pub static ref SNAPSHOT_VERSION: IntGaugeVec = IntGaugeVec::new(
        Opts::new("toggle_snapshot_version", "Store version of the cached snapshot"),
        &["app_name"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();

    static ref DEFAULT_REGISTRATION: () = register_custom_metrics(&REGISTRY);
}

pub(crate) fn register_custom_metrics(registry: &Registry) {
    let collectors: [Box<dyn prometheus::core::Collector>; 5] = [
        Box::new(REFRESH_SUCCESS_TOTAL.clone()),
        Box::new(REFRESH_FAILURE_TOTAL.clone()),
        Box::new(UPDATE_BATCHES_TOTAL.clone()),
        Box::new(TOGGLE_CHANGES_TOTAL.clone()),
        Box::new(SNAPSHOT_VERSION.clone()),
    ];
    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            warn!("collector can not be registered: {}", e);
        }
    }
}

/// Text exposition of every toggle cache metric, for a scrape endpoint the
/// embedding application owns.
pub fn gather_metrics() -> String {
    *DEFAULT_REGISTRATION;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        warn!("could not encode custom metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub(crate) fn record_refresh_success(
    app_name: &str,
    version: u64,
) {
    REFRESH_SUCCESS_TOTAL.with_label_values(&[app_name]).inc();
    SNAPSHOT_VERSION
        .with_label_values(&[app_name])
        .set(i64::try_from(version).unwrap_or(i64::MAX));
}

pub(crate) fn record_refresh_failure(app_name: &str) {
    REFRESH_FAILURE_TOTAL.with_label_values(&[app_name]).inc();
}

pub(crate) fn record_update_batch(
    app_name: &str,
    changes: &[crate::ToggleDiff],
) {
    UPDATE_BATCHES_TOTAL.with_label_values(&[app_name]).inc();
    for change in changes {
        let kind = match change {
            crate::ToggleDiff::Added { .. } => "added",
            crate::ToggleDiff::Removed { .. } => "removed",
            crate::ToggleDiff::Changed { .. } => "changed",
        };
        TOGGLE_CHANGES_TOTAL.with_label_values(&[app_name, kind]).inc();
    }
}
