//! Prometheus metrics for database queries and the connection pool.

use std::time::Duration;

use prometheus::core::Collector;
use prometheus::{Gauge, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};

use crate::error::Error;

#[derive(Debug, Clone)]
pub struct Metrics {
    pub query_total: IntCounter,
    pub explain_total: IntCounter,
    pub error_total: IntCounter,
    pub query_execution_time: Histogram,
    pub pool: PoolMetrics,
}

/// Gauges mirroring the state and options of the connection pool.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub size: IntGauge,
    pub idle_count: IntGauge,
    pub active_count: IntGauge,
    pub max_connections: IntGauge,
    pub acquire_timeout: Gauge,
    pub idle_timeout: Gauge,
    pub max_lifetime: Gauge,
}

fn register<C: Collector + Clone + 'static>(registry: &mut Registry, collector: C) -> Result<C, Error> {
    registry.register(Box::new(collector.clone()))?;
    Ok(collector)
}

fn counter(registry: &mut Registry, name: &str, help: &str) -> Result<IntCounter, Error> {
    register(registry, IntCounter::with_opts(Opts::new(name, help))?)
}

fn int_gauge(registry: &mut Registry, name: &str, help: &str) -> Result<IntGauge, Error> {
    register(registry, IntGauge::with_opts(Opts::new(name, help))?)
}

fn seconds_gauge(registry: &mut Registry, name: &str, help: &str) -> Result<Gauge, Error> {
    register(registry, Gauge::with_opts(Opts::new(name, help))?)
}

/// Register every metric with the registry. Fails if they are already registered.
pub fn initialise_metrics(registry: &mut Registry) -> Result<Metrics, Error> {
    let pool = PoolMetrics {
        size: int_gauge(
            registry,
            "objquery_pool_size",
            "Open connections, idle or in use.",
        )?,
        idle_count: int_gauge(registry, "objquery_pool_idle", "Open connections not in use.")?,
        active_count: int_gauge(registry, "objquery_pool_active", "Connections in use.")?,
        max_connections: int_gauge(
            registry,
            "objquery_pool_max_connections",
            "Upper bound on open connections.",
        )?,
        acquire_timeout: seconds_gauge(
            registry,
            "objquery_pool_acquire_timeout",
            "Seconds to wait for a free connection before failing.",
        )?,
        idle_timeout: seconds_gauge(
            registry,
            "objquery_pool_idle_timeout",
            "Seconds an idle connection is kept open, or 0.",
        )?,
        max_lifetime: seconds_gauge(
            registry,
            "objquery_pool_max_lifetime",
            "Seconds a connection is kept open at most, or 0.",
        )?,
    };

    Ok(Metrics {
        query_total: counter(registry, "objquery_query_total", "Queries run to completion.")?,
        explain_total: counter(registry, "objquery_explain_total", "Explains run to completion.")?,
        error_total: counter(
            registry,
            "objquery_error_total",
            "Queries the database rejected.",
        )?,
        query_execution_time: register(
            registry,
            Histogram::with_opts(HistogramOpts::new(
                "objquery_query_execution_time",
                "Seconds spent waiting for the database to answer a query.",
            ))?,
        )?,
        pool,
    })
}

fn seconds(duration: Option<Duration>) -> f64 {
    duration.unwrap_or(Duration::ZERO).as_secs_f64()
}

/// Copy the current state of the pool into its gauges.
pub fn update_pool_metrics(pool: &sqlx::PgPool, metrics: &Metrics) {
    let gauges = &metrics.pool;
    let size = i64::from(pool.size());
    let idle = i64::try_from(pool.num_idle()).unwrap_or(i64::MAX);
    gauges.size.set(size);
    gauges.idle_count.set(idle);
    gauges.active_count.set(size - idle);

    let options = pool.options();
    gauges
        .max_connections
        .set(i64::from(options.get_max_connections()));
    gauges
        .acquire_timeout
        .set(seconds(Some(options.get_acquire_timeout())));
    gauges.idle_timeout.set(seconds(options.get_idle_timeout()));
    gauges.max_lifetime.set(seconds(options.get_max_lifetime()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_register_once_per_registry() {
        let mut registry = prometheus::Registry::new();
        let metrics = initialise_metrics(&mut registry).expect("first registration");
        metrics.query_total.inc();

        let families = registry.gather();
        let query_total = families
            .iter()
            .find(|family| family.get_name() == "objquery_query_total")
            .expect("query_total is registered");
        assert_eq!(query_total.get_metric()[0].get_counter().get_value(), 1.0);

        assert!(matches!(
            initialise_metrics(&mut registry),
            Err(Error::PrometheusError(_))
        ));
    }
}
