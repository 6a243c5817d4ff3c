pub mod catalog_store;
pub mod config;
pub mod contract;
pub mod core_service;
pub mod count_fetcher;
pub mod index_store;
pub mod logging;
pub mod model;
pub mod query_engine;
pub mod refresh_scheduler;
pub mod runtime;
pub mod session_state;
pub mod session_store;
pub mod settings;
pub mod steam_api;
pub mod transport;
pub mod worker_pool;

#[cfg(test)]
mod tests {
    mod filter_latency_test {
        include!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../tests/perf/filter_latency_test.rs"
        ));
    }
}
