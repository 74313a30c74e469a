pub mod store;
pub mod zkp;

pub use store::{CircuitBreaker, MetricsSnapshot, MetricsStore, StatusClass};
pub use zkp::{ZkpMetrics, ZkpSnapshot};
