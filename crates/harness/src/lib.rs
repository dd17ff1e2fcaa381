//! Scenario orchestration for ledger node clusters.
//!
//! The harness drives a cluster of external node processes through
//! scripted failure/recovery and load steps, polling each node's RPC
//! endpoint and asserting protocol-level invariants along the way:
//!
//! - [`ThroughputMonitor`]: sliding-window block-production rate used
//!   to detect liveness degradation without misreading cold starts
//! - [`TxStatusValidator`]: cross-checks the two independently-derived
//!   receipt-id views of one transaction's execution
//! - [`ScenarioRunner`]: the Bootstrapping → Running → Succeeded/Failed
//!   state machine executing an ordered step list under a global
//!   wall-clock timeout
//!
//! Control flow is a single task with sequential awaits; the harness
//! drives at most one action at a time and treats node processes as
//! independently-scheduled external entities.

mod monitor;
mod receipts;
mod scenario;
pub mod scenarios;

pub use monitor::{HeightSample, ThroughputMonitor, MONITOR_WINDOW};
pub use receipts::{MismatchError, TxStatusValidator};
pub use scenario::{
    BpsThreshold, Scenario, ScenarioError, ScenarioRunner, ScenarioState, Step, TxTemplate,
};
