//! Link-level simulation harness driving the detectors with synthetic
//! Rayleigh-faded traffic.

pub mod channel;
pub mod config;
pub mod link;
pub mod modem;
pub mod report;

pub use channel::MimoFlatChannel;
pub use config::{ReceiverSpec, SweepConfig};
pub use link::{
    BerPoint, LinkModel, Silent, StopCriteria, SweepObserver, link_performance, run_sweep,
};
pub use modem::Modem;
pub use report::{ReceiverReport, SweepReport};
