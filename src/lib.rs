pub mod detector;
pub mod error;
pub mod problem;
pub mod sim;
pub mod ui;
pub mod utils;

pub use detector::{Detection, FireflyDetector, FireflyParams, KBestDetector, Receiver, firefly};
pub use error::{DetectError, DetectResult, SimError, SimResult};
