pub mod progress;

pub use progress::{ProgressManager, templates};

pub fn print_banner() {
    eprintln!("firefly-mimo {}", env!("CARGO_PKG_VERSION"));
}
