/// Default log level, overridden by RUST_LOG
pub const LOG_LEVEL: &str = "info";

/// Progress refresh interval (milliseconds)
pub const PROGRESS_UPDATE_INTERVAL_MS: u64 = 100;

// ============================================================================
// Detector Parameters
// ============================================================================

/// Candidate pool size used when none is given
pub const DEFAULT_FIREFLY_ITERATIONS: usize = 100;

/// Attractiveness decay scale
pub const DEFAULT_FIREFLY_GAMMA: f64 = 0.5;

/// Exponent applied to the squared distance
pub const DEFAULT_FIREFLY_K: f64 = 1.0;

/// Survivors kept by the reference K-best receiver
pub const DEFAULT_KBEST_K: usize = 16;

/// R diagonal entries below this fraction of the largest one flag the
/// channel as near-singular
pub const ILL_CONDITIONED_RATIO: f64 = 1e-10;

// ============================================================================
// Link Simulation Parameters
// ============================================================================

/// Transmit antennas
pub const DEFAULT_NB_TX: usize = 8;

/// Receive antennas
pub const DEFAULT_NB_RX: usize = 8;

/// Bit errors after which an SNR point is considered converged
pub const DEFAULT_TARGET_ERRORS: u64 = 200;

/// Lowest BER the sweep is expected to resolve
pub const TARGET_BER_FLOOR: f64 = 4e-4;

/// Bits per simulated chunk
pub const DEFAULT_CHUNK_BITS: usize = 1440;

/// SNR grid (dB): start, stop (exclusive), step
pub const DEFAULT_SNR_DB: (f64, f64, f64) = (0.0, 14.0, 2.0);

/// Firefly pool sizes compared by the default sweep
pub const DEFAULT_SWEEP_ITERATIONS: [usize; 4] = [20, 40, 60, 100];

/// Seed of the default sweep
pub const DEFAULT_SEED: u64 = 0x5EED;
