//! Application-level configuration constants.

// Endpoints
pub const CALIBRATE_URL: &str = "/calibrate/";
pub const SIMULATE_URL: &str = "/simulate/";
pub const REQUEST_TIMEOUT_MS: u32 = 120_000;

// Default values for run options
pub const DEFAULT_HEADER: u32 = 0;
pub const DEFAULT_SEPARATOR: &str = ",";
pub const DEFAULT_WARM_UP: u32 = 10;
pub const DEFAULT_TOL: f64 = 0.001;
pub const DEFAULT_MINIMISE: bool = true;
pub const DEFAULT_VERBOSE: bool = true;
pub const DEFAULT_SNOW: bool = true;

// Initial model states and discharge
pub const DEFAULT_STATES: [(&str, f64); 5] =
    [("sp", 0.0), ("sm", 30.0), ("uz", 30.0), ("lz", 30.0), ("wc", 0.0)];
pub const DEFAULT_DISCHARGE: f64 = 0.183;

// Min limits for bounded inputs
pub const MIN_TOL: f64 = 0.0;
pub const MIN_AREA: f64 = 0.0;

// UI constants
pub const INVALID_CLASS: &str = "invalid";
pub const WARNING_CLASS: &str = "input-error";
