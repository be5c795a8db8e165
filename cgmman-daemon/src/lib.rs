//! cgmman daemon: directory poller + daily log rotation.

mod error;
pub mod log_rotation;
pub mod logging;
pub mod paths;
pub mod poller;

pub use error::DaemonError;
pub use log_rotation::{Clock, DailyRotatingWriter, SharedDailyWriter, SystemClock};
pub use logging::{init_logging, LineFormat};
pub use poller::{request_stop, run, scan_files, scan_once, FileReport, PollerConfig, ScanSummary};
