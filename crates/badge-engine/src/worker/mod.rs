pub mod badge_scan_worker;

pub use badge_scan_worker::{BadgeScanWorker, TickSummary};
