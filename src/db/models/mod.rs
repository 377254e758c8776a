pub mod scan;

pub use scan::{NewScan, ScanPatch, ScanRecord};
