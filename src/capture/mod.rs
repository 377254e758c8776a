mod controller;
mod location;
mod loop_worker;

pub use controller::CaptureController;
pub use location::{FixedLocation, Location, LocationError, LocationProvider, NoLocation};
pub use loop_worker::{assemble_candidate, capture_loop, CaptureNotice, DecodeEvent};
