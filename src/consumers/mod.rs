//! Consumers shipped with the probe.

mod do_work;

pub use do_work::{DoWorkConsumer, STEPS};
