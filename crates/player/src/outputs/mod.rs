pub mod simulated;

#[cfg(feature = "rodio-output")]
pub mod rodio_output;

pub use simulated::SimulatedOutput;

#[cfg(feature = "rodio-output")]
pub use rodio_output::RodioOutput;
