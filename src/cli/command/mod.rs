pub mod forecast;
pub mod knobs;
pub mod spatial;

pub use forecast::forecast;
pub use knobs::knobs;
pub use spatial::spatial;
