pub mod paper;
pub mod settings;

pub use paper::*;
pub use settings::*;
