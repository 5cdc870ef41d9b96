pub mod architecture;
pub mod config;
pub mod errors;
pub mod family;
pub mod params;

pub use architecture::*;
pub use config::*;
pub use errors::*;
pub use family::*;
pub use params::*;
