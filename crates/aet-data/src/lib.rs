pub mod catalog;
pub mod records;
pub mod storage;

pub use catalog::*;
pub use records::*;
pub use storage::*;
