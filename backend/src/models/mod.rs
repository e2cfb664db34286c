pub mod interval;
pub mod macros;
pub mod records;

pub use interval::*;
pub use records::*;
