pub mod device;
pub mod load;

pub use device::*;
pub use load::*;
