mod def;
mod pool;
mod property;
mod registry;

pub use def::*;
pub use pool::*;
pub use property::*;
pub use registry::*;
