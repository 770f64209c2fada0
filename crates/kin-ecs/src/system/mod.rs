mod def;
mod manager;

pub use def::*;
pub use manager::*;
