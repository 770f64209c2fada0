mod alias;
mod def;
mod handle;
mod table;

pub use alias::*;
pub use def::*;
pub use handle::*;
pub(crate) use table::*;
