pub mod proof;

mod caveats;
mod data;
mod semantics;

pub use caveats::*;
pub use data::*;
pub use semantics::*;
