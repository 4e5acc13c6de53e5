mod advance;
mod atomic;
mod interface;
mod lazy;
mod lock;
mod mutex;
mod spin;
mod status;

pub(crate) use advance::*;
pub use atomic::*;
pub use interface::*;
pub use lazy::*;
pub use lock::*;
pub(crate) use mutex::*;
pub use spin::*;
pub use status::*;
