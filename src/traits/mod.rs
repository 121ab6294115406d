mod driver;
mod escape;

pub use driver::{Adapter, DriverConnection, ThreadId};
pub use escape::Escape;
