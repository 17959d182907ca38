pub mod dispatcher;
pub mod memory;
pub mod queue;
pub mod worker;

pub use dispatcher::*;
pub use memory::*;
pub use queue::*;
pub use worker::*;
