pub mod background_worker;

pub use background_worker::{BackgroundWorker, TickReport};
