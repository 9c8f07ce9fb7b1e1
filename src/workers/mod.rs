pub mod progress;

pub use progress::{ProgressEvent, ProgressWorker};
