pub mod pipe;

pub use pipe::{PipeOptions, display_progress_pipe};
