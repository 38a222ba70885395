pub mod cli;
pub mod resolve;
pub mod run;

/// Exit code when resolution or a stage failed and the errors were reported.
pub const EXIT_LOADING_FAILED: i32 = 30;
