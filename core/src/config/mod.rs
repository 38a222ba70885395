mod load;
mod types;

pub use load::{get_stagehand_data_dir, load_default, load_from};
pub use types::{ExecutorConfig, LoaderConfig, LoggingConfig, ProgressConfig};
