mod settings;

pub use settings::{CONFIG_FILE, DEFAULT_DATA_DIR, RetrySettings, Settings, StorageSettings};
