pub mod settings;

pub use settings::{check_tree_label, BackupPolicy, LayoutKind, RemoldConfig, CONFIG_FILE};
