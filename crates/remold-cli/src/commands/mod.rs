pub mod extract;
pub mod init;
pub mod logs;
pub mod refactor;
pub mod version;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a file through the agent (or a saved transcript) and apply the result
    Refactor(refactor::RefactorArgs),
    /// Extract and validate a saved transcript without writing anything
    Extract(extract::ExtractArgs),
    /// List audit log entries (most recent first)
    Logs(logs::LogsArgs),
    /// Write a default config file
    Init(init::InitArgs),
    /// Print version information
    Version,
}
