use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("No agent command configured")]
    NotConfigured,

    #[error("Invalid agent command: {0}")]
    InvalidCommand(String),

    #[error("Failed to start agent `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error talking to agent: {0}")]
    Io(#[from] std::io::Error),

    #[error("Agent exited with {}: {stderr}", code.map(|c| format!("code {c}")).unwrap_or_else(|| "a signal".into()))]
    Failed { code: Option<i32>, stderr: String },

    #[error("Agent produced non-UTF-8 output")]
    InvalidOutput,
}

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Worker pool is closed")]
    Closed,

    #[error("Pipeline task panicked: {0}")]
    Panicked(String),
}
