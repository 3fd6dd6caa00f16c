use thiserror::Error;

/// Errors raised by a shell while it owns the process
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Shell failed: {message}")]
    Failed { message: String },

    #[error("Shell exited with status {code}")]
    Exit { code: i32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShellError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// A capability that takes over the process once the container is built
///
/// Register one with [`ContainerBuilder::register_shell`](crate::container::ContainerBuilder::register_shell)
/// to make the bootstrap run as a standalone host instead of a library.
pub trait Shell: Send + Sync {
    /// Run without process arguments
    fn run(&self) -> Result<(), ShellError>;

    /// Run with forwarded process arguments; ignores them by default
    fn run_with_args(&self, args: &[String]) -> Result<(), ShellError> {
        tracing::debug!("Shell ignores {} forwarded arguments", args.len());
        self.run()
    }
}
