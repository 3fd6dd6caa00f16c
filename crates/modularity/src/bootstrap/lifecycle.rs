/// Bootstrap lifecycle states, in the order a run passes through them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Created,
    ShellRegistered,
    ContainerConfigured,
    Built,
    PostConfigured,
    /// Terminal: the shell owned the process and returned
    ShellDispatched,
    /// Terminal: the container was published and the library hook ran
    Published,
    Failed,
}

impl BootstrapState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BootstrapState::Created => "created",
            BootstrapState::ShellRegistered => "shell_registered",
            BootstrapState::ContainerConfigured => "container_configured",
            BootstrapState::Built => "built",
            BootstrapState::PostConfigured => "post_configured",
            BootstrapState::ShellDispatched => "shell_dispatched",
            BootstrapState::Published => "published",
            BootstrapState::Failed => "failed",
        }
    }

    /// Check if a run ends in this state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BootstrapState::ShellDispatched | BootstrapState::Published | BootstrapState::Failed
        )
    }
}

impl std::fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
