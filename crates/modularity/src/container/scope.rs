/// Lifetime of a registered service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceScope {
    /// Single instance shared by every resolution
    #[default]
    Singleton,
    /// Fresh instance produced by a factory on each resolution
    Transient,
}

impl ServiceScope {
    /// Get the scope name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceScope::Singleton => "singleton",
            ServiceScope::Transient => "transient",
        }
    }
}

impl std::fmt::Display for ServiceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_display() {
        assert_eq!(ServiceScope::default().to_string(), "singleton");
        assert_eq!(ServiceScope::Transient.to_string(), "transient");
    }
}
