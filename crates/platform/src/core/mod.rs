//! Host capabilities consulted by the installer

/// Capabilities of the platform packages are installed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    supports_symlinks: bool,
    has_permission_model: bool,
}

impl Platform {
    /// Capabilities of the running host
    #[must_use]
    pub fn current() -> Self {
        Self {
            supports_symlinks: cfg!(unix),
            has_permission_model: cfg!(unix),
        }
    }

    /// Override symlink support, e.g. to exercise the wrapper fallback
    #[must_use]
    pub fn with_symlinks(mut self, supported: bool) -> Self {
        self.supports_symlinks = supported;
        self
    }

    #[must_use]
    pub fn supports_symlinks(&self) -> bool {
        self.supports_symlinks
    }

    /// Whether file mode bits are meaningful
    #[must_use]
    pub fn has_permission_model(&self) -> bool {
        self.has_permission_model
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symlink_support_can_be_disabled() {
        let platform = Platform::current().with_symlinks(false);
        assert!(!platform.supports_symlinks());
        assert_eq!(platform.has_permission_model(), cfg!(unix));
    }
}
