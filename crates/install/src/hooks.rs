//! Install hooks registered on an installer instance

use crate::context::InstallContext;
use rgem_errors::{Error, InstallError};
use std::fmt;
use std::panic::Location;

/// Point in the lifecycle a hook runs at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// After extraction, before extensions are built
    PreInstall,
    PostBuild,
    /// After the manifest is persisted; failures are only reported
    PostInstall,
}

impl HookKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreInstall => "pre-install",
            Self::PostBuild => "post-build",
            Self::PostInstall => "post-install",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type HookFn = Box<dyn Fn(&InstallContext) -> bool + Send + Sync>;

struct Hook {
    kind: HookKind,
    location: String,
    callback: HookFn,
}

/// Ordered hook callbacks; a `false` return aborts the install
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Hook>,
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|h| (h.kind, h.location.as_str())))
            .finish()
    }
}

impl HookRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[track_caller]
    pub fn pre_install<F>(&mut self, hook: F)
    where
        F: Fn(&InstallContext) -> bool + Send + Sync + 'static,
    {
        self.register(HookKind::PreInstall, Location::caller(), hook);
    }

    #[track_caller]
    pub fn post_build<F>(&mut self, hook: F)
    where
        F: Fn(&InstallContext) -> bool + Send + Sync + 'static,
    {
        self.register(HookKind::PostBuild, Location::caller(), hook);
    }

    #[track_caller]
    pub fn post_install<F>(&mut self, hook: F)
    where
        F: Fn(&InstallContext) -> bool + Send + Sync + 'static,
    {
        self.register(HookKind::PostInstall, Location::caller(), hook);
    }

    fn register<F>(&mut self, kind: HookKind, location: &Location<'_>, hook: F)
    where
        F: Fn(&InstallContext) -> bool + Send + Sync + 'static,
    {
        self.hooks.push(Hook {
            kind,
            location: format!("{}:{}", location.file(), location.line()),
            callback: Box::new(hook),
        });
    }

    #[must_use]
    pub fn count(&self, kind: HookKind) -> usize {
        self.hooks.iter().filter(|h| h.kind == kind).count()
    }

    /// Run the hooks of `kind` in registration order, stopping at the first
    /// one that returns `false`
    ///
    /// # Errors
    ///
    /// Returns `InstallError::HookFailed` naming the failing hook's
    /// registration site.
    pub fn run(&self, kind: HookKind, ctx: &InstallContext) -> Result<(), Error> {
        match self.first_failure(kind, ctx) {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    /// Run every hook of `kind` and collect the failures without aborting
    #[must_use]
    pub fn run_observed(&self, kind: HookKind, ctx: &InstallContext) -> Vec<Error> {
        self.hooks
            .iter()
            .filter(|h| h.kind == kind)
            .filter(|h| !(h.callback)(ctx))
            .map(|h| hook_failed(h, ctx))
            .collect()
    }

    fn first_failure(&self, kind: HookKind, ctx: &InstallContext) -> Option<Error> {
        self.hooks
            .iter()
            .filter(|h| h.kind == kind)
            .find(|h| !(h.callback)(ctx))
            .map(|h| hook_failed(h, ctx))
    }
}

fn hook_failed(hook: &Hook, ctx: &InstallContext) -> Error {
    InstallError::HookFailed {
        kind: hook.kind.to_string(),
        location: hook.location.clone(),
        package: ctx.manifest().full_name(),
    }
    .into()
}
