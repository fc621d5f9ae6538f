/// Host platform settings a session owns while it is live (audio routing,
/// screen orientation, keep-awake and similar).
#[cfg_attr(feature = "mocks", mockall::automock)]
pub trait PlatformSession: Send + Sync {
    fn activate(&self);

    fn deactivate(&self);
}

/// Platform hook for hosts with nothing to configure.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPlatform;

impl PlatformSession for NoopPlatform {
    fn activate(&self) {}

    fn deactivate(&self) {}
}
