//! Progress reporting for scene reads.
//!
//! Hosts that convert large scene files (build pipelines, editors) can
//! pass a [`Progress`] to [`read_scene_with_progress`] to surface how far
//! along the read is. Reporting is informational only.
//!
//! [`read_scene_with_progress`]: super::read_scene_with_progress

/// A progress callback fed the fraction of the input consumed, in `[0, 1]`.
pub struct Progress {
    callback: Box<dyn Fn(f32) + Send + Sync>,
}

impl Progress {
    /// Create a progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(f32) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report the current fraction.
    #[inline]
    pub fn report(&self, fraction: f32) {
        (self.callback)(fraction);
    }

    /// Create a no-op reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}
