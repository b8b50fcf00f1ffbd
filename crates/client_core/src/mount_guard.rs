//! Suppresses reactive side effects during a component's first render.

/// Two-state mount flag owned by one component instance.
///
/// The flag is `Pending` while the first render and its effects run, and flips
/// to `Mounted` exactly once, after that first effect flush. It never resets;
/// a new component instance gets a new guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MountGuard {
    #[default]
    Pending,
    Mounted,
}

impl MountGuard {
    pub fn new() -> Self {
        Self::Pending
    }

    pub fn mounted(&self) -> bool {
        matches!(self, Self::Mounted)
    }

    /// Marks the end of the first effect flush. Returns `true` only on the call
    /// that performed the transition.
    pub fn flush(&mut self) -> bool {
        match self {
            Self::Pending => {
                *self = Self::Mounted;
                true
            }
            Self::Mounted => false,
        }
    }

    /// Runs `effect` only once the owner has mounted.
    pub fn gate<R>(&self, effect: impl FnOnce() -> R) -> Option<R> {
        if self.mounted() {
            Some(effect())
        } else {
            None
        }
    }
}
