//! Propagation control threaded through one dispatch.

/// Lets handlers veto delivery to lower priority subscribers.
///
/// A fresh control is created for every dispatched message. Calling
/// [`PropagationControl::stop`] latches the priority of the handler that is
/// currently running. Dispatch then ends at the first subscription whose
/// priority is strictly lower, so handlers sharing the stopping priority
/// still run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationControl {
    current: Option<i64>,
    threshold: Option<i64>,
}

impl PropagationControl {
    /// Creates a control with no threshold.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: None,
            threshold: None,
        }
    }

    /// Stops delivery to every priority below the current one.
    ///
    /// Has no effect before any handler has been entered.
    pub fn stop(&mut self) {
        if self.current.is_some() {
            self.threshold = self.current;
        }
    }

    /// Returns true once a handler has called [`PropagationControl::stop`].
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.threshold.is_some()
    }

    /// The latched stop threshold.
    #[must_use]
    pub const fn threshold(&self) -> Option<i64> {
        self.threshold
    }

    /// Priority of the handler most recently entered.
    #[must_use]
    pub const fn current_priority(&self) -> Option<i64> {
        self.current
    }

    /// Returns true if dispatch must end before a subscription of `priority`.
    #[must_use]
    pub fn should_stop_before(&self, priority: i64) -> bool {
        self.threshold.is_some_and(|threshold| priority < threshold)
    }

    pub(crate) fn enter(&mut self, priority: i64) {
        self.current = Some(priority);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_control_never_stops() {
        let control = PropagationControl::new();
        assert!(!control.is_stopped());
        assert!(!control.should_stop_before(i64::MIN));
    }

    #[test]
    fn test_stop_latches_current_priority() {
        let mut control = PropagationControl::new();
        control.enter(5);
        control.enter(1);
        control.stop();

        assert_eq!(control.threshold(), Some(1));
        assert!(!control.should_stop_before(1));
        assert!(control.should_stop_before(0));
        assert!(control.should_stop_before(-3));
    }

    #[test]
    fn test_stop_before_any_handler_is_ignored() {
        let mut control = PropagationControl::new();
        control.stop();
        assert!(!control.is_stopped());
    }
}
