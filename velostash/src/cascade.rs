use tracing::error;

/// Result of a multi-step update such as deleting a user together with their listings.
///
/// The steps are independent writes with no atomicity: a failure partway leaves the
/// earlier steps applied. `Partial` keeps that case distinct from nothing being written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeOutcome {
    Complete,
    Partial {
        completed: Vec<&'static str>,
        failed_at: &'static str,
    },
    Failed {
        step: &'static str,
    },
}

impl CascadeOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Runs named write steps in order, stopping at the first one that fails.
pub(crate) struct Cascade {
    name: &'static str,
    completed: Vec<&'static str>,
    failed_at: Option<&'static str>,
}

impl Cascade {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            completed: Vec::new(),
            failed_at: None,
        }
    }

    /// Runs `write` unless an earlier step failed.
    pub(crate) fn step(&mut self, step: &'static str, write: impl FnOnce() -> bool) -> &mut Self {
        if self.failed_at.is_some() {
            return self;
        }
        if write() {
            self.completed.push(step);
        } else {
            self.failed_at = Some(step);
        }
        self
    }

    pub(crate) fn finish(&mut self) -> CascadeOutcome {
        let completed = std::mem::take(&mut self.completed);
        match self.failed_at {
            None => CascadeOutcome::Complete,
            Some(step) if completed.is_empty() => {
                error!(cascade = self.name, %step, "update failed before any write");
                CascadeOutcome::Failed { step }
            }
            Some(failed_at) => {
                error!(
                    cascade = self.name,
                    %failed_at,
                    ?completed,
                    "update partially applied"
                );
                CascadeOutcome::Partial {
                    completed,
                    failed_at,
                }
            }
        }
    }
}
