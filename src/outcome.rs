// src/outcome.rs
//! Per-item bookkeeping for the batch operations (stage deletions and file
//! uploads). A failure never silently truncates a batch: every item ends up
//! Succeeded, Failed or Skipped.

/// What to do with the rest of a batch once one item fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Remaining items are recorded as skipped and not attempted.
    #[default]
    StopOnFirstFailure,
    /// Remaining items are attempted anyway.
    ContinueOnFailure,
}

impl FailurePolicy {
    pub fn from_stop_flag(stop_on_first_failure: bool) -> Self {
        if stop_on_first_failure {
            FailurePolicy::StopOnFirstFailure
        } else {
            FailurePolicy::ContinueOnFailure
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome<T> {
    Succeeded(T),
    Failed(String),
    Skipped,
}

impl<T> ItemOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Succeeded(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            ItemOutcome::Succeeded(_) => "ok",
            ItemOutcome::Failed(_) => "failed",
            ItemOutcome::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport<T> {
    pub items: Vec<(String, ItemOutcome<T>)>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> BatchReport<T> {
    /// Runs `op` over `keys` in order, honouring `policy`.
    pub fn run<K, F>(keys: &[K], policy: FailurePolicy, mut op: F) -> Self
    where
        K: AsRef<str>,
        F: FnMut(&K) -> anyhow::Result<T>,
    {
        let mut report = Self::default();
        let mut halted = false;
        for key in keys {
            let name = key.as_ref().to_string();
            if halted {
                report.items.push((name, ItemOutcome::Skipped));
                continue;
            }
            match op(key) {
                Ok(value) => report.items.push((name, ItemOutcome::Succeeded(value))),
                Err(e) => {
                    report.items.push((name, ItemOutcome::Failed(format!("{e:#}"))));
                    halted = policy == FailurePolicy::StopOnFirstFailure;
                }
            }
        }
        report
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = (&str, &T)> {
        self.items.iter().filter_map(|(k, o)| match o {
            ItemOutcome::Succeeded(v) => Some((k.as_str(), v)),
            _ => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().filter_map(|(k, o)| match o {
            ItemOutcome::Failed(msg) => Some((k.as_str(), msg.as_str())),
            _ => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|(k, o)| match o {
            ItemOutcome::Skipped => Some(k.as_str()),
            _ => None,
        })
    }

    pub fn all_succeeded(&self) -> bool {
        self.items.iter().all(|(_, o)| o.is_success())
    }

    /// Keys that failed or were never attempted, for a manual retry.
    pub fn remaining(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|(_, o)| !o.is_success())
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// `"3 ok, 1 failed, 1 skipped"`
    pub fn summary(&self) -> String {
        let ok = self.succeeded().count();
        let failed = self.failed().count();
        let skipped = self.skipped().count();
        let mut parts = vec![format!("{ok} ok")];
        if failed > 0 {
            parts.push(format!("{failed} failed"));
        }
        if skipped > 0 {
            parts.push(format!("{skipped} skipped"));
        }
        parts.join(", ")
    }
}
