use super::runner::{CommandRunner, Invocation, ProcessError};
use async_trait::async_trait;
use std::sync::Mutex;

/// When a scripted failure fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureRule {
    /// Every invocation whose first argument equals the subcommand
    Subcommand(String),
    /// The invocation at this zero-based position
    Call(usize),
}

/// Records invocations instead of running them
///
/// Scripted failures are reported as a nonzero exit (status 1). Failing calls are
/// still recorded.
#[derive(Debug, Default)]
pub struct MockRunner {
    calls: Mutex<Vec<Invocation>>,
    failures: Vec<FailureRule>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, subcommand: impl Into<String>) -> Self {
        self.failures.push(FailureRule::Subcommand(subcommand.into()));
        self
    }

    pub fn failing_at(mut self, index: usize) -> Self {
        self.failures.push(FailureRule::Call(index));
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Subcommands in call order, e.g. `["build", "run", "cp", "stop"]`
    pub fn subcommands(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| call.subcommand().map(str::to_string))
            .collect()
    }

    fn should_fail(&self, index: usize, invocation: &Invocation) -> bool {
        self.failures.iter().any(|rule| match rule {
            FailureRule::Subcommand(name) => invocation.subcommand() == Some(name.as_str()),
            FailureRule::Call(at) => *at == index,
        })
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, invocation: &Invocation) -> Result<(), ProcessError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(invocation.clone());
            calls.len() - 1
        };

        if self.should_fail(index, invocation) {
            return Err(ProcessError::Exit {
                command: invocation.to_string(),
                code: Some(1),
            });
        }
        Ok(())
    }
}
