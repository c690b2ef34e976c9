use std::fmt;
use uuid::Uuid;

/// Per-platform pipeline steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Render,
    Persist,
    Build,
    Launch,
    Extract,
    Teardown,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Render => "render",
            Step::Persist => "persist",
            Step::Build => "build",
            Step::Launch => "launch",
            Step::Extract => "extract",
            Step::Teardown => "teardown",
        }
    }

    /// Whether an instance may exist once this step has been attempted
    pub fn has_instance(&self) -> bool {
        matches!(self, Step::Launch | Step::Extract | Step::Teardown)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `<package><uuid>`; fresh on every call, so repeated platforms never collide
pub fn instance_name(package: &str) -> String {
    format!("{}{}", package, Uuid::new_v4().simple())
}
