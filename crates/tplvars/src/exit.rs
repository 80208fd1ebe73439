use std::process::ExitCode;

use crate::args::GlobalArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Success,
    Error,
}

/// How a command finished, plus an optional summary for stderr.
#[derive(Debug)]
pub struct Exit {
    status: Status,
    message: Option<String>,
}

impl Exit {
    pub fn success() -> Self {
        Self {
            status: Status::Success,
            message: None,
        }
    }

    pub fn error() -> Self {
        Self {
            status: Status::Error,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Print the summary unless `--quiet` and turn the status into a process exit code.
    pub fn report(self, global: &GlobalArgs) -> ExitCode {
        if let Some(message) = &self.message {
            if !global.quiet {
                eprintln!("{message}");
            }
        }
        match self.status {
            Status::Success => ExitCode::SUCCESS,
            Status::Error => ExitCode::FAILURE,
        }
    }
}
