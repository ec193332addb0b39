//! Formatting and splitting layer between the workers and the shell transport.

use crate::core::shell::{CommandRequest, LINE_DELIMITER, Transport};
use std::sync::Arc;

/// Files sent in a single request before splitting into several
pub const DEFAULT_MAX_FILES_PER_BATCH: usize = 5000;

/// Output of one logical command, possibly spanning several batched requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    pub lines: Vec<String>,
    pub errors: Vec<String>,
    pub success: bool,
}

/// Cheap to clone; every clone shares the same transport.
#[derive(Clone)]
pub struct Runner {
    transport: Arc<dyn Transport>,
    max_files_per_batch: usize,
}

impl Runner {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_batch_size(transport, DEFAULT_MAX_FILES_PER_BATCH)
    }

    pub fn with_batch_size(transport: Arc<dyn Transport>, max_files_per_batch: usize) -> Self {
        Self {
            transport,
            max_files_per_batch: max_files_per_batch.max(1),
        }
    }

    /// Run `verb` and split its output into non-empty lines.
    ///
    /// Long file lists are sent in several requests; their outputs are concatenated and
    /// the command succeeds only if every request did.
    pub fn run_lines(&self, verb: &str, parameters: &[String], files: &[String]) -> RunOutput {
        let mut output = RunOutput {
            success: true,
            ..RunOutput::default()
        };

        if files.is_empty() {
            self.run_batch(verb, parameters, &[], &mut output);
        } else {
            for batch in files.chunks(self.max_files_per_batch) {
                self.run_batch(verb, parameters, batch, &mut output);
            }
        }

        output
    }

    /// Run `verb` and return its whole output as one string.
    pub fn run_raw(&self, verb: &str, parameters: &[String], files: &[String]) -> (String, Vec<String>, bool) {
        let output = self.run_lines(verb, parameters, files);
        (output.lines.join(LINE_DELIMITER), output.errors, output.success)
    }

    fn run_batch(&self, verb: &str, parameters: &[String], files: &[String], output: &mut RunOutput) {
        let reply = self
            .transport
            .send(&CommandRequest::new(verb, parameters, files));

        output.lines.extend(split_lines(&reply.output));
        output.errors.extend(split_lines(&reply.errors));
        output.success &= reply.success;
    }
}

/// Split on the platform delimiter, dropping empty lines.
pub fn split_lines(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(LINE_DELIMITER)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
}
