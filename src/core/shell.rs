//! Persistent `cm shell` transport.
//!
//! A single long-lived `cm shell` child process answers one request line at a time.
//! Every reply ends with a `CommandResult <code>` line. The [`Shell`] owns the process
//! and its pipes behind one mutex, so requests from any number of threads are
//! strictly serialized.
//!
//! Failure handling:
//! - a stopped process is restarted before the next request;
//! - an interactive prompt (credentials the shell cannot get) sends a notice on the
//!   side channel, force-restarts the process and fails the request;
//! - no output for longer than the inactivity timeout force-restarts the process and
//!   fails the request with the output read so far as error text;
//! - the process exiting before the result line fails the request.

use crate::core::config::ShellConfig;
use crate::core::error::{PlasticError, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// Marker preceding the integer result code at the end of every reply
pub const RESULT_MARKER: &str = "CommandResult ";

/// Printed by `cm` when it needs a credentials setup it cannot get in shell mode
pub const INTERACTIVE_PROMPT: &str = "Select your system [0-1]";

/// Notice sent on the side channel when the interactive prompt is detected
pub const USER_INTERACTION_NOTICE: &str =
    "Plastic SCM command line requires user interaction.\nSign in using the Plastic SCM client.";

#[cfg(windows)]
pub const LINE_DELIMITER: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_DELIMITER: &str = "\n";

const POLL_INTERVAL: Duration = Duration::from_millis(1);
const MAX_LOGGED_COMMAND_CHARS: usize = 256;
const MAX_DISPLAYED_OUTPUT_CHARS: usize = 200;
const MAX_LOGGED_OUTPUT_CHARS: usize = 4096;
const EXIT_VERB: &str = "exit";

/// One request to the shell: verb, ordered parameters and ordered file paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub verb: String,
    pub parameters: Vec<String>,
    pub files: Vec<String>,
}

impl CommandRequest {
    pub fn new(verb: impl Into<String>, parameters: &[String], files: &[String]) -> Self {
        Self {
            verb: verb.into(),
            parameters: parameters.to_vec(),
            files: files.to_vec(),
        }
    }

    /// `verb param... "file"...`, without the trailing newline
    pub fn to_command_line(&self) -> String {
        let mut line = self.verb.clone();
        for parameter in &self.parameters {
            line.push(' ');
            line.push_str(parameter);
        }
        for file in &self.files {
            line.push_str(" \"");
            line.push_str(file);
            line.push('"');
        }
        line
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandReply {
    pub output: String,
    /// Same text as `output` when the request failed, empty otherwise
    pub errors: String,
    pub result_code: i32,
    pub success: bool,
}

impl CommandReply {
    fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            output: String::new(),
            errors: message,
            result_code: -1,
            success: false,
        }
    }
}

/// Request/reply primitive used by the [`Runner`](crate::core::runner::Runner).
pub trait Transport: Send + Sync {
    fn send(&self, request: &CommandRequest) -> CommandReply;
}

/// Diagnostics accumulated since the last launch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShellStats {
    pub commands: u64,
    pub cumulated_time: Duration,
}

enum ReadOutcome {
    Completed(i32),
    InteractivePrompt,
    TimedOut,
    Stopped,
}

struct Session {
    child: Child,
    stdin: ChildStdin,
    output: Receiver<Vec<u8>>,
}

impl Session {
    fn spawn(binary: &Path, working_dir: &Path) -> io::Result<Self> {
        // stdout and stderr share one pipe, so error text stays ordered with the
        // result line of its command.
        let (reader, writer) = io::pipe()?;
        let mut child = Command::new(binary)
            .args(["shell", "--encoding=UTF-8"])
            .current_dir(working_dir)
            .stdin(Stdio::piped())
            .stdout(writer.try_clone()?)
            .stderr(writer)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("'cm shell' stdin is not piped"))?;

        let (tx, rx) = crossbeam_channel::unbounded();
        spawn_stream_reader(reader, tx)?;

        Ok(Self {
            child,
            stdin,
            output: rx,
        })
    }

    fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.stdin.write_all(line.as_bytes())?;
        self.stdin.write_all(b"\n")?;
        self.stdin.flush()
    }

    /// Ask the shell to exit, killing it if it does not within `grace`.
    fn shutdown(mut self, force: bool, grace: Duration) {
        if self.is_running() {
            if force {
                let _ = self.child.kill();
            } else {
                let _ = self.write_line(EXIT_VERB);
                match self.child.wait_timeout(grace) {
                    Ok(Some(_)) => {}
                    _ => {
                        log::warn!("ExitBackgroundCommandLineShell: cm shell didn't stop gracefully in {grace:?}.");
                        let _ = self.child.kill();
                    }
                }
            }
        }
        let _ = self.child.wait();
        // Dropping the session closes stdin and the output channel.
    }
}

fn spawn_stream_reader<R: Read + Send + 'static>(
    mut pipe: R,
    tx: Sender<Vec<u8>>,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("cm-shell-reader".to_string())
        .spawn(move || {
            // The interactive prompt has no trailing newline, so read raw chunks.
            let mut buffer = [0u8; 4096];
            loop {
                match pipe.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(read) => {
                        if tx.send(buffer[..read].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
        })
}

struct ShellInner {
    session: Option<Session>,
    working_dir: PathBuf,
    stats: ShellStats,
}

/// Owner of the `cm shell` child process.
pub struct Shell {
    config: ShellConfig,
    inner: Mutex<ShellInner>,
    notifier: Option<Sender<String>>,
}

impl Shell {
    pub fn new(config: ShellConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(ShellInner {
                session: None,
                working_dir: PathBuf::from("."),
                stats: ShellStats::default(),
            }),
            notifier: None,
        }
    }

    /// Also deliver user-facing notices, such as the interactive prompt one, to `notifier`.
    pub fn with_notifier(config: ShellConfig, notifier: Sender<String>) -> Self {
        let mut shell = Self::new(config);
        shell.notifier = Some(notifier);
        shell
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Terminate any running session and start a new one in `working_dir`.
    ///
    /// Returns false when the process cannot be created, typically because `cm` is not
    /// installed.
    pub fn launch(&self, working_dir: &Path) -> bool {
        self.try_launch(working_dir).is_ok()
    }

    /// Same as [`launch`](Self::launch), with the reason the process could not start.
    pub fn try_launch(&self, working_dir: &Path) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.working_dir = working_dir.to_path_buf();
        self.exit_session(&mut inner, false);
        self.start_session(&mut inner)
            .map_err(|e| PlasticError::launch_failed(&self.config.binary_path, e))
    }

    /// Stop the session, gracefully if possible. Idempotent.
    pub fn terminate(&self) {
        let mut inner = self.inner.lock();
        self.exit_session(&mut inner, false);
    }

    pub fn is_running(&self) -> bool {
        let mut inner = self.inner.lock();
        inner
            .session
            .as_mut()
            .is_some_and(|session| session.is_running())
    }

    pub fn stats(&self) -> ShellStats {
        self.inner.lock().stats
    }

    fn start_session(&self, inner: &mut ShellInner) -> io::Result<()> {
        let started = Instant::now();
        match Session::spawn(&self.config.binary_path, &inner.working_dir) {
            Ok(session) => {
                log::info!(
                    "LaunchBackgroundCommandLineShell: '{} shell' started in {:.3}s in '{}'",
                    self.config.binary_path.display(),
                    started.elapsed().as_secs_f64(),
                    inner.working_dir.display()
                );
                inner.session = Some(session);
                inner.stats = ShellStats::default();
                Ok(())
            }
            Err(e) => {
                log::warn!(
                    "Failed to launch '{} shell': {e}",
                    self.config.binary_path.display()
                );
                Err(e)
            }
        }
    }

    fn exit_session(&self, inner: &mut ShellInner, force: bool) {
        if let Some(session) = inner.session.take() {
            session.shutdown(force, self.config.exit_grace_period);
        }
    }

    fn restart_session(&self, inner: &mut ShellInner, force: bool) -> bool {
        self.exit_session(inner, force);
        self.start_session(inner).is_ok()
    }

    fn notify(&self, message: &str) {
        if let Some(notifier) = &self.notifier {
            let _ = notifier.send(message.to_string());
        }
    }

    fn run(&self, inner: &mut ShellInner, request: &CommandRequest) -> CommandReply {
        let started = Instant::now();
        let is_exit = request.verb == EXIT_VERB;

        let running = inner
            .session
            .as_mut()
            .is_some_and(|session| session.is_running());
        if !running && !is_exit {
            log::warn!("'cm shell' has stopped. Restarting!");
            if !self.restart_session(inner, false) {
                return CommandReply::failure("Failed to launch 'cm shell'");
            }
        }
        let Some(session) = inner.session.as_mut() else {
            return CommandReply::failure("'cm shell' is not running");
        };

        let command_line = request.to_command_line();
        let logged_command = truncate_chars(&command_line, MAX_LOGGED_COMMAND_CHARS);
        if !is_exit {
            log::info!(
                "RunCommand: '{logged_command}' ({} chars, {} files)",
                command_line.chars().count(),
                request.files.len()
            );
        }

        if let Err(e) = session.write_line(&command_line) {
            log::error!("RunCommand: '{logged_command}' could not be written: {e}");
            self.exit_session(inner, true);
            return CommandReply::failure(format!("Failed to write to 'cm shell': {e}"));
        }

        let (outcome, buffer) = self.read_reply(session, &command_line);
        let output = String::from_utf8_lossy(&buffer).into_owned();
        let elapsed = started.elapsed();

        let (success, result_code) = match outcome {
            ReadOutcome::Completed(code) => (code == 0, code),
            ReadOutcome::InteractivePrompt => {
                self.notify(USER_INTERACTION_NOTICE);
                log::error!("RunCommand: '{logged_command}' {USER_INTERACTION_NOTICE}");
                self.restart_session(inner, true);
                (false, -1)
            }
            ReadOutcome::TimedOut => {
                log::error!(
                    "RunCommand: '{logged_command}' {:.3}s TIMEOUT after {:.3}s output ({} chars):\n{}",
                    elapsed.as_secs_f64(),
                    self.config.inactivity_timeout.as_secs_f64(),
                    output.chars().count(),
                    truncate_chars(&output, MAX_LOGGED_OUTPUT_CHARS)
                );
                self.restart_session(inner, true);
                (false, -1)
            }
            ReadOutcome::Stopped => {
                if !is_exit {
                    log::error!(
                        "RunCommand: '{logged_command}' 'cm shell' stopped after {:.3}s output ({} chars):\n{}",
                        elapsed.as_secs_f64(),
                        output.chars().count(),
                        truncate_chars(&output, MAX_LOGGED_OUTPUT_CHARS)
                    );
                }
                (false, -1)
            }
        };

        if !is_exit {
            log_reply(&command_line, &output, success, elapsed);
        }

        inner.stats.commands += 1;
        inner.stats.cumulated_time += elapsed;

        // A failed command's output is its error text.
        let (output, errors) = if success {
            (output, String::new())
        } else {
            (String::new(), output)
        };
        CommandReply {
            output,
            errors,
            result_code,
            success,
        }
    }

    fn read_reply(&self, session: &mut Session, command_line: &str) -> (ReadOutcome, Vec<u8>) {
        let started = Instant::now();
        let mut buffer: Vec<u8> = Vec::new();
        let mut last_activity = Instant::now();
        let mut last_log = Instant::now();
        let mut last_logged_len = 0;

        loop {
            match session.output.recv_timeout(POLL_INTERVAL) {
                Ok(chunk) => {
                    buffer.extend_from_slice(&chunk);
                    last_activity = Instant::now();

                    if let Some((marker_index, code)) = parse_result_marker(&buffer) {
                        buffer.truncate(marker_index);
                        return (ReadOutcome::Completed(code), buffer);
                    }
                    if find_bytes(&buffer, INTERACTIVE_PROMPT.as_bytes()).is_some() {
                        return (ReadOutcome::InteractivePrompt, buffer);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if !session.is_running() {
                        // Collect what the reader still holds before reporting the stop.
                        while let Ok(chunk) = session.output.recv_timeout(Duration::from_millis(50)) {
                            buffer.extend_from_slice(&chunk);
                        }
                        if let Some((marker_index, code)) = parse_result_marker(&buffer) {
                            buffer.truncate(marker_index);
                            return (ReadOutcome::Completed(code), buffer);
                        }
                        return (ReadOutcome::Stopped, buffer);
                    }

                    let now = Instant::now();
                    if now.duration_since(last_log) >= self.config.progress_log_interval {
                        if buffer.len() > last_logged_len {
                            log::info!(
                                "RunCommand: '{}' in progress for {:.3}s... ({} chars)",
                                truncate_chars(command_line, MAX_LOGGED_COMMAND_CHARS),
                                started.elapsed().as_secs_f64(),
                                buffer.len()
                            );
                            last_logged_len = buffer.len();
                        }
                        last_log = now;
                    }
                    if now.duration_since(last_activity) > self.config.inactivity_timeout {
                        return (ReadOutcome::TimedOut, buffer);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    if let Some((marker_index, code)) = parse_result_marker(&buffer) {
                        buffer.truncate(marker_index);
                        return (ReadOutcome::Completed(code), buffer);
                    }
                    return (ReadOutcome::Stopped, buffer);
                }
            }
        }
    }
}

impl Transport for Shell {
    fn send(&self, request: &CommandRequest) -> CommandReply {
        let mut inner = self.inner.lock();
        self.run(&mut inner, request)
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if let Some(session) = inner.session.take() {
            session.shutdown(false, self.config.exit_grace_period);
        }
    }
}

fn log_reply(command_line: &str, output: &str, success: bool, elapsed: Duration) {
    let command = truncate_chars(command_line, MAX_LOGGED_COMMAND_CHARS);
    let chars = output.chars().count();
    if !success {
        log::warn!(
            "RunCommand: '{command}' (in {:.3}s) output ({chars} chars):\n{}",
            elapsed.as_secs_f64(),
            truncate_chars(output, MAX_LOGGED_OUTPUT_CHARS)
        );
    } else if chars <= MAX_DISPLAYED_OUTPUT_CHARS {
        log::info!(
            "RunCommand: '{command}' (in {:.3}s) output ({chars} chars):\n{output}",
            elapsed.as_secs_f64()
        );
    } else {
        log::info!(
            "RunCommand: '{command}' (in {:.3}s) (output {chars} chars not displayed)",
            elapsed.as_secs_f64()
        );
        log::debug!("{}", truncate_chars(output, MAX_LOGGED_OUTPUT_CHARS));
    }
}

/// Locate the last result marker followed by a complete line.
///
/// Returns the marker offset and the parsed result code.
pub fn parse_result_marker(buffer: &[u8]) -> Option<(usize, i32)> {
    let marker_index = rfind_bytes(buffer, RESULT_MARKER.as_bytes())?;
    let code_start = marker_index + RESULT_MARKER.len();
    let code_len = find_bytes(&buffer[code_start..], LINE_DELIMITER.as_bytes())?;
    let code = String::from_utf8_lossy(&buffer[code_start..code_start + code_len]);
    Some((marker_index, atoi(&code)))
}

/// C-style integer parsing: optional sign and leading digits, 0 when there are none.
pub fn atoi(input: &str) -> i32 {
    let trimmed = input.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let mut value: i64 = 0;
    for digit in digits.chars().map_while(|c| c.to_digit(10)) {
        value = (value * 10 + i64::from(digit)).min(i64::from(i32::MAX) + 1);
    }
    (sign * value).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn rfind_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_quotes_files() {
        let request = CommandRequest::new(
            "status",
            &["--machinereadable".to_string(), "--fieldseparator=\";\"".to_string()],
            &["/ws/Content/A.uasset".to_string(), "/ws/My Map.umap".to_string()],
        );
        assert_eq!(
            request.to_command_line(),
            "status --machinereadable --fieldseparator=\";\" \"/ws/Content/A.uasset\" \"/ws/My Map.umap\""
        );
    }

    #[test]
    fn test_command_line_without_arguments() {
        assert_eq!(CommandRequest::new("version", &[], &[]).to_command_line(), "version");
    }

    #[test]
    fn test_parse_result_marker() {
        let reply = format!("11.0.16.8101{LINE_DELIMITER}CommandResult 0{LINE_DELIMITER}");
        let (index, code) = parse_result_marker(reply.as_bytes()).unwrap();
        assert_eq!(code, 0);
        assert_eq!(&reply[..index], format!("11.0.16.8101{LINE_DELIMITER}"));
    }

    #[test]
    fn test_parse_result_marker_needs_complete_line() {
        assert!(parse_result_marker(b"output\nCommandResult 1").is_none());
        assert!(parse_result_marker(b"no marker at all\n").is_none());
    }

    #[test]
    fn test_parse_result_marker_uses_last_occurrence() {
        let reply = format!(
            "echo CommandResult 5{LINE_DELIMITER}CommandResult 2{LINE_DELIMITER}"
        );
        let (index, code) = parse_result_marker(reply.as_bytes()).unwrap();
        assert_eq!(code, 2);
        assert!(reply[..index].ends_with(&format!("5{LINE_DELIMITER}")));
    }

    #[test]
    fn test_atoi() {
        assert_eq!(atoi("0"), 0);
        assert_eq!(atoi("1"), 1);
        assert_eq!(atoi("-3"), -3);
        assert_eq!(atoi("  42 trailing"), 42);
        assert_eq!(atoi("abc"), 0);
        assert_eq!(atoi(""), 0);
        assert_eq!(atoi("99999999999"), i32::MAX);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("ééé", 2), "éé");
    }

    #[test]
    fn test_launch_failure_is_not_fatal() {
        let config = ShellConfig {
            binary_path: PathBuf::from("/nonexistent/path/to/cm"),
            ..ShellConfig::default()
        };
        let shell = Shell::new(config);
        assert!(!shell.launch(Path::new(".")));
        assert!(matches!(
            shell.try_launch(Path::new(".")),
            Err(PlasticError::LaunchFailed { .. })
        ));
        assert!(!shell.is_running());

        let reply = shell.send(&CommandRequest::new("version", &[], &[]));
        assert!(!reply.success);
        assert!(!reply.errors.is_empty());
        shell.terminate();
    }
}
