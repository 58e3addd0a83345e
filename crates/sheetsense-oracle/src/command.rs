//! Oracle backed by an external program
//!
//! The program is started once per request. It receives the request as a
//! JSON object on stdin (`task`, `instruction`, `excerpt`, `prompt`) and must
//! print its answer on stdout. A program that has not exited when the
//! timeout expires is killed.

use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::{OracleError, OracleResult};
use crate::{Oracle, OracleRequest, OracleTask};

#[derive(Serialize)]
struct WireRequest<'a> {
    task: OracleTask,
    instruction: &'a str,
    excerpt: &'a str,
    prompt: String,
}

/// Default time a program gets to answer one request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs a program for every oracle request
#[derive(Debug, Clone)]
pub struct CommandOracle {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandOracle {
    /// Create an oracle running `program` with no arguments
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Parse a whitespace-separated command line
    pub fn from_command_line(line: &str) -> OracleResult<Self> {
        let mut words = line.split_whitespace().map(str::to_string);
        let program = words
            .next()
            .ok_or_else(|| OracleError::Unavailable("empty oracle command".to_string()))?;
        Ok(Self {
            program,
            args: words.collect(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Append an argument
    pub fn with_arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set how long one request may take
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Program name
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Oracle for CommandOracle {
    fn complete(&self, request: &OracleRequest) -> OracleResult<String> {
        let payload = serde_json::to_vec(&WireRequest {
            task: request.task,
            instruction: &request.instruction,
            excerpt: &request.excerpt,
            prompt: request.prompt(),
        })
        .map_err(|e| OracleError::Transport(e.to_string()))?;

        tracing::debug!(program = %self.program, task = %request.task, "spawning oracle command");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // pipes are serviced on helper threads; this thread only polls for exit
        let stdin = child.stdin.take();
        let writer = thread::spawn(move || -> std::io::Result<()> {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&payload)?;
            }
            Ok(())
        });
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                // kill can only fail if the child already exited
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(program = %self.program, timeout = ?self.timeout, "oracle command timed out");
                return Err(OracleError::Timeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };

        match writer.join() {
            Ok(Err(err)) => {
                tracing::debug!(program = %self.program, error = %err, "oracle command did not read its whole request")
            }
            Ok(Ok(())) => {}
            Err(_) => return Err(OracleError::Transport("stdin writer panicked".to_string())),
        }
        let stdout = join_output(stdout)?;
        let stderr = join_output(stderr)?;

        if !status.success() {
            return Err(OracleError::ProcessFailed {
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        String::from_utf8(stdout).map_err(|e| OracleError::Transport(e.to_string()))
    }
}

/// Read a pipe to the end on a helper thread
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join_output(handle: thread::JoinHandle<std::io::Result<Vec<u8>>>) -> OracleResult<Vec<u8>> {
    handle
        .join()
        .map_err(|_| OracleError::Transport("output reader panicked".to_string()))?
        .map_err(OracleError::from)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::{ask, OracleReply};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_command_line() {
        let oracle = CommandOracle::from_command_line("python3 oracle.py --fast").unwrap();
        assert_eq!(oracle.program(), "python3");
        assert_eq!(oracle.args, vec!["oracle.py", "--fast"]);
        assert!(CommandOracle::from_command_line("   ").is_err());
    }

    #[test]
    fn test_echo_program() {
        let oracle = CommandOracle::new("sh")
            .with_arg("-c")
            .with_arg(r#"cat > /dev/null; echo '{"is_heading": false}'"#);
        let request = OracleRequest::new(OracleTask::DetectHeading, "[A1] | val=\"x\"");
        let reply: OracleReply<serde_json::Value> = ask(&oracle, &request);
        assert_eq!(
            reply.answer(),
            Some(serde_json::json!({"is_heading": false}))
        );
    }

    #[test]
    fn test_failing_program() {
        let oracle = CommandOracle::new("sh")
            .with_arg("-c")
            .with_arg("cat > /dev/null; echo boom >&2; exit 3");
        let request = OracleRequest::new(OracleTask::DetectText, "");
        match oracle.complete(&request) {
            Err(OracleError::ProcessFailed { stderr, .. }) => assert_eq!(stderr, "boom"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_hung_program_times_out() {
        let oracle = CommandOracle::new("sh")
            .with_arg("-c")
            .with_arg("cat > /dev/null; sleep 5; echo '{}'")
            .with_timeout(Duration::from_millis(200));
        let request = OracleRequest::new(OracleTask::DetectText, "");

        let started = Instant::now();
        let result = oracle.complete(&request);
        assert!(matches!(result, Err(OracleError::Timeout(t)) if t == Duration::from_millis(200)));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_large_request_does_not_block() {
        let oracle = CommandOracle::new("sh").with_arg("-c").with_arg("wc -c");
        let request = OracleRequest::new(OracleTask::DetectTable, "x".repeat(1 << 20));
        let answer = oracle.complete(&request).unwrap();
        let bytes: usize = answer.trim().parse().unwrap();
        assert!(bytes > 1 << 20);
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(CommandOracle::new("x").timeout(), DEFAULT_TIMEOUT);
        assert_eq!(
            CommandOracle::from_command_line("x y").unwrap().timeout(),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_missing_program() {
        let oracle = CommandOracle::new("sheetsense-no-such-oracle-binary");
        let request = OracleRequest::new(OracleTask::DetectText, "");
        assert!(matches!(oracle.complete(&request), Err(OracleError::Io(_))));
    }
}
