//! Converter process boundary.
//!
//! Only the exit status of a converter is observed; its standard streams are
//! discarded.

use std::io;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use cgmman_core::ConcreteCommand;

const WAIT_POLL: Duration = Duration::from_millis(100);

/// Runs a resolved converter command inside the working directory.
pub trait ConverterRunner {
    /// Run `command` with `work_dir` as its current directory and wait for
    /// it. `Ok(None)` means the process ended without an exit code.
    fn run(&self, command: &ConcreteCommand, work_dir: &Path) -> io::Result<Option<i32>>;
}

/// Spawns converters as child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    /// Wait for converters indefinitely.
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill converters still running after `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl ConverterRunner for ProcessRunner {
    fn run(&self, command: &ConcreteCommand, work_dir: &Path) -> io::Result<Option<i32>> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let Some(timeout) = self.timeout else {
            return Ok(child.wait()?.code());
        };

        let deadline = Instant::now() + timeout;
        match wait_or_kill(&mut child, deadline)? {
            Waited::Exited(code) => Ok(code),
            Waited::Killed => {
                tracing::warn!(
                    "converter `{command}` still running after {}s, killed",
                    timeout.as_secs()
                );
                Ok(None)
            }
        }
    }
}

/// The parts of a child process the deadline wait needs.
trait Reap {
    fn try_wait(&mut self) -> io::Result<Option<Option<i32>>>;
    fn kill(&mut self) -> io::Result<()>;
    fn wait(&mut self) -> io::Result<()>;
}

impl Reap for Child {
    fn try_wait(&mut self) -> io::Result<Option<Option<i32>>> {
        Ok(Child::try_wait(self)?.map(|status| status.code()))
    }

    fn kill(&mut self) -> io::Result<()> {
        Child::kill(self)
    }

    fn wait(&mut self) -> io::Result<()> {
        Child::wait(self).map(|_| ())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Waited {
    Exited(Option<i32>),
    Killed,
}

/// Poll until exit or `deadline`. On any error the process is killed and
/// reaped before the error returns.
fn wait_or_kill<P: Reap>(process: &mut P, deadline: Instant) -> io::Result<Waited> {
    loop {
        match process.try_wait() {
            Ok(Some(code)) => return Ok(Waited::Exited(code)),
            Ok(None) => {}
            Err(err) => {
                let _ = process.kill();
                let _ = process.wait();
                return Err(err);
            }
        }
        if Instant::now() >= deadline {
            process.kill()?;
            process.wait()?;
            return Ok(Waited::Killed);
        }
        thread::sleep(WAIT_POLL);
    }
}


#[cfg(test)]
mod reap_tests {
    use super::*;

    #[derive(Default)]
    struct FailingWait {
        killed: bool,
        reaped: bool,
    }

    impl Reap for FailingWait {
        fn try_wait(&mut self) -> io::Result<Option<Option<i32>>> {
            Err(io::Error::new(io::ErrorKind::Other, "wait failed"))
        }

        fn kill(&mut self) -> io::Result<()> {
            self.killed = true;
            Ok(())
        }

        fn wait(&mut self) -> io::Result<()> {
            self.reaped = true;
            Ok(())
        }
    }

    #[test]
    fn wait_error_still_kills_and_reaps() {
        let mut process = FailingWait::default();
        let deadline = Instant::now() + Duration::from_secs(60);

        let err = wait_or_kill(&mut process, deadline).unwrap_err();
        assert_eq!(err.to_string(), "wait failed");
        assert!(process.killed);
        assert!(process.reaped);
    }
}
