use std::{
    collections::HashMap,
    fmt, io,
    io::Read,
    process::{Command, Stdio},
    thread,
    time::{Duration, Instant},
};

// How often we check whether the query command has exited.
const WAIT_POLL_INTERVAL: u64 = 50; // Milliseconds between child exit checks.

/// One complete set of `key: value` telemetry fields from a single query.
///
/// Empty when the query failed; consumers treat missing keys as "N/A".
pub type Snapshot = HashMap<String, String>;

#[derive(Debug)]
pub enum FetchError {
    Timeout,
    Unknown,
    CommandFailed(i32),
    Io(io::Error),
}
impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FetchError::Timeout => write!(f, "query command timed out"),
            FetchError::Unknown => write!(f, "query command failed"),
            FetchError::CommandFailed(code) => {
                write!(f, "query command exited with status {}", code)
            }
            FetchError::Io(err) => write!(f, "{}", err),
        }
    }
}
impl From<io::Error> for FetchError {
    fn from(err: io::Error) -> FetchError {
        FetchError::Io(err)
    }
}

/// Seam between the fetcher and the external status-query command, so tests
/// and alternative acquisition backends can stand in for the subprocess.
pub trait CommandRunner: Send + Sync {
    fn run(&self, target: &str) -> Result<String, FetchError>;
}

/// Runs the configured query binary (`upsc` by default) with the UPS target
/// as its single argument, killing it once the timeout elapses.
pub struct QueryCommand {
    command: String,
    timeout: Duration,
}

impl QueryCommand {
    pub fn new(command: String, timeout: Duration) -> QueryCommand {
        return QueryCommand { command, timeout };
    }
}

impl CommandRunner for QueryCommand {
    fn run(&self, target: &str) -> Result<String, FetchError> {
        let mut child = Command::new(&self.command)
            .arg(target)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .stdin(Stdio::null())
            .spawn()?;

        // Drain stdout on a separate thread so the child can never block on
        // a full pipe while we wait on it.
        let mut stdout = child.stdout.take().ok_or(FetchError::Unknown)?;
        let reader = thread::spawn(move || -> io::Result<String> {
            let mut output = String::new();
            stdout.read_to_string(&mut output)?;
            Ok(output)
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                child.kill().ok();
                child.wait().ok();
                return Err(FetchError::Timeout);
            }
            thread::sleep(Duration::from_millis(WAIT_POLL_INTERVAL));
        };

        let output = reader.join().map_err(|_| FetchError::Unknown)??;
        if status.success() {
            Ok(output)
        } else {
            Err(FetchError::CommandFailed(status.code().unwrap_or(-1)))
        }
    }
}

/// Splits query output into a snapshot, one `key: value` field per line.
///
/// Splits at the first colon only; keys and values keep everything else
/// verbatim apart from surrounding whitespace. Lines without a colon are
/// dropped.
pub fn parse_snapshot(raw: &str) -> Snapshot {
    let mut data = Snapshot::new();
    for line in raw.lines() {
        if let Some((key, value)) = line.split_once(':') {
            data.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    return data;
}

pub struct Fetcher {
    target: String,
    runner: Box<dyn CommandRunner>,
}

impl Fetcher {
    pub fn new(target: String, runner: Box<dyn CommandRunner>) -> Fetcher {
        return Fetcher { target, runner };
    }

    /// Queries the UPS once and returns whatever fields came back.
    ///
    /// Never fails from the caller's point of view: a non-zero exit, a spawn
    /// failure, and a timed-out command all log a diagnostic and yield an
    /// empty snapshot.
    pub fn fetch(&self) -> Snapshot {
        match self.runner.run(&self.target) {
            Ok(output) => parse_snapshot(&output),
            Err(FetchError::CommandFailed(code)) => {
                log::error!(
                    "Query for '{}' returned non-zero exit status {}.",
                    self.target,
                    code
                );
                Snapshot::new()
            }
            Err(err) => {
                log::error!("Error fetching UPS data: {}.", err);
                Snapshot::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticRunner(Result<&'static str, fn() -> FetchError>);

    impl CommandRunner for StaticRunner {
        fn run(&self, _target: &str) -> Result<String, FetchError> {
            match &self.0 {
                Ok(output) => Ok(output.to_string()),
                Err(make) => Err(make()),
            }
        }
    }

    #[test]
    fn parse_splits_and_trims_fields() {
        let raw = "battery.charge: 100\n  ups.status :  OL \nups.load: 9\n";
        let data = parse_snapshot(raw);
        assert_eq!(data.len(), 3);
        assert_eq!(data["battery.charge"], "100");
        assert_eq!(data["ups.status"], "OL");
        assert_eq!(data["ups.load"], "9");
    }

    #[test]
    fn parse_drops_malformed_lines() {
        let raw = "garbage\n\nbattery.charge: 42\nno colon here\n";
        let data = parse_snapshot(raw);
        assert_eq!(data.len(), 1);
        assert_eq!(data["battery.charge"], "42");
    }

    #[test]
    fn parse_splits_at_first_colon_only() {
        let data = parse_snapshot("battery.date: 2024:06:01");
        assert_eq!(data["battery.date"], "2024:06:01");
    }

    #[test]
    fn fetch_returns_parsed_fields_on_success() {
        let fetcher = Fetcher::new(
            "ups@localhost".to_string(),
            Box::new(StaticRunner(Ok("ups.status: OL\nbattery.charge: 87"))),
        );
        let data = fetcher.fetch();
        assert_eq!(data["ups.status"], "OL");
        assert_eq!(data["battery.charge"], "87");
    }

    #[test]
    fn fetch_is_empty_when_command_exits_non_zero() {
        let fetcher = Fetcher::new(
            "ups@localhost".to_string(),
            Box::new(StaticRunner(Err(|| FetchError::CommandFailed(1)))),
        );
        assert!(fetcher.fetch().is_empty());
    }

    #[test]
    fn fetch_is_empty_when_command_cannot_run() {
        let fetcher = Fetcher::new(
            "ups@localhost".to_string(),
            Box::new(StaticRunner(Err(|| {
                FetchError::Io(io::Error::new(io::ErrorKind::NotFound, "no such file"))
            }))),
        );
        assert!(fetcher.fetch().is_empty());
    }

    #[cfg(unix)]
    mod subprocess {
        use super::*;

        #[test]
        fn captures_stdout_of_successful_command() {
            let runner = QueryCommand::new("echo".to_string(), Duration::from_secs(5));
            let output = runner.run("battery.charge: 90").unwrap();
            assert_eq!(parse_snapshot(&output)["battery.charge"], "90");
        }

        #[test]
        fn reports_non_zero_exit() {
            // `sh <missing file>` runs but exits non-zero.
            let runner = QueryCommand::new("sh".to_string(), Duration::from_secs(5));
            match runner.run("/definitely/not/a/script") {
                Err(FetchError::CommandFailed(code)) => assert_ne!(code, 0),
                other => panic!("expected CommandFailed, got {:?}", other),
            }
        }

        #[test]
        fn reports_missing_binary() {
            let runner = QueryCommand::new(
                "/definitely/not/a/binary".to_string(),
                Duration::from_secs(5),
            );
            assert!(matches!(
                runner.run("ups@localhost"),
                Err(FetchError::Io(_))
            ));
        }

        #[test]
        fn kills_hung_command_on_timeout() {
            let runner = QueryCommand::new("sleep".to_string(), Duration::from_millis(200));
            assert!(matches!(runner.run("5"), Err(FetchError::Timeout)));
        }

        #[test]
        fn fetch_is_empty_for_real_failures_too() {
            let broken = Fetcher::new(
                "ups@localhost".to_string(),
                Box::new(QueryCommand::new(
                    "/definitely/not/a/binary".to_string(),
                    Duration::from_secs(5),
                )),
            );
            let unreachable = Fetcher::new(
                "/definitely/not/a/script".to_string(),
                Box::new(QueryCommand::new("sh".to_string(), Duration::from_secs(5))),
            );
            assert!(broken.fetch().is_empty());
            assert!(unreachable.fetch().is_empty());
        }
    }
}
