use super::{SchemaSource, SourceError};
use repoconf_hash::sha256_hex;
use repoconf_types::{CancelToken, Cancelled, LoadedSchema, SchemaLock};
use std::ffi::OsStr;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Reads schemas from a single commit of a git repository.
///
/// The pinned reference is fetched at depth 1 into a throwaway bare repository that lives
/// as long as the source. Requires the `git` executable.
#[derive(Debug)]
pub struct GitSchemaSource {
    dir: TempDir,
    origin: String,
    version: String,
    commit: String,
}

impl GitSchemaSource {
    /// Fetch `reference` (a branch, tag, or full ref name) from `origin`.
    pub fn fetch(cancel: &CancelToken, origin: &str, reference: &str) -> Result<Self, SourceError> {
        let dir = tempfile::Builder::new()
            .prefix("repoconf-git-")
            .tempdir()
            .map_err(|e| SourceError::Io {
                context: "create temporary git directory".to_string(),
                source: e,
            })?;

        debug!(origin, reference, dir = %dir.path().display(), "fetching schema repository");

        run_git(
            cancel,
            "init",
            [
                OsStr::new("init"),
                OsStr::new("--bare"),
                OsStr::new("--quiet"),
                dir.path().as_os_str(),
            ],
        )?;

        let git_dir = dir.path();
        run_git(
            cancel,
            "fetch",
            with_git_dir(
                git_dir,
                [
                    "fetch",
                    "--quiet",
                    "--no-tags",
                    "--depth",
                    "1",
                    origin,
                    reference,
                ],
            ),
        )?;

        let out = run_git(
            cancel,
            "rev-parse",
            with_git_dir(git_dir, ["rev-parse", "--verify", "FETCH_HEAD^{commit}"]),
        )?;
        let commit = String::from_utf8_lossy(&out).trim().to_string();
        debug!(origin, reference, commit = %commit, "resolved schema reference");

        Ok(Self {
            dir,
            origin: origin.to_string(),
            version: reference.to_string(),
            commit,
        })
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

impl SchemaSource for GitSchemaSource {
    fn load_schema(&self, cancel: &CancelToken, name: &str) -> Result<LoadedSchema, SourceError> {
        let object = format!("{}:{}.json", self.commit, name);
        let data = run_git(
            cancel,
            "cat-file",
            with_git_dir(self.dir.path(), ["cat-file", "blob", object.as_str()]),
        )?;

        let hash = sha256_hex(&data);
        debug!(schema = name, commit = %self.commit, hash = %hash, "read schema from git");

        Ok(LoadedSchema {
            lock: SchemaLock {
                name: name.to_string(),
                url: String::new(),
                version: self.version.clone(),
                hash,
            },
            data,
        })
    }
}

fn with_git_dir<'a, const N: usize>(
    git_dir: &'a Path,
    args: [&'a str; N],
) -> impl IntoIterator<Item = &'a OsStr> {
    [OsStr::new("--git-dir"), git_dir.as_os_str()]
        .into_iter()
        .chain(args.into_iter().map(OsStr::new))
}

/// Run git to completion, killing it if the run is cancelled. Returns stdout.
fn run_git<'a>(
    cancel: &CancelToken,
    operation: &str,
    args: impl IntoIterator<Item = &'a OsStr>,
) -> Result<Vec<u8>, SourceError> {
    cancel.check()?;

    let mut child = Command::new("git")
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SourceError::Io {
            context: "spawn git".to_string(),
            source: e,
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = loop {
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Cancelled.into());
        }
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                return Err(SourceError::Io {
                    context: format!("wait for git {operation}"),
                    source: e,
                });
            }
        }
    };

    let out = stdout.join().unwrap_or_default();
    let err = stderr.join().unwrap_or_default();

    if !status.success() {
        let message = String::from_utf8_lossy(&err).trim().to_string();
        return Err(SourceError::Git {
            operation: operation.to_string(),
            message: if message.is_empty() {
                format!("exited with {status}")
            } else {
                message
            },
        });
    }

    Ok(out)
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}
