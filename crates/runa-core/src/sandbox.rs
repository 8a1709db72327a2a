//! Local execution backend scoped to a workspace root.
//!
//! Runs shell commands and file operations on behalf of the agent. The
//! assembler always configures absolute real paths (`virtual_mode = false`),
//! a fixed per-command wall-clock timeout, and a fixed cap on captured output
//! bytes; exceeding either is a command-level failure, not a process error.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use globset::Glob;
use ignore::WalkBuilder;

/// Configuration for the local sandbox.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Workspace root; shell commands run with this as working directory.
    pub root_dir: PathBuf,
    /// When false, all paths are fully qualified absolute system paths.
    pub virtual_mode: bool,
    /// Wall-clock timeout per command execution.
    pub timeout: Duration,
    /// Cap on captured bytes per output stream.
    pub max_output_bytes: usize,
}

/// Output of one shell command execution.
#[derive(Debug)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
}

/// One line matched by [`LocalSandbox::search`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    pub path: PathBuf,
    pub line_number: usize,
    pub line: String,
}

/// Truncates a byte slice at a valid UTF-8 character boundary.
///
/// Returns the truncated string and whether truncation occurred.
fn truncate_at_utf8_boundary(bytes: &[u8], max_bytes: usize) -> (String, bool) {
    if bytes.len() <= max_bytes {
        return (String::from_utf8_lossy(bytes).into_owned(), false);
    }

    // Walk backwards past UTF-8 continuation bytes (10xxxxxx).
    let mut end = max_bytes;
    while end > 0 && (bytes[end - 1] & 0xC0) == 0x80 {
        end -= 1;
    }

    // We are now just past a lead byte. Keep its whole sequence when it fits
    // within the cap, otherwise drop the lead byte too.
    if end > 0 && bytes[end - 1] >= 0xC0 {
        let byte = bytes[end - 1];
        let char_len = if byte >= 0xF0 {
            4
        } else if byte >= 0xE0 {
            3
        } else {
            2
        };
        if end - 1 + char_len <= max_bytes {
            end = end - 1 + char_len;
        } else {
            end -= 1;
        }
    }

    (String::from_utf8_lossy(&bytes[..end]).into_owned(), true)
}

/// Sandboxed execution backend bound to one workspace.
#[derive(Debug)]
pub struct LocalSandbox {
    config: SandboxConfig,
}

impl LocalSandbox {
    /// Creates a sandbox with the given configuration.
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    /// Returns the workspace root.
    pub fn root_dir(&self) -> &Path {
        &self.config.root_dir
    }

    pub fn virtual_mode(&self) -> bool {
        self.config.virtual_mode
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    pub fn max_output_bytes(&self) -> usize {
        self.config.max_output_bytes
    }

    /// Resolves a caller-supplied path against the configured path mode.
    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        if self.config.virtual_mode {
            Ok(self.config.root_dir.join(path.strip_prefix("/").unwrap_or(path)))
        } else if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            bail!(
                "expected an absolute path, got {} (virtual_mode is off)",
                path.display()
            )
        }
    }

    /// Runs a shell command in the workspace root.
    ///
    /// Timeouts and output truncation are reported in the returned
    /// [`ExecOutput`]; only spawn/wait failures are errors.
    ///
    /// # Errors
    /// Returns an error if the command cannot be spawned or awaited.
    pub async fn exec(&self, command: &str) -> Result<ExecOutput> {
        if command.trim().is_empty() {
            bail!("command cannot be empty");
        }

        let child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.config.root_dir)
            // Signal to programs that we are a non-interactive, dumb terminal.
            .env("TERM", "dumb")
            .env("NO_COLOR", "1")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to execute command '{command}'"))?;

        let output_fut = child.wait_with_output();
        let output = match tokio::time::timeout(self.config.timeout, output_fut).await {
            Ok(result) => {
                result.with_context(|| format!("Failed to execute command '{command}'"))?
            }
            Err(_) => {
                return Ok(ExecOutput {
                    stdout: String::new(),
                    stderr: format!(
                        "Command timed out after {} seconds",
                        self.config.timeout.as_secs()
                    ),
                    exit_code: -1,
                    timed_out: true,
                    stdout_truncated: false,
                    stderr_truncated: false,
                });
            }
        };

        let (stdout, stdout_truncated) =
            truncate_at_utf8_boundary(&output.stdout, self.config.max_output_bytes);
        let (stderr, stderr_truncated) =
            truncate_at_utf8_boundary(&output.stderr, self.config.max_output_bytes);

        Ok(ExecOutput {
            stdout,
            stderr,
            exit_code: output.status.code().unwrap_or(-1),
            timed_out: false,
            stdout_truncated,
            stderr_truncated,
        })
    }

    /// Lists the entries of a directory.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be read.
    pub fn list_dir(&self, path: &Path) -> Result<Vec<String>> {
        let path = self.resolve(path)?;
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&path)
            .with_context(|| format!("Failed to list {}", path.display()))?
        {
            let entry = entry?;
            entries.push(entry.file_name().to_string_lossy().into_owned());
        }
        entries.sort();
        Ok(entries)
    }

    /// Reads a file to a string.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn read_file(&self, path: &Path) -> Result<String> {
        let path = self.resolve(path)?;
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    /// Writes a file, creating parent directories as needed.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn write_file(&self, path: &Path, contents: &str) -> Result<()> {
        let path = self.resolve(path)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Replaces one exact occurrence of `old` in a file.
    ///
    /// # Errors
    /// Returns an error if `old` is absent or appears more than once.
    pub fn edit_file(&self, path: &Path, old: &str, new: &str) -> Result<()> {
        let resolved = self.resolve(path)?;
        let contents = std::fs::read_to_string(&resolved)
            .with_context(|| format!("Failed to read {}", resolved.display()))?;

        let occurrences = contents.matches(old).count();
        if occurrences == 0 {
            bail!("text to replace not found in {}", resolved.display());
        }
        if occurrences > 1 {
            bail!(
                "text to replace appears {occurrences} times in {}; it must be unique",
                resolved.display()
            );
        }

        std::fs::write(&resolved, contents.replacen(old, new, 1))
            .with_context(|| format!("Failed to write {}", resolved.display()))
    }

    /// Finds workspace files matching a glob pattern (e.g. `**/*.rs`).
    ///
    /// Respects ignore files; returns absolute paths sorted for stable output.
    ///
    /// # Errors
    /// Returns an error if the pattern is invalid.
    pub fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let matcher = Glob::new(pattern)
            .with_context(|| format!("Invalid glob pattern '{pattern}'"))?
            .compile_matcher();

        let mut matches = Vec::new();
        for entry in WalkBuilder::new(&self.config.root_dir).build() {
            let entry = entry?;
            if entry.file_type().is_some_and(|ft| ft.is_file()) {
                let relative = entry
                    .path()
                    .strip_prefix(&self.config.root_dir)
                    .unwrap_or_else(|_| entry.path());
                if matcher.is_match(relative) {
                    matches.push(entry.into_path());
                }
            }
        }
        matches.sort();
        Ok(matches)
    }

    /// Searches workspace files for lines containing `query`.
    ///
    /// # Errors
    /// Returns an error if the workspace walk fails.
    pub fn search(&self, query: &str) -> Result<Vec<SearchMatch>> {
        let mut results = Vec::new();
        for entry in WalkBuilder::new(&self.config.root_dir).build() {
            let entry = entry?;
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            // Skip binary or unreadable files silently.
            let Ok(contents) = std::fs::read_to_string(entry.path()) else {
                continue;
            };
            for (index, line) in contents.lines().enumerate() {
                if line.contains(query) {
                    results.push(SearchMatch {
                        path: entry.path().to_path_buf(),
                        line_number: index + 1,
                        line: line.to_string(),
                    });
                }
            }
        }
        results.sort_by(|a, b| (&a.path, a.line_number).cmp(&(&b.path, b.line_number)));
        Ok(results)
    }
}
