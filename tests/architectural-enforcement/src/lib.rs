//! Architectural Enforcement
//!
//! Source-scanning helpers shared by the policy tests in `tests/`:
//! - No sleep calls in production code
//! - No blocking I/O inside async functions
//!
//! The scanner works on text, not on a syntax tree. It understands
//! visibility and qualifier prefixes on `fn` items, async blocks, and the
//! trailing `#[cfg(test)]` module convention used across the workspace.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source roots, relative to the workspace root
pub const PRODUCTION_ROOTS: &[&str] = &["sim-client/core/src", "sim-client/cli/src"];

/// Workspace root, resolved from this package's manifest directory
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// A Rust source file split into lines
#[derive(Debug)]
pub struct SourceFile {
    /// Path to the file
    pub path: PathBuf,
    /// File content, one entry per line
    pub lines: Vec<String>,
    test_module_start: Option<usize>,
}

impl SourceFile {
    /// Read a source file
    ///
    /// # Errors
    ///
    /// Returns the IO error if the file cannot be read.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::from_content(path.to_path_buf(), &content))
    }

    /// Build from in-memory content
    #[must_use]
    pub fn from_content(path: PathBuf, content: &str) -> Self {
        let lines: Vec<String> = content.lines().map(str::to_string).collect();
        // A gated item such as a test-only helper is not a test module
        let test_module_start = lines.iter().enumerate().position(|(idx, line)| {
            line.trim_start().starts_with("#[cfg(test)]")
                && lines[idx + 1..]
                    .iter()
                    .map(|next| next.trim_start())
                    .find(|next| !next.is_empty())
                    .is_some_and(|next| next.starts_with("mod "))
        });

        Self {
            path,
            lines,
            test_module_start,
        }
    }

    /// Code portion of a line, with any trailing `//` comment removed
    #[must_use]
    pub fn code(&self, idx: usize) -> &str {
        let line = &self.lines[idx];
        line.split("//").next().unwrap_or(line)
    }

    /// Whether the line is test code: inside the trailing test module, or
    /// inside a function carrying a test attribute
    #[must_use]
    pub fn is_test_code(&self, idx: usize) -> bool {
        if self.test_module_start.is_some_and(|start| idx >= start) {
            return true;
        }

        self.enclosing_fn(idx)
            .is_some_and(|fn_idx| self.has_test_attribute(fn_idx))
    }

    /// Whether the line runs in an async context: an `async fn` body or an
    /// `async` block nested in any function
    #[must_use]
    pub fn is_async_context(&self, idx: usize) -> bool {
        let mut indent = indent_of(&self.lines[idx]);

        for i in (0..idx).rev() {
            let line = &self.lines[i];
            if line.trim().is_empty() {
                continue;
            }

            let line_indent = indent_of(line);
            if line_indent >= indent {
                continue;
            }
            indent = line_indent;

            let code = self.code(i);
            if code.contains("async move {") || code.trim_end().ends_with("async {") {
                return true;
            }
            if let Some(is_async) = fn_signature(code) {
                return is_async;
            }
        }

        false
    }

    /// Index of the signature line of the function enclosing `idx`
    #[must_use]
    pub fn enclosing_fn(&self, idx: usize) -> Option<usize> {
        let indent = indent_of(&self.lines[idx]);

        (0..idx).rev().find(|&i| {
            let line = &self.lines[i];
            !line.trim().is_empty()
                && indent_of(line) < indent
                && fn_signature(self.code(i)).is_some()
        })
    }

    fn has_test_attribute(&self, fn_idx: usize) -> bool {
        self.lines[..fn_idx]
            .iter()
            .rev()
            .map(|line| line.trim())
            .take_while(|line| line.starts_with("#[") || line.starts_with("///"))
            .any(|line| line.starts_with("#[test]") || line.starts_with("#[tokio::test"))
    }
}

/// Parse a function signature line; returns whether it is async
///
/// Accepts `pub`, `pub(crate)`, `const`, `unsafe` and `extern "C"` prefixes
/// in any combination.
#[must_use]
pub fn fn_signature(code: &str) -> Option<bool> {
    let mut rest = code.trim_start();
    let mut is_async = false;

    loop {
        if let Some(after) = rest.strip_prefix("pub") {
            if let Some(close) = after.strip_prefix('(').and_then(|a| a.find(')')) {
                rest = after[close + 2..].trim_start();
                continue;
            }
            if after.starts_with(' ') {
                rest = after.trim_start();
                continue;
            }
        }

        if let Some(after) = rest.strip_prefix("async ") {
            is_async = true;
            rest = after.trim_start();
        } else if let Some(after) = rest.strip_prefix("const ") {
            rest = after.trim_start();
        } else if let Some(after) = rest.strip_prefix("unsafe ") {
            rest = after.trim_start();
        } else if let Some(after) = rest.strip_prefix("extern ") {
            rest = after
                .trim_start()
                .strip_prefix("\"C\"")
                .unwrap_or(after)
                .trim_start();
        } else {
            break;
        }
    }

    rest.starts_with("fn ").then_some(is_async)
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Every `.rs` file under the production roots
#[must_use]
pub fn production_sources() -> Vec<SourceFile> {
    let root = workspace_root();

    PRODUCTION_ROOTS
        .iter()
        .map(|dir| root.join(dir))
        .filter(|dir| dir.exists())
        .flat_map(|dir| {
            walkdir::WalkDir::new(dir)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("rs"))
                .filter_map(|entry| SourceFile::read(entry.path()).ok())
        })
        .collect()
}

/// One policy violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File containing the violation
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// What was found
    pub reason: &'static str,
    /// The offending source line, trimmed
    pub source: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} - {}: {}",
            self.path.display(),
            self.line,
            self.reason,
            self.source
        )
    }
}

/// Sleep calls outside test code
#[must_use]
pub fn sleep_violations(file: &SourceFile) -> Vec<Violation> {
    (0..file.lines.len())
        .filter(|&idx| {
            let code = file.code(idx);
            (code.contains("::sleep(") || code.contains(".sleep(")) && !file.is_test_code(idx)
        })
        .map(|idx| Violation {
            path: file.path.clone(),
            line: idx + 1,
            reason: "Sleep call",
            source: file.lines[idx].trim().to_string(),
        })
        .collect()
}

/// Blocking calls that are forbidden inside async code
const BLOCKING_PATTERNS: &[(&str, &str)] = &[
    ("std::fs::", "Blocking file I/O"),
    ("std::net::", "Blocking network I/O"),
    ("std::process::Command", "Blocking process I/O"),
    ("std::io::stdin()", "Blocking stdin"),
    ("std::thread::sleep", "Blocking sleep"),
    (".blocking_lock()", "Blocking mutex acquisition"),
];

/// Blocking I/O inside async functions or blocks, outside test code
#[must_use]
pub fn blocking_io_violations(file: &SourceFile) -> Vec<Violation> {
    let mut violations = Vec::new();

    for idx in 0..file.lines.len() {
        let code = file.code(idx);
        let Some(&(_, reason)) = BLOCKING_PATTERNS
            .iter()
            .find(|(pattern, _)| code.contains(pattern))
        else {
            continue;
        };

        if file.is_test_code(idx) || !file.is_async_context(idx) {
            continue;
        }

        violations.push(Violation {
            path: file.path.clone(),
            line: idx + 1,
            reason,
            source: file.lines[idx].trim().to_string(),
        });
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(content: &str) -> SourceFile {
        SourceFile::from_content(PathBuf::from("sample.rs"), content)
    }

    #[test]
    fn test_fn_signature_prefixes() {
        assert_eq!(fn_signature("fn plain() {"), Some(false));
        assert_eq!(fn_signature("    pub async fn open("), Some(true));
        assert_eq!(fn_signature("pub(crate) async fn run() {"), Some(true));
        assert_eq!(fn_signature("pub const fn new() -> Self {"), Some(false));
        assert_eq!(fn_signature("let fn_name = 1;"), None);
        assert_eq!(fn_signature("impl Foo {"), None);
    }

    #[test]
    fn test_pub_async_fn_is_async_context() {
        let file = source("pub async fn load() {\n    let s = std::fs::read_to_string(p);\n}\n");

        assert!(file.is_async_context(1));
        assert_eq!(blocking_io_violations(&file).len(), 1);
    }

    #[test]
    fn test_sync_fn_is_allowed() {
        let file = source("pub fn load() {\n    let s = std::fs::read_to_string(p);\n}\n");

        assert!(blocking_io_violations(&file).is_empty());
    }

    #[test]
    fn test_async_block_in_sync_fn() {
        let file = source(
            "fn spawn_it() {\n    tokio::spawn(async move {\n        std::fs::remove_file(p);\n    });\n}\n",
        );

        assert_eq!(blocking_io_violations(&file).len(), 1);
    }

    #[test]
    fn test_test_module_is_exempt() {
        let file = source(
            "fn ok() {}\n\n#[cfg(test)]\nmod tests {\n    async fn t() {\n        tokio::time::sleep(d).await;\n    }\n}\n",
        );

        assert!(sleep_violations(&file).is_empty());
    }

    #[test]
    fn test_gated_helper_is_not_test_module() {
        let file = source(
            "impl Peer {\n    #[cfg(test)]\n    pub fn restore(&self) {}\n}\n\nasync fn poll() {\n    tokio::time::sleep(d).await;\n}\n\n#[cfg(test)]\nmod tests {}\n",
        );

        let violations = sleep_violations(&file);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, 7);
        assert!(file.is_test_code(10));
    }

    #[test]
    fn test_sleep_in_production_flagged() {
        let file = source("async fn poll() {\n    tokio::time::sleep(d).await; // wait\n}\n");

        let violations = sleep_violations(&file);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, 2);
    }

    #[test]
    fn test_comment_mentions_are_ignored() {
        let file = source("async fn poll() {\n    // never call std::fs::write here\n}\n");

        assert!(blocking_io_violations(&file).is_empty());
    }
}
