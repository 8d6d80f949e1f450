//! Structural tests for architectural boundary enforcement.
//!
//! These tests scan source files to verify that the layer boundaries hold:
//! domain is pure, application talks to the outside only through ports, and
//! infra never prints or reaches up into commands or output.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Read a file and strip comment lines to avoid false positives.
fn read_non_comment_lines(path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .filter(|l| {
            let trimmed = l.trim();
            !trimmed.starts_with("//") && !trimmed.starts_with("/*") && !trimmed.starts_with('*')
        })
        .map(String::from)
        .collect()
}

/// Track brace depth and return whether a line is inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    /// Process a line and return `true` if it's inside a `#[cfg(test)]` block.
    fn process_line(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.contains("#[cfg(test)]") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

fn src_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src")
}

fn relative(file: &Path) -> String {
    file.strip_prefix(env!("CARGO_MANIFEST_DIR"))
        .unwrap_or(file)
        .display()
        .to_string()
        .replace('\\', "/")
}

/// Every non-comment line under `dir` containing one of `patterns`.
fn find_imports(dir: &Path, patterns: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();
    for file in collect_rs_files(dir) {
        let rel = relative(&file);
        for (i, line) in read_non_comment_lines(&file).iter().enumerate() {
            for pattern in patterns {
                if line.contains(pattern) {
                    violations.push(format!("{rel}:{}: `{pattern}`: {line}", i + 1));
                }
            }
        }
    }
    violations
}

/// Non-test lines under `dir` using a print macro.
fn find_print_macros(dir: &Path) -> Vec<String> {
    let mut violations = Vec::new();
    for file in collect_rs_files(dir) {
        let rel = relative(&file);
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let mut tracker = CfgTestTracker::new();
        for (i, line) in content.lines().enumerate() {
            let in_test = tracker.process_line(line);
            if in_test || line.trim().starts_with("//") {
                continue;
            }
            if line.contains("println!") || line.contains("eprintln!") {
                violations.push(format!("{rel}:{}: {line}", i + 1));
            }
        }
    }
    violations
}

// ── Layer imports ─────────────────────────────────────────────────────────────

#[test]
fn domain_has_no_outer_layer_imports() {
    let violations = find_imports(
        &src_dir().join("domain"),
        &[
            "crate::application",
            "crate::infra",
            "crate::commands",
            "crate::output",
            "crate::app::",
            "tokio::",
        ],
    );
    assert!(
        violations.is_empty(),
        "domain/ must stay pure (no outer layers, no runtime):\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_has_no_infra_or_output_imports() {
    let violations = find_imports(
        &src_dir().join("application"),
        &["crate::infra", "crate::output", "crate::commands", "crate::app::"],
    );
    assert!(
        violations.is_empty(),
        "application/ must not import from infra/, output/ or commands/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_imports_from_commands_or_output() {
    let violations = find_imports(
        &src_dir().join("infra"),
        &["crate::commands", "crate::output", "crate::app::"],
    );
    assert!(
        violations.is_empty(),
        "infra/ must not import from commands/ or output/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_may_only_import_ports_from_application() {
    let mut violations = Vec::new();
    for file in collect_rs_files(&src_dir().join("infra")) {
        let rel = relative(&file);
        for (i, line) in read_non_comment_lines(&file).iter().enumerate() {
            if line.contains("crate::application") && !line.contains("crate::application::ports") {
                violations.push(format!("{rel}:{}: {line}", i + 1));
            }
        }
    }
    assert!(
        violations.is_empty(),
        "infra/ must depend on application::ports only, never on services:\n{}",
        violations.join("\n")
    );
}

// ── Side effects ──────────────────────────────────────────────────────────────

#[test]
fn infra_has_no_print_macros_outside_tests() {
    let violations = find_print_macros(&src_dir().join("infra"));
    assert!(
        violations.is_empty(),
        "infra/ must not use println!/eprintln! outside #[cfg(test)]:\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_has_no_print_macros_outside_tests() {
    let violations = find_print_macros(&src_dir().join("application"));
    assert!(
        violations.is_empty(),
        "application/ must report through ProgressReporter, not print:\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_has_no_direct_io() {
    let mut violations = Vec::new();
    for file in collect_rs_files(&src_dir().join("application")) {
        let rel = relative(&file);
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let mut tracker = CfgTestTracker::new();
        for (i, line) in content.lines().enumerate() {
            let in_test = tracker.process_line(line);
            if in_test || line.trim().starts_with("//") {
                continue;
            }
            for pattern in ["std::fs::", "std::process::Command", "tokio::process", "ureq::"] {
                if line.contains(pattern) {
                    violations.push(format!("{rel}:{}: `{pattern}`: {line}", i + 1));
                }
            }
        }
    }
    assert!(
        violations.is_empty(),
        "application/ must go through ports for files, processes and HTTP:\n{}",
        violations.join("\n")
    );
}

// ── Runner construction ───────────────────────────────────────────────────────

#[test]
fn no_tokio_command_runner_new_outside_infra() {
    let mut violations = Vec::new();
    for file in collect_rs_files(&src_dir()) {
        let rel = relative(&file);
        if rel.contains("/infra/") || rel.ends_with("app.rs") {
            continue;
        }
        for (i, line) in read_non_comment_lines(&file).iter().enumerate() {
            if line.contains("TokioCommandRunner::new") {
                violations.push(format!("{rel}:{}: {line}", i + 1));
            }
        }
    }
    assert!(
        violations.is_empty(),
        "Found TokioCommandRunner::new outside infra/: obtain runners from AppContext:\n{}",
        violations.join("\n")
    );
}

#[test]
fn no_concrete_adapter_types_in_service_signatures() {
    let concrete = ["TokioCommandRunner", "HostRunner", "HostFs", "UreqFetcher", "TarGzExtractor"];
    let mut violations = Vec::new();
    for file in collect_rs_files(&src_dir().join("application").join("services")) {
        let rel = relative(&file);
        for (i, line) in read_non_comment_lines(&file).iter().enumerate() {
            if !line.contains("fn ") {
                continue;
            }
            for ty in concrete {
                if line.contains(ty) {
                    violations.push(format!("{rel}:{}: `{ty}`: {line}", i + 1));
                }
            }
        }
    }
    assert!(
        violations.is_empty(),
        "Services must take port trait bounds, not concrete adapters:\n{}",
        violations.join("\n")
    );
}

/// No module-level `#![allow(dead_code)]` in domain/, application/, or infra/.
#[test]
fn no_module_level_dead_code_allows_in_layers() {
    let mut violations = Vec::new();
    for layer in ["domain", "application", "infra"] {
        for file in collect_rs_files(&src_dir().join(layer)) {
            let rel = relative(&file);
            let Ok(content) = std::fs::read_to_string(&file) else {
                continue;
            };
            for (i, line) in content.lines().enumerate() {
                if line.trim() == "#![allow(dead_code)]" {
                    violations.push(format!("{rel}:{}", i + 1));
                }
            }
        }
    }
    assert!(
        violations.is_empty(),
        "Module-level #![allow(dead_code)] found in architecture layers:\n{}",
        violations.join("\n")
    );
}
