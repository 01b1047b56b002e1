//! File-path allow/deny policy

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use crate::error::ArbiterResult;

use super::{PolicyDecision, ToolInvocationRequest, ToolPolicy};

/// Input fields that may carry a file path
const PATH_FIELDS: &[&str] = &["path", "file_path"];

/// Gates file reads against a restricted-path list and file writes against
/// an allowed-tree list
///
/// Paths are tilde-expanded and lexically normalized before comparison, so
/// `~/../../etc/passwd` style inputs resolve to what they actually address.
#[derive(Debug, Clone)]
pub struct FileAccessPolicy {
    restricted_read_paths: Vec<PathBuf>,
    allowed_write_paths: Vec<PathBuf>,
    read_tools: HashSet<String>,
    write_tools: HashSet<String>,
}

impl FileAccessPolicy {
    pub fn new(restricted_read_paths: Vec<PathBuf>, allowed_write_paths: Vec<PathBuf>) -> Self {
        Self {
            restricted_read_paths,
            allowed_write_paths,
            read_tools: ["read", "read_file", "glob", "grep"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            write_tools: ["write", "write_file", "edit"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Override the tool names treated as readers
    pub fn with_read_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.read_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Override the tool names treated as writers
    pub fn with_write_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Expand and lexically normalize a path without touching the filesystem
    fn normalize(raw: &str) -> PathBuf {
        let expanded = shellexpand::tilde(raw);
        let path = Path::new(expanded.as_ref());

        let mut normalized = PathBuf::new();
        for component in path.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    normalized.pop();
                }
                other => normalized.push(other.as_os_str()),
            }
        }
        normalized
    }

    fn extract_path(request: &ToolInvocationRequest) -> Option<PathBuf> {
        PATH_FIELDS
            .iter()
            .find_map(|field| request.input_str(field))
            .map(Self::normalize)
    }
}

impl ToolPolicy for FileAccessPolicy {
    fn name(&self) -> &str {
        "file_access"
    }

    fn applicable_to(&self, tool_name: &str) -> bool {
        self.read_tools.contains(tool_name) || self.write_tools.contains(tool_name)
    }

    fn evaluate(&self, request: &ToolInvocationRequest) -> ArbiterResult<PolicyDecision> {
        let Some(path) = Self::extract_path(request) else {
            // No path in the input means nothing for this policy to judge
            return Ok(PolicyDecision::allow());
        };

        if self.read_tools.contains(&request.tool_name) {
            for restricted in &self.restricted_read_paths {
                let restricted = Self::normalize(&restricted.to_string_lossy());
                if path.starts_with(&restricted) {
                    return Ok(PolicyDecision::deny(format!(
                        "read access to {} is restricted",
                        path.display()
                    )));
                }
            }
        }

        if self.write_tools.contains(&request.tool_name) && !self.allowed_write_paths.is_empty() {
            let allowed = self.allowed_write_paths.iter().any(|root| {
                let root = Self::normalize(&root.to_string_lossy());
                path.starts_with(&root)
            });
            if !allowed {
                return Ok(PolicyDecision::deny(format!(
                    "write access to {} is outside the allowed paths",
                    path.display()
                )));
            }
        }

        Ok(PolicyDecision::allow())
    }
}
