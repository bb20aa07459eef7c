use dashmap::DashMap;
use std::env;
use std::sync::Arc;

/// Environment snapshot
///
/// A flat key/value view of the process environment and command-line options,
/// handed to listeners during `environment_prepared`. Clones share the same
/// underlying properties, so listeners may add to it.
#[derive(Clone, Default)]
pub struct Environment {
    properties: Arc<DashMap<String, String>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the process environment variables. Entries that are not valid
    /// unicode are skipped.
    pub fn from_process_env() -> Self {
        let environment = Self::new();
        for (key, value) in env::vars_os() {
            if let (Some(key), Some(value)) = (key.to_str(), value.to_str()) {
                environment.set(key, value);
            }
        }
        environment
    }

    /// Apply `--key=value` options from `args`; a bare `--flag` is stored as `"true"`.
    /// Arguments that are not options are ignored.
    pub fn apply_command_line_args(&self, args: &[String]) {
        for arg in args {
            let Some(option) = arg.strip_prefix("--") else {
                continue;
            };
            match option.split_once('=') {
                Some((key, value)) if !key.is_empty() => self.set(key, value),
                None if !option.is_empty() => self.set(option, "true"),
                _ => tracing::debug!("Ignoring malformed option '{}'", arg),
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.properties.get(key).map(|v| v.clone())
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.properties.insert(key.to_string(), value.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Whether `other` is a handle to the same snapshot.
    pub fn same_snapshot(&self, other: &Environment) -> bool {
        Arc::ptr_eq(&self.properties, &other.properties)
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("properties", &self.len())
            .finish()
    }
}
