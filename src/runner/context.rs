use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([a-zA-Z0-9_.]+)\}").expect("valid placeholder regex"))
}

/// Variables and paths a suite run resolves against
pub struct SuiteContext {
    /// Directory `file` step paths are relative to
    pub root_dir: PathBuf,

    /// Values given on the command line; they win over everything else
    pub overrides: HashMap<String, String>,

    /// Suite defaults plus values captured from responses
    pub vars: HashMap<String, String>,
}

impl SuiteContext {
    pub fn new(root_dir: &Path, overrides: HashMap<String, String>) -> Self {
        Self {
            root_dir: root_dir.to_path_buf(),
            overrides,
            vars: HashMap::new(),
        }
    }

    /// Load suite defaults, keeping anything already captured
    pub fn merge_defaults(&mut self, defaults: &HashMap<String, String>) {
        for (k, v) in defaults {
            self.vars.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }

    pub fn get_var(&self, name: &str) -> Option<String> {
        self.overrides
            .get(name)
            .or_else(|| self.vars.get(name))
            .cloned()
            .or_else(|| std::env::var(name).ok())
    }

    pub fn set_var(&mut self, name: &str, value: &str) {
        self.vars.insert(name.to_string(), value.to_string());
    }

    /// Replace `${name}` placeholders; unknown names are left in place
    pub fn substitute_vars(&self, text: &str) -> String {
        placeholder_re()
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let key = &caps[1];
                if let Some(val) = self.get_var(key) {
                    return val;
                }
                match key {
                    "timestamp" => chrono::Utc::now().timestamp().to_string(),
                    "date" => chrono::Local::now().format("%Y-%m-%d").to_string(),
                    _ => format!("${{{}}}", key),
                }
            })
            .to_string()
    }

    /// Substitute inside every string of a JSON document
    pub fn substitute_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.substitute_vars(s)),
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.substitute_value(v)).collect())
            }
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.substitute_value(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Resolve a path against the root directory
    pub fn resolve_path(&self, relative: &str) -> PathBuf {
        let path = Path::new(relative);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root_dir.join(path)
        }
    }

    /// Store response values addressed by JSON pointers; returns names not found
    pub fn capture(&mut self, body: &Value, save: &HashMap<String, String>) -> Vec<String> {
        let mut missing = Vec::new();
        for (var_name, pointer) in save {
            match lookup(body, pointer) {
                Some(val) => {
                    let text = match val {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    self.set_var(var_name, &text);
                }
                None => missing.push(var_name.clone()),
            }
        }
        missing
    }
}

/// First placeholder still present in `text`
pub fn first_unresolved(text: &str) -> Option<String> {
    placeholder_re()
        .captures(text)
        .map(|caps| format!("${{{}}}", &caps[1]))
}

/// JSON pointer lookup that also accepts dotted paths (`data.token`)
pub fn lookup<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    if path == "$" || path == "." || path.is_empty() {
        return Some(body);
    }
    let pointer = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path.replace('.', "/"))
    };
    body.pointer(&pointer)
}
