use super::types::{
    CheckParams, FileParams, LoginParams, PreflightParams, RefreshParams, Step, StepGroup, Suite,
};
use anyhow::{Context, Result};
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::path::Path;

/// Parse a YAML suite file
pub fn parse_suite_file(path: &Path) -> Result<Suite> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let fallback_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "suite".to_string());

    parse_suite_content(&content, &fallback_name)
        .with_context(|| format!("Invalid suite file: {}", path.display()))
}

/// Parse YAML content into a Suite
pub fn parse_suite_content(content: &str, fallback_name: &str) -> Result<Suite> {
    let value: Value = serde_yaml::from_str(content).context("Failed to parse YAML content")?;

    let map = match value {
        Value::Mapping(map) => map,
        _ => anyhow::bail!("Invalid suite format: expected a mapping at the top level"),
    };

    let name = get_str(&map, "name").unwrap_or_else(|| fallback_name.to_string());
    let description = get_str(&map, "description");
    let base_url = get_str(&map, "baseUrl");
    let vars = match map.get("vars") {
        Some(v) => parse_vars(v)?,
        None => HashMap::new(),
    };

    let mut groups = Vec::new();
    if let Some(val) = map.get("groups") {
        let seq = val.as_sequence().context("'groups' must be a list")?;
        for (i, item) in seq.iter().enumerate() {
            groups.push(parse_group(item).with_context(|| format!("groups[{}]", i))?);
        }
    } else if let Some(val) = map.get("steps") {
        // Flat form: one unnamed group
        groups.push(StepGroup {
            name: name.clone(),
            steps: parse_steps(val)?,
        });
    } else {
        anyhow::bail!("Suite '{}' has neither 'groups' nor 'steps'", name);
    }

    Ok(Suite {
        name,
        description,
        base_url,
        vars,
        groups,
    })
}

fn parse_group(value: &Value) -> Result<StepGroup> {
    let map = value.as_mapping().context("group must be a mapping")?;
    let name = get_str(map, "name").context("group is missing 'name'")?;
    let steps = match map.get("steps") {
        Some(v) => parse_steps(v)?,
        None => Vec::new(),
    };
    Ok(StepGroup { name, steps })
}

fn parse_steps(value: &Value) -> Result<Vec<Step>> {
    let seq = value.as_sequence().context("'steps' must be a list")?;
    let mut steps = Vec::with_capacity(seq.len());
    for (i, item) in seq.iter().enumerate() {
        steps.push(parse_step_value(item).with_context(|| format!("steps[{}]", i))?);
    }
    Ok(steps)
}

/// Parse a single step: `- kind: {params}` or a bare `- refresh`
pub fn parse_step_value(value: &Value) -> Result<Step> {
    let (kind, params) = match value {
        Value::String(s) => (s.as_str(), Value::Null),
        Value::Mapping(map) if map.len() == 1 => {
            let (k, v) = map.iter().next().context("empty step")?;
            let kind = k.as_str().context("step key must be a string")?;
            (kind, v.clone())
        }
        _ => anyhow::bail!("step must be a single-key mapping like '- check: {{...}}'"),
    };

    let step = match kind {
        "check" | "request" => Step::Check(from_params::<CheckParams>(kind, params)?),
        "login" => Step::Login(from_params::<LoginParams>(kind, params)?),
        "refresh" => {
            if params.is_null() {
                Step::Refresh(RefreshParams::default())
            } else {
                Step::Refresh(from_params::<RefreshParams>(kind, params)?)
            }
        }
        "preflight" | "cors" => Step::Preflight(from_params::<PreflightParams>(kind, params)?),
        "file" => Step::File(from_params::<FileParams>(kind, params)?),
        other => anyhow::bail!("Unknown step '{}'", other),
    };

    Ok(step)
}

fn from_params<T: serde::de::DeserializeOwned>(kind: &str, params: Value) -> Result<T> {
    serde_yaml::from_value(params).with_context(|| format!("Invalid parameters for '{}'", kind))
}

fn parse_vars(value: &Value) -> Result<HashMap<String, String>> {
    let map = value.as_mapping().context("'vars' must be a mapping")?;
    let mut vars = HashMap::new();
    for (k, v) in map {
        let name = k.as_str().context("variable names must be strings")?;
        let text = match v {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            _ => anyhow::bail!("variable '{}' must be a scalar", name),
        };
        vars.insert(name.to_string(), text);
    }
    Ok(vars)
}

fn get_str(map: &Mapping, name: &str) -> Option<String> {
    map.get(name).and_then(|v| v.as_str()).map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::client::HttpMethod;
    use crate::runner::state::Severity;

    #[test]
    fn test_parse_grouped_suite() {
        let yaml = r#"
name: Backend API
baseUrl: http://localhost:3001
vars:
  admin_email: admin@example.com
  page_size: 5
groups:
  - name: Health
    steps:
      - check:
          name: API Health Check
          path: /api/health
          json:
            /success: true
  - name: Authentication
    steps:
      - login:
          credentials:
            email: ${admin_email}
            password: secret
      - check:
          method: GET
          path: /api/auth/me
          auth: true
      - refresh
      - check:
          name: Create blocked without auth
          method: POST
          path: /api/blog
          body: { title: x, content: y }
          expect: 401
          severity: minor
"#;

        let suite = parse_suite_content(yaml, "fallback").unwrap();
        assert_eq!(suite.name, "Backend API");
        assert_eq!(suite.base_url.as_deref(), Some("http://localhost:3001"));
        assert_eq!(suite.vars.get("page_size").map(String::as_str), Some("5"));
        assert_eq!(suite.groups.len(), 2);
        assert_eq!(suite.step_count(), 5);

        match &suite.groups[1].steps[3] {
            Step::Check(c) => {
                assert_eq!(c.method, HttpMethod::Post);
                assert_eq!(c.expect, 401);
                assert_eq!(c.severity, Severity::Minor);
                assert!(c.body.is_some());
            }
            other => panic!("expected check, got {}", other.kind()),
        }
        assert!(matches!(suite.groups[1].steps[2], Step::Refresh(_)));
    }

    #[test]
    fn test_flat_steps_and_defaults() {
        let yaml = r#"
steps:
  - file:
      path: vercel.json
      json:
        /builds/0/src: backend/api/index.cjs
  - preflight:
      path: /api/auth/login
"#;
        let suite = parse_suite_content(yaml, "deploy").unwrap();
        assert_eq!(suite.name, "deploy");
        assert_eq!(suite.groups.len(), 1);

        match &suite.groups[0].steps[0] {
            Step::File(f) => {
                assert!(f.exists);
                assert_eq!(f.json.len(), 1);
            }
            other => panic!("expected file, got {}", other.kind()),
        }
        match &suite.groups[0].steps[1] {
            Step::Preflight(p) => {
                assert_eq!(p.origin, "http://localhost:5173");
                assert_eq!(p.request_method, "POST");
            }
            other => panic!("expected preflight, got {}", other.kind()),
        }
    }

    #[test]
    fn test_rejects_misspelled_parameters() {
        let typo = "steps:\n  - check: {path: /api/blog, expected: 401}\n";
        let err = format!("{:#}", parse_suite_content(typo, "x").unwrap_err());
        assert!(err.contains("unknown field `expected`"), "{}", err);

        let file_typo = "steps:\n  - file: {path: vercel.json, notContain: ['501']}\n";
        assert!(parse_suite_content(file_typo, "x").is_err());

        let login_typo = "steps:\n  - login: {credentials: {email: a}, expcet: 401}\n";
        assert!(parse_suite_content(login_typo, "x").is_err());
    }

    #[test]
    fn test_method_case_and_forbidden_status() {
        let yaml = r#"
steps:
  - check: {method: get, path: /api/blog}
  - check: {method: Put, path: /api/blog/test-id, expectNot: 501}
  - check: {method: DELETE, path: /api/blog/test-id, notStatus: 501}
  - file: {path: backend/api/index.cjs, notContains: ["501", Not Implemented]}
"#;
        let suite = parse_suite_content(yaml, "blog").unwrap();
        let steps = &suite.groups[0].steps;

        let checks: Vec<&CheckParams> = steps
            .iter()
            .filter_map(|s| match s {
                Step::Check(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(checks[0].method, HttpMethod::Get);
        assert_eq!(checks[0].expect_not, None);
        assert_eq!(checks[1].method, HttpMethod::Put);
        assert_eq!(checks[1].expect_not, Some(501));
        assert_eq!(checks[2].expect_not, Some(501));

        match &steps[3] {
            Step::File(f) => assert_eq!(f.not_contains, vec!["501", "Not Implemented"]),
            other => panic!("expected file, got {}", other.kind()),
        }
    }

    #[test]
    fn test_rejects_unknown_step_and_method() {
        let unknown = "steps:\n  - tapOn: {text: Login}\n";
        assert!(parse_suite_content(unknown, "x").is_err());

        let bad_method = "steps:\n  - check: {method: PATCH, path: /api/blog}\n";
        assert!(parse_suite_content(bad_method, "x").is_err());

        let no_steps = "name: empty\n";
        assert!(parse_suite_content(no_steps, "x").is_err());
    }
}
