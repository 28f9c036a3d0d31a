//! Suites compiled into the binary, runnable by name (`api-probe run backend`)

const BUILTIN: &[(&str, &str)] = &[
    ("backend", include_str!("../suites/backend.yaml")),
    ("blog", include_str!("../suites/blog.yaml")),
    ("dashboard", include_str!("../suites/dashboard.yaml")),
    ("deployment", include_str!("../suites/deployment.yaml")),
];

/// YAML source of a built-in suite
pub fn builtin(name: &str) -> Option<&'static str> {
    BUILTIN
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, content)| *content)
}

pub fn names() -> Vec<&'static str> {
    BUILTIN.iter().map(|(n, _)| *n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_suite_content, Step};

    #[test]
    fn test_builtin_suites_parse() {
        for name in names() {
            let content = builtin(name).unwrap();
            let suite = parse_suite_content(content, name)
                .unwrap_or_else(|e| panic!("built-in suite '{}' failed: {:#}", name, e));
            assert!(suite.step_count() > 0, "{} has no steps", name);
        }
        assert!(builtin("BLOG").is_some());
        assert!(builtin("mobile").is_none());
    }

    #[test]
    fn test_blog_suite_guards_not_implemented() {
        let suite = parse_suite_content(builtin("blog").unwrap(), "blog").unwrap();
        let first = &suite.groups[0].steps[0];
        match first {
            Step::Check(c) => {
                assert_eq!(c.path, "/api/blog");
                assert_eq!(c.expect, 401);
                assert!(!c.auth);
            }
            other => panic!("expected check, got {}", other.kind()),
        }
    }
}
