//! Webhook payload decoding.

use std::path::Path;

use serde::Deserialize;

use crate::errors::WebhookError;

/// One webhook-triggered request to run a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Task identifier; empty when absent. Ignored by the fixed strategy.
    pub task: String,
    /// Working directory for the task, used verbatim.
    pub source_dir: String,
    /// Branch to synchronize to before running; `None` skips synchronization.
    pub branch: Option<String>,
    /// Forwarded to the command as discrete arguments, in order.
    pub params: Vec<String>,
}

/// Wire shape. Every field is optional so that `null` and absence both fall
/// back to the defaults.
#[derive(Deserialize)]
struct RawInvocation {
    #[serde(default)]
    task: Option<String>,
    #[serde(default)]
    source_dir: Option<String>,
    #[serde(default, alias = "revision")]
    branch: Option<String>,
    #[serde(default)]
    params: Option<Vec<String>>,
}

impl From<RawInvocation> for Invocation {
    fn from(raw: RawInvocation) -> Self {
        Self {
            task: raw.task.unwrap_or_default(),
            source_dir: raw.source_dir.unwrap_or_default(),
            branch: raw.branch.filter(|b| !b.trim().is_empty()),
            params: raw.params.unwrap_or_default(),
        }
    }
}

impl Invocation {
    /// Parse a request body. The body must be a JSON object; unknown fields
    /// are ignored.
    pub fn decode(body: &[u8]) -> Result<Self, WebhookError> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(WebhookError::MalformedPayload)?;
        if !value.is_object() {
            return Err(WebhookError::MalformedPayload(serde::de::Error::custom(
                "webhook payload must be a JSON object",
            )));
        }
        let raw: RawInvocation =
            serde_json::from_value(value).map_err(WebhookError::MalformedPayload)?;
        Ok(raw.into())
    }

    /// Check required fields and that the branch can only be read as a
    /// branch name by git.
    pub fn validate(&self) -> Result<(), WebhookError> {
        if self.source_dir.trim().is_empty() {
            return Err(WebhookError::MissingField("source_dir"));
        }
        if let Some(branch) = &self.branch {
            if !is_valid_branch_name(branch) {
                return Err(WebhookError::InvalidBranch(branch.clone()));
            }
        }
        Ok(())
    }

    /// Directory the task runs in, or `None` to inherit the daemon's.
    pub fn working_dir(&self) -> Option<&Path> {
        if self.source_dir.is_empty() {
            None
        } else {
            Some(Path::new(&self.source_dir))
        }
    }
}

/// A subset of `git check-ref-format --branch`. Anything starting with `-`
/// would be parsed as an option by `git checkout` and `git pull`.
pub fn is_valid_branch_name(name: &str) -> bool {
    const FORBIDDEN: &[char] = &['~', '^', ':', '?', '*', '[', '\\'];

    !name.is_empty()
        && !name.starts_with('-')
        && !name.starts_with('/')
        && !name.ends_with('/')
        && !name.ends_with('.')
        && !name.ends_with(".lock")
        && !name.contains("..")
        && !name.contains("//")
        && !name.contains("@{")
        && name != "@"
        && !name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || FORBIDDEN.contains(&c))
        && name.split('/').all(|part| !part.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_payload() {
        let body = br#"{"task":"deploy","source_dir":"/tmp/x","branch":"main","params":["a","b"]}"#;
        let inv = Invocation::decode(body).unwrap();
        assert_eq!(inv.task, "deploy");
        assert_eq!(inv.source_dir, "/tmp/x");
        assert_eq!(inv.branch.as_deref(), Some("main"));
        assert_eq!(inv.params, vec!["a", "b"]);
    }

    #[test]
    fn test_decode_defaults_missing_fields() {
        let inv = Invocation::decode(br#"{"source_dir":"/srv/app"}"#).unwrap();
        assert_eq!(inv.task, "");
        assert_eq!(inv.branch, None);
        assert!(inv.params.is_empty());
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let body = br#"{"source_dir":"/srv/app","ref":"refs/heads/main","pusher":{"name":"ci"}}"#;
        let inv = Invocation::decode(body).unwrap();
        assert_eq!(inv.source_dir, "/srv/app");
    }

    #[test]
    fn test_decode_null_fields_take_defaults() {
        let body = br#"{"task":null,"source_dir":"/srv/app","branch":null,"params":null}"#;
        let inv = Invocation::decode(body).unwrap();
        assert_eq!(inv.task, "");
        assert_eq!(inv.branch, None);
        assert!(inv.params.is_empty());
    }

    #[test]
    fn test_decode_revision_alias_and_blank_branch() {
        let inv = Invocation::decode(br#"{"source_dir":"/a","revision":"release"}"#).unwrap();
        assert_eq!(inv.branch.as_deref(), Some("release"));

        let inv = Invocation::decode(br#"{"source_dir":"/a","branch":"  "}"#).unwrap();
        assert_eq!(inv.branch, None);
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        let err = Invocation::decode(b"{not json").unwrap_err();
        assert!(matches!(err, WebhookError::MalformedPayload(_)));
    }

    #[test]
    fn test_decode_rejects_non_object() {
        let err = Invocation::decode(br#"["deploy", "/tmp/x"]"#).unwrap_err();
        assert!(matches!(err, WebhookError::MalformedPayload(_)));
    }

    #[test]
    fn test_decode_rejects_wrong_param_type() {
        let err = Invocation::decode(br#"{"source_dir":"/a","params":[1,2]}"#).unwrap_err();
        assert!(matches!(err, WebhookError::MalformedPayload(_)));
    }

    #[test]
    fn test_validate_requires_source_dir() {
        let inv = Invocation::decode(br#"{"task":"deploy"}"#).unwrap();
        let err = inv.validate().unwrap_err();
        assert!(matches!(err, WebhookError::MissingField("source_dir")));
        assert!(err.to_string().contains("source_dir"));
    }

    #[test]
    fn test_validate_rejects_option_like_branch() {
        let inv =
            Invocation::decode(br#"{"source_dir":"/a","branch":"--upload-pack=touch x"}"#)
                .unwrap();
        let err = inv.validate().unwrap_err();
        assert!(matches!(err, WebhookError::InvalidBranch(ref b) if b == "--upload-pack=touch x"));

        let inv = Invocation::decode(br#"{"source_dir":"/a","revision":"-f"}"#).unwrap();
        assert!(matches!(inv.validate(), Err(WebhookError::InvalidBranch(_))));
    }

    #[test]
    fn test_branch_name_rules() {
        for ok in ["main", "release/1.2", "feature/JIRA-12_fix", "v2.0.1", "user@host"] {
            assert!(is_valid_branch_name(ok), "{ok} should be accepted");
        }
        for bad in [
            "-f",
            "--orphan",
            "a b",
            "a..b",
            "/main",
            "main/",
            "main.lock",
            "main.",
            ".hidden",
            "feat/.x",
            "a//b",
            "a~1",
            "a^",
            "a:b",
            "a?",
            "a*",
            "a[b",
            "a\\b",
            "HEAD@{1}",
            "@",
            "tab\tname",
        ] {
            assert!(!is_valid_branch_name(bad), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_source_dir_is_used_verbatim() {
        let inv = Invocation::decode(br#"{"source_dir":"./rel/../dir"}"#).unwrap();
        inv.validate().unwrap();
        assert_eq!(inv.working_dir(), Some(Path::new("./rel/../dir")));
    }
}
