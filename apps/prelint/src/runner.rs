//! CI runner identity, gathered for informational logging only.

use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunnerIdentity {
    pub ci: bool,
    pub provider: Option<String>,
    pub name: Option<String>,
    pub os: Option<String>,
    pub arch: Option<String>,
    pub event: Option<String>,
}

impl RunnerIdentity {
    pub fn detect() -> Self {
        Self::detect_with(|k| std::env::var(k).ok())
    }

    pub fn detect_with<F>(env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| env(k).filter(|v| !v.trim().is_empty());
        let provider = if get("GITHUB_ACTIONS").is_some() {
            Some("github-actions".to_string())
        } else if get("GITLAB_CI").is_some() {
            Some("gitlab-ci".to_string())
        } else if get("BUILDKITE").is_some() {
            Some("buildkite".to_string())
        } else {
            None
        };
        Self {
            ci: provider.is_some() || get("CI").is_some_and(|v| v != "false" && v != "0"),
            provider,
            name: get("RUNNER_NAME"),
            os: get("RUNNER_OS"),
            arch: get("RUNNER_ARCH"),
            event: get("GITHUB_EVENT_NAME"),
        }
    }

    pub fn log(&self) {
        if !self.ci {
            return;
        }
        info!(
            provider = self.provider.as_deref().unwrap_or("unknown"),
            runner = self.name.as_deref().unwrap_or("-"),
            os = self.os.as_deref().unwrap_or("-"),
            arch = self.arch.as_deref().unwrap_or("-"),
            event = self.event.as_deref().unwrap_or("-"),
            "running on CI"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn test_detects_github_actions() {
        let id = RunnerIdentity::detect_with(env_of(&[
            ("GITHUB_ACTIONS", "true"),
            ("RUNNER_NAME", "hosted-7"),
            ("RUNNER_OS", "Linux"),
            ("GITHUB_EVENT_NAME", "pull_request"),
        ]));
        assert!(id.ci);
        assert_eq!(id.provider.as_deref(), Some("github-actions"));
        assert_eq!(id.name.as_deref(), Some("hosted-7"));
        assert_eq!(id.event.as_deref(), Some("pull_request"));
    }

    #[test]
    fn test_local_run_is_not_ci() {
        let id = RunnerIdentity::detect_with(env_of(&[("CI", "false")]));
        assert!(!id.ci);
        assert_eq!(id, RunnerIdentity::default());
    }
}
