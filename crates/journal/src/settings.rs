//! Per-user settings record

use buildr_core::{SyncError, SyncTarget};
use serde::{Deserialize, Serialize};

/// Remote linkage and editor preferences of one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default)]
    pub github_repo: Option<String>,
    #[serde(default)]
    pub github_branch: Option<String>,
    /// GitHub App installation granting access to the repo
    #[serde(default)]
    pub installation_id: Option<u64>,
    #[serde(default)]
    pub github_username: Option<String>,
    #[serde(default)]
    pub active_workspace_id: Option<String>,
}

impl UserSettings {
    /// The configured sync target, or a configuration error naming what is missing
    pub fn target(&self) -> Result<SyncTarget, SyncError> {
        let repo = self
            .github_repo
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| SyncError::missing("GitHub repository"))?;
        let branch = self
            .github_branch
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| SyncError::missing("GitHub branch"))?;
        SyncTarget::new(repo, branch)
    }

    /// The installation id, required before any remote call
    pub fn installation(&self) -> Result<u64, SyncError> {
        self.installation_id
            .ok_or_else(|| SyncError::missing("GitHub App installation"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_linkage_is_configuration_error() {
        let settings = UserSettings::default();
        assert!(matches!(settings.target(), Err(SyncError::Configuration(_))));
        assert!(matches!(settings.installation(), Err(SyncError::Configuration(_))));

        let settings = UserSettings {
            github_repo: Some("octo/site".into()),
            github_branch: Some("".into()),
            ..Default::default()
        };
        let err = settings.target().unwrap_err();
        assert!(err.to_string().contains("GitHub branch"));
    }

    #[test]
    fn test_complete_linkage() {
        let settings = UserSettings {
            github_repo: Some("octo/site".into()),
            github_branch: Some("main".into()),
            installation_id: Some(42),
            ..Default::default()
        };
        assert_eq!(settings.target().unwrap().to_string(), "octo/site@main");
        assert_eq!(settings.installation().unwrap(), 42);
    }
}
