use crate::utils::error::{Result, SiteError};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Shallow-clones `url` into `parent/<repo name>` and returns the checkout path.
pub async fn clone_repository(url: &str, branch: Option<&str>, parent: &Path) -> Result<PathBuf> {
    let name = repo_dir_name(url);
    let target = parent.join(&name);

    let mut cmd = Command::new("git");
    cmd.arg("clone").arg("--depth").arg("1");
    if let Some(branch) = branch {
        cmd.arg("--branch").arg(branch);
    }
    cmd.arg(url).arg(&target);

    tracing::info!("📥 Cloning {} into {}", url, target.display());
    let output = cmd.output().await.map_err(|e| SiteError::ConfigError {
        message: format!("failed to run git: {}", e),
    })?;

    if !output.status.success() {
        return Err(SiteError::ConfigError {
            message: format!(
                "git clone of {} failed: {}",
                url,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(target)
}

/// `https://github.com/someone/site.git` -> `site`
pub fn repo_dir_name(url: &str) -> String {
    let last = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default();
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() {
        "site".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_dir_name() {
        assert_eq!(repo_dir_name("https://github.com/michaelmu/lindabaird.git"), "lindabaird");
        assert_eq!(repo_dir_name("https://example.com/org/site/"), "site");
        assert_eq!(repo_dir_name(""), "site");
    }
}
