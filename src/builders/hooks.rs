use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const HOOK_MARKER: &str = "SpecSync Governance";

const PRE_COMMIT_HOOK: &str = r#"#!/bin/sh
# SpecSync Governance - Pre-commit Hook

# Check if specsync is available
if ! command -v specsync > /dev/null 2>&1; then
    echo "Warning: specsync not found in PATH, skipping validation"
    exit 0
fi

# Block the commit unless code, spec, tests and docs are aligned
specsync validate
if [ $? -ne 0 ]; then
    echo ""
    echo "Commit blocked by SpecSync. Fix the issues above or use 'git commit --no-verify'."
    exit 1
fi
"#;

/// What `install_git_hooks` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookInstall {
    Installed,
    AlreadyInstalled,
    /// A foreign hook was moved aside to the given path.
    ReplacedExisting(PathBuf),
}

/// What `uninstall_git_hooks` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookRemoval {
    Removed,
    RestoredBackup,
    NotInstalled,
    /// The hook at the path belongs to someone else and was left alone.
    ForeignHook,
}

fn hooks_dir(repo_root: &Path) -> PathBuf {
    repo_root.join(".git").join("hooks")
}

fn backup_path(hooks_dir: &Path) -> PathBuf {
    hooks_dir.join("pre-commit.backup")
}

pub fn install_git_hooks(repo_root: &Path) -> Result<HookInstall> {
    let hooks_dir = hooks_dir(repo_root);
    fs::create_dir_all(&hooks_dir).context("Failed to create hooks directory")?;
    let hook_path = hooks_dir.join("pre-commit");

    let mut outcome = HookInstall::Installed;
    if hook_path.exists() {
        // Check if it's already our hook
        let existing_content = fs::read_to_string(&hook_path)?;
        if existing_content.contains(HOOK_MARKER) {
            return Ok(HookInstall::AlreadyInstalled);
        }

        let backup = backup_path(&hooks_dir);
        fs::rename(&hook_path, &backup).context("Failed to back up existing pre-commit hook")?;
        info!(backup = %backup.display(), "Backed up existing pre-commit hook");
        outcome = HookInstall::ReplacedExisting(backup);
    }

    fs::write(&hook_path, PRE_COMMIT_HOOK).context("Failed to write pre-commit hook")?;

    // Make executable on Unix systems
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&hook_path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&hook_path, perms)?;
    }

    info!(path = %hook_path.display(), "Installed pre-commit hook");
    Ok(outcome)
}

/// Removes our hook only, restoring a backed-up foreign hook if there is one.
pub fn uninstall_git_hooks(repo_root: &Path) -> Result<HookRemoval> {
    let hooks_dir = hooks_dir(repo_root);
    let hook_path = hooks_dir.join("pre-commit");

    if !hook_path.exists() {
        return Ok(HookRemoval::NotInstalled);
    }
    let content = fs::read_to_string(&hook_path)?;
    if !content.contains(HOOK_MARKER) {
        return Ok(HookRemoval::ForeignHook);
    }

    fs::remove_file(&hook_path).context("Failed to remove pre-commit hook")?;
    let backup = backup_path(&hooks_dir);
    if backup.exists() {
        fs::rename(&backup, &hook_path).context("Failed to restore backed-up hook")?;
        info!("Restored previous pre-commit hook");
        return Ok(HookRemoval::RestoredBackup);
    }
    Ok(HookRemoval::Removed)
}
