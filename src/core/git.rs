use anyhow::{Context, Result};
use git2::{Diff, DiffFormat, DiffOptions, Repository};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Read-only view of the commit staging area.
///
/// This is all the governance layer needs from version control: the staged
/// file list and the staged diff text.
pub trait StagingAreaProbe: Send + Sync {
    /// Returns the files currently staged in the index, in index order.
    fn staged_files(&self) -> Result<Vec<String>>;

    /// Returns the full staged diff (HEAD against the index) as patch text.
    fn staged_diff(&self) -> Result<String>;
}

/// Concrete implementation of `StagingAreaProbe` using the git2 crate.
///
/// The repository is reopened on every call so each probe sees the index as
/// it is on disk at that moment.
pub struct Git2Probe {
    root: PathBuf,
}

impl Git2Probe {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path.as_ref())
            .with_context(|| format!("Not a git repository: {}", path.as_ref().display()))?;
        let root = repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| repo.path().to_path_buf());
        Ok(Self { root })
    }

    /// Short name of the checked-out branch, `"HEAD"` when detached and
    /// `"unknown"` before the first commit.
    pub fn current_branch(&self) -> String {
        Repository::open(&self.root)
            .ok()
            .and_then(|repo| {
                repo.head()
                    .ok()
                    .and_then(|head| head.shorthand().map(str::to_string))
            })
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn open(&self) -> Result<Repository> {
        Repository::open(&self.root).context("Failed to open repository")
    }

    /// Diff from HEAD to the index. Before the first commit the old side is
    /// empty, so every indexed file shows up as added.
    fn staged_changes<'r>(&self, repo: &'r Repository) -> Result<Diff<'r>> {
        let index = repo.index()?;
        let head_tree = match repo.head() {
            Ok(head) => Some(head.peel_to_tree()?),
            Err(_) => None,
        };
        let mut options = DiffOptions::new();
        let diff = repo.diff_tree_to_index(head_tree.as_ref(), Some(&index), Some(&mut options))?;
        Ok(diff)
    }
}

impl StagingAreaProbe for Git2Probe {
    fn staged_files(&self) -> Result<Vec<String>> {
        let repo = self.open()?;
        let diff = self.staged_changes(&repo)?;

        let mut staged_files = Vec::new();
        for delta in diff.deltas() {
            let path = delta.new_file().path().or_else(|| delta.old_file().path());
            if let Some(path) = path {
                staged_files.push(path.to_string_lossy().replace('\\', "/"));
            }
        }
        Ok(staged_files)
    }

    fn staged_diff(&self) -> Result<String> {
        let repo = self.open()?;
        let diff = self.staged_changes(&repo)?;

        let mut text = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            if matches!(line.origin(), '+' | '-' | ' ') {
                text.push(line.origin());
            }
            text.push_str(&String::from_utf8_lossy(line.content()));
            true
        })?;
        Ok(text)
    }
}

/// An in-memory staging area, for embedding the orchestrator where no
/// repository is available and for tests.
#[derive(Clone, Default)]
pub struct MemoryProbe {
    state: Arc<Mutex<(Vec<String>, String)>>,
}

impl MemoryProbe {
    pub fn new(files: Vec<String>, diff: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new((files, diff.to_string()))),
        }
    }

    /// Replaces the staged content. Clones share the same state.
    pub fn stage(&self, files: Vec<String>, diff: &str) {
        if let Ok(mut state) = self.state.lock() {
            *state = (files, diff.to_string());
        }
    }
}

impl StagingAreaProbe for MemoryProbe {
    fn staged_files(&self) -> Result<Vec<String>> {
        let state = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("staging state lock poisoned"))?;
        Ok(state.0.clone())
    }

    fn staged_diff(&self) -> Result<String> {
        let state = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("staging state lock poisoned"))?;
        Ok(state.1.clone())
    }
}
