//! The visual workflow store: a single JSON file, rewritten atomically
//! (write-to-temp, fsync, rename) on every mutation, grounded on the
//! teacher pack's atomic file-write helper.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use deskrelay_schema::VisualWorkflow;
use tokio::sync::RwLock;

pub struct VisualWorkflowStore {
    path: PathBuf,
    workflows: RwLock<Vec<VisualWorkflow>>,
}

impl VisualWorkflowStore {
    /// Loads the store from `path`, creating an empty file if absent (§6).
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let workflows = if path.is_file() {
            let text = tokio::fs::read_to_string(&path).await?;
            if text.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            Vec::new()
        };
        let store = Self {
            path,
            workflows: RwLock::new(workflows),
        };
        store.flush().await?;
        Ok(store)
    }

    pub async fn list(&self) -> Vec<VisualWorkflow> {
        self.workflows.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<VisualWorkflow> {
        self.workflows
            .read()
            .await
            .iter()
            .find(|w| w.id.as_str() == id)
            .cloned()
    }

    /// Inserts a new workflow. Returns `Err` if a workflow with the same id
    /// already exists (§6 "400 on duplicate id"). `updated_at` is stamped
    /// here rather than trusted from the request body.
    pub async fn create(&self, mut workflow: VisualWorkflow) -> anyhow::Result<()> {
        let mut guard = self.workflows.write().await;
        if guard.iter().any(|w| w.id == workflow.id) {
            anyhow::bail!("duplicate workflow id: {}", workflow.id);
        }
        workflow.updated_at = Some(chrono::Utc::now());
        guard.push(workflow);
        self.flush_locked(&guard).await
    }

    pub async fn update(&self, id: &str, mut workflow: VisualWorkflow) -> anyhow::Result<bool> {
        let mut guard = self.workflows.write().await;
        match guard.iter_mut().find(|w| w.id.as_str() == id) {
            Some(slot) => {
                workflow.updated_at = Some(chrono::Utc::now());
                *slot = workflow;
                self.flush_locked(&guard).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn delete(&self, id: &str) -> anyhow::Result<bool> {
        let mut guard = self.workflows.write().await;
        let before = guard.len();
        guard.retain(|w| w.id.as_str() != id);
        let removed = guard.len() != before;
        if removed {
            self.flush_locked(&guard).await?;
        }
        Ok(removed)
    }

    async fn flush(&self) -> anyhow::Result<()> {
        let guard = self.workflows.read().await;
        self.flush_locked(&guard).await
    }

    async fn flush_locked(&self, workflows: &[VisualWorkflow]) -> anyhow::Result<()> {
        let encoded = serde_json::to_vec_pretty(workflows)?;
        atomic_write_file(&self.path, &encoded)?;
        Ok(())
    }
}

fn atomic_write_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other("path has no parent"))?;
    std::fs::create_dir_all(parent)?;
    let tmp_name = format!(
        ".{}.tmp-{}-{}",
        path.file_name().and_then(|v| v.to_str()).unwrap_or("store"),
        std::process::id(),
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0),
    );
    let tmp_path = parent.join(tmp_name);

    {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }

    std::fs::rename(&tmp_path, path)?;
    sync_parent_dir(parent)
}

#[cfg(unix)]
fn sync_parent_dir(parent: &Path) -> std::io::Result<()> {
    std::fs::File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent_dir(_parent: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskrelay_schema::WorkflowId;

    fn workflow(id: &str) -> VisualWorkflow {
        VisualWorkflow {
            id: WorkflowId::new(id).unwrap(),
            hotkey: None,
            enabled: true,
            steps: vec![],
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn creates_and_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visual_workflows.json");
        let store = VisualWorkflowStore::open(&path).await.unwrap();
        store.create(workflow("wf1")).await.unwrap();

        let reopened = VisualWorkflowStore::open(&path).await.unwrap();
        assert_eq!(reopened.list().await.len(), 1);
    }

    #[tokio::test]
    async fn create_rejects_duplicate_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = VisualWorkflowStore::open(dir.path().join("w.json")).await.unwrap();
        store.create(workflow("wf1")).await.unwrap();
        assert!(store.create(workflow("wf1")).await.is_err());
    }

    #[tokio::test]
    async fn update_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let store = VisualWorkflowStore::open(dir.path().join("w.json")).await.unwrap();
        store.create(workflow("wf1")).await.unwrap();
        let mut updated = workflow("wf1");
        updated.enabled = false;
        assert!(store.update("wf1", updated).await.unwrap());
        assert!(!store.get("wf1").await.unwrap().enabled);
    }

    #[tokio::test]
    async fn delete_removes_and_reports_presence() {
        let dir = tempfile::tempdir().unwrap();
        let store = VisualWorkflowStore::open(dir.path().join("w.json")).await.unwrap();
        store.create(workflow("wf1")).await.unwrap();
        assert!(store.delete("wf1").await.unwrap());
        assert!(!store.delete("wf1").await.unwrap());
    }
}
