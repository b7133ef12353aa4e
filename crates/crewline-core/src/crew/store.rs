//! File-backed CRUD store for crew definitions.
//!
//! Crews live under a single root directory, one subdirectory per crew,
//! holding `agents.yaml`, `tasks.yaml` and `process.yaml`. The store is the
//! only component that touches the filesystem; everything above it works on
//! the parsed schema types.

use std::path::{Path, PathBuf};

use crate::crew::schema::{AgentsFile, CrewBundle, CrewProcess, ProcessFile, TasksFile};
use crate::error::CoreError;

const AGENTS_FILE: &str = "agents.yaml";
const TASKS_FILE: &str = "tasks.yaml";
const PROCESS_FILE: &str = "process.yaml";

pub struct CrewStore {
    root: PathBuf,
}

impl CrewStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List crew names (subdirectory names under the root), sorted.
    pub async fn list(&self) -> Result<Vec<String>, CoreError> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            // No root yet means no crews yet, not an error.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Create a crew directory with empty template files.
    pub async fn create(&self, name: &str) -> Result<(), CoreError> {
        let dir = self.crew_dir(name)?;
        if dir.exists() {
            return Err(CoreError::Conflict(format!("Crew '{}' already exists", name)));
        }
        tokio::fs::create_dir_all(&dir).await?;

        self.write_yaml(&dir.join(PROCESS_FILE), &ProcessFile::default()).await?;
        self.write_yaml(&dir.join(AGENTS_FILE), &AgentsFile::new()).await?;
        self.write_yaml(&dir.join(TASKS_FILE), &TasksFile::new()).await?;

        tracing::info!("[CrewStore] created crew '{}'", name);
        Ok(())
    }

    /// Delete a crew directory and everything in it.
    pub async fn delete(&self, name: &str) -> Result<(), CoreError> {
        let dir = self.crew_dir(name)?;
        if !dir.exists() {
            return Err(CoreError::NotFound(format!("Crew '{}' not found", name)));
        }
        tokio::fs::remove_dir_all(&dir).await?;
        tracing::info!("[CrewStore] deleted crew '{}'", name);
        Ok(())
    }

    pub async fn agents(&self, name: &str) -> Result<AgentsFile, CoreError> {
        self.read_yaml(name, AGENTS_FILE, "Agents").await
    }

    pub async fn put_agents(&self, name: &str, agents: &AgentsFile) -> Result<(), CoreError> {
        self.put_yaml(name, AGENTS_FILE, agents).await
    }

    pub async fn tasks(&self, name: &str) -> Result<TasksFile, CoreError> {
        self.read_yaml(name, TASKS_FILE, "Tasks").await
    }

    pub async fn put_tasks(&self, name: &str, tasks: &TasksFile) -> Result<(), CoreError> {
        self.put_yaml(name, TASKS_FILE, tasks).await
    }

    pub async fn process(&self, name: &str) -> Result<CrewProcess, CoreError> {
        let file: ProcessFile = self.read_yaml(name, PROCESS_FILE, "Process").await?;
        Ok(file.crew)
    }

    pub async fn put_process(&self, name: &str, process: &CrewProcess) -> Result<(), CoreError> {
        let file = ProcessFile { crew: process.clone() };
        self.put_yaml(name, PROCESS_FILE, &file).await
    }

    /// Load all three definition files for a crew at once.
    pub async fn load_bundle(&self, name: &str) -> Result<CrewBundle, CoreError> {
        Ok(CrewBundle {
            name: name.to_string(),
            process: self.process(name).await?,
            agents: self.agents(name).await?,
            tasks: self.tasks(name).await?,
        })
    }

    // -- helpers ------------------------------------------------------------

    fn crew_dir(&self, name: &str) -> Result<PathBuf, CoreError> {
        // Crew names become directory names; keep them path-safe.
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
        {
            return Err(CoreError::BadRequest(format!("Invalid crew name: '{}'", name)));
        }
        Ok(self.root.join(name))
    }

    async fn read_yaml<T: serde::de::DeserializeOwned>(
        &self,
        name: &str,
        file: &str,
        label: &str,
    ) -> Result<T, CoreError> {
        let path = self.crew_dir(name)?.join(file);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CoreError::NotFound(format!(
                    "{} file not found for crew '{}'",
                    label, name
                )));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_yaml::from_str(&content)?)
    }

    async fn put_yaml<T: serde::Serialize>(
        &self,
        name: &str,
        file: &str,
        value: &T,
    ) -> Result<(), CoreError> {
        let dir = self.crew_dir(name)?;
        tokio::fs::create_dir_all(&dir).await?;
        self.write_yaml(&dir.join(file), value).await
    }

    async fn write_yaml<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<(), CoreError> {
        let yaml = serde_yaml::to_string(value)?;
        tokio::fs::write(path, yaml).await?;
        Ok(())
    }
}
