//! Definitions served from a file on disk.

use std::path::{Path, PathBuf};

use prompting::panel::provider::{DefinitionFuture, DefinitionProvider};
use prompting::parameters::ParameterDefinition;
use serde_json::{Map, Value};
use tracing::debug;

/// Re-reads a definition file on every refresh.
///
/// Editing the file while the panel is live behaves like a server that
/// answers parameter changes with a new definition. An unchanged file
/// yields `Ok(None)`.
pub struct FileDefinitionProvider {
    path: PathBuf,
}

impl FileDefinitionProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the file.
    pub async fn load(&self) -> Result<ParameterDefinition, String> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| format!("failed to read '{}': {e}", self.path.display()))?;
        ParameterDefinition::from_json(&text).map_err(|e| format!("{}: {e}", self.path.display()))
    }
}

impl DefinitionProvider for FileDefinitionProvider {
    fn fetch<'a>(
        &'a self,
        current: &'a ParameterDefinition,
        values: &'a Map<String, Value>,
    ) -> DefinitionFuture<'a> {
        Box::pin(async move {
            debug!(path = %self.path.display(), values = values.len(), "reloading definition");
            let next = self.load().await?;
            Ok((next != *current).then_some(next))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompting::parameters::{Parameter, ParameterGroup};

    fn definition(values: &[&str]) -> ParameterDefinition {
        ParameterDefinition::new().with_group(
            ParameterGroup::new("G1").with_parameter(Parameter::new("p1").with_choices(values, &[])),
        )
    }

    fn write(path: &Path, definition: &ParameterDefinition) {
        std::fs::write(path, serde_json::to_string(definition).unwrap()).unwrap();
    }

    #[tokio::test]
    async fn unchanged_file_has_nothing_new() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write(&path, &definition(&["a"]));

        let provider = FileDefinitionProvider::new(&path);
        let d1 = provider.load().await.unwrap();
        assert_eq!(provider.fetch(&d1, &Map::new()).await, Ok(None));

        write(&path, &definition(&["a", "b"]));
        let d2 = provider.fetch(&d1, &Map::new()).await.unwrap().unwrap();
        assert_eq!(d2.parameters().next().unwrap().values.len(), 2);
    }

    #[tokio::test]
    async fn missing_and_malformed_files_fail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let provider = FileDefinitionProvider::new(&path);
        let err = provider.load().await.unwrap_err();
        assert!(err.starts_with("failed to read"), "{err}");

        std::fs::write(&path, "{not json").unwrap();
        let err = provider
            .fetch(&ParameterDefinition::new(), &Map::new())
            .await
            .unwrap_err();
        assert!(err.contains("invalid parameter definition"), "{err}");
    }
}
