use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The validated output of one refactor request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RefactorResult {
    /// Replacement content for the file under refactor.
    pub primary_content: String,
    /// Verbatim pre-change content, when the agent supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_content: Option<String>,
    /// Auxiliary files keyed by untrusted logical name, in document order.
    #[serde(default)]
    pub utility_modules: IndexMap<String, String>,
}

impl RefactorResult {
    pub fn new(primary_content: impl Into<String>) -> Self {
        Self {
            primary_content: primary_content.into(),
            backup_content: None,
            utility_modules: IndexMap::new(),
        }
    }

    pub fn with_backup(mut self, backup: impl Into<String>) -> Self {
        self.backup_content = Some(backup.into());
        self
    }

    pub fn with_module(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.utility_modules.insert(name.into(), content.into());
        self
    }

    /// Human-readable preview: primary content followed by a module listing.
    pub fn to_preview(&self) -> String {
        let rule = "=".repeat(50);
        let mut out = format!(
            "Primary file ({} characters):\n{rule}\n{}\n{rule}\n",
            self.primary_content.chars().count(),
            self.primary_content
        );
        if let Some(backup) = &self.backup_content {
            out.push_str(&format!(
                "Backup content supplied ({} characters)\n",
                backup.chars().count()
            ));
        }
        if self.utility_modules.is_empty() {
            out.push_str("No utility modules.\n");
        } else {
            out.push_str(&format!("Utility modules ({}):\n", self.utility_modules.len()));
            for (name, content) in &self.utility_modules {
                out.push_str(&format!("  - {name}: {} characters\n", content.chars().count()));
            }
        }
        out
    }
}
