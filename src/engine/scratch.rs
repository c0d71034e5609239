use tracing::{debug, warn};
use uuid::Uuid;

use super::MediaEngine;
use crate::error::Result;

/// Names staged in the scratch workspace for one operation.
///
/// Every name is recorded before it is written, so `release` also
/// removes partially written entries.
#[derive(Debug)]
pub struct ScratchSet {
    prefix: String,
    names: Vec<String>,
}

impl ScratchSet {
    pub fn new(operation: &str) -> Self {
        let token = Uuid::new_v4().simple().to_string();
        Self {
            prefix: format!("{}-{}", operation, &token[..8]),
            names: Vec::new(),
        }
    }

    /// Allocate and record a name without writing anything.
    pub fn reserve(&mut self, role: &str, extension: &str) -> String {
        let name = format!("{}-{}.{}", self.prefix, role, extension);
        self.names.push(name.clone());
        name
    }

    /// Allocate a name and write `data` under it.
    pub async fn stage(
        &mut self,
        engine: &dyn MediaEngine,
        role: &str,
        extension: &str,
        data: &[u8],
    ) -> Result<String> {
        let name = self.reserve(role, extension);
        debug!(name = %name, bytes = data.len(), "Staging scratch entry");
        engine.write_file(&name, data).await?;
        Ok(name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Delete every recorded name. Failures are logged, not returned.
    pub async fn release(self, engine: &dyn MediaEngine) {
        for name in &self.names {
            if let Err(e) = engine.delete_file(name).await {
                warn!(name = %name, error = %e, "Failed to remove scratch entry");
            }
        }
        debug!(count = self.names.len(), prefix = %self.prefix, "Released scratch entries");
    }
}
