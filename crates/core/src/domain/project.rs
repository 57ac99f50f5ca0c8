use serde::{Deserialize, Serialize};

/// A project grouping missions created or referenced by a package.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub mission_ids: Vec<String>,
}
