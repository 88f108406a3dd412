use bson::oid::ObjectId;
use relief_core::MaskRecord;
use serde::{Deserialize, Serialize};

// One saved relief mask. The mask body uses the same layout as the JSON
// save files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none", default)]
    pub id: Option<ObjectId>,
    pub name: String,
    pub updated_at: bson::DateTime,
    pub mask: MaskRecord,
}
