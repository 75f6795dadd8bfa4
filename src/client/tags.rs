use serde_json::{Map, Value, json};

use crate::error::{Error, Result};

use super::Client;

impl Client {
    /// Create a tag. Returns the new tag's ID as the server sent it.
    pub async fn create_tag(&self, name: &str) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("tagname".into(), name.into());

        let body = self.json_mode_request("createtag", extra).await?;
        body.get("id")
            .cloned()
            .ok_or_else(|| Error::InvalidResponse("missing tag id".into()))
    }

    /// Apply the given tag to the specified tracks, or remove it when
    /// `untag` is set.
    pub async fn tag_tracks(
        &self,
        tag_id: impl Into<Value>,
        track_ids: &[i64],
        untag: bool,
    ) -> Result<()> {
        let mut extra = Map::new();
        extra.insert("tagid".into(), tag_id.into());
        extra.insert("tracks".into(), json!(track_ids));
        extra.insert("untag".into(), untag.into());
        self.json_mode_request("tagtracks", extra).await.map(drop)
    }
}
