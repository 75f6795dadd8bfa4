use serde_json::{Map, Value, json};

use crate::{
    error::{Error, Result},
    types::Mood,
};

use super::Client;

impl Client {
    /// Create a playlist, optionally sharable and/or autopopulated from a
    /// mood. Returns the new playlist's ID as the server sent it.
    pub async fn create_playlist(
        &self,
        name: &str,
        description: &str,
        sharable: bool,
        mood: Option<Mood>,
    ) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("name".into(), name.into());
        extra.insert("description".into(), description.into());
        extra.insert("make_public".into(), sharable.into());
        extra.insert(
            "mood".into(),
            mood.map(|m| m.as_str()).unwrap_or_default().into(),
        );

        let body = self.json_mode_request("createplaylist", extra).await?;
        body.get("playlist_id")
            .cloned()
            .ok_or_else(|| Error::InvalidResponse("missing playlist_id".into()))
    }

    /// Delete a playlist.
    pub async fn delete_playlist(&self, playlist_id: impl Into<Value>) -> Result<()> {
        let mut extra = Map::new();
        extra.insert("playlist".into(), playlist_id.into());
        self.json_mode_request("deleteplaylist", extra).await.map(drop)
    }

    /// Append tracks to the given playlist, keeping its current contents.
    pub async fn add_tracks(
        &self,
        playlist_id: impl Into<Value>,
        track_ids: &[i64],
    ) -> Result<()> {
        let mut extra = Map::new();
        extra.insert("playlist".into(), playlist_id.into());
        extra.insert("tracks".into(), json!(track_ids));
        self.json_mode_request("appendplaylist", extra).await.map(drop)
    }

    /// Overwrite the given playlist to consist of exactly these tracks.
    pub async fn set_tracks(
        &self,
        playlist_id: impl Into<Value>,
        track_ids: &[i64],
    ) -> Result<()> {
        let mut extra = Map::new();
        extra.insert("playlist".into(), playlist_id.into());
        extra.insert("tracks".into(), json!(track_ids));
        self.json_mode_request("updateplaylist", extra).await.map(drop)
    }
}
