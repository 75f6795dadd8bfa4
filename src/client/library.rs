use serde_json::{Map, Value, json};
use tracing::info;

use crate::{
    error::{Error, Result},
    types::Record,
    utils,
};

use super::Client;

impl Client {
    /// Download library data: albums, artists, playlists, tags, tracks.
    ///
    /// Replaces the in-memory caches wholesale and invalidates any
    /// previously downloaded upload checksums.
    pub async fn refresh_library(&mut self) -> Result<()> {
        self.md5 = None;

        info!("downloading library data");
        let url = self.endpoints.library_url.clone();
        let body = self.json_request_at(&url, "library", Map::new()).await?;
        let library = body
            .get("library")
            .ok_or_else(|| Error::InvalidResponse("missing library section".into()))?;

        self.albums = utils::decode(library.get("albums").unwrap_or(&Value::Null));
        self.artists = utils::decode(library.get("artists").unwrap_or(&Value::Null));
        self.playlists = utils::decode(library.get("playlists").unwrap_or(&Value::Null));
        self.tags = utils::decode(library.get("tags").unwrap_or(&Value::Null));
        self.tracks = utils::decode(library.get("tracks").unwrap_or(&Value::Null));
        Ok(())
    }

    pub fn album(&self, album_id: &str) -> Option<&Record> {
        self.albums.get(album_id)
    }

    pub fn artist(&self, artist_id: &str) -> Option<&Record> {
        self.artists.get(artist_id)
    }

    pub fn playlist(&self, playlist_id: &str) -> Option<&Record> {
        self.playlists.get(playlist_id)
    }

    pub fn tag(&self, tag_id: &str) -> Option<&Record> {
        self.tags.get(tag_id)
    }

    pub fn track(&self, track_id: &str) -> Option<&Record> {
        self.tracks.get(track_id)
    }

    pub fn albums(&self) -> &std::collections::HashMap<String, Record> {
        &self.albums
    }

    pub fn artists(&self) -> &std::collections::HashMap<String, Record> {
        &self.artists
    }

    pub fn playlists(&self) -> &std::collections::HashMap<String, Record> {
        &self.playlists
    }

    pub fn tags(&self) -> &std::collections::HashMap<String, Record> {
        &self.tags
    }

    pub fn tracks(&self) -> &std::collections::HashMap<String, Record> {
        &self.tracks
    }

    /// Whether the specified track carries the given tag.
    pub fn is_tagged(&self, tag_id: &str, track_id: i64) -> bool {
        self.tags
            .get(tag_id)
            .and_then(|tag| tag.get("tracks"))
            .and_then(Value::as_array)
            .is_some_and(|tracks| tracks.iter().any(|t| t.as_i64() == Some(track_id)))
    }

    /// IDs of all tags applied to the given track.
    pub fn track_tags(&self, track_id: i64) -> Vec<String> {
        let mut ids: Vec<String> = self
            .tags
            .keys()
            .filter(|tag_id| self.is_tagged(tag_id, track_id))
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Fetch user status/info from the API and cache it.
    pub async fn get_status(&mut self) -> Result<Value> {
        let status = self.json_mode_request("status", Map::new()).await?;
        self.status = Some(status.clone());
        Ok(status)
    }

    /// File extensions of the audio formats the service accepts.
    pub async fn extensions(&mut self) -> Result<Vec<String>> {
        let status = match &self.status {
            Some(status) => status.clone(),
            None => self.get_status().await?,
        };

        let supported = status
            .get("supported")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::InvalidResponse("missing supported formats".into()))?;
        Ok(supported
            .iter()
            .filter_map(|format| format.get("extension").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    /// Move the given tracks to the trash.
    pub async fn trash(&self, track_ids: &[i64]) -> Result<()> {
        let mut extra = Map::new();
        extra.insert("tracks".into(), json!(track_ids));
        self.json_mode_request("trash", extra).await.map(drop)
    }
}
