use std::{collections::HashSet, path::Path};

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::info;

use crate::{
    error::{Error, Result},
    types::is_unauthenticated_body,
    utils,
};

use super::{Client, check_api_response, response_json};

impl Client {
    /// Download the MD5 checksums of the files already uploaded to the
    /// server and cache them for dedup checks.
    pub async fn download_md5s(&mut self) -> Result<&HashSet<String>> {
        info!("downloading MD5 checksums");
        let bearer = self.tokens.bearer_token().await?;

        let (status, json) = self.post_sync(&bearer).await?;
        let (status, json) = if status == StatusCode::UNAUTHORIZED || is_unauthenticated_body(&json)
        {
            let bearer = self.tokens.refresh_after_reject(&bearer).await?;
            self.post_sync(&bearer).await?
        } else {
            (status, json)
        };
        let body = check_api_response(status, json)?;

        let checksums = body
            .get("md5")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::InvalidResponse("missing md5 list".into()))?
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        Ok(self.md5.insert(checksums))
    }

    /// Whether the given file is already uploaded, by checksum. Fetches
    /// the server's checksum list on first use.
    pub async fn is_uploaded(&mut self, filepath: impl AsRef<Path>) -> Result<bool> {
        if self.md5.is_none() {
            self.download_md5s().await?;
        }
        let checksum = utils::calc_md5(filepath).await?;
        Ok(self.md5.as_ref().is_some_and(|md5| md5.contains(&checksum)))
    }

    /// Upload the given file, unless its checksum is already on the server.
    ///
    /// `label` is a human-readable stand-in for the path in log messages.
    /// With `force` the dedup check is skipped. Returns the new track's ID
    /// when the server reports one, `None` when the upload was skipped.
    pub async fn upload(
        &mut self,
        filepath: impl AsRef<Path>,
        label: Option<&str>,
        force: bool,
    ) -> Result<Option<String>> {
        let path = filepath.as_ref();
        let path_str = path.display().to_string();
        let label = label.unwrap_or(&path_str);

        if !force && self.is_uploaded(path).await? {
            info!("skipping - already uploaded: {label}");
            return Ok(None);
        }
        info!("uploading {label}");

        let bytes = async_fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path_str.clone());

        let bearer = self.tokens.bearer_token().await?;
        let (status, json) = self
            .post_upload(&bearer, &path_str, bytes.clone(), file_name.clone())
            .await?;
        let (status, json) = if status == StatusCode::UNAUTHORIZED || is_unauthenticated_body(&json)
        {
            let bearer = self.tokens.refresh_after_reject(&bearer).await?;
            self.post_upload(&bearer, &path_str, bytes, file_name).await?
        } else {
            (status, json)
        };
        let body = check_api_response(status, json)?;

        // The track ID is embedded in the result message; extract it.
        let message = body.get("message").and_then(Value::as_str).unwrap_or_default();
        Ok(utils::extract_track_id(message))
    }

    async fn post_sync(&self, bearer: &str) -> Result<(StatusCode, Value)> {
        let response = self
            .http
            .post(&self.endpoints.sync_url)
            .header(USER_AGENT, self.identity.user_agent())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .bearer_auth(bearer)
            .body("")
            .send()
            .await?;
        response_json(response).await
    }

    async fn post_upload(
        &self,
        bearer: &str,
        file_path: &str,
        bytes: Vec<u8>,
        file_name: String,
    ) -> Result<(StatusCode, Value)> {
        let form = Form::new()
            .text("client", self.identity.client_name.clone())
            .text("version", self.identity.version.clone())
            .text("file_path", file_path.to_string())
            .text("method", self.identity.client_name.clone())
            .part("file", Part::bytes(bytes).file_name(file_name));

        let response = self
            .http
            .post(&self.endpoints.upload_url)
            .header(USER_AGENT, self.identity.user_agent())
            .bearer_auth(bearer)
            .multipart(form)
            .send()
            .await?;
        response_json(response).await
    }
}
