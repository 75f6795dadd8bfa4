use std::{collections::HashMap, path::Path, sync::OnceLock};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use md5::{Digest as _, Md5};
use rand::{Rng, distr::Alphanumeric};
use regex::Regex;
use sha2::{Digest as _, Sha256};

use crate::{error::Result, types::Record};

/// Minimum/maximum PKCE verifier lengths per RFC 7636.
const VERIFIER_MIN_LEN: usize = 43;
const VERIFIER_MAX_LEN: usize = 128;

pub fn generate_code_verifier() -> String {
    generate_code_verifier_with_length(64)
}

pub fn generate_code_verifier_with_length(length: usize) -> String {
    let length = length.clamp(VERIFIER_MIN_LEN, VERIFIER_MAX_LEN);
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Opaque anti-CSRF token for the authorization URL. The caller compares
/// it against the `state` query parameter on redirect.
pub fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Expand a "compressed" library section with a special `map` entry.
///
/// The server avoids repeating key strings by sending each record as a
/// positional array, with a single `map` object giving the field name for
/// each index:
///
/// ```text
/// {
///   "244526": ["Starter Songs", [134082068, 134082066], "1234-...", false, ...],
///   "map": {"name": 0, "tracks": 1, "uid": 2, "system_created": 3, ...}
/// }
/// ```
///
/// becomes `{"244526": {"name": "Starter Songs", "tracks": [...], ...}}`.
/// A section without a `map` entry is taken to be in expanded form already.
pub fn decode(data: &serde_json::Value) -> HashMap<String, Record> {
    let Some(section) = data.as_object() else {
        return HashMap::new();
    };

    let Some(keymap) = section.get("map").and_then(serde_json::Value::as_object) else {
        return section
            .iter()
            .filter_map(|(id, value)| value.as_object().map(|rec| (id.clone(), rec.clone())))
            .collect();
    };

    // Invert the map: positional index -> field name.
    let fields: HashMap<u64, &str> = keymap
        .iter()
        .filter_map(|(name, index)| index.as_u64().map(|i| (i, name.as_str())))
        .collect();

    let mut records = HashMap::new();
    for (id, value) in section {
        let Some(items) = value.as_array() else {
            continue;
        };
        let mut record = Record::new();
        for (index, item) in items.iter().enumerate() {
            if let Some(name) = fields.get(&(index as u64)) {
                record.insert((*name).to_string(), item.clone());
            }
        }
        records.insert(id.clone(), record);
    }
    records
}

/// MD5 checksum of a file, lowercase hex, matching the format of the
/// server's uploaded-file checksum list.
pub async fn calc_md5(path: impl AsRef<Path>) -> Result<String> {
    let bytes = async_fs::read(path.as_ref()).await?;
    let digest = Md5::digest(&bytes);
    Ok(digest.iter().map(|byte| format!("{byte:02x}")).collect())
}

/// Pull the new track ID out of an upload response message, e.g.
/// `"song.mp3 (123456789) uploaded successfully"`.
pub fn extract_track_id(message: &str) -> Option<String> {
    static TRACK_ID: OnceLock<Regex> = OnceLock::new();
    let re = TRACK_ID.get_or_init(|| {
        Regex::new(r"\(([^()]*)\) uploaded successfully").expect("track id pattern compiles")
    });
    re.captures(message)
        .map(|caps| caps[1].to_string())
        .filter(|id| !id.is_empty())
}
