//! Turning pasted base64 images into files under the media folder.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::Regex;

use crate::error::{PanelError, Result};
use crate::fs::{to_link_path, NoteFs};

/// Image rewrite waiting for the next `applyChanges`. A second paste before
/// that replaces the first one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PendingImage {
    #[default]
    None,
    /// The pasted image already lives under the media folder.
    Replace { payload: String, resolved_path: String },
    Convert { payload: String },
}

impl PendingImage {
    pub fn is_pending(&self) -> bool {
        !matches!(self, PendingImage::None)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conversion {
    pub content: String,
    pub files: Vec<PathBuf>,
}

pub fn image_name(index: u32, ext: &str) -> String {
    format!("image_{index}.{ext}")
}

/// Link text for a file under the media folder.
pub fn image_tag_url(media_folder: &str, relative: &str) -> String {
    let folder = media_folder.trim_end_matches(['/', '\\']).replace('\\', "/");
    let file = to_link_path(relative);
    let joined = if folder.is_empty() {
        file
    } else {
        format!("{folder}/{file}")
    };
    joined.replace(' ', "%20")
}

/// One past the highest `image_N.*` index already in `media_dir`.
pub fn next_image_index(fs: &dyn NoteFs, media_dir: &Path) -> Result<u32> {
    static RE_IMAGE: OnceLock<Regex> = OnceLock::new();
    let re_image = RE_IMAGE.get_or_init(|| Regex::new(r"^image_(\d+)\.").unwrap());

    let names = match fs.list_file_names(media_dir) {
        Ok(names) => names,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(1),
        Err(e) => return Err(PanelError::io("list", media_dir, e)),
    };
    let highest = names
        .iter()
        .filter_map(|name| re_image.captures(name))
        .filter_map(|cap| cap.get(1).and_then(|m| m.as_str().parse::<u32>().ok()))
        .max()
        .unwrap_or(0);
    Ok(highest + 1)
}

/// Splits `data:image/<type>;base64,<data>` into extension and bytes.
pub fn decode_data_uri(payload: &str) -> Result<(String, Vec<u8>)> {
    static RE_DATA: OnceLock<Regex> = OnceLock::new();
    let re_data =
        RE_DATA.get_or_init(|| Regex::new(r"^data:image/([^;]+);base64,(.*)$").unwrap());

    let cap = re_data
        .captures(payload.trim())
        .ok_or_else(|| PanelError::ImagePayload("not a base64 image data URI".to_string()))?;
    let kind = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
    let data = cap.get(2).map(|m| m.as_str()).unwrap_or_default();
    let bytes = STANDARD
        .decode(data)
        .map_err(|e| PanelError::ImagePayload(e.to_string()))?;
    let ext = match kind {
        "svg+xml" => "svg",
        other => other,
    };
    Ok((ext.to_string(), bytes))
}

/// Writes every occurrence of `payload` in `content` to its own numbered
/// file in `media_dir` and links it instead. Content comes back unchanged
/// when the payload is absent or cannot be decoded.
pub fn convert_images(
    fs: &dyn NoteFs,
    media_dir: &Path,
    media_folder: &str,
    content: &str,
    payload: &str,
) -> Result<Conversion> {
    let unchanged = || Conversion {
        content: content.to_string(),
        files: Vec::new(),
    };
    if payload.is_empty() || !content.contains(payload) {
        return Ok(unchanged());
    }
    let (ext, bytes) = match decode_data_uri(payload) {
        Ok(decoded) => decoded,
        Err(e) => {
            log::warn!("skipping embedded image: {e}");
            return Ok(unchanged());
        }
    };

    let mut index = next_image_index(fs, media_dir)?;
    let mut files = Vec::new();
    let mut out = String::with_capacity(content.len());
    let mut pieces = content.split(payload);
    if let Some(first) = pieces.next() {
        out.push_str(first);
    }
    for rest in pieces {
        let name = image_name(index, &ext);
        index += 1;
        out.push_str(&image_tag_url(media_folder, &name));
        out.push_str(rest);
        files.push(media_dir.join(name));
    }

    fs.create_dir_all(media_dir)
        .map_err(|e| PanelError::io("create", media_dir, e))?;
    for file in &files {
        fs.write_binary(file, &bytes)
            .map_err(|e| PanelError::io("write", file, e))?;
    }
    Ok(Conversion {
        content: out,
        files,
    })
}

/// Swaps a pasted payload for the link of the file it was pasted from.
pub fn replace_image(content: &str, payload: &str, resolved_path: &str) -> String {
    if payload.is_empty() {
        return content.to_string();
    }
    content.replacen(payload, resolved_path, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::NativeFs;

    const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn names_and_urls() {
        assert_eq!(image_name(3, "png"), "image_3.png");
        assert_eq!(image_tag_url("media", "image_3.png"), "media/image_3.png");
        assert_eq!(image_tag_url("media/", "/sub/a b.png"), "media/sub/a%20b.png");
        assert_eq!(image_tag_url("/abs/media", "x.png"), "/abs/media/x.png");
    }

    #[test]
    fn index_resumes_after_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(next_image_index(&NativeFs, &dir.path().join("missing")).unwrap(), 1);

        for name in ["image_2.png", "image_10.jpeg", "photo.png", "image_x.png"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        assert_eq!(next_image_index(&NativeFs, dir.path()).unwrap(), 11);
    }

    #[test]
    fn decodes_data_uri() {
        let (ext, bytes) = decode_data_uri(PNG).unwrap();
        assert_eq!(ext, "png");
        assert_eq!(bytes, STANDARD.decode("iVBORw0KGgo=").unwrap());
        assert!(decode_data_uri("data:text/plain;base64,aGk=").is_err());
        assert!(decode_data_uri("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn converts_single_payload_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("media");
        let content = format!("before\n![]({PNG})\nafter");

        let result = convert_images(&NativeFs, &media, "media", &content, PNG).unwrap();

        assert_eq!(result.content, "before\n![](media/image_1.png)\nafter");
        assert!(!result.content.contains("base64"));
        assert_eq!(result.files, vec![media.join("image_1.png")]);
        assert_eq!(
            std::fs::read(media.join("image_1.png")).unwrap(),
            STANDARD.decode("iVBORw0KGgo=").unwrap()
        );
    }

    #[test]
    fn every_occurrence_gets_its_own_index() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("media");
        std::fs::create_dir_all(&media).unwrap();
        std::fs::write(media.join("image_4.png"), b"old").unwrap();
        let content = format!("![]({PNG}) and ![]({PNG})");

        let result = convert_images(&NativeFs, &media, "media", &content, PNG).unwrap();

        assert_eq!(
            result.content,
            "![](media/image_5.png) and ![](media/image_6.png)"
        );
        assert_eq!(result.files.len(), 2);
        assert_eq!(std::fs::read(media.join("image_4.png")).unwrap(), b"old");
    }

    #[test]
    fn absent_or_malformed_payload_leaves_content() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("media");

        let result = convert_images(&NativeFs, &media, "media", "no images", PNG).unwrap();
        assert_eq!(result.content, "no images");
        assert!(result.files.is_empty());

        let bad = "data:image/png;base64,%%%";
        let content = format!("![]({bad})");
        let result = convert_images(&NativeFs, &media, "media", &content, bad).unwrap();
        assert_eq!(result.content, content);
        assert!(!media.exists());
    }

    #[test]
    fn replace_swaps_payload_for_path() {
        let content = format!("![]({PNG})");
        assert_eq!(
            replace_image(&content, PNG, "media/sub/cat.png"),
            "![](media/sub/cat.png)"
        );
        assert_eq!(replace_image("plain", PNG, "x"), "plain");
    }
}
