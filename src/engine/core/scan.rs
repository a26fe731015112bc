use super::types::MediaType;
use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory inside a volume holding bridge metadata; never indexed
pub const METADATA_DIR: &str = ".mediabridge";

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "mov", "avi", "3gp", "m4v", "wmv"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "heic", "heif", "bmp"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "ogg", "opus", "flac", "wav", "amr"];

/// Classify a path by extension
pub fn media_type_for(path: &Path) -> Option<MediaType> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    let ext = ext.as_str();
    if VIDEO_EXTENSIONS.contains(&ext) {
        Some(MediaType::Video)
    } else if IMAGE_EXTENSIONS.contains(&ext) {
        Some(MediaType::Image)
    } else if AUDIO_EXTENSIONS.contains(&ext) {
        Some(MediaType::Audio)
    } else {
        None
    }
}

pub fn is_media_file(path: &Path) -> bool {
    media_type_for(path).is_some()
}

/// Walk a volume and invoke a callback for each media file found
pub fn scan_streaming<F>(root: &Path, mut on_file: F) -> Result<()>
where
    F: FnMut(PathBuf, MediaType),
{
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.file_name() != METADATA_DIR)
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(media_type) = media_type_for(path) {
            on_file(path.to_path_buf(), media_type);
        }
    }

    Ok(())
}

pub fn scan(root: &Path) -> Result<Vec<(PathBuf, MediaType)>> {
    let mut files = Vec::new();
    scan_streaming(root, |path, media_type| files.push((path, media_type)))?;
    Ok(files)
}
