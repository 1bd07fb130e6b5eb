use anyhow::{anyhow, Result};
use rand::Rng;
use std::path::{Path, PathBuf};

/// Local-disk media store. Files land under `root` with generated names and
/// are served back at `/media/<name>` by the static file route.
#[derive(Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub async fn new(media_dir: &str) -> Result<Self> {
        let root = PathBuf::from(media_dir);
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `data` under a unique name with the extension for `content_type`.
    /// Returns the public path (`/media/<name>`).
    pub async fn save(&self, prefix: &str, content_type: &str, data: &[u8]) -> Result<String> {
        let ext = extension_for(content_type)
            .ok_or_else(|| anyhow!("unsupported content type: {}", content_type))?;
        let suffix: u32 = rand::thread_rng().gen();
        let filename = format!("{}_{:08x}.{}", prefix, suffix, ext);
        tokio::fs::write(self.root.join(&filename), data).await?;
        Ok(format!("/media/{}", filename))
    }

    /// Remove the file behind a public path. Missing files are not an error;
    /// callers treat deletion as best-effort cleanup.
    pub async fn delete(&self, media_path: &str) -> Result<()> {
        let Some(filename) = media_path.rsplit('/').next() else {
            return Ok(());
        };
        // never follow path components out of the media root
        if filename.is_empty() || filename.contains("..") {
            return Ok(());
        }
        match tokio::fs::remove_file(self.root.join(filename)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "video/mp4" => Some("mp4"),
        "video/webm" => Some("webm"),
        _ => None,
    }
}

pub fn is_image(content_type: &str) -> bool {
    matches!(content_type, "image/jpeg" | "image/png" | "image/gif")
}

pub fn is_video(content_type: &str) -> bool {
    matches!(content_type, "video/mp4" | "video/webm")
}
