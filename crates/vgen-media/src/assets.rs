//! Asset materialization.
//!
//! Resolves every scene's video/audio locator to a file inside the render
//! job's directory. A failed asset becomes a warning and the scene falls
//! back to a placeholder track.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::future::join_all;
use futures::StreamExt;
use reqwest::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use vgen_models::{MediaLocator, RenderScene};

use crate::error::{MediaError, MediaResult};

/// Local files for one scene, in scene order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneAssets {
    pub index: usize,
    pub video: Option<PathBuf>,
    /// The video track is a still image to be looped
    pub video_is_image: bool,
    pub audio: Option<PathBuf>,
    /// Fetch problems replaced by placeholders
    pub warnings: Vec<String>,
}

/// Fetches remote and inline media to local files.
#[derive(Clone)]
pub struct AssetFetcher {
    client: Client,
}

impl AssetFetcher {
    pub fn new(timeout: Duration) -> MediaResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Resolve `locator` to a local file. Remote and inline media are written
    /// to `dir/<stem>.<ext>`; local files are used in place.
    pub async fn materialize(
        &self,
        locator: &MediaLocator,
        dir: &Path,
        stem: &str,
        default_ext: &str,
    ) -> MediaResult<PathBuf> {
        match locator {
            MediaLocator::Local(path) => {
                if fs::metadata(path).await.is_err() {
                    return Err(MediaError::FileNotFound(path.clone()));
                }
                Ok(path.clone())
            }
            MediaLocator::Inline { .. } => {
                let bytes = locator
                    .decode_bytes()
                    .map_err(|e| MediaError::invalid_request(e.to_string()))?;
                let dest = dir.join(file_name(locator, stem, default_ext));
                fs::write(&dest, bytes).await?;
                Ok(dest)
            }
            MediaLocator::Url(url) => {
                let dest = dir.join(file_name(locator, stem, default_ext));
                self.download(url, &dest).await?;
                Ok(dest)
            }
        }
    }

    async fn download(&self, url: &str, dest: &Path) -> MediaResult<()> {
        debug!(url, dest = %dest.display(), "Downloading asset");

        let response = self.client.get(url).send().await?.error_for_status()?;
        let mut file = fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0usize;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len();
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        if written == 0 {
            return Err(MediaError::internal(format!("empty response body from {}", url)));
        }
        Ok(())
    }

    /// Materialize every scene concurrently. Never fails as a whole.
    pub async fn materialize_scenes(&self, scenes: &[RenderScene], dir: &Path) -> Vec<SceneAssets> {
        let tasks = scenes
            .iter()
            .enumerate()
            .map(|(index, scene)| self.materialize_scene(index, scene, dir));
        join_all(tasks).await
    }

    async fn materialize_scene(&self, index: usize, scene: &RenderScene, dir: &Path) -> SceneAssets {
        let video_stem = format!("scene_{:03}_video", index);
        let audio_stem = format!("scene_{:03}_audio", index);

        let video = async {
            match &scene.video {
                Some(locator) => Some(self.materialize(locator, dir, &video_stem, "mp4").await),
                None => None,
            }
        };
        let audio = async {
            match &scene.audio {
                Some(locator) => Some(self.materialize(locator, dir, &audio_stem, "mp3").await),
                None => None,
            }
        };
        let (video, audio) = tokio::join!(video, audio);

        let mut assets = SceneAssets {
            index,
            video_is_image: scene.video.as_ref().map(|v| v.is_image()).unwrap_or(false),
            ..Default::default()
        };

        match video {
            Some(Ok(path)) => assets.video = Some(path),
            Some(Err(e)) => {
                let err = MediaError::asset_fetch(index, "video", e.to_string());
                warn!(scene_index = index, "{}", err);
                assets.video_is_image = false;
                assets.warnings.push(err.to_string());
            }
            None => {}
        }

        match audio {
            Some(Ok(path)) => assets.audio = Some(path),
            Some(Err(e)) => {
                let err = MediaError::asset_fetch(index, "audio", e.to_string());
                warn!(scene_index = index, "{}", err);
                assets.warnings.push(err.to_string());
            }
            None => {}
        }

        assets
    }
}

fn file_name(locator: &MediaLocator, stem: &str, default_ext: &str) -> String {
    let ext = locator
        .extension()
        .filter(|e| e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or(default_ext);
    format!("{}.{}", stem, ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_name_uses_locator_extension() {
        let url = MediaLocator::Url("https://x.test/clip.webm?sig=abc".into());
        assert_eq!(file_name(&url, "scene_000_video", "mp4"), "scene_000_video.webm");

        let bare = MediaLocator::Url("https://x.test/download".into());
        assert_eq!(file_name(&bare, "scene_000_video", "mp4"), "scene_000_video.mp4");
    }

    #[tokio::test]
    async fn test_inline_audio_is_decoded_to_file() {
        let tmp = TempDir::new().unwrap();
        let fetcher = AssetFetcher::new(Duration::from_secs(5)).unwrap();
        let locator = MediaLocator::inline_from_bytes("audio/mpeg", b"ID3data");

        let path = fetcher
            .materialize(&locator, tmp.path(), "scene_001_audio", "mp3")
            .await
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "scene_001_audio.mp3");
        assert_eq!(fs::read(&path).await.unwrap(), b"ID3data");
    }

    #[tokio::test]
    async fn test_missing_local_file_becomes_warning() {
        let tmp = TempDir::new().unwrap();
        let fetcher = AssetFetcher::new(Duration::from_secs(5)).unwrap();
        let scenes = vec![RenderScene::new(2.0)
            .with_video(MediaLocator::local("/definitely/not/here.mp4"))];

        let assets = fetcher.materialize_scenes(&scenes, tmp.path()).await;

        assert_eq!(assets.len(), 1);
        assert!(assets[0].video.is_none());
        assert_eq!(assets[0].warnings.len(), 1);
        assert!(assets[0].warnings[0].contains("scene 0"));
    }
}
