//! Output file naming for episodes
//!
//! Every episode lands in the download directory under a fixed,
//! human-readable name that embeds its 2-digit zero-padded number. The
//! mapping is invertible so cleanup can go from a file name back to the
//! episode that owns it.
//!
//! yt-dlp leaves intermediates next to the output while it works
//! (`<name>.part`, `<name>.ytdl`, `<name>.part-Frag3`, and per-format files
//! such as `<stem>.f137.mp4`). [`EpisodeNaming::is_artifact_of`] recognizes
//! all of them so cleanup can sweep an episode's files.

use crate::types::EpisodeId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Template around the episode number
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeNaming {
    /// Text before the episode number
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Text after the episode number, including the extension
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

impl Default for EpisodeNaming {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            suffix: default_suffix(),
        }
    }
}

impl EpisodeNaming {
    /// File name for an episode, e.g. `"... S01E07 1080p x264 Hindi.mp4"`
    pub fn file_name(&self, episode: EpisodeId) -> String {
        format!("{}{:02}{}", self.prefix, episode.get(), self.suffix)
    }

    /// Full local path for an episode under `dir`
    pub fn local_path(&self, dir: &Path, episode: EpisodeId) -> PathBuf {
        dir.join(self.file_name(episode))
    }

    /// Recover the episode number from a file name produced by [`file_name`](Self::file_name)
    pub fn parse_episode(&self, name: &str) -> Option<EpisodeId> {
        let digits = name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let episode = digits.parse().ok().map(EpisodeId)?;
        // Only canonical names: "S01E007" is not episode 7's file
        (self.file_name(episode) == name).then_some(episode)
    }

    /// Whether `name` is the episode's file or one of yt-dlp's intermediates for it
    pub fn is_artifact_of(&self, name: &str, episode: EpisodeId) -> bool {
        self.parse_episode(name) == Some(episode)
            || name
                .strip_prefix(self.intermediate_stem(episode).as_str())
                .is_some_and(|rest| rest.starts_with('.'))
    }

    /// File name without its final extension; yt-dlp inserts format ids after it
    fn intermediate_stem(&self, episode: EpisodeId) -> String {
        let suffix_stem = self
            .suffix
            .rfind('.')
            .map_or(self.suffix.as_str(), |dot| &self.suffix[..dot]);
        format!("{}{:02}{}", self.prefix, episode.get(), suffix_stem)
    }
}

fn default_prefix() -> String {
    "My Girlfriend is An Alien S01E".to_string()
}

fn default_suffix() -> String {
    " 1080p x264 Hindi.mp4".to_string()
}
