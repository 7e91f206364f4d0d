use serde::{Deserialize, Serialize};
use std::fmt;

/// Source platform of a media URL, decided by substring matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Vk,
    Instagram,
    Unknown,
}

impl Platform {
    pub fn detect(url: &str) -> Self {
        let url = url.to_lowercase();

        if url.contains("youtube.com") || url.contains("youtu.be") {
            Platform::Youtube
        } else if url.contains("vk.com") || url.contains("vkvideo.ru") {
            Platform::Vk
        } else if url.contains("instagram.com") {
            Platform::Instagram
        } else {
            Platform::Unknown
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Platform::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Vk => "vk",
            Platform::Instagram => "instagram",
            Platform::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
