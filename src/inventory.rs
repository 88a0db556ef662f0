use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The reason an image survived the filter pipeline, or the sentinel meaning
/// "no rule claimed it" which marks it for deletion.
///
/// The numeric discriminants are part of the plan file format: they must
/// never be reordered, only appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum KeepReason {
    None,
    Young,
    UsedInCluster,
    WhitelistedTag,
    WhitelistedDigest,
    WhitelistedRepository,
    OneOfFew,
}

impl KeepReason {
    pub fn is_delete_candidate(&self) -> bool {
        matches!(self, KeepReason::None)
    }
}

impl From<KeepReason> for u8 {
    fn from(value: KeepReason) -> Self {
        match value {
            KeepReason::None => 0,
            KeepReason::Young => 1,
            KeepReason::UsedInCluster => 2,
            KeepReason::WhitelistedTag => 3,
            KeepReason::WhitelistedDigest => 4,
            KeepReason::WhitelistedRepository => 5,
            KeepReason::OneOfFew => 6,
        }
    }
}

impl TryFrom<u8> for KeepReason {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(KeepReason::None),
            1 => Ok(KeepReason::Young),
            2 => Ok(KeepReason::UsedInCluster),
            3 => Ok(KeepReason::WhitelistedTag),
            4 => Ok(KeepReason::WhitelistedDigest),
            5 => Ok(KeepReason::WhitelistedRepository),
            6 => Ok(KeepReason::OneOfFew),
            other => Err(format!("unknown keep-reason discriminant {other}")),
        }
    }
}

/// Keep/delete annotation attached to an image by the filter pipeline.
///
/// Once `reason` is anything other than `KeepReason::None`, no later filter
/// may overwrite it: first writer wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeptData {
    pub reason: KeepReason,
    pub metadata: Option<String>,
}

impl KeptData {
    pub fn none() -> Self {
        KeptData {
            reason: KeepReason::None,
            metadata: None,
        }
    }

    pub fn is_decided(&self) -> bool {
        self.reason != KeepReason::None
    }
}

impl Default for KeptData {
    fn default() -> Self {
        Self::none()
    }
}

/// A single image manifest within a repository, identified by a unique
/// digest and referenced by zero or more mutable tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub digest: String,
    pub tags: BTreeSet<String>,
    pub size_bytes: u64,
    pub created_ms: String,
    pub uploaded_ms: String,
    pub media_type: String,
    #[serde(default)]
    pub kept_data: KeptData,
}

impl Image {
    pub fn new(digest: impl Into<String>, uploaded_ms: impl Into<String>) -> Self {
        Image {
            digest: digest.into(),
            tags: BTreeSet::new(),
            size_bytes: 0,
            created_ms: String::new(),
            uploaded_ms: uploaded_ms.into(),
            media_type: String::new(),
            kept_data: KeptData::none(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

/// A registry repository and the full set of images it currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub link: String,
    pub images: Vec<Image>,
}

impl Repository {
    pub fn new(link: impl Into<String>) -> Self {
        Repository {
            link: link.into(),
            images: Vec::new(),
        }
    }

    pub fn should_delete_count(&self) -> usize {
        self.images.iter().filter(|i| i.kept_data.reason.is_delete_candidate()).count()
    }
}

/// The full annotated inventory produced by the crawler and consumed by the
/// filter pipeline, reporter, plan codec, and deleter.
pub type Inventory = Vec<Repository>;
