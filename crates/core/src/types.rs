use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Request for the favicon of a domain at a given pixel size, resolved by
/// the host browser against its internal favicon cache.
///
/// Construction is pure: identical `(domain, size)` pairs always produce the
/// byte-identical request URL, so calibration and classification stay
/// deterministic across repeated runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IconRequest {
    domain: String,
    size_px: u32,
}

impl IconRequest {
    /// Builds the request for a domain's favicon at `size_px`.
    pub fn new(domain: impl Into<String>, size_px: u32) -> Self {
        Self {
            domain: domain.into(),
            size_px,
        }
    }

    /// Builds the request for the empty domain, which is guaranteed to miss
    /// the cache and therefore resolves to the host's placeholder bitmap.
    /// Calibration rests on this request.
    pub fn empty(size_px: u32) -> Self {
        Self::new("", size_px)
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn size_px(&self) -> u32 {
        self.size_px
    }

    /// Returns the cache-resolvable URL for this request.
    pub fn url(&self) -> String {
        format!(
            "browser://favicon/size/{}@1x/https://{}/",
            self.size_px, self.domain
        )
    }
}

/// Serialized pixel content of an image drawn onto a fixed-size offscreen
/// surface.
///
/// The surface dimensions are embedded in the serialized form, so samples
/// produced under different dimensions can never compare equal. Comparison
/// is exact string equality; there is no perceptual tolerance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterSample(String);

impl RasterSample {
    pub(crate) fn new(serialized: String) -> Self {
        Self(serialized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short hex digest of the serialized form, for logs and patches.
    /// Never used for comparison.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        hex::encode(digest)[..12].to_string()
    }
}

/// Classification verdict for one cached icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The sample is indistinguishable from the calibrated placeholder; the
    /// cache holds no real icon for the domain.
    Missing,
    /// A distinct icon bitmap was found in the cache.
    Icon,
}

impl Verdict {
    /// Returns `true` when the cache returned the placeholder bitmap.
    pub fn is_missing(self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Icon => "icon",
        }
    }
}

/// Result of a recovery attempt for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RecoveryOutcome {
    /// The host surfaced a favicon URL for the background tab before the
    /// deadline.
    Recovered { icon_url: String },
    /// No favicon surfaced before the deadline.
    Empty,
}

impl RecoveryOutcome {
    /// Returns `true` when no favicon was discovered. Callers must check
    /// this before using the outcome.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn icon_url(&self) -> Option<&str> {
        match self {
            Self::Recovered { icon_url } => Some(icon_url),
            Self::Empty => None,
        }
    }
}

/// Trailing report for one audit pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    /// Leaf bookmarks counted across the whole tree.
    pub bookmarks_total: u64,
    /// Distinct HTTPS hostnames actually classified.
    pub domains_total: u64,
    /// Domains whose cached icon matched the placeholder.
    pub missing: u64,
    /// Domains recovered so far in this run.
    pub recovered: u64,
    pub elapsed_ms: u64,
}

/// Patch emitted through the SSE channel while an audit runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditPatch {
    pub seq: u64,
    #[serde(rename = "type")]
    pub kind: AuditPatchKind,
    pub at: DateTime<Utc>,
    pub data: Value,
}

impl AuditPatch {
    /// Returns the patch type string.
    pub fn kind_str(&self) -> &'static str {
        self.kind.as_str()
    }
}

/// Enumerates the supported audit patch kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditPatchKind {
    AuditStarted,
    IconClassified,
    IconRecovered,
    AuditCompleted,
}

impl AuditPatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuditStarted => "audit.started",
            Self::IconClassified => "icon.classified",
            Self::IconRecovered => "icon.recovered",
            Self::AuditCompleted => "audit.completed",
        }
    }
}

impl fmt::Display for AuditPatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AuditPatchKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AuditPatchKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        AuditPatchKind::from_str(&value).map_err(|_| D::Error::custom("unknown patch kind"))
    }
}

impl FromStr for AuditPatchKind {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "audit.started" => Ok(Self::AuditStarted),
            "icon.classified" => Ok(Self::IconClassified),
            "icon.recovered" => Ok(Self::IconRecovered),
            "audit.completed" => Ok(Self::AuditCompleted),
            _ => Err(()),
        }
    }
}
