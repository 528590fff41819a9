//! Generated item metadata: alt text, title, hashtags, badge.
//!
//! Everything here is a pure function of the subject name, slot, media kind
//! and the configured pools, so the same input always yields the same
//! manifest entry.
//!
//! ## Alt text
//!
//! ```text
//! phrase = phrases[(slot + len(subject)) % len(phrases)]
//! alt    = "{phrase} - {subject} Look {slot}"          (+ " - Video")
//! ```
//!
//! ## Hashtags
//!
//! The first `hashtag_count` pool tags, then `{subject_tag_prefix}{subject}`
//! (whitespace removed), then the brand tag.
//!
//! ## Badges
//!
//! The badge table is scanned in order and the first token contained in the
//! subject name (case-insensitive) wins.

use crate::config::{BadgeRule, MetadataConfig};
use crate::types::MediaKind;

/// A badge shown on an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub label: String,
    pub badge_type: String,
}

impl From<&BadgeRule> for Badge {
    fn from(rule: &BadgeRule) -> Self {
        Self {
            label: rule.label.clone(),
            badge_type: rule.badge_type.clone(),
        }
    }
}

/// Synthesized descriptive fields for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemMetadata {
    pub alt: String,
    pub title: String,
    pub hashtags: Vec<String>,
    pub badge: Option<Badge>,
}

/// Metadata generator over a fixed configuration.
pub struct Synthesizer<'a> {
    config: &'a MetadataConfig,
}

impl<'a> Synthesizer<'a> {
    pub fn new(config: &'a MetadataConfig) -> Self {
        Self { config }
    }

    /// Rotating SEO phrase for a subject slot.
    pub fn phrase(&self, subject: &str, slot: u32) -> &str {
        let pool = &self.config.phrases;
        if pool.is_empty() {
            return "";
        }
        let idx = (slot as usize + subject.chars().count()) % pool.len();
        &pool[idx]
    }

    pub fn alt_text(&self, subject: &str, slot: u32, kind: MediaKind) -> String {
        let base = format!("{} - {subject} Look {slot}", self.phrase(subject, slot));
        match kind {
            MediaKind::Image => base,
            MediaKind::Video => format!("{base} - Video"),
        }
    }

    pub fn hashtags(&self, subject: &str) -> Vec<String> {
        let mut tags: Vec<String> = self
            .config
            .hashtags
            .iter()
            .take(self.config.hashtag_count)
            .cloned()
            .collect();
        let subject_tag: String = subject.chars().filter(|c| !c.is_whitespace()).collect();
        tags.push(format!("{}{subject_tag}", self.config.subject_tag_prefix));
        tags.push(self.config.brand_tag.clone());
        tags
    }

    /// First badge whose token appears in `subject`, ignoring case.
    pub fn badge_for(&self, subject: &str) -> Option<Badge> {
        let subject = subject.to_lowercase();
        self.config
            .badges
            .iter()
            .find(|rule| subject.contains(&rule.token.to_lowercase()))
            .map(Badge::from)
    }

    /// Badge picked explicitly by type (upload form selector).
    pub fn badge_by_type(&self, badge_type: &str) -> Option<Badge> {
        self.config
            .badges
            .iter()
            .find(|rule| rule.badge_type.eq_ignore_ascii_case(badge_type))
            .map(Badge::from)
    }

    /// Metadata for a batch item.
    pub fn for_subject(&self, subject: &str, slot: u32, kind: MediaKind) -> ItemMetadata {
        let alt = self.alt_text(subject, slot, kind);
        ItemMetadata {
            title: alt.clone(),
            alt,
            hashtags: self.hashtags(subject),
            badge: self.badge_for(subject),
        }
    }

    /// Metadata for an uploaded item. Unknown selectors mean no badge.
    pub fn for_upload(&self, id: u64, kind: MediaKind, badge: Option<&str>) -> ItemMetadata {
        let badge = badge.filter(|b| !b.trim().is_empty()).and_then(|selector| {
            let found = self.badge_by_type(selector.trim());
            if found.is_none() {
                tracing::warn!(selector, "unknown badge selector, uploading without badge");
            }
            found
        });

        let mut hashtags = vec![self.config.brand_tag.clone()];
        hashtags.extend(self.config.upload_hashtags.iter().cloned());

        ItemMetadata {
            alt: format!("{} Gallery {} {id}", self.config.site_name, kind.label()),
            title: format!("Gallery {} {id}", kind.label()),
            hashtags,
            badge,
        }
    }
}
