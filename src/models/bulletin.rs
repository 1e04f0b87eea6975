// src/models/bulletin.rs

//! Bulletin-board data structures.

use chrono::{DateTime, FixedOffset};

/// A row of the bulletin-board "all posts" list.
///
/// Created fresh on every list fetch; nothing persists across fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletinItem {
    /// DOM-assigned ordinal id. This is NOT a stable identity: the server
    /// numbers rows by display order only. Do not use it to correlate
    /// posts across sessions or to detect content changes.
    pub item_id: String,
    /// Post title
    pub title: String,
    /// `s` correlation value for the detail postback
    pub target_s: String,
    /// `p` correlation value for the detail postback
    pub target_p: String,
    /// Flag-toggle checkbox id
    pub flag_id: String,
    /// Unread-toggle checkbox id
    pub unread_id: String,
    /// Attention marker, set by the poster
    pub is_attention: bool,
    /// Flag state, settable by the user. The portal checkbox is inverted:
    /// checked means NOT flagged.
    pub is_flag: bool,
    /// Unread state, settable by the user
    pub is_unread: bool,
}

/// Publication period of a bulletin post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationPeriod {
    /// Publication start
    pub start: Option<DateTime<FixedOffset>>,
    /// Publication end
    pub end: Option<DateTime<FixedOffset>>,
}

/// Full detail view of a bulletin post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletinDetails {
    /// Ordinal id of the originating list row (not a stable identity)
    pub item_id: String,
    /// Post title (件名)
    pub title: String,
    /// Author (差出人)
    pub author: String,
    /// Category (カテゴリ)
    pub category: String,
    /// Body as verbatim HTML. Plain-text or Markdown conversion is left to
    /// the caller.
    pub content_html: String,
    /// Publication period (掲示期間)
    pub publication_period: PublicationPeriod,
    /// Attached files, empty when the post has none
    pub files: Vec<AttachedFile>,
}

/// An attachment of a bulletin post.
///
/// The portal will not serve the file bytes directly: a priming partial
/// request against `prime_id` must precede the real download request
/// against `download_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedFile {
    /// Filename with extension, size annotation stripped
    pub filename: String,
    /// Id of the form the download buttons live in
    pub form_id: String,
    /// Id used by the priming request
    pub prime_id: String,
    /// Id used by the actual download request
    pub download_id: String,
}

impl AttachedFile {
    /// Expand the `{filename}` placeholder of a destination path template.
    pub fn resolve_path(&self, template: &str) -> String {
        template.replace("{filename}", &self.filename)
    }
}
