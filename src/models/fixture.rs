// src/models/fixture.rs

//! Test-fixture file models.
//!
//! `tests.json` records what a live session is expected to return, so the
//! extraction code can be validated against a real or recorded portal. The
//! portal exposes no stable post identifier, so fixtures are joined to live
//! records by field-match scoring instead of a key.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{BulletinDetails, BulletinItem};
use crate::utils::datetime::process_datetime;

/// Root of the `tests.json` fixture file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    /// Expected bulletin list rows
    #[serde(default)]
    pub bulletin_list: Vec<BulletinListExpectation>,

    /// Expected bulletin detail records
    #[serde(default)]
    pub bulletin_details: Vec<BulletinDetailsExpectation>,
}

impl Fixture {
    /// Load a fixture from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the fixture to a JSON file, pretty-printed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Expected fields of one bulletin list row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletinListExpectation {
    pub title: String,
    pub target_s: String,
    pub target_p: String,
    pub flag_id: String,
    pub unread_id: String,
    pub is_attention: bool,
    pub is_flag: bool,
    pub is_unread: bool,
}

impl BulletinListExpectation {
    /// Count how many comparable fields of `item` equal this expectation.
    ///
    /// The ordinal item id is deliberately not compared: it is assigned by
    /// display order and differs between fetches.
    pub fn match_score(&self, item: &BulletinItem) -> usize {
        [
            self.title == item.title,
            self.flag_id == item.flag_id,
            self.unread_id == item.unread_id,
            self.is_attention == item.is_attention,
            self.is_flag == item.is_flag,
            self.is_unread == item.is_unread,
        ]
        .into_iter()
        .filter(|m| *m)
        .count()
    }
}

/// Expected publication period, in the portal's own text form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicationPeriodExpectation {
    pub start_date: String,
    pub end_date: String,
}

/// Expected fields of one bulletin detail record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletinDetailsExpectation {
    pub title: String,
    pub author: String,
    pub category: String,
    pub content_html: String,
    pub publication_period: PublicationPeriodExpectation,

    /// SHA-256 hashes of the attachments, when the post has any
    #[serde(default)]
    pub file_hashes: Vec<String>,
}

impl BulletinDetailsExpectation {
    /// Count how many comparable fields of `details` equal this expectation.
    pub fn match_score(&self, details: &BulletinDetails) -> usize {
        let expected_start = process_datetime(&self.publication_period.start_date)
            .ok()
            .flatten();
        let expected_end = process_datetime(&self.publication_period.end_date)
            .ok()
            .flatten();
        [
            self.title == details.title,
            self.author == details.author,
            self.category == details.category,
            self.content_html == details.content_html,
            expected_start == details.publication_period.start,
            expected_end == details.publication_period.end,
        ]
        .into_iter()
        .filter(|m| *m)
        .count()
    }
}

/// Pick the candidate with the highest score; first seen wins ties.
///
/// Returns `None` when no candidate scores above zero. This is the
/// explicit replacement for a join key the portal does not provide; retire
/// it if a future server revision exposes a stable identifier.
pub fn best_match<'a, T>(candidates: &'a [T], score: impl Fn(&T) -> usize) -> Option<&'a T> {
    let mut best: Option<&'a T> = None;
    let mut best_score = 0;
    for candidate in candidates {
        let candidate_score = score(candidate);
        if candidate_score > best_score {
            best = Some(candidate);
            best_score = candidate_score;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item(title: &str, flag_id: &str) -> BulletinItem {
        BulletinItem {
            item_id: "funcForm:tabArea:1:j_idt200".to_string(),
            title: title.to_string(),
            target_s: "s-1".to_string(),
            target_p: "p-1".to_string(),
            flag_id: flag_id.to_string(),
            unread_id: "unread-1".to_string(),
            is_attention: false,
            is_flag: false,
            is_unread: true,
        }
    }

    #[test]
    fn test_match_score_counts_equal_fields() {
        let expectation = BulletinListExpectation {
            title: "休講のお知らせ".to_string(),
            target_s: "s-1".to_string(),
            target_p: "p-1".to_string(),
            flag_id: "flag-1".to_string(),
            unread_id: "unread-1".to_string(),
            is_attention: false,
            is_flag: false,
            is_unread: true,
        };
        let item = sample_item("休講のお知らせ", "flag-1");
        assert_eq!(expectation.match_score(&item), 6);

        let renamed = sample_item("別の掲示", "flag-1");
        assert_eq!(expectation.match_score(&renamed), 5);
    }

    #[test]
    fn test_best_match_prefers_highest_score() {
        let items = vec![sample_item("a", "x"), sample_item("b", "y")];
        let found = best_match(&items, |item| if item.title == "b" { 3 } else { 1 }).unwrap();
        assert_eq!(found.title, "b");
    }

    #[test]
    fn test_best_match_first_seen_wins_ties() {
        let items = vec![sample_item("first", "x"), sample_item("second", "x")];
        let found = best_match(&items, |_| 2).unwrap();
        assert_eq!(found.title, "first");
    }

    #[test]
    fn test_best_match_none_on_zero_scores() {
        let items = vec![sample_item("a", "x")];
        assert!(best_match(&items, |_| 0).is_none());
    }

    #[test]
    fn test_fixture_json_round_trip() {
        let fixture = Fixture {
            bulletin_list: vec![BulletinListExpectation {
                title: "t".to_string(),
                target_s: "s".to_string(),
                target_p: "p".to_string(),
                flag_id: "f".to_string(),
                unread_id: "u".to_string(),
                is_attention: true,
                is_flag: false,
                is_unread: false,
            }],
            bulletin_details: Vec::new(),
        };
        let json = serde_json::to_string(&fixture).unwrap();
        let reparsed: Fixture = serde_json::from_str(&json).unwrap();
        assert_eq!(reparsed.bulletin_list.len(), 1);
        assert!(reparsed.bulletin_list[0].is_attention);
    }
}
