// src/services/classes.rs

//! Class schedule extraction.
//!
//! Reads the class-profile panel: one panel per day of week, each pairing
//! period markers with class-list columns by position.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::client::UnipaClient;
use crate::error::{Result, UnipaError};
use crate::models::{ClassEntry, LectureSlot};

/// Display name of the class-profile info item.
const INFO_ITEM_NAME: &str = "クラスプロファイル";

static DAY_PANELS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".yobiContArea").unwrap());

static PANEL_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.ui-panel-title").unwrap());

static PERIOD_MARKERS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.classJigen").unwrap());

static CLASS_LISTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.classList").unwrap());

static CLASS_ENTRIES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.ui-outputpanel").unwrap());

static ENTRY_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

static PERIOD_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

static CLASS_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([A-Za-z0-9]+)\)").unwrap());

/// Class-schedule feature, driven through a logged-in client.
pub struct ClassSchedule<'a> {
    client: &'a mut UnipaClient,
}

impl<'a> ClassSchedule<'a> {
    pub fn new(client: &'a mut UnipaClient) -> Self {
        Self { client }
    }

    /// Fetch all enrolled classes from the class-profile panel.
    pub async fn fetch_all(&mut self) -> Result<Vec<ClassEntry>> {
        if !self.client.is_logged_in() {
            return Err(UnipaError::NotLoggedIn);
        }
        let info_item = self.client.info_item(INFO_ITEM_NAME)?.clone();
        let document = self.client.request_from_info(&info_item).await?;
        parse_schedule(&document)
    }
}

/// Parse the class-profile panel into schedule entries.
fn parse_schedule(document: &Html) -> Result<Vec<ClassEntry>> {
    let mut classes = Vec::new();

    for panel in document.select(&DAY_PANELS) {
        let day_of_week = panel
            .select(&PANEL_TITLE)
            .next()
            .map(|title| title.text().collect::<String>())
            .ok_or_else(|| UnipaError::structure("class day panel without a title"))?;

        let markers: Vec<ElementRef<'_>> = panel.select(&PERIOD_MARKERS).collect();
        let lists: Vec<ElementRef<'_>> = panel.select(&CLASS_LISTS).collect();
        if markers.len() != lists.len() {
            return Err(UnipaError::structure(format!(
                "class day panel {day_of_week:?} has {} period markers but {} class lists",
                markers.len(),
                lists.len()
            )));
        }

        for (marker, list) in markers.iter().zip(lists.iter()) {
            let marker_text = marker.text().collect::<String>();
            // Markers without a period number (headers, spacers) are skipped.
            let Some(found) = PERIOD_NUMBER.find(&marker_text) else {
                continue;
            };
            let period_of_time = found.as_str().parse::<u32>().ok();

            for entry in list.select(&CLASS_ENTRIES) {
                let link = entry.select(&ENTRY_LINK).next().ok_or_else(|| {
                    UnipaError::structure(format!(
                        "class entry without a link in day panel {day_of_week:?}"
                    ))
                })?;
                let name = link.text().collect::<String>();
                let internal_id = link
                    .value()
                    .attr("id")
                    .map(str::to_string)
                    .ok_or_else(|| {
                        UnipaError::structure(format!("class entry {name:?} without an id"))
                    })?;

                let entry_text = entry.text().collect::<String>();
                let class_code = CLASS_CODE
                    .captures(&entry_text)
                    .map(|captures| captures[1].to_string());

                classes.push(ClassEntry {
                    internal_id,
                    name,
                    class_code,
                    lecture_at: LectureSlot {
                        day_of_week: day_of_week.clone(),
                        period_of_time,
                    },
                });
            }
        }
    }

    log::debug!("parsed {} classes", classes.len());
    Ok(classes)
}
