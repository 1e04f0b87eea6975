// src/services/bulletin_board.rs

//! Bulletin-board extraction.
//!
//! Fetches the post list, per-post details, and attached files. The markup
//! here is the most brittle part of the portal: every expected panel,
//! table, or button that is missing raises a structure error naming it,
//! rather than returning partial data.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::client::{FeatureKey, UnipaClient};
use crate::error::{Result, UnipaError};
use crate::models::{AttachedFile, BulletinDetails, BulletinItem, PublicationPeriod};
use crate::utils::datetime::process_datetime;
use crate::utils::extract_target_sp;

/// Display name of the bulletin-board navigation item.
const NAV_ITEM_NAME: &str = "掲示板";

static TAB_PANEL_WRAP: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.ui-tabs-panels").unwrap());

static TAB_PANELS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div.ui-tabs-panels > div[role="tabpanel"]"#).unwrap());

static LIST_ROWS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.ui-scrollpanel > div.alignRight").unwrap());

static ROW_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

static ATTENTION_ICON: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("i.iconColorAttention").unwrap());

static ROW_BUTTONS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"span.inlineBlock > div[type="button"]"#).unwrap());

static CHECKBOX: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"input[type="checkbox"]"#).unwrap());

static DETAIL_PANEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.ui-outputpanel").unwrap());

static DETAIL_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.singleTable").unwrap());

static TABLE_ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static TABLE_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static SPAN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").unwrap());

static ATTACH_BUTTON: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"button[title*="添付"]"#).unwrap());

static FILE_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.ui-datatable").unwrap());

static FILE_ROWS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.ui-datatable tbody tr").unwrap());

static FILE_BUTTON: LazyLock<Selector> = LazyLock::new(|| Selector::parse("button").unwrap());

static SIZE_ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\d+(?:\.\d+)?\s*[KMGT]?B\)$").unwrap());

/// Bulletin-board feature, driven through a logged-in client.
pub struct BulletinBoard<'a> {
    client: &'a mut UnipaClient,
}

impl<'a> BulletinBoard<'a> {
    pub fn new(client: &'a mut UnipaClient) -> Self {
        Self { client }
    }

    /// Fetch the full post list from the "all posts" tab.
    ///
    /// Dispatches the bulletin-board menu item and records the action URL
    /// the server advertises for the feature; every later bulletin
    /// postback goes through that URL.
    pub async fn fetch_all(&mut self) -> Result<Vec<BulletinItem>> {
        if !self.client.is_logged_in() {
            return Err(UnipaError::NotLoggedIn);
        }
        let nav_item = self.client.nav_item(NAV_ITEM_NAME)?.clone();
        log::debug!("bulletin board menu id: {:?}", nav_item.menu_id);

        let document = self
            .client
            .request_from_menu(&nav_item, &[("javax.faces.partial.execute", "@all")])
            .await?;
        self.client
            .record_request_url(FeatureKey::BulletinBoard, &document)?;

        parse_items(&document)
    }

    /// Fetch the detail view of one post, keyed by its s/p pair.
    ///
    /// When the post advertises an attachment button, a follow-up postback
    /// enumerates the attached files.
    pub async fn fetch_details(&mut self, item: &BulletinItem) -> Result<BulletinDetails> {
        if !self.client.is_logged_in() {
            return Err(UnipaError::NotLoggedIn);
        }
        let document = self
            .client
            .request(
                FeatureKey::BulletinBoard,
                "funcForm",
                &[
                    ("javax.faces.source", item.target_s.as_str()),
                    ("javax.faces.partial.execute", item.target_s.as_str()),
                    ("funcForm:tabArea_activeIndex", "1"),
                    (item.target_s.as_str(), item.target_p.as_str()),
                ],
            )
            .await?;

        let (mut details, attach_button) = parse_details(&item.item_id, &document)?;
        if let Some(button_id) = attach_button {
            let listing = self
                .client
                .request(
                    FeatureKey::BulletinBoard,
                    "funcForm",
                    &[
                        ("javax.faces.source", button_id.as_str()),
                        ("javax.faces.partial.execute", button_id.as_str()),
                        (button_id.as_str(), button_id.as_str()),
                    ],
                )
                .await?;
            details.files = parse_file_list(&listing)?;
        }
        Ok(details)
    }

    /// Download an attached file.
    ///
    /// The portal refuses to serve file bytes without a priming partial
    /// request first, so this is always two round trips. The destination
    /// template may contain `{filename}`; parent directories are created.
    pub async fn download(&mut self, file: &AttachedFile, dest_template: &str) -> Result<PathBuf> {
        let dest = PathBuf::from(file.resolve_path(dest_template));

        self.client
            .request_partial(
                FeatureKey::BulletinBoard,
                &file.form_id,
                &[
                    ("javax.faces.partial.ajax", "true"),
                    ("javax.faces.source", file.prime_id.as_str()),
                    ("javax.faces.partial.execute", "@all"),
                    (file.prime_id.as_str(), file.prime_id.as_str()),
                ],
            )
            .await?;

        self.client
            .download(
                FeatureKey::BulletinBoard,
                &file.form_id,
                &[(file.download_id.as_str(), file.download_id.as_str())],
                &dest,
            )
            .await?;
        Ok(dest)
    }

    /// Mark a post as read. Not implemented against the portal.
    pub async fn mark_read(&mut self, _item: &BulletinItem) -> Result<()> {
        Err(UnipaError::Unimplemented("mark_read"))
    }

    /// Mark a post as unread. Not implemented against the portal.
    pub async fn mark_unread(&mut self, _item: &BulletinItem) -> Result<()> {
        Err(UnipaError::Unimplemented("mark_unread"))
    }

    /// Flag a post. Not implemented against the portal.
    pub async fn mark_flag(&mut self, _item: &BulletinItem) -> Result<()> {
        Err(UnipaError::Unimplemented("mark_flag"))
    }

    /// Unflag a post. Not implemented against the portal.
    pub async fn mark_unflag(&mut self, _item: &BulletinItem) -> Result<()> {
        Err(UnipaError::Unimplemented("mark_unflag"))
    }
}

/// Parse the post list out of the bulletin-board landing panel.
fn parse_items(document: &Html) -> Result<Vec<BulletinItem>> {
    if document.select(&TAB_PANEL_WRAP).next().is_none() {
        return Err(UnipaError::structure(
            "bulletin panel container div.ui-tabs-panels not found",
        ));
    }
    let panels: Vec<ElementRef<'_>> = document.select(&TAB_PANELS).collect();
    // The second tab panel is the "all posts" view; the index is fixed.
    if panels.len() < 2 {
        return Err(UnipaError::structure(
            "bulletin 'all posts' tab panel not found",
        ));
    }
    let panel = panels[1];

    let mut items = Vec::new();
    for row in panel.select(&LIST_ROWS) {
        let Some(link) = row.select(&ROW_LINK).next() else {
            continue;
        };
        // A row whose title link carries no s/p pair is not addressable
        // and is excluded from the result set.
        let Some(onclick) = link.value().attr("onclick") else {
            continue;
        };
        let Some((target_s, target_p)) = extract_target_sp(onclick) else {
            continue;
        };

        let item_id = link
            .value()
            .attr("id")
            .map(str::to_string)
            .ok_or_else(|| UnipaError::structure("bulletin row title link without an id"))?;
        let title = link.text().collect::<String>();
        let is_attention = row.select(&ATTENTION_ICON).next().is_some();

        let buttons: Vec<ElementRef<'_>> = row.select(&ROW_BUTTONS).collect();
        if buttons.len() < 2 {
            return Err(UnipaError::structure(
                "bulletin row without flag/unread buttons",
            ));
        }
        let (flag_id, flag_checked) = checkbox_state(&buttons[0], "flag")?;
        let (unread_id, unread_checked) = checkbox_state(&buttons[1], "unread")?;

        items.push(BulletinItem {
            item_id,
            title,
            target_s,
            target_p,
            flag_id,
            unread_id,
            is_attention,
            // The flag checkbox is inverted: checked means NOT flagged.
            is_flag: !flag_checked,
            is_unread: unread_checked,
        });
    }

    log::debug!("parsed {} bulletin items", items.len());
    Ok(items)
}

fn checkbox_state(button: &ElementRef<'_>, which: &str) -> Result<(String, bool)> {
    let input = button
        .select(&CHECKBOX)
        .next()
        .ok_or_else(|| UnipaError::structure(format!("bulletin {which} button without checkbox")))?;
    let id = input
        .value()
        .attr("id")
        .map(str::to_string)
        .ok_or_else(|| UnipaError::structure(format!("bulletin {which} checkbox without id")))?;
    Ok((id, input.value().attr("checked").is_some()))
}

/// Parse the detail panel into a record plus the attachment-button id, when
/// the post has one.
fn parse_details(item_id: &str, document: &Html) -> Result<(BulletinDetails, Option<String>)> {
    let panel = document
        .select(&DETAIL_PANEL)
        .next()
        .ok_or_else(|| UnipaError::structure("bulletin detail panel div.ui-outputpanel not found"))?;
    let table = panel
        .select(&DETAIL_TABLE)
        .next()
        .ok_or_else(|| UnipaError::structure("bulletin detail table.singleTable not found"))?;

    // Two-column key/value rows, keyed by the field label.
    let mut fields: HashMap<String, ElementRef<'_>> = HashMap::new();
    for row in table.select(&TABLE_ROW) {
        let cells: Vec<ElementRef<'_>> = row.select(&TABLE_CELL).collect();
        if cells.len() != 2 {
            continue;
        }
        let label = cells[0].text().collect::<String>().trim().to_string();
        fields.insert(label, cells[1]);
    }

    let period_cell = detail_field(&fields, "掲示期間")?;
    let spans: Vec<ElementRef<'_>> = period_cell.select(&SPAN).collect();
    if spans.len() < 3 {
        return Err(UnipaError::structure(
            "bulletin publication period cell malformed",
        ));
    }
    let start = process_datetime(spans[0].text().collect::<String>().trim())?;
    let end = process_datetime(spans[2].text().collect::<String>().trim())?;

    let attach_button = match panel.select(&ATTACH_BUTTON).next() {
        Some(button) => Some(
            button
                .value()
                .attr("id")
                .map(str::to_string)
                .ok_or_else(|| UnipaError::structure("bulletin attachment button without id"))?,
        ),
        None => None,
    };

    let details = BulletinDetails {
        item_id: item_id.to_string(),
        title: cell_text(detail_field(&fields, "件名")?),
        author: cell_text(detail_field(&fields, "差出人")?),
        category: cell_text(detail_field(&fields, "カテゴリ")?),
        content_html: detail_field(&fields, "本文")?.inner_html(),
        publication_period: PublicationPeriod { start, end },
        files: Vec::new(),
    };
    Ok((details, attach_button))
}

fn detail_field<'a>(
    fields: &HashMap<String, ElementRef<'a>>,
    label: &str,
) -> Result<ElementRef<'a>> {
    fields
        .get(label)
        .copied()
        .ok_or_else(|| UnipaError::structure(format!("bulletin detail field {label:?} not found")))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Parse the attachment listing panel into file descriptors.
fn parse_file_list(document: &Html) -> Result<Vec<AttachedFile>> {
    if document.select(&FILE_TABLE).next().is_none() {
        return Err(UnipaError::structure("attachment table not found"));
    }

    let mut files = Vec::new();
    for row in document.select(&FILE_ROWS) {
        let name_cell = row
            .select(&TABLE_CELL)
            .next()
            .ok_or_else(|| UnipaError::structure("attachment row without filename cell"))?;
        let filename = strip_size_annotation(name_cell.text().collect::<String>().trim());

        let buttons: Vec<ElementRef<'_>> = row.select(&FILE_BUTTON).collect();
        if buttons.len() < 2 {
            return Err(UnipaError::structure(
                "attachment row without priming/download buttons",
            ));
        }
        let prime_id = button_id(&buttons[0])?;
        let download_id = button_id(&buttons[1])?;
        let form_id = enclosing_form_id(&row)?;

        files.push(AttachedFile {
            filename,
            form_id,
            prime_id,
            download_id,
        });
    }
    log::debug!("parsed {} attached files", files.len());
    Ok(files)
}

fn button_id(button: &ElementRef<'_>) -> Result<String> {
    button
        .value()
        .attr("id")
        .map(str::to_string)
        .ok_or_else(|| UnipaError::structure("attachment button without id"))
}

fn enclosing_form_id(element: &ElementRef<'_>) -> Result<String> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "form")
        .and_then(|form| form.value().attr("id").map(str::to_string))
        .ok_or_else(|| UnipaError::structure("attachment row outside an identified form"))
}

/// Strip the trailing size annotation from a filename cell:
/// `資料.pdf(120KB)` becomes `資料.pdf`.
fn strip_size_annotation(text: &str) -> String {
    SIZE_ANNOTATION.replace(text.trim(), "").trim().to_string()
}
