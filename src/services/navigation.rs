// src/services/navigation.rs

//! Navigation and info-item resolvers.
//!
//! Both walk the post-login page. The main menu is a PrimeFaces tiered menu
//! whose clickable entries carry a confirm-command script with the menu
//! identifier; the top-page info list entries carry an s/p correlation pair
//! in their onclick script instead.

use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::error::{Result, UnipaError};
use crate::models::{InfoItem, NavItem, NavMenu};
use crate::utils::{extract_menu_id, extract_target_sp};

static MAIN_MENU: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[id="menuForm:mainMenu"]"#).unwrap());

static TOP_ENTRIES: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div[id="menuForm:mainMenu"] > .ui-menu-list > .ui-menuitem"#).unwrap()
});

static TOP_ENTRY_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.ui-submenu-link span.ui-menuitem-text").unwrap());

static SUBMENU_COLUMNS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("ul.ui-menu-child td").unwrap());

static COLUMN_HEADER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li.ui-widget-header h3").unwrap());

static COLUMN_ITEMS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li.ui-menuitem").unwrap());

static ITEM_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.ui-menuitem-link").unwrap());

static ITEM_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.ui-menuitem-text").unwrap());

static INFO_ENTRIES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.infoList li a").unwrap());

/// Parse the main navigation menu of the post-login page.
///
/// Entries without a confirm-command attribute are skipped: they are not
/// postback-addressable. The returned order follows document order, but
/// callers must match by name; order is not a documented property of the
/// menu.
pub fn parse_nav_items(document: &Html) -> Result<Vec<NavItem>> {
    if document.select(&MAIN_MENU).next().is_none() {
        return Err(UnipaError::structure(
            r#"main menu div[id="menuForm:mainMenu"] not found"#,
        ));
    }

    let mut items = Vec::new();
    for entry in document.select(&TOP_ENTRIES) {
        let menu_name = match entry.select(&TOP_ENTRY_NAME).next() {
            Some(label) => label.text().collect::<String>(),
            // Entries without a submenu link have no dispatchable children.
            None => continue,
        };

        for column in entry.select(&SUBMENU_COLUMNS) {
            let sub_name = column
                .select(&COLUMN_HEADER)
                .next()
                .map(|header| header.text().collect::<String>());

            for item in column.select(&COLUMN_ITEMS) {
                let Some(link) = item.select(&ITEM_LINK).next() else {
                    continue;
                };
                let Some(confirm_command) = link.value().attr("data-pfconfirmcommand") else {
                    continue;
                };
                let name = item
                    .select(&ITEM_NAME)
                    .next()
                    .map(|label| label.text().collect::<String>())
                    .ok_or_else(|| {
                        UnipaError::structure("menu entry without a name label")
                    })?;

                items.push(NavItem {
                    menu: NavMenu {
                        name: menu_name.clone(),
                        sub_name: sub_name.clone(),
                    },
                    name,
                    menu_id: extract_menu_id(confirm_command),
                });
            }
        }
    }

    log::debug!("parsed {} navigation items", items.len());
    Ok(items)
}

/// Parse the top-page info list into addressable info items.
///
/// Entries whose onclick carries no s/p pair are skipped; a missing info
/// list yields an empty set (the lookup error surfaces at dispatch time,
/// naming the feature).
pub fn parse_info_items(document: &Html) -> Vec<InfoItem> {
    let mut items = Vec::new();
    for entry in document.select(&INFO_ENTRIES) {
        let Some(onclick) = entry.value().attr("onclick") else {
            continue;
        };
        let Some((target_s, target_p)) = extract_target_sp(onclick) else {
            continue;
        };
        let name = entry.text().collect::<String>().trim().to_string();
        items.push(InfoItem {
            name,
            target_s,
            target_p,
        });
    }
    log::debug!("parsed {} info items", items.len());
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    const MENU_PAGE: &str = r#"
        <html><body>
        <div id="menuForm:mainMenu" class="ui-tieredmenu">
          <ul class="ui-menu-list">
            <li class="ui-menuitem">
              <a class="ui-submenu-link"><span class="ui-menuitem-text">キャンパスライフ</span></a>
              <ul class="ui-menu-child">
                <table><tr>
                  <td>
                    <li class="ui-widget-header"><h3>リクエスト</h3></li>
                    <li class="ui-menuitem">
                      <a class="ui-menuitem-link" data-pfconfirmcommand="PrimeFaces.confirm({params:[{'menuForm:mainMenu_menuid':'po030100'}]});">
                        <span class="ui-menuitem-text">掲示板</span>
                      </a>
                    </li>
                    <li class="ui-menuitem">
                      <a class="ui-menuitem-link" data-pfconfirmcommand="PrimeFaces.confirm({params:[{}]});">
                        <span class="ui-menuitem-text">アンケート</span>
                      </a>
                    </li>
                    <li class="ui-menuitem">
                      <a class="ui-menuitem-link">
                        <span class="ui-menuitem-text">リンク集</span>
                      </a>
                    </li>
                  </td>
                </tr></table>
              </ul>
            </li>
          </ul>
        </div>
        </body></html>"#;

    #[test]
    fn test_parse_nav_items() {
        let document = Html::parse_document(MENU_PAGE);
        let items = parse_nav_items(&document).unwrap();

        // リンク集 has no confirm command and is skipped entirely.
        assert_eq!(items.len(), 2);

        let board = &items[0];
        assert_eq!(board.name, "掲示板");
        assert_eq!(board.menu.name, "キャンパスライフ");
        assert_eq!(board.menu.sub_name.as_deref(), Some("リクエスト"));
        assert_eq!(board.menu_id.as_deref(), Some("po030100"));

        // アンケート carries a confirm command without a menu id: kept,
        // but not addressable.
        assert_eq!(items[1].name, "アンケート");
        assert!(items[1].menu_id.is_none());
    }

    #[test]
    fn test_parse_nav_items_missing_menu_is_structure_error() {
        let document = Html::parse_document("<html><body><p>blank</p></body></html>");
        assert!(matches!(
            parse_nav_items(&document),
            Err(UnipaError::Structure(_))
        ));
    }

    const INFO_PAGE: &str = r#"
        <html><body>
        <div class="infoList">
          <ul>
            <li><a onclick='PrimeFaces.ab({s:"funcForm:j_idt90",p:"funcForm:j_idt90"});return false;'>クラスプロファイル</a></li>
            <li><a onclick="somethingElse();">ポートフォリオ</a></li>
            <li><a>シラバス</a></li>
          </ul>
        </div>
        </body></html>"#;

    #[test]
    fn test_parse_info_items() {
        let document = Html::parse_document(INFO_PAGE);
        let items = parse_info_items(&document);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "クラスプロファイル");
        assert_eq!(items[0].target_s, "funcForm:j_idt90");
        assert_eq!(items[0].target_p, "funcForm:j_idt90");
    }

    #[test]
    fn test_parse_info_items_missing_list_is_empty() {
        let document = Html::parse_document("<html><body></body></html>");
        assert!(parse_info_items(&document).is_empty());
    }
}
