//! Utility functions and helpers.

pub mod datetime;

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

static MENU_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'menuForm:mainMenu_menuid':'(.+?)'").unwrap());

static TARGET_SP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"PrimeFaces\.ab\(\{s:"(.+?)",p:"(.+?)"\}\);"#).unwrap());

/// Extract the menu identifier from a menu entry's confirm-command script.
///
/// Capture group 1 of `'menuForm:mainMenu_menuid':'…'`; `None` when the
/// command carries no menu id (the entry is not postback-addressable).
pub fn extract_menu_id(confirm_command: &str) -> Option<String> {
    MENU_ID
        .captures(confirm_command)
        .map(|captures| captures[1].to_string())
}

/// Extract the s/p correlation pair from an inline script call.
///
/// Capture groups 1 and 2 of `PrimeFaces.ab({s:"…",p:"…"});`; `None` when
/// the script does not carry the pair.
pub fn extract_target_sp(script: &str) -> Option<(String, String)> {
    TARGET_SP
        .captures(script)
        .map(|captures| (captures[1].to_string(), captures[2].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://unipa.example.ac.jp/up/faces/login").unwrap();
        assert_eq!(
            resolve_url(&base, "/up/faces/up/po/Poa00601A.jsp"),
            "https://unipa.example.ac.jp/up/faces/up/po/Poa00601A.jsp"
        );
        assert_eq!(
            resolve_url(&base, "menu.jsp"),
            "https://unipa.example.ac.jp/up/faces/menu.jsp"
        );
        assert_eq!(
            resolve_url(&base, "https://other.example.com/x"),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn test_extract_menu_id() {
        let command = r"PrimeFaces.confirm({source:'menuForm:mainMenu',process:'@this',params:[{'menuForm:mainMenu_menuid':'po030200'}]});";
        assert_eq!(extract_menu_id(command), Some("po030200".to_string()));
        assert_eq!(extract_menu_id("PrimeFaces.confirm({});"), None);
    }

    #[test]
    fn test_extract_target_sp() {
        let onclick = r#"PrimeFaces.ab({s:"funcForm:tabArea:1:j_idt200",p:"funcForm:tabArea:1:j_idt200"});return false;"#;
        assert_eq!(
            extract_target_sp(onclick),
            Some((
                "funcForm:tabArea:1:j_idt200".to_string(),
                "funcForm:tabArea:1:j_idt200".to_string()
            ))
        );
        assert_eq!(extract_target_sp("return false;"), None);
    }
}
