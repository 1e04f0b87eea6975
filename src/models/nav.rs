// src/models/nav.rs

//! Navigation structures parsed from the post-login page.

/// A navigation menu grouping (top-level name plus optional submenu header).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavMenu {
    /// Top-level menu name
    pub name: String,
    /// Submenu group header, when the item sits inside a grouped column
    pub sub_name: Option<String>,
}

/// A single entry of the main navigation menu.
///
/// Items are computed once per login from the post-login page and are
/// immutable afterwards; a fresh login recomputes the full list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    /// Menu the item belongs to
    pub menu: NavMenu,
    /// Display name, the lookup key for feature dispatch
    pub name: String,
    /// Menu identifier used in postbacks; `None` means the item is not
    /// addressable via postback
    pub menu_id: Option<String>,
}

/// A per-feature sub-navigation entry on the portal top page.
///
/// Info items carry the s/p correlation pair of their client-side script
/// call instead of a menu identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoItem {
    /// Display name, the lookup key for feature dispatch
    pub name: String,
    /// `s` correlation value for the dispatch postback
    pub target_s: String,
    /// `p` correlation value for the dispatch postback
    pub target_p: String,
}
