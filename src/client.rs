// src/client.rs

//! Portal session client.
//!
//! Owns the cookie-bearing HTTP session, the protocol token set, and the
//! per-feature request-URL registry. The portal's view-state scheme is
//! stateful and non-reentrant: every postback consumes the token set derived
//! from the previous response, so all requests on one session are strictly
//! sequential. Every method that talks to the server takes `&mut self`;
//! sharing a client across tasks requires external mutual exclusion.

use std::path::Path;

use reqwest::StatusCode;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{Result, UnipaError};
use crate::models::{header_form_action, InfoItem, NavItem, TokenSet};
use crate::services::navigation;
use crate::utils::resolve_url;

const USER_AGENT: &str = concat!("unipa/", env!("CARGO_PKG_VERSION"));

const USER_ID_FIELD: &str = "loginForm:userId";
const PASSWORD_FIELD: &str = "loginForm:password";

/// Logical features whose postback action URL the server may rotate.
///
/// The server can advertise a fresh `form#headerForm` action URL when a
/// feature's landing panel is opened; subsequent postbacks for that feature
/// must use it instead of the login-time URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKey {
    /// Post-login top page; baseline for menu dispatch
    Top,
    /// Bulletin board (掲示板)
    BulletinBoard,
    /// Sitemap
    Sitemap,
}

/// Last-seen relative action URL per feature. All keys start unset; reading
/// an unset key yields `None`, never an error.
#[derive(Debug, Default)]
struct RequestUrlRegistry {
    top: Option<String>,
    bulletin_board: Option<String>,
    sitemap: Option<String>,
}

impl RequestUrlRegistry {
    fn get(&self, key: FeatureKey) -> Option<&str> {
        match key {
            FeatureKey::Top => self.top.as_deref(),
            FeatureKey::BulletinBoard => self.bulletin_board.as_deref(),
            FeatureKey::Sitemap => self.sitemap.as_deref(),
        }
    }

    fn record(&mut self, key: FeatureKey, action: String) {
        let slot = match key {
            FeatureKey::Top => &mut self.top,
            FeatureKey::BulletinBoard => &mut self.bulletin_board,
            FeatureKey::Sitemap => &mut self.sitemap,
        };
        *slot = Some(action);
    }
}

/// Raw copy of the most recent HTTP exchange, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct LastResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// UNIVERSAL PASSPORT session client.
pub struct UnipaClient {
    http: reqwest::Client,
    base_url: Url,
    logged_in: bool,
    token: Option<TokenSet>,
    nav_items: Vec<NavItem>,
    info_items: Vec<InfoItem>,
    request_urls: RequestUrlRegistry,
    last_response: Option<LastResponse>,
}

impl UnipaClient {
    /// Create a client against a portal base URL (the part of the login
    /// page URL before `/up/`).
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            logged_in: false,
            token: None,
            nav_items: Vec::new(),
            info_items: Vec::new(),
            request_urls: RequestUrlRegistry::default(),
            last_response: None,
        })
    }

    /// Whether a login has succeeded on this session.
    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// The most recent full token set, `None` before the first login.
    pub fn token(&self) -> Option<&TokenSet> {
        self.token.as_ref()
    }

    /// Navigation items parsed from the post-login page.
    pub fn nav_items(&self) -> &[NavItem] {
        &self.nav_items
    }

    /// Info items parsed from the post-login page.
    pub fn info_items(&self) -> &[InfoItem] {
        &self.info_items
    }

    /// The most recent raw HTTP exchange, for diagnostics.
    pub fn last_response(&self) -> Option<&LastResponse> {
        self.last_response.as_ref()
    }

    /// The portal base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Look up a navigation item by display name. Document order is not a
    /// stable property of the menu, so name lookup is the supported join.
    pub fn nav_item(&self, name: &str) -> Result<&NavItem> {
        self.nav_items
            .iter()
            .find(|item| item.name == name)
            .ok_or_else(|| UnipaError::structure(format!("navigation item {name:?} not found")))
    }

    /// Look up an info item by display name.
    pub fn info_item(&self, name: &str) -> Result<&InfoItem> {
        self.info_items
            .iter()
            .find(|item| item.name == name)
            .ok_or_else(|| UnipaError::structure(format!("info item {name:?} not found")))
    }

    /// The action URL recorded for a feature, resolved against the base
    /// URL; `None` while the server has not advertised one yet.
    pub fn request_url(&self, key: FeatureKey) -> Option<String> {
        self.request_urls
            .get(key)
            .map(|action| resolve_url(&self.base_url, action))
    }

    /// Record the header-form action URL of `document` for a feature.
    pub fn record_request_url(&mut self, key: FeatureKey, document: &Html) -> Result<()> {
        self.request_urls.record(key, header_form_action(document)?);
        Ok(())
    }

    /// Log in with the given credentials.
    ///
    /// Harvests the login form's default parameters, injects the
    /// credentials, and submits. Returns `Ok(false)` when the POST itself
    /// is answered non-200 (the one soft-failure path); a rejected login
    /// with an inline message is `UnipaError::LoginRejected`, so callers
    /// can tell bad credentials from a broken session.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<bool> {
        let base = self.base_url.to_string();
        let document = self.get_document(&base).await?;

        let login_form_selector = Selector::parse("form#loginForm").unwrap();
        let form = document
            .select(&login_form_selector)
            .next()
            .ok_or_else(|| UnipaError::structure("form#loginForm not found on login page"))?;
        let action = form
            .value()
            .attr("action")
            .ok_or_else(|| UnipaError::structure("form#loginForm has no action attribute"))?;
        let login_url = resolve_url(&self.base_url, action);
        log::debug!("login form action: {login_url}");

        let params = build_login_params(&form, username, password);

        let response = self.http.post(&login_url).form(&params).send().await?;
        let status = response.status();
        let text = response.text().await?;
        self.remember(&login_url, status, text.clone());
        if status != StatusCode::OK {
            return Ok(false);
        }

        let document = Html::parse_document(&text);
        let error_selector = Selector::parse("span.ui-messages-error-detail").unwrap();
        if let Some(detail) = document.select(&error_selector).next() {
            let message = detail.text().collect::<String>().trim().to_string();
            return Err(UnipaError::login_rejected(message));
        }

        self.logged_in = true;
        self.token = Some(TokenSet::from_document(&document)?);
        self.nav_items = navigation::parse_nav_items(&document)?;
        self.info_items = navigation::parse_info_items(&document);
        self.request_urls
            .record(FeatureKey::Top, header_form_action(&document)?);

        log::debug!(
            "logged in: {} nav items, {} info items",
            self.nav_items.len(),
            self.info_items.len()
        );
        Ok(true)
    }

    /// GET a page and parse it as lenient HTML. Non-200 is a transport
    /// error.
    pub async fn get_document(&mut self, url: &str) -> Result<Html> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        self.remember(url, status, text.clone());
        if status != StatusCode::OK {
            return Err(UnipaError::transport(url, status));
        }
        Ok(Html::parse_document(&text))
    }

    /// Issue a feature postback and parse the response as lenient HTML.
    ///
    /// `form` is the request-type marker field (`menuForm`, `funcForm`,
    /// ...); per the portal convention its value equals its own name. The
    /// body carries the current token set plus `extra`, and the token set
    /// is refreshed from the response, which must contain the header form.
    pub async fn request(
        &mut self,
        key: FeatureKey,
        form: &str,
        extra: &[(&str, &str)],
    ) -> Result<Html> {
        let url = self.postback_url(key)?;
        let params = self.postback_params(form, extra)?;

        let response = self.http.post(&url).form(&params).send().await?;
        let status = response.status();
        let text = response.text().await?;
        self.remember(&url, status, text.clone());
        if status != StatusCode::OK {
            return Err(UnipaError::transport(&url, status));
        }

        let document = Html::parse_document(&text);
        // The XML partial mode never reaches this path, so a page without
        // the header form means the protocol state is already lost.
        self.token = Some(TokenSet::from_document(&document)?);
        Ok(document)
    }

    /// Issue an AJAX-style partial postback and return the raw XML body.
    ///
    /// Partial responses are fragments without the header form, so the
    /// token set is deliberately not refreshed.
    pub async fn request_partial(
        &mut self,
        key: FeatureKey,
        form: &str,
        extra: &[(&str, &str)],
    ) -> Result<String> {
        let url = self.postback_url(key)?;
        let params = self.postback_params(form, extra)?;

        let response = self
            .http
            .post(&url)
            .form(&params)
            .header("Accept", "application/xml")
            .header("Faces-Request", "partial/ajax")
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        self.remember(&url, status, text.clone());
        if status != StatusCode::OK {
            return Err(UnipaError::transport(&url, status));
        }
        Ok(text)
    }

    /// Issue a postback and stream the response body to `dest`.
    ///
    /// Parent directories are created as needed. No token refresh: the
    /// response is file content, not a page.
    pub async fn download(
        &mut self,
        key: FeatureKey,
        form: &str,
        extra: &[(&str, &str)],
        dest: &Path,
    ) -> Result<()> {
        let url = self.postback_url(key)?;
        let params = self.postback_params(form, extra)?;

        let response = self.http.post(&url).form(&params).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            self.remember(&url, status, String::new());
            return Err(UnipaError::transport(&url, status));
        }
        let bytes = response.bytes().await?;
        self.remember(&url, status, format!("<{} bytes>", bytes.len()));

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(dest, &bytes).await?;
        log::debug!("downloaded {} bytes to {}", bytes.len(), dest.display());
        Ok(())
    }

    /// Menu dispatch: open the feature behind a navigation item.
    ///
    /// Items without a menu identifier are not postback-addressable.
    pub async fn request_from_menu(
        &mut self,
        item: &NavItem,
        extra: &[(&str, &str)],
    ) -> Result<Html> {
        let menu_id = item.menu_id.as_deref().ok_or_else(|| {
            UnipaError::structure(format!(
                "navigation item {:?} has no menu id and cannot be dispatched",
                item.name
            ))
        })?;
        log::debug!("menu dispatch {:?} (menu id {menu_id})", item.name);

        let mut params: Vec<(&str, &str)> = vec![
            ("menuForm:mainMenu", "menuForm:mainMenu"),
            ("rx.sync.source", "menuForm:mainMenu"),
            ("menuForm:mainMenu_menuid", menu_id),
        ];
        params.extend_from_slice(extra);
        self.request(FeatureKey::Top, "menuForm", &params).await
    }

    /// Info dispatch: open the feature behind a top-page info item.
    pub async fn request_from_info(&mut self, item: &InfoItem) -> Result<Html> {
        log::debug!("info dispatch {:?}", item.name);
        let params: Vec<(&str, &str)> = vec![
            ("javax.faces.source", item.target_s.as_str()),
            ("javax.faces.partial.execute", item.target_s.as_str()),
            (item.target_s.as_str(), item.target_p.as_str()),
        ];
        self.request(FeatureKey::Top, "funcForm", &params).await
    }

    fn postback_url(&self, key: FeatureKey) -> Result<String> {
        if !self.logged_in {
            return Err(UnipaError::NotLoggedIn);
        }
        self.request_url(key)
            .ok_or_else(|| UnipaError::structure(format!("no action URL recorded for {key:?}")))
    }

    fn postback_params(&self, form: &str, extra: &[(&str, &str)]) -> Result<Vec<(String, String)>> {
        let token = self.token.as_ref().ok_or(UnipaError::NotLoggedIn)?;
        let mut params = token.form_params();
        params.push((form.to_string(), form.to_string()));
        for (name, value) in extra {
            upsert(&mut params, name, value);
        }
        Ok(params)
    }

    fn remember(&mut self, url: &str, status: StatusCode, body: String) {
        self.last_response = Some(LastResponse {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }
}

/// Harvest a login form's default parameters.
///
/// Every `input`'s name and value are taken, skipping entries with an
/// empty or missing name or value. Every `button` is taken as long as its
/// name is present; a missing value becomes the empty string, since
/// buttons participate in the form even with a blank value.
fn collect_form_params(form: &ElementRef<'_>) -> Vec<(String, String)> {
    let input_selector = Selector::parse("input").unwrap();
    let button_selector = Selector::parse("button").unwrap();

    let mut params = Vec::new();
    for input in form.select(&input_selector) {
        let Some(name) = input.value().attr("name") else {
            continue;
        };
        let Some(value) = input.value().attr("value") else {
            continue;
        };
        if name.is_empty() || value.is_empty() {
            continue;
        }
        upsert(&mut params, name, value);
    }
    for button in form.select(&button_selector) {
        let Some(name) = button.value().attr("name") else {
            continue;
        };
        let value = button.value().attr("value").unwrap_or("");
        upsert(&mut params, name, value);
    }
    params
}

/// The full parameter set of a login submission: form defaults with the
/// credential fields overwritten (or inserted).
fn build_login_params(
    form: &ElementRef<'_>,
    username: &str,
    password: &str,
) -> Vec<(String, String)> {
    let mut params = collect_form_params(form);
    upsert(&mut params, USER_ID_FIELD, username);
    upsert(&mut params, PASSWORD_FIELD, password);
    params
}

/// Replace an existing entry by name, or append one.
fn upsert(params: &mut Vec<(String, String)>, name: &str, value: &str) {
    match params.iter_mut().find(|(existing, _)| existing.as_str() == name) {
        Some((_, existing_value)) => *existing_value = value.to_string(),
        None => params.push((name.to_string(), value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Config;

    const LOGIN_PAGE: &str = r#"
        <html><body>
        <form id="loginForm" action="/up/faces/login/Com00501A.jsp">
            <input type="text" name="loginForm:userId" value="" />
            <input type="password" name="loginForm:password" value="" />
            <input type="hidden" name="csrf" value="abc123" />
            <input type="hidden" value="orphan" />
            <button name="loginForm:loginButton"></button>
        </form>
        </body></html>"#;

    fn login_form(document: &Html) -> ElementRef<'_> {
        let selector = Selector::parse("form#loginForm").unwrap();
        document.select(&selector).next().unwrap()
    }

    fn value_of<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_collect_form_params_skips_empty_inputs_keeps_buttons() {
        let document = Html::parse_document(LOGIN_PAGE);
        let params = collect_form_params(&login_form(&document));

        // Empty credential inputs and the nameless input are skipped; the
        // valueless button is kept with an empty value.
        assert_eq!(value_of(&params, "csrf"), Some("abc123"));
        assert_eq!(value_of(&params, "loginForm:loginButton"), Some(""));
        assert_eq!(value_of(&params, "loginForm:userId"), None);
        assert_eq!(value_of(&params, "loginForm:password"), None);
    }

    #[test]
    fn test_build_login_params_injects_credentials() {
        let document = Html::parse_document(LOGIN_PAGE);
        let params = build_login_params(&login_form(&document), "alice", "secret");

        assert_eq!(value_of(&params, "csrf"), Some("abc123"));
        assert_eq!(value_of(&params, "loginForm:userId"), Some("alice"));
        assert_eq!(value_of(&params, "loginForm:password"), Some("secret"));
        // No duplicate entries for the credential fields.
        assert_eq!(
            params
                .iter()
                .filter(|(n, _)| n == "loginForm:userId")
                .count(),
            1
        );
    }

    #[test]
    fn test_upsert_overwrites_in_place() {
        let mut params = vec![("a".to_string(), "1".to_string())];
        upsert(&mut params, "a", "2");
        upsert(&mut params, "b", "3");
        assert_eq!(params.len(), 2);
        assert_eq!(value_of(&params, "a"), Some("2"));
    }

    #[test]
    fn test_request_url_unset_then_recorded() {
        let mut client = UnipaClient::new("https://unipa.example.ac.jp/").unwrap();
        assert!(client.request_url(FeatureKey::BulletinBoard).is_none());

        let page = r#"<form id="headerForm" action="/up/faces/up/po/Poa00601A.jsp">
            <input name="rx-token" value="t"/><input name="rx-loginKey" value="k"/>
            <input name="rx-deviceKbn" value="1"/><input name="rx-loginType" value="g"/>
            <input name="javax.faces.ViewState" value="v"/></form>"#;
        let document = Html::parse_document(page);
        client
            .record_request_url(FeatureKey::BulletinBoard, &document)
            .unwrap();
        assert_eq!(
            client.request_url(FeatureKey::BulletinBoard).unwrap(),
            "https://unipa.example.ac.jp/up/faces/up/po/Poa00601A.jsp"
        );
        // Top stays unset; the registry never cross-fills keys.
        assert!(client.request_url(FeatureKey::Top).is_none());
    }

    #[test]
    fn test_postback_before_login_is_not_logged_in() {
        let client = UnipaClient::new("https://unipa.example.ac.jp/").unwrap();
        assert!(matches!(
            client.postback_url(FeatureKey::Top),
            Err(UnipaError::NotLoggedIn)
        ));
        assert!(matches!(
            client.postback_params("menuForm", &[]),
            Err(UnipaError::NotLoggedIn)
        ));
    }

    #[tokio::test]
    #[ignore = "requires config.json with live portal credentials"]
    async fn test_login_wrong_credentials_is_rejection_not_transport() {
        let config = Config::load("config.json").unwrap();
        let mut client = UnipaClient::new(&config.base_url).unwrap();
        let result = client.login("XXXXXXXX", "XXXXXXXX").await;
        assert!(matches!(result, Err(UnipaError::LoginRejected(_))));
    }

    #[tokio::test]
    #[ignore = "requires config.json with live portal credentials"]
    async fn test_login_populates_session_state() {
        let config = Config::load("config.json").unwrap();
        let mut client = UnipaClient::new(&config.base_url).unwrap();
        assert!(client.login(&config.username, &config.password).await.unwrap());
        assert!(client.is_logged_in());
        assert!(client.token().is_some());
        assert!(!client.nav_items().is_empty());
        assert!(client.request_url(FeatureKey::Top).is_some());
    }
}
