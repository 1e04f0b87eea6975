// src/models/token.rs

//! Protocol token set.
//!
//! Every page the portal serves embeds `form#headerForm` with five hidden
//! fields the server expects back on every postback. The set is replaced
//! wholesale each time a response containing the form is parsed; a partial
//! set is useless, so extraction fails loudly on any missing field.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::error::{Result, UnipaError};

static HEADER_FORM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("form#headerForm").unwrap());

/// Hidden-field names the server round-trips on every request.
const FIELD_NAMES: [&str; 5] = [
    "rx-token",
    "rx-loginKey",
    "rx-deviceKbn",
    "rx-loginType",
    "javax.faces.ViewState",
];

/// The five opaque protocol tokens carried on every postback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSet {
    /// `rx-token` request token
    pub token: String,
    /// `rx-loginKey` login key
    pub login_key: String,
    /// `rx-deviceKbn` device kind
    pub device_kbn: String,
    /// `rx-loginType` login type
    pub login_type: String,
    /// `javax.faces.ViewState` view state, re-derived from each response
    pub view_state: String,
}

impl TokenSet {
    /// Extract a complete token set from a page containing `form#headerForm`.
    pub fn from_document(document: &Html) -> Result<Self> {
        let form = header_form(document)?;
        Ok(Self {
            token: hidden_value(&form, FIELD_NAMES[0])?,
            login_key: hidden_value(&form, FIELD_NAMES[1])?,
            device_kbn: hidden_value(&form, FIELD_NAMES[2])?,
            login_type: hidden_value(&form, FIELD_NAMES[3])?,
            view_state: hidden_value(&form, FIELD_NAMES[4])?,
        })
    }

    /// Wire form fields, in the order the portal's own pages emit them.
    pub fn form_params(&self) -> Vec<(String, String)> {
        vec![
            (FIELD_NAMES[0].to_string(), self.token.clone()),
            (FIELD_NAMES[1].to_string(), self.login_key.clone()),
            (FIELD_NAMES[2].to_string(), self.device_kbn.clone()),
            (FIELD_NAMES[3].to_string(), self.login_type.clone()),
            (FIELD_NAMES[4].to_string(), self.view_state.clone()),
        ]
    }
}

/// Locate `form#headerForm` in a page.
pub fn header_form(document: &Html) -> Result<ElementRef<'_>> {
    document
        .select(&HEADER_FORM)
        .next()
        .ok_or_else(|| UnipaError::structure("form#headerForm not found"))
}

/// The header form's action URL, relative to the portal base.
pub fn header_form_action(document: &Html) -> Result<String> {
    header_form(document)?
        .value()
        .attr("action")
        .map(str::to_string)
        .ok_or_else(|| UnipaError::structure("form#headerForm has no action attribute"))
}

fn hidden_value(form: &ElementRef<'_>, name: &str) -> Result<String> {
    let selector = Selector::parse(&format!(r#"input[name="{name}"]"#)).unwrap();
    form.select(&selector)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string)
        .ok_or_else(|| UnipaError::structure(format!("hidden field {name} missing from form#headerForm")))
}
