// src/models/mod.rs

//! Domain models for the portal client.
//!
//! This module contains all data structures used throughout the client,
//! organized by their primary purpose.

mod bulletin;
mod class;
mod config;
mod fixture;
mod nav;
mod token;

// Re-export all public types
pub use bulletin::{AttachedFile, BulletinDetails, BulletinItem, PublicationPeriod};
pub use class::{ClassEntry, LectureSlot};
pub use config::Config;
pub use fixture::{
    best_match, BulletinDetailsExpectation, BulletinListExpectation, Fixture,
    PublicationPeriodExpectation,
};
pub use nav::{InfoItem, NavItem, NavMenu};
pub use token::{header_form, header_form_action, TokenSet};
