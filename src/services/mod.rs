//! Service layer for the portal client.
//!
//! This module contains the feature extractors:
//! - Navigation/info-item resolution (`navigation`)
//! - Bulletin board (`BulletinBoard`)
//! - Class schedule (`ClassSchedule`)

mod bulletin_board;
mod classes;
pub mod navigation;

pub use bulletin_board::BulletinBoard;
pub use classes::ClassSchedule;
