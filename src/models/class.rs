// src/models/class.rs

//! Class schedule data structures.

/// Day and period a class is held at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LectureSlot {
    /// Day of week as displayed (月曜日 etc., or 集中講義 / 実習)
    pub day_of_week: String,
    /// Period number within the day, when the marker carries one
    pub period_of_time: Option<u32>,
}

/// A class entry from the class-profile schedule.
///
/// Created fresh on every schedule fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    /// Internal element id used by the portal
    pub internal_id: String,
    /// Display name of the class
    pub name: String,
    /// Human-visible class code, parsed from a trailing parenthesized
    /// alphanumeric group when present
    pub class_code: Option<String>,
    /// Day/period the class is held at
    pub lecture_at: LectureSlot,
}
