use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::Arc;

use super::{Field, FieldValue, Resource};
use crate::{repository::Repository, AppState};

/// Строка `room_table`.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(default)]
pub struct Room {
    pub auto_increment: i32,
    pub company_code: i32,
    pub room_code: i32,
    pub room_title: String,
    pub title_background_color: String,
    pub title_text_color: String,
    pub room_background_color: String,
    pub room_top: i32,
    pub room_left: i32,
    pub room_width: i32,
    pub room_height: i32,
    pub gender: i32,
    pub waiting: i32,
    pub release: i32,
    pub hide_title: i32,
    pub transparent_background: i32,
    pub hide_border: i32,
    pub kiosk_disabled: i32,
    pub power_control: i32,
    pub breaker_number: i32,
}

impl Resource for Room {
    const PATH: &'static str = "rooms";
    const TABLE: &'static str = "room_table";
    const KEY: &'static str = "room_code";
    const COLUMNS: &'static [&'static str] = &[
        "auto_increment", "company_code", "room_code", "room_title",
        "title_background_color", "title_text_color", "room_background_color",
        "room_top", "room_left", "room_width", "room_height",
        "gender", "waiting", "release", "hide_title",
        "transparent_background", "hide_border", "kiosk_disabled",
        "power_control", "breaker_number",
    ];
    // Список комнат пока не фильтруется и не сортируется
    const FILTERS: &'static [&'static str] = &[];
    const SEARCH_COLUMN: Option<&'static str> = None;
    const SORT_KEYS: &'static [&'static str] = &[];
    const DEFAULT_SORT: Option<&'static str> = None;
    const UPDATED_JOB: &'static str = "RoomUpdated";

    const NOT_FOUND: &'static str = "Комната не найдена";
    const DUPLICATE: &'static str = "Комната с таким room_code уже существует";
    const INVALID_KEY: &'static str = "Некорректный room_code";
    const KEY_MISMATCH: &'static str = "room_code в URL и в теле запроса не совпадают";

    fn column(field: Field) -> &'static str {
        match field {
            Field::Title => "room_title",
            Field::BackgroundColor => "room_background_color",
            Field::Top => "room_top",
            Field::Left => "room_left",
            Field::Width => "room_width",
            Field::Height => "room_height",
            other => other.shared_column().unwrap_or_default(),
        }
    }

    fn key(&self) -> i32 {
        self.room_code
    }

    fn field_value(&self, field: Field) -> FieldValue {
        use FieldValue::{Int, Text};
        match field {
            Field::CompanyCode => Int(self.company_code),
            Field::Title => Text(self.room_title.clone()),
            Field::TitleBackgroundColor => Text(self.title_background_color.clone()),
            Field::TitleTextColor => Text(self.title_text_color.clone()),
            Field::BackgroundColor => Text(self.room_background_color.clone()),
            Field::Top => Int(self.room_top),
            Field::Left => Int(self.room_left),
            Field::Width => Int(self.room_width),
            Field::Height => Int(self.room_height),
            Field::Gender => Int(self.gender),
            Field::Waiting => Int(self.waiting),
            Field::Release => Int(self.release),
            Field::HideTitle => Int(self.hide_title),
            Field::TransparentBackground => Int(self.transparent_background),
            Field::HideBorder => Int(self.hide_border),
            Field::KioskDisabled => Int(self.kiosk_disabled),
            Field::PowerControl => Int(self.power_control),
            Field::BreakerNumber => Int(self.breaker_number),
        }
    }

    fn apply_defaults(&mut self) {
        if self.room_width == 0 {
            self.room_width = super::DEFAULT_WIDTH;
        }
        if self.room_height == 0 {
            self.room_height = super::DEFAULT_HEIGHT;
        }
        if self.room_background_color.is_empty() {
            self.room_background_color = super::DEFAULT_BACKGROUND_COLOR.to_string();
        }
        if self.title_background_color.is_empty() {
            self.title_background_color = super::DEFAULT_TITLE_BACKGROUND_COLOR.to_string();
        }
        if self.title_text_color.is_empty() {
            self.title_text_color = super::DEFAULT_TITLE_TEXT_COLOR.to_string();
        }
    }

    fn repository(state: &AppState) -> &Arc<dyn Repository<Self>> {
        &state.rooms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_explicit_colors() {
        let mut room: Room = serde_json::from_str(
            r##"{"room_code": 3, "room_title": "VIP", "room_background_color": "#FF0000"}"##,
        )
        .unwrap();
        room.apply_defaults();
        assert_eq!((room.room_width, room.room_height), (100, 100));
        assert_eq!(room.room_background_color, "#FF0000");
        assert_eq!(room.title_background_color, "#000000");
    }

    #[test]
    fn prefixed_fields_use_room_columns() {
        assert_eq!(Room::column(Field::Title), "room_title");
        assert_eq!(Room::column(Field::Width), "room_width");
        assert_eq!(Room::column(Field::Gender), "gender");
        assert_eq!(Room::field_for_column("seat_title"), None);
        assert_eq!(Room::field_for_column("room_code"), None);
    }

    #[test]
    fn list_capabilities_are_empty() {
        assert!(Room::FILTERS.is_empty());
        assert!(Room::SORT_KEYS.is_empty());
        assert_eq!(Room::SEARCH_COLUMN, None);
        assert_eq!(Room::DEFAULT_SORT, None);
    }
}
