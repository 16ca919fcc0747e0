use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::Arc;

use super::{Field, FieldValue, Resource};
use crate::{repository::Repository, AppState};

/// Строка `seat_table`. Отсутствующие в JSON поля получают нулевые значения,
/// дальше `apply_defaults` подставляет размеры и цвета.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(default)]
pub struct Seat {
    pub auto_increment: i32,
    pub company_code: i32,
    pub seat_code: i32,
    pub seat_title: String,
    pub title_background_color: String,
    pub title_text_color: String,
    pub seat_background_color: String,
    pub seat_top: i32,
    pub seat_left: i32,
    pub seat_width: i32,
    pub seat_height: i32,
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

impl Resource for Seat {
    const PATH: &'static str = "seats";
    const TABLE: &'static str = "seat_table";
    const KEY: &'static str = "seat_code";
    const COLUMNS: &'static [&'static str] = &[
        "auto_increment", "company_code", "seat_code", "seat_title",
        "title_background_color", "title_text_color", "seat_background_color",
        "seat_top", "seat_left", "seat_width", "seat_height",
        "gender", "waiting", "release", "hide_title",
        "transparent_background", "hide_border", "kiosk_disabled",
        "power_control", "breaker_number",
    ];
    const FILTERS: &'static [&'static str] = &[
        "company_code", "seat_code", "gender", "waiting",
        "release", "kiosk_disabled", "power_control",
    ];
    const SEARCH_COLUMN: Option<&'static str> = Some("seat_title");
    const SORT_KEYS: &'static [&'static str] = &["seat_code", "seat_title", "auto_increment"];
    const DEFAULT_SORT: Option<&'static str> = Some("seat_code");
    const UPDATED_JOB: &'static str = "SeatUpdated";

    const NOT_FOUND: &'static str = "Место не найдено";
    const DUPLICATE: &'static str = "Место с таким seat_code уже существует";
    const INVALID_KEY: &'static str = "Некорректный seat_code";
    const KEY_MISMATCH: &'static str = "seat_code в URL и в теле запроса не совпадают";

    fn column(field: Field) -> &'static str {
        match field {
            Field::Title => "seat_title",
            Field::BackgroundColor => "seat_background_color",
            Field::Top => "seat_top",
            Field::Left => "seat_left",
            Field::Width => "seat_width",
            Field::Height => "seat_height",
            other => other.shared_column().unwrap_or_default(),
        }
    }

    fn key(&self) -> i32 {
        self.seat_code
    }

    fn field_value(&self, field: Field) -> FieldValue {
        use FieldValue::{Int, Text};
        match field {
            Field::CompanyCode => Int(self.company_code),
            Field::Title => Text(self.seat_title.clone()),
            Field::TitleBackgroundColor => Text(self.title_background_color.clone()),
            Field::TitleTextColor => Text(self.title_text_color.clone()),
            Field::BackgroundColor => Text(self.seat_background_color.clone()),
            Field::Top => Int(self.seat_top),
            Field::Left => Int(self.seat_left),
            Field::Width => Int(self.seat_width),
            Field::Height => Int(self.seat_height),
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
        if self.seat_width == 0 {
            self.seat_width = super::DEFAULT_WIDTH;
        }
        if self.seat_height == 0 {
            self.seat_height = super::DEFAULT_HEIGHT;
        }
        if self.seat_background_color.is_empty() {
            self.seat_background_color = super::DEFAULT_BACKGROUND_COLOR.to_string();
        }
        if self.title_background_color.is_empty() {
            self.title_background_color = super::DEFAULT_TITLE_BACKGROUND_COLOR.to_string();
        }
        if self.title_text_color.is_empty() {
            self.title_text_color = super::DEFAULT_TITLE_TEXT_COLOR.to_string();
        }
    }

    fn repository(state: &AppState) -> &Arc<dyn Repository<Self>> {
        &state.seats
    }
}
