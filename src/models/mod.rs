pub mod room;
pub mod seat;

pub use room::Room;
pub use seat::Seat;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sqlx::{postgres::PgRow, FromRow};
use std::fmt;
use std::sync::Arc;

use crate::{repository::Repository, AppState};

// Значения по умолчанию при создании
pub const DEFAULT_WIDTH: i32 = 100;
pub const DEFAULT_HEIGHT: i32 = 100;
pub const DEFAULT_BACKGROUND_COLOR: &str = "#FFFFFF";
pub const DEFAULT_TITLE_BACKGROUND_COLOR: &str = "#000000";
pub const DEFAULT_TITLE_TEXT_COLOR: &str = "#FFFFFF";

/// Поля, которые можно менять частичным обновлением.
/// Суррогатный ключ и бизнес-ключ сюда не входят.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    CompanyCode,
    Title,
    TitleBackgroundColor,
    TitleTextColor,
    BackgroundColor,
    Top,
    Left,
    Width,
    Height,
    Gender,
    Waiting,
    Release,
    HideTitle,
    TransparentBackground,
    HideBorder,
    KioskDisabled,
    PowerControl,
    BreakerNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Text,
}

impl Field {
    pub const ALL: [Field; 18] = [
        Field::CompanyCode,
        Field::Title,
        Field::TitleBackgroundColor,
        Field::TitleTextColor,
        Field::BackgroundColor,
        Field::Top,
        Field::Left,
        Field::Width,
        Field::Height,
        Field::Gender,
        Field::Waiting,
        Field::Release,
        Field::HideTitle,
        Field::TransparentBackground,
        Field::HideBorder,
        Field::KioskDisabled,
        Field::PowerControl,
        Field::BreakerNumber,
    ];

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Title
            | Field::TitleBackgroundColor
            | Field::TitleTextColor
            | Field::BackgroundColor => FieldKind::Text,
            _ => FieldKind::Int,
        }
    }

    /// Имя колонки для полей, одинаковых в обеих таблицах.
    /// Для полей с префиксом ресурса (`seat_*`, `room_*`) возвращает `None`.
    pub fn shared_column(self) -> Option<&'static str> {
        let name = match self {
            Field::CompanyCode => "company_code",
            Field::TitleBackgroundColor => "title_background_color",
            Field::TitleTextColor => "title_text_color",
            Field::Gender => "gender",
            Field::Waiting => "waiting",
            Field::Release => "release",
            Field::HideTitle => "hide_title",
            Field::TransparentBackground => "transparent_background",
            Field::HideBorder => "hide_border",
            Field::KioskDisabled => "kiosk_disabled",
            Field::PowerControl => "power_control",
            Field::BreakerNumber => "breaker_number",
            Field::Title
            | Field::BackgroundColor
            | Field::Top
            | Field::Left
            | Field::Width
            | Field::Height => return None,
        };
        Some(name)
    }
}

/// Типизированное значение поля, проверенное на границе.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i32),
    Text(String),
}

impl FieldValue {
    /// JSON числа допускаются только целые (в том числе `5.0`).
    pub fn from_json(kind: FieldKind, value: &Value) -> Option<Self> {
        match kind {
            FieldKind::Int => json_to_i32(value).map(FieldValue::Int),
            FieldKind::Text => value.as_str().map(|s| FieldValue::Text(s.to_string())),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Int(v) => Value::from(*v),
            FieldValue::Text(s) => Value::from(s.as_str()),
        }
    }
}

pub(crate) fn json_to_i32(value: &Value) -> Option<i32> {
    if let Some(i) = value.as_i64() {
        return i32::try_from(i).ok();
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64 {
        Some(f as i32)
    } else {
        None
    }
}

/// Описание таблицы-ресурса: колонки, ключ, фильтры и поведение при создании.
pub trait Resource:
    Serialize
    + DeserializeOwned
    + Default
    + Clone
    + fmt::Debug
    + Send
    + Sync
    + Unpin
    + for<'r> FromRow<'r, PgRow>
    + 'static
{
    /// Сегмент пути: `seats`, `rooms`.
    const PATH: &'static str;
    const TABLE: &'static str;
    /// Бизнес-ключ.
    const KEY: &'static str;
    /// Полный список колонок в порядке выдачи.
    const COLUMNS: &'static [&'static str];
    /// Целочисленные колонки, по которым фильтрует список (точное совпадение).
    const FILTERS: &'static [&'static str];
    const SEARCH_COLUMN: Option<&'static str>;
    const SORT_KEYS: &'static [&'static str];
    const DEFAULT_SORT: Option<&'static str>;
    /// Имя задачи, которая ставится в очередь после обновления.
    const UPDATED_JOB: &'static str;

    const NOT_FOUND: &'static str;
    const DUPLICATE: &'static str;
    const INVALID_KEY: &'static str;
    const KEY_MISMATCH: &'static str;

    fn column(field: Field) -> &'static str;
    fn key(&self) -> i32;
    fn field_value(&self, field: Field) -> FieldValue;
    fn apply_defaults(&mut self);
    fn repository(state: &AppState) -> &Arc<dyn Repository<Self>>;

    fn field_for_column(column: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| Self::column(*f) == column)
    }

    /// Колонки и значения для INSERT: бизнес-ключ плюс все изменяемые поля.
    fn insert_values(&self) -> Vec<(&'static str, FieldValue)> {
        let mut values = Vec::with_capacity(Field::ALL.len() + 1);
        values.push((Self::KEY, FieldValue::Int(self.key())));
        for field in Field::ALL {
            values.push((Self::column(field), self.field_value(field)));
        }
        values
    }
}
