//! query.rs
//!
//! Построение параметризованных SELECT/INSERT/UPDATE/DELETE для ресурсов.
//!
//! В текст запроса попадают только имена колонок из фиксированных списков
//! ресурса. Все значения пользователя идут через плейсхолдеры `$n`.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::error::ApiError;
use crate::models::{json_to_i32, FieldValue, Field, Resource};

/// Набор изменяемых полей для частичного обновления.
pub type UpdateSet = BTreeMap<Field, FieldValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub direction: Direction,
}

/// Запрос списка: выбранные колонки, фильтры, поиск и сортировка.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub table: &'static str,
    pub fields: Vec<&'static str>,
    pub filters: Vec<(&'static str, i32)>,
    /// Колонка и исходная строка поиска (без `%`).
    pub search: Option<(&'static str, String)>,
    pub order: Option<Order>,
}

/// Пересечение запрошенных полей со списком разрешённых.
/// Если не совпало ни одно поле - возвращается весь список.
pub fn select_fields(allowed: &'static [&'static str], header: Option<&str>) -> Vec<&'static str> {
    let mut fields: Vec<&'static str> = Vec::new();
    if let Some(header) = header {
        for requested in header.split(',').map(str::trim) {
            if let Some(column) = allowed.iter().copied().find(|c| *c == requested) {
                if !fields.contains(&column) {
                    fields.push(column);
                }
            }
        }
    }
    if fields.is_empty() {
        allowed.to_vec()
    } else {
        fields
    }
}

/// `sort=col` или `sort=-col`. Неизвестный ключ - без ORDER BY,
/// пустой или отсутствующий параметр - сортировка ресурса по умолчанию.
pub fn parse_sort<R: Resource>(sort: Option<&str>) -> Option<Order> {
    match sort.filter(|s| !s.is_empty()) {
        None => R::DEFAULT_SORT.map(|column| Order { column, direction: Direction::Asc }),
        Some(sort) => {
            let (key, direction) = match sort.strip_prefix('-') {
                Some(key) => (key, Direction::Desc),
                None => (sort, Direction::Asc),
            };
            R::SORT_KEYS
                .iter()
                .copied()
                .find(|k| *k == key)
                .map(|column| Order { column, direction })
        }
    }
}

impl ListQuery {
    pub fn build<R: Resource>(fields_header: Option<&str>, params: &HashMap<String, String>) -> Self {
        let fields = select_fields(R::COLUMNS, fields_header);

        let mut filters = Vec::new();
        for column in R::FILTERS {
            let Some(raw) = params.get(*column).filter(|v| !v.is_empty()) else {
                continue;
            };
            match raw.trim().parse::<i32>() {
                Ok(value) => filters.push((*column, value)),
                Err(_) => tracing::warn!("ignoring non-numeric filter {}={:?}", column, raw),
            }
        }

        let search = R::SEARCH_COLUMN.and_then(|column| {
            params
                .get("search")
                .filter(|s| !s.is_empty())
                .map(|s| (column, s.clone()))
        });

        let order = parse_sort::<R>(params.get("sort").map(String::as_str));

        ListQuery { table: R::TABLE, fields, filters, search, order }
    }

    pub fn to_sql(&self) -> (String, Vec<FieldValue>) {
        let mut sql = format!("SELECT {} FROM {}", self.fields.join(", "), self.table);
        let mut conditions = Vec::new();
        let mut args = Vec::new();

        for (column, value) in &self.filters {
            args.push(FieldValue::Int(*value));
            conditions.push(format!("{} = ${}", column, args.len()));
        }
        if let Some((column, term)) = &self.search {
            args.push(FieldValue::Text(format!("%{}%", escape_like(term))));
            conditions.push(format!("{} LIKE ${}", column, args.len()));
        }

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        if let Some(order) = &self.order {
            sql.push_str(&format!(" ORDER BY {} {}", order.column, order.direction.as_sql()));
        }
        (sql, args)
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Разбор тела PUT в типизированный набор полей.
///
/// Порядок проверок: бизнес-ключ в теле должен совпадать с ключом из пути
/// (и затем удаляется), пустое тело отклоняется, неизвестные поля
/// пропускаются, значения проверяются по типу колонки, пустой итоговый
/// набор отклоняется.
pub fn parse_update<R: Resource>(path_key: i32, mut body: Map<String, Value>) -> Result<UpdateSet, ApiError> {
    if let Some(value) = body.remove(R::KEY) {
        match json_to_i32(&value) {
            Some(key) if key == path_key => {}
            Some(_) => return Err(ApiError::BadRequest(R::KEY_MISMATCH.to_string())),
            None => return Err(ApiError::BadRequest(R::INVALID_KEY.to_string())),
        }
    }
    if body.is_empty() {
        return Err(ApiError::BadRequest("Нет полей для обновления".to_string()));
    }

    let mut set = UpdateSet::new();
    for (name, value) in &body {
        let Some(field) = R::field_for_column(name) else {
            continue;
        };
        let value = FieldValue::from_json(field.kind(), value)
            .ok_or_else(|| ApiError::BadRequest(format!("Некорректное значение поля {}", name)))?;
        set.insert(field, value);
    }
    if set.is_empty() {
        return Err(ApiError::BadRequest("Нет допустимых полей для обновления".to_string()));
    }
    Ok(set)
}

/// `UPDATE t SET a = $1, b = $2 WHERE key = $3` и значения в том же порядке.
/// Ключ всегда последний параметр.
pub fn update_sql<R: Resource>(set: &UpdateSet, key: i32) -> (String, Vec<FieldValue>) {
    let mut assignments = Vec::with_capacity(set.len());
    let mut args = Vec::with_capacity(set.len() + 1);
    for (field, value) in set {
        args.push(value.clone());
        assignments.push(format!("{} = ${}", R::column(*field), args.len()));
    }
    args.push(FieldValue::Int(key));
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ${}",
        R::TABLE,
        assignments.join(", "),
        R::KEY,
        args.len()
    );
    (sql, args)
}

pub fn insert_sql<R: Resource>(record: &R) -> (String, Vec<FieldValue>) {
    let values = record.insert_values();
    let columns: Vec<&str> = values.iter().map(|(c, _)| *c).collect();
    let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("${}", i)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        R::TABLE,
        columns.join(", "),
        placeholders.join(", "),
        R::COLUMNS.join(", ")
    );
    (sql, values.into_iter().map(|(_, v)| v).collect())
}

pub fn select_by_key_sql<R: Resource>() -> String {
    format!("SELECT {} FROM {} WHERE {} = $1", R::COLUMNS.join(", "), R::TABLE, R::KEY)
}

pub fn delete_sql<R: Resource>() -> String {
    format!("DELETE FROM {} WHERE {} = $1", R::TABLE, R::KEY)
}
