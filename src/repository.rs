use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::{Map, Value};
use sqlx::{
    postgres::{PgArguments, PgRow},
    query::Query,
    Column, Postgres, Row, TypeInfo,
};
use std::marker::PhantomData;
use std::time::Instant;
use tracing::{debug, info};

use crate::{
    database::Database,
    error::StoreError,
    models::{FieldValue, Resource},
    query::{self, ListQuery, UpdateSet},
};

/// Слой хранения для одного ресурса.
#[async_trait]
pub trait Repository<R: Resource>: Send + Sync {
    /// Строки списка как JSON-объекты с выбранными колонками.
    async fn list(&self, query: &ListQuery) -> Result<Vec<Map<String, Value>>, StoreError>;
    async fn get(&self, key: i32) -> Result<Option<R>, StoreError>;
    /// Вставка; возвращает запись с заполненным `auto_increment`.
    async fn insert(&self, record: &R) -> Result<R, StoreError>;
    /// Количество изменённых строк.
    async fn update(&self, key: i32, changes: &UpdateSet) -> Result<u64, StoreError>;
    async fn delete(&self, key: i32) -> Result<u64, StoreError>;
}

pub struct PgRepository<R> {
    db: Database,
    _resource: PhantomData<fn() -> R>,
}

impl<R> PgRepository<R> {
    pub fn new(db: Database) -> Self {
        Self { db, _resource: PhantomData }
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    args: Vec<FieldValue>,
) -> Query<'q, Postgres, PgArguments> {
    for arg in args {
        query = match arg {
            FieldValue::Int(v) => query.bind(v),
            FieldValue::Text(v) => query.bind(v),
        };
    }
    query
}

/// Как декодировать колонку списка.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Int2,
    Int4,
    Int8,
    Bool,
    Float4,
    Float8,
    Bytes,
    Text,
}

// Имя типа из sqlx -> способ декодирования. Всё незнакомое читается как текст.
fn column_kind(type_name: &str) -> ColumnKind {
    match type_name {
        "INT2" => ColumnKind::Int2,
        "INT4" => ColumnKind::Int4,
        "INT8" => ColumnKind::Int8,
        "BOOL" => ColumnKind::Bool,
        "FLOAT4" => ColumnKind::Float4,
        "FLOAT8" => ColumnKind::Float8,
        "BYTEA" => ColumnKind::Bytes,
        _ => ColumnKind::Text,
    }
}

fn bytes_to_json(bytes: &[u8]) -> Value {
    Value::from(String::from_utf8_lossy(bytes).into_owned())
}

/// Значение колонки по её типу в Postgres. BYTEA превращается в текст.
fn column_to_json(row: &PgRow, index: usize) -> Result<Value, sqlx::Error> {
    let value = match column_kind(row.columns()[index].type_info().name()) {
        ColumnKind::Int2 => row.try_get::<Option<i16>, _>(index)?.map(Value::from),
        ColumnKind::Int4 => row.try_get::<Option<i32>, _>(index)?.map(Value::from),
        ColumnKind::Int8 => row.try_get::<Option<i64>, _>(index)?.map(Value::from),
        ColumnKind::Bool => row.try_get::<Option<bool>, _>(index)?.map(Value::from),
        ColumnKind::Float4 => row.try_get::<Option<f32>, _>(index)?.map(Value::from),
        ColumnKind::Float8 => row.try_get::<Option<f64>, _>(index)?.map(Value::from),
        ColumnKind::Bytes => row.try_get::<Option<Vec<u8>>, _>(index)?.map(|b| bytes_to_json(&b)),
        ColumnKind::Text => row.try_get::<Option<String>, _>(index)?.map(Value::from),
    };
    Ok(value.unwrap_or(Value::Null))
}

fn row_to_map(row: &PgRow) -> Result<Map<String, Value>, sqlx::Error> {
    let mut map = Map::new();
    for (index, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), column_to_json(row, index)?);
    }
    Ok(map)
}

#[async_trait]
impl<R: Resource> Repository<R> for PgRepository<R> {
    async fn list(&self, query: &ListQuery) -> Result<Vec<Map<String, Value>>, StoreError> {
        let (sql, args) = query.to_sql();
        debug!("list query: {}, args: {:?}", sql, args);

        let mut rows = bind_all(sqlx::query(&sql), args).fetch(&self.db.pool);
        let mut result = Vec::new();
        while let Some(row) = rows.try_next().await? {
            result.push(row_to_map(&row)?);
        }
        Ok(result)
    }

    async fn get(&self, key: i32) -> Result<Option<R>, StoreError> {
        let sql = query::select_by_key_sql::<R>();
        let record = sqlx::query_as::<_, R>(&sql)
            .bind(key)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(record)
    }

    async fn insert(&self, record: &R) -> Result<R, StoreError> {
        let (sql, args) = query::insert_sql(record);
        info!("{} insert started: {:?}", R::TABLE, record);

        let started = Instant::now();
        let result = bind_all(sqlx::query(&sql), args)
            .fetch_one(&self.db.pool)
            .await;
        info!("{} insert took {:?}", R::TABLE, started.elapsed());

        let row = result.map_err(StoreError::classify)?;
        Ok(R::from_row(&row)?)
    }

    async fn update(&self, key: i32, changes: &UpdateSet) -> Result<u64, StoreError> {
        let (sql, args) = query::update_sql::<R>(changes, key);
        debug!("update query: {}, args: {:?}", sql, args);

        let result = bind_all(sqlx::query(&sql), args)
            .execute(&self.db.pool)
            .await
            .map_err(StoreError::classify)?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, key: i32) -> Result<u64, StoreError> {
        let sql = query::delete_sql::<R>();
        let result = sqlx::query(&sql)
            .bind(key)
            .execute(&self.db.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
