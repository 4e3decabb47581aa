//! Activity entity model
//!
//! This module contains the SeaORM entity model for the `activity` table,
//! which stores daily commit counts and distinct authors per repository.
//!
//! On Postgres `authors` is a `text[]` column. SQLite has no array type, so
//! there the same column holds a JSON string array; [`insert_statement`]
//! encodes it for whichever backend it targets.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::{
    ArrayType, InsertStatement, Query, RcOrArc, SimpleExpr, ValueType, ValueTypeErr,
};
use sea_orm::{ColIdx, DbBackend, QueryResult, TryGetError, TryGetable};
use serde::{Deserialize, Serialize};

/// Distinct commit author names for one repository and day.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authors(pub Vec<String>);

impl Authors {
    /// The bind value for `backend`: a text array on Postgres, JSON text elsewhere.
    pub fn to_db_value(&self, backend: DbBackend) -> Value {
        match backend {
            DbBackend::Postgres => self.clone().into(),
            _ => {
                let json = serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string());
                Value::String(Some(Box::new(json)))
            }
        }
    }
}

impl From<Authors> for Value {
    fn from(authors: Authors) -> Self {
        let items = authors
            .0
            .into_iter()
            .map(|name| Value::String(Some(Box::new(name))))
            .collect();
        Value::Array(ArrayType::String, Some(Box::new(items)))
    }
}

impl TryGetable for Authors {
    fn try_get_by<I: ColIdx>(res: &QueryResult, idx: I) -> Result<Self, TryGetError> {
        match <Vec<String> as TryGetable>::try_get_by(res, idx) {
            Ok(names) => Ok(Authors(names)),
            Err(TryGetError::Null(col)) => Err(TryGetError::Null(col)),
            // Not a Postgres array; read the JSON text form.
            Err(TryGetError::DbErr(_)) => {
                let raw = <String as TryGetable>::try_get_by(res, idx)?;
                serde_json::from_str(&raw).map(Authors).map_err(|err| {
                    TryGetError::DbErr(DbErr::Type(format!("invalid authors value: {err}")))
                })
            }
        }
    }
}

impl ValueType for Authors {
    fn try_from(value: Value) -> Result<Self, ValueTypeErr> {
        match value {
            Value::Array(ArrayType::String, Some(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(Some(name)) => Ok(*name),
                    _ => Err(ValueTypeErr),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Authors),
            Value::String(Some(json)) => serde_json::from_str(&json)
                .map(Authors)
                .map_err(|_| ValueTypeErr),
            _ => Err(ValueTypeErr),
        }
    }

    fn type_name() -> String {
        "Authors".to_string()
    }

    fn array_type() -> ArrayType {
        ArrayType::String
    }

    fn column_type() -> ColumnType {
        ColumnType::Array(RcOrArc::new(ColumnType::Text))
    }
}

/// Daily activity for one repository
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "activity")]
pub struct Model {
    /// Repository full name in `owner/name` form
    #[sea_orm(primary_key, auto_increment = false)]
    pub repo: String,

    /// Calendar day (UTC) the commits were authored on
    #[sea_orm(primary_key, auto_increment = false)]
    pub date: Date,

    /// Number of commits authored on `date`
    pub commits: i32,

    pub authors: Authors,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Multi-row INSERT of `rows` with `authors` encoded for `backend`.
pub fn insert_statement(backend: DbBackend, rows: &[Model]) -> Result<InsertStatement, DbErr> {
    let mut insert = Query::insert();
    insert
        .into_table(Entity)
        .columns([Column::Repo, Column::Date, Column::Commits, Column::Authors]);

    for row in rows {
        insert
            .values([
                SimpleExpr::from(row.repo.clone()),
                SimpleExpr::from(row.date),
                SimpleExpr::from(row.commits),
                SimpleExpr::from(row.authors.to_db_value(backend)),
            ])
            .map_err(|err| DbErr::Custom(err.to_string()))?;
    }

    Ok(insert)
}
