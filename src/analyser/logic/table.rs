//! In-memory tabular container used by every analysis stage.
//!
//! A [`Table`] wraps a polars `DataFrame`. Records arrive dynamically typed
//! ([`Value`]) from the remote source; each column is stored as `Float64` when
//! every present cell is a number, as `String` as soon as one cell is text, and
//! as an all-null column when nothing is present. A text column only becomes
//! numeric when [`Table::coerce_numeric`] resolves it.
//!
//! Every operation borrows the table and returns a new one, so a caller that
//! holds a `Table` never observes a partially transformed version of it.

use super::types::{GroupAggregate, GroupCount};
use crate::error::{PaystatError, Result};
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashSet;

/// Name of the aggregated count column produced while grouping.
const DISTINCT_COUNT: &str = "__distinct_count";

/// A single cell.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Missing, Into::into)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Numeric,
    Text,
    Empty,
}

impl ColumnKind {
    pub fn of(series: &Series) -> Self {
        if series.null_count() == series.len() {
            Self::Empty
        } else if series.dtype().is_primitive_numeric() {
            Self::Numeric
        } else {
            Self::Text
        }
    }
}

/// Builds a typed series from dynamically typed cells. Numbers in a column
/// that also holds text are kept as their decimal text.
fn series_from_values(name: &str, values: &[Value]) -> Series {
    let has_text = values.iter().any(|v| matches!(v, Value::Text(_)));
    let has_number = values.iter().any(|v| matches!(v, Value::Number(_)));

    if has_text {
        let cells: Vec<Option<String>> = values
            .iter()
            .map(|v| match v {
                Value::Text(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Missing => None,
            })
            .collect();
        Series::new(name.into(), cells)
    } else if has_number {
        let cells: Vec<Option<f64>> = values.iter().map(Value::as_f64).collect();
        Series::new(name.into(), cells)
    } else {
        Series::full_null(name.into(), values.len(), &DataType::Null)
    }
}

/// Reads a series back as cells in row order.
///
/// # Errors
///
/// Returns `DataProcessing` if a numeric column cannot be cast to `Float64`.
fn series_values(series: &Series) -> Result<Vec<Value>> {
    let values = match series.dtype() {
        DataType::Null => vec![Value::Missing; series.len()],
        DataType::String => series
            .str()?
            .into_iter()
            .map(|cell| cell.map_or(Value::Missing, Value::text))
            .collect(),
        dtype if dtype.is_primitive_numeric() => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(Value::from)
            .collect(),
        _ => series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|cell| cell.map_or(Value::Missing, Value::text))
            .collect(),
    };
    Ok(values)
}

/// The same column as `String`, numbers rendered in their shortest decimal
/// form.
fn as_text(series: &Series) -> Result<Series> {
    let name = series.name().clone();
    let text = match series.dtype() {
        DataType::String => series.clone(),
        DataType::Null => Series::full_null(name, series.len(), &DataType::String),
        _ => series_values(series)?
            .into_iter()
            .map(|v| match v {
                Value::Number(n) => Some(n.to_string()),
                Value::Text(s) => Some(s),
                Value::Missing => None,
            })
            .collect::<StringChunked>()
            .with_name(name)
            .into_series(),
    };
    Ok(text)
}

/// Parses text as a number; text that does not parse is read again with
/// every character other than digits and `.` removed (`"$1,234.56"` reads
/// as `1234.56`). Non-finite results are missing.
fn numeric_reading(column: &str, dtype: &DataType) -> Expr {
    let number = if dtype.is_primitive_numeric() {
        col(column).cast(DataType::Float64)
    } else {
        let text = col(column).cast(DataType::String).str().strip_chars(lit(NULL));
        let digits = text
            .clone()
            .str()
            .replace_all(lit(r"[^0-9.]"), lit(""), false)
            .cast(DataType::Float64);
        text.cast(DataType::Float64).fill_null(digits)
    };
    when(number.clone().is_finite())
        .then(number)
        .otherwise(lit(NULL))
        .cast(DataType::Float64)
        .alias(column)
}

#[derive(Clone, Debug)]
pub struct Table {
    df: DataFrame,
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.column_names() == other.column_names() && self.df.equals_missing(&other.df)
    }
}

impl From<DataFrame> for Table {
    fn from(df: DataFrame) -> Self {
        Self { df }
    }
}

impl Table {
    /// Builds a table from named columns of equal length with distinct names.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the lengths differ or a name repeats.
    pub fn from_columns<N: Into<String>>(columns: Vec<(N, Vec<Value>)>) -> Result<Self> {
        let columns: Vec<(String, Vec<Value>)> = columns
            .into_iter()
            .map(|(name, values)| (name.into(), values))
            .collect();

        let mut seen = HashSet::new();
        for (name, _) in &columns {
            if !seen.insert(name.as_str()) {
                return Err(PaystatError::invalid_parameter(
                    "columns",
                    format!("duplicate column '{name}'"),
                ));
            }
        }
        if let Some((_, first)) = columns.first()
            && let Some((name, bad)) = columns.iter().find(|(_, v)| v.len() != first.len())
        {
            return Err(PaystatError::invalid_parameter(
                "columns",
                format!(
                    "column '{name}' has {} values, expected {}",
                    bad.len(),
                    first.len()
                ),
            ));
        }

        let series: Vec<Column> = columns
            .iter()
            .map(|(name, values)| Column::from(series_from_values(name, values)))
            .collect();
        Ok(Self {
            df: DataFrame::new(series)?,
        })
    }

    /// Builds a table from row-major data under the given header.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if a row's width differs from the header.
    pub fn from_rows(header: &[String], rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut columns: Vec<Vec<Value>> = header
            .iter()
            .map(|_| Vec::with_capacity(rows.len()))
            .collect();
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != header.len() {
                return Err(PaystatError::invalid_parameter(
                    "rows",
                    format!("row {i} has {} values, expected {}", row.len(), header.len()),
                ));
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }
        Self::from_columns(header.iter().cloned().zip(columns).collect())
    }

    pub fn empty() -> Self {
        Self {
            df: DataFrame::empty(),
        }
    }

    pub fn as_dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn width(&self) -> usize {
        self.df.width()
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.df
            .get_column_names()
            .into_iter()
            .map(PlSmallStr::as_str)
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.column(name).is_ok()
    }

    /// # Errors
    ///
    /// Returns `Schema` naming every requested column that is absent.
    pub fn require_columns(&self, names: &[&str]) -> Result<()> {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| !self.has_column(name))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PaystatError::schema(missing))
        }
    }

    /// # Errors
    ///
    /// Returns `Schema` if the column is absent.
    pub fn series(&self, name: &str) -> Result<&Series> {
        self.df
            .column(name)
            .ok()
            .map(Column::as_materialized_series)
            .ok_or_else(|| PaystatError::schema([name]))
    }

    /// Cells of `name` in row order.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if the column is absent.
    pub fn values(&self, name: &str) -> Result<Vec<Value>> {
        series_values(self.series(name)?)
    }

    /// # Errors
    ///
    /// Returns `Schema` if the column is absent.
    pub fn kind(&self, name: &str) -> Result<ColumnKind> {
        Ok(ColumnKind::of(self.series(name)?))
    }

    /// # Errors
    ///
    /// Returns `Schema` if the column is absent.
    pub fn missing_count(&self, name: &str) -> Result<usize> {
        Ok(self.series(name)?.null_count())
    }

    /// The numeric cells of `name` as `Float64`; a text column reads as all
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if the column is absent.
    pub fn numeric(&self, name: &str) -> Result<Float64Chunked> {
        let series = self.series(name)?;
        if series.dtype().is_primitive_numeric() {
            Ok(series.cast(&DataType::Float64)?.f64()?.clone())
        } else {
            Ok(Float64Chunked::full_null(series.name().clone(), series.len()))
        }
    }

    /// Present numeric values of `name` in row order.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if the column is absent.
    pub fn numbers(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.numeric(name)?.into_iter().flatten().collect())
    }

    /// All rows, each as cells in column order.
    ///
    /// # Errors
    ///
    /// Returns `DataProcessing` if a column cannot be read back.
    pub fn rows(&self) -> Result<Vec<Vec<Value>>> {
        let columns = self
            .df
            .get_columns()
            .iter()
            .map(|c| series_values(c.as_materialized_series()))
            .collect::<Result<Vec<_>>>()?;
        Ok((0..self.height())
            .map(|i| {
                columns
                    .iter()
                    .map(|c| c.get(i).cloned().unwrap_or(Value::Missing))
                    .collect()
            })
            .collect())
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> Self {
        Self {
            df: self.df.head(Some(n)),
        }
    }

    /// Stacks `tables` top to bottom in one pass. Tables without columns are
    /// skipped. A column that is text in any table becomes text throughout.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if two tables disagree on column names or order.
    pub fn concat(tables: Vec<Self>) -> Result<Self> {
        let frames: Vec<Self> = tables.into_iter().filter(|t| t.width() > 0).collect();
        let Some(first) = frames.first() else {
            return Ok(Self::empty());
        };
        let names: Vec<String> = first.column_names().into_iter().map(str::to_owned).collect();
        if let Some(other) = frames.iter().find(|t| t.column_names() != names) {
            return Err(first.shape_mismatch(other));
        }

        let text_columns: HashSet<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|name| {
                frames
                    .iter()
                    .filter_map(|t| t.series(name).ok())
                    .any(|s| s.dtype() == &DataType::String)
            })
            .collect();

        let mut stacked = first.unify(&names, &text_columns)?;
        for table in frames.iter().skip(1) {
            stacked.vstack_mut(&table.unify(&names, &text_columns)?)?;
        }
        Ok(Self::from(stacked))
    }

    /// Casts every column to the dtype the stacked result will carry.
    fn unify(&self, names: &[String], text_columns: &HashSet<&str>) -> Result<DataFrame> {
        let columns = names
            .iter()
            .map(|name| {
                let series = self.series(name)?;
                let cast = if text_columns.contains(name.as_str()) {
                    as_text(series)?
                } else {
                    series.cast(&DataType::Float64)?
                };
                Ok(Column::from(cast))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(DataFrame::new(columns)?)
    }

    fn shape_mismatch(&self, other: &Self) -> PaystatError {
        let missing: Vec<&str> = self
            .column_names()
            .into_iter()
            .filter(|name| !other.has_column(name))
            .collect();
        PaystatError::schema(if missing.is_empty() {
            other.column_names()
        } else {
            missing
        })
    }

    /// Keeps only the named columns, in the given order.
    ///
    /// # Errors
    ///
    /// Returns `Schema` listing every requested column that is absent.
    pub fn select(&self, names: &[&str]) -> Result<Self> {
        self.require_columns(names)?;
        Ok(Self {
            df: self.df.select(names.iter().copied())?,
        })
    }

    /// Keeps the rows for which `predicate` is true; a null predicate drops
    /// the row.
    ///
    /// # Errors
    ///
    /// Returns `DataProcessing` if polars rejects the expression.
    pub fn filter(&self, predicate: Expr) -> Result<Self> {
        Ok(Self {
            df: self.df.clone().lazy().filter(predicate).collect()?,
        })
    }

    /// Replaces every value of `column` with its numeric reading; values that
    /// cannot be read become missing. No rows are removed.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if the column is absent.
    pub fn coerce_numeric(&self, column: &str) -> Result<Self> {
        let dtype = self.series(column)?.dtype().clone();
        Ok(Self {
            df: self
                .df
                .clone()
                .lazy()
                .with_column(numeric_reading(column, &dtype))
                .collect()?,
        })
    }

    /// # Errors
    ///
    /// Returns `Schema` if the column is absent.
    pub fn drop_missing(&self, column: &str) -> Result<Self> {
        self.series(column)?;
        self.filter(col(column).is_not_null())
    }

    /// Keeps rows whose numeric value lies in `[min, max]`. A text column
    /// keeps nothing.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if the column is absent.
    pub fn filter_numeric_range(&self, column: &str, min: f64, max: f64) -> Result<Self> {
        if !self.series(column)?.dtype().is_primitive_numeric() {
            return Ok(Self {
                df: self.df.clear(),
            });
        }
        let value = col(column).cast(DataType::Float64);
        self.filter(value.clone().gt_eq(lit(min)).and(value.lt_eq(lit(max))))
    }

    /// Value at quantile `q` of the numeric values of `column`, linearly
    /// interpolated between the order statistics around `q * (n - 1)`.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if the column is absent, `InvalidParameter` if `q` is
    /// outside `[0, 1]` and `EmptyColumn` if it holds no numbers.
    pub fn percentile(&self, column: &str, q: f64) -> Result<f64> {
        let values = self.numeric(column)?;
        quantile(&values, q)?.ok_or_else(|| PaystatError::empty_column(column))
    }

    /// Applies `f` to every text value of `column`. A column without text is
    /// returned unchanged, and missing values stay missing.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if the column is absent.
    pub fn transform_text<F>(&self, column: &str, f: F) -> Result<Self>
    where
        F: Fn(&str) -> String,
    {
        let series = self.series(column)?;
        if series.dtype() != &DataType::String {
            return Ok(self.clone());
        }
        let mapped: StringChunked = series.str()?.into_iter().map(|cell| cell.map(&f)).collect();
        let mut df = self.df.clone();
        df.replace(column, mapped.with_name(series.name().clone()).into_series())?;
        Ok(Self { df })
    }

    /// Counts distinct `id_column` values per distinct `group_column` value.
    /// Groups are listed in order of first appearance; missing identifiers are
    /// not counted. Rows with a missing group value form their own group
    /// unless `drop_missing_group` is set.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if either column is absent.
    pub fn group_count_distinct(
        &self,
        group_column: &str,
        id_column: &str,
        drop_missing_group: bool,
    ) -> Result<GroupAggregate> {
        self.require_columns(&[group_column, id_column])?;

        let mut lf = self.df.clone().lazy();
        if drop_missing_group {
            lf = lf.filter(col(group_column).is_not_null());
        }
        let grouped = lf
            .group_by_stable([col(group_column)])
            .agg([col(id_column).drop_nulls().n_unique().alias(DISTINCT_COUNT)])
            .collect()?;

        let groups = series_values(grouped.column(group_column)?.as_materialized_series())?;
        let counts = grouped
            .column(DISTINCT_COUNT)?
            .as_materialized_series()
            .cast(&DataType::UInt64)?;

        Ok(GroupAggregate {
            group_column: group_column.to_owned(),
            id_column: id_column.to_owned(),
            groups: groups
                .into_iter()
                .zip(counts.u64()?.into_iter())
                .map(|(group, count)| GroupCount {
                    group,
                    count: count.unwrap_or(0) as usize,
                })
                .collect(),
        })
    }

    /// Keeps rows equal to `value`. Numeric text also matches the number it
    /// spells, so a typed identifier `"123"` finds a record whose id arrived
    /// as `123`. Missing never matches.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if the column is absent.
    pub fn filter_equals(&self, column: &str, value: &Value) -> Result<Self> {
        let dtype = self.series(column)?.dtype().clone();
        let predicate = match value {
            Value::Missing => None,
            _ if dtype.is_primitive_numeric() => {
                let needle = match value {
                    Value::Number(n) => Some(*n),
                    Value::Text(s) => s.trim().parse::<f64>().ok(),
                    Value::Missing => None,
                };
                needle.map(|n| col(column).cast(DataType::Float64).eq(lit(n)))
            }
            Value::Text(s) if dtype == DataType::String => Some(col(column).eq(lit(s.clone()))),
            Value::Number(n) if dtype == DataType::String => Some(
                col(column)
                    .str()
                    .strip_chars(lit(NULL))
                    .cast(DataType::Float64)
                    .eq(lit(*n)),
            ),
            _ => None,
        };
        match predicate {
            Some(predicate) => self.filter(predicate),
            None => Ok(Self {
                df: self.df.clear(),
            }),
        }
    }

    /// Keeps rows whose text value contains `needle`. Numbers and missing
    /// values never match.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if the column is absent.
    pub fn filter_contains(
        &self,
        column: &str,
        needle: &str,
        case_insensitive: bool,
    ) -> Result<Self> {
        if self.series(column)?.dtype() != &DataType::String {
            return Ok(Self {
                df: self.df.clear(),
            });
        }
        let predicate = if case_insensitive {
            col(column)
                .str()
                .to_lowercase()
                .str()
                .contains_literal(lit(needle.to_lowercase()))
        } else {
            col(column).str().contains_literal(lit(needle.to_owned()))
        };
        self.filter(predicate)
    }
}

/// Linear-interpolation quantile of the present values. `Ok(None)` when
/// nothing is present.
///
/// # Errors
///
/// Returns `InvalidParameter` if `q` is not within `[0, 1]`.
pub fn quantile(values: &Float64Chunked, q: f64) -> Result<Option<f64>> {
    if !(0.0..=1.0).contains(&q) {
        return Err(PaystatError::invalid_parameter(
            "quantile",
            format!("{q} is outside [0, 1]"),
        ));
    }
    Ok(values.quantile(q, QuantileMethod::Linear)?)
}
