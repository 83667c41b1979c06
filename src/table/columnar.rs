//! Arrow/Parquet export of a [`Table`]
//!
//! Column types are inferred from the JSON values:
//! - all non-null values numbers -> `Float64`
//! - all non-null values booleans -> `Boolean`
//! - anything else -> `Utf8` (strings verbatim, other values as compact JSON)
//!
//! Every field is nullable.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use parquet::arrow::ArrowWriter;
use serde_json::Value;
use tracing::info;

use super::Table;
use crate::Result;

impl Table {
    /// Convert to an Arrow record batch.
    ///
    /// # Errors
    ///
    /// Returns error if Arrow rejects the assembled columns.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) = self
            .columns()
            .iter()
            .map(|column| {
                let (data_type, array) = infer_array(column.values());
                (Field::new(column.name(), data_type, true), array)
            })
            .unzip();

        let options = RecordBatchOptions::new().with_row_count(Some(self.num_rows()));
        Ok(RecordBatch::try_new_with_options(
            Arc::new(Schema::new(fields)),
            arrays,
            &options,
        )?)
    }

    /// Write the table as a Parquet file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or Parquet encoding fails.
    pub fn write_parquet<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let batch = self.to_record_batch()?;
        let file = File::create(path.as_ref())?;

        let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
        writer.write(&batch)?;
        writer.close()?;

        info!(
            path = %path.as_ref().display(),
            rows = batch.num_rows(),
            columns = batch.num_columns(),
            "wrote parquet export"
        );
        Ok(())
    }
}

fn infer_array(values: &[Value]) -> (DataType, ArrayRef) {
    let mut present = values.iter().filter(|v| !v.is_null()).peekable();
    let has_values = present.peek().is_some();

    if has_values && values.iter().all(|v| v.is_null() || v.is_number()) {
        let array: Float64Array = values.iter().map(Value::as_f64).collect();
        return (DataType::Float64, Arc::new(array));
    }

    if has_values && values.iter().all(|v| v.is_null() || v.is_boolean()) {
        let array: BooleanArray = values.iter().map(Value::as_bool).collect();
        return (DataType::Boolean, Arc::new(array));
    }

    let array: StringArray = values
        .iter()
        .map(|v| match v {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .collect();
    (DataType::Utf8, Arc::new(array))
}
