//! Parquet persistence for [`FrozenTable`]s.

use super::*;
use crate::data::io::{canonicalize_input_path, expand_output_path};
use arrow::{
    array::{ArrayRef, Float32Array, Float64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter};
use std::{fs::File, sync::Arc};

/// Default number of rows in each written record batch.
pub const DEFAULT_WRITE_BATCH_SIZE: usize = 10_000;

/// Precision for writing floating-point columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FloatPrecision {
    /// 32-bit floats.
    F32,
    /// 64-bit floats.
    #[default]
    F64,
}

impl FloatPrecision {
    fn data_type(&self) -> DataType {
        match self {
            FloatPrecision::F32 => DataType::Float32,
            FloatPrecision::F64 => DataType::Float64,
        }
    }

    fn array(&self, values: &[f64]) -> ArrayRef {
        match self {
            FloatPrecision::F32 => Arc::new(Float32Array::from(
                values.iter().map(|v| *v as f32).collect::<Vec<_>>(),
            )),
            FloatPrecision::F64 => Arc::new(Float64Array::from(values.to_vec())),
        }
    }
}

/// Options for writing a [`FrozenTable`] to disk.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteOptions {
    /// Number of rows to include in each batch when writing.
    pub batch_size: usize,
    /// Floating-point precision to use for persisted columns.
    pub precision: FloatPrecision,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_WRITE_BATCH_SIZE,
            precision: FloatPrecision::default(),
        }
    }
}

impl WriteOptions {
    /// Override the batch size used for writing; defaults to 10_000.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Select the floating-point precision for persisted columns.
    pub fn precision(mut self, precision: FloatPrecision) -> Self {
        self.precision = precision;
        self
    }
}

fn write_columns(
    columns: &[(Column, &[f64])],
    file_path: &str,
    options: &WriteOptions,
) -> TpnResult<usize> {
    let path = expand_output_path(file_path)?;
    let batch_size = options.batch_size.max(1);
    let precision = options.precision;
    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(column, _)| Field::new(column.name(), precision.data_type(), false))
            .collect::<Vec<_>>(),
    ));
    let n_rows = columns.first().map_or(0, |(_, values)| values.len());
    let file = File::create(&path)?;
    let mut writer = ArrowWriter::try_new(file, schema.clone(), None)?;
    let mut start = 0usize;
    while start < n_rows {
        let end = (start + batch_size).min(n_rows);
        let arrays = columns
            .iter()
            .map(|(_, values)| precision.array(&values[start..end]))
            .collect::<Vec<_>>();
        let batch = RecordBatch::try_new(schema.clone(), arrays)?;
        writer.write(&batch)?;
        start = end;
    }
    writer.close()?;
    info!(path = %path.display(), n_rows, "wrote parquet file");
    Ok(n_rows)
}

/// Persist the aligned columns of a [`FrozenTable`] to a Parquet file.
pub fn write_parquet(table: &FrozenTable, file_path: &str, options: &WriteOptions) -> TpnResult<()> {
    let columns = table.aligned_columns().collect::<Vec<_>>();
    write_columns(&columns, file_path, options)?;
    Ok(())
}

/// Persist each hit-energy pool to its own single-column Parquet file.
pub fn write_hit_pools_parquet(
    table: &FrozenTable,
    ecal_file_path: &str,
    hcal_file_path: &str,
    options: &WriteOptions,
) -> TpnResult<()> {
    for (column, file_path) in [
        (Column::EcalHitEnergy, ecal_file_path),
        (Column::HcalHitEnergy, hcal_file_path),
    ] {
        write_columns(&[(column, table.column(column))], file_path, options)?;
    }
    Ok(())
}

fn extend_from_array(values: &mut Vec<f64>, column: Column, array: &ArrayRef) -> TpnResult<()> {
    let downcast_error = || TpnError::InvalidColumnType {
        name: column.to_string(),
        datatype: array.data_type().to_string(),
    };
    match array.data_type() {
        DataType::Float64 => {
            let array = array
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(downcast_error)?;
            values.extend(array.values().iter().copied());
        }
        DataType::Float32 => {
            let array = array
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(downcast_error)?;
            values.extend(array.values().iter().map(|v| *v as f64));
        }
        _ => return Err(downcast_error()),
    }
    Ok(())
}

fn read_columns(file_path: &str, wanted: &[Column]) -> TpnResult<IndexMap<Column, Vec<f64>>> {
    let path = canonicalize_input_path(file_path)?;
    let file = File::open(&path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    for column in wanted {
        let field = builder
            .schema()
            .field_with_name(column.name())
            .map_err(|_| TpnError::MissingColumn {
                name: column.to_string(),
            })?;
        if !matches!(field.data_type(), DataType::Float32 | DataType::Float64) {
            return Err(TpnError::InvalidColumnType {
                name: column.to_string(),
                datatype: field.data_type().to_string(),
            });
        }
    }
    let total_rows = builder.metadata().file_metadata().num_rows() as usize;
    let mut columns: IndexMap<Column, Vec<f64>> = wanted
        .iter()
        .map(|column| (*column, Vec::with_capacity(total_rows)))
        .collect();
    for batch in builder.build()? {
        let batch = batch?;
        for (column, values) in columns.iter_mut() {
            let array = batch
                .column_by_name(column.name())
                .ok_or_else(|| TpnError::MissingColumn {
                    name: column.to_string(),
                })?;
            extend_from_array(values, *column, array)?;
        }
    }
    info!(path = %path.display(), n_rows = total_rows, "read parquet file");
    Ok(columns)
}

/// Load the aligned columns of a table written by [`write_parquet`]. The returned table has
/// empty hit-energy pools; use [`read_hit_pool_parquet`] to recover those.
pub fn read_parquet(file_path: &str) -> TpnResult<FrozenTable> {
    let columns = read_columns(file_path, &Column::ALIGNED)?;
    FrozenTable::from_columns(columns, Vec::new(), Vec::new())
}

/// Load one hit-energy pool written by [`write_hit_pools_parquet`].
pub fn read_hit_pool_parquet(file_path: &str, column: Column) -> TpnResult<Vec<f64>> {
    let mut columns = read_columns(file_path, &[column])?;
    Ok(columns.swap_remove(&column).unwrap_or_default())
}
