//! In-memory container engine
//!
//! Mirrors the HDF5 layout with plain Rust collections. Useful for dry runs,
//! inspecting a conversion without libhdf5, and tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{AttributeValue, ContainerFormat, ContainerSink, SampleDatasetSpec, StridedSelection};
use crate::{ConvertError, Result};

/// Dataset contents, row-major.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetValues {
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
}

impl DatasetValues {
    pub fn len(&self) -> usize {
        match self {
            DatasetValues::I32(v) => v.len(),
            DatasetValues::U32(v) => v.len(),
            DatasetValues::I64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryDataset {
    pub shape: Vec<usize>,
    /// Chunk shape, `None` for contiguous storage
    pub chunk: Option<(usize, usize)>,
    pub deflate_level: Option<u8>,
    pub values: DatasetValues,
}

impl MemoryDataset {
    /// Copy out one column of a two-dimensional `i32` dataset.
    pub fn column_i32(&self, column: usize) -> Option<Vec<i32>> {
        let (DatasetValues::I32(values), [_, columns]) = (&self.values, self.shape.as_slice())
        else {
            return None;
        };
        if column >= *columns {
            return None;
        }
        Some(values.iter().skip(column).step_by(*columns).copied().collect())
    }
}

/// A container held in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryContainer {
    pub path: PathBuf,
    pub group: String,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub datasets: BTreeMap<String, MemoryDataset>,
}

impl MemoryContainer {
    fn insert_dataset(&mut self, name: &str, dataset: MemoryDataset) -> Result<()> {
        if self.datasets.contains_key(name) {
            return Err(ConvertError::dataset_creation(name, "name already exists in group"));
        }
        self.datasets.insert(name.to_string(), dataset);
        Ok(())
    }
}

/// Engine producing [`MemoryContainer`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryFormat;

impl ContainerFormat for MemoryFormat {
    type Sink = MemoryContainer;

    fn create(&self, path: &Path, group: &str) -> Result<MemoryContainer> {
        if group.is_empty() {
            return Err(ConvertError::container_creation(path, "group name is empty"));
        }
        Ok(MemoryContainer {
            path: path.to_path_buf(),
            group: group.to_string(),
            ..Default::default()
        })
    }
}

impl ContainerSink for MemoryContainer {
    type Output = MemoryContainer;

    fn write_attribute(&mut self, name: &str, value: &AttributeValue) -> Result<()> {
        if self.attributes.contains_key(name) {
            return Err(ConvertError::container_write(name, "attribute already exists"));
        }
        self.attributes.insert(name.to_string(), value.clone());
        Ok(())
    }

    fn create_sample_dataset(&mut self, spec: &SampleDatasetSpec<'_>) -> Result<()> {
        let (chunk_rows, chunk_columns) = spec.chunk;
        if chunk_rows == 0 || chunk_columns == 0 {
            return Err(ConvertError::dataset_creation(
                spec.name,
                "chunk dimensions must be non-zero",
            ));
        }
        if chunk_rows > spec.rows || chunk_columns > spec.columns {
            return Err(ConvertError::dataset_creation(
                spec.name,
                format!(
                    "chunk {:?} exceeds fixed shape ({}, {})",
                    spec.chunk, spec.rows, spec.columns
                ),
            ));
        }

        self.insert_dataset(
            spec.name,
            MemoryDataset {
                shape: vec![spec.rows, spec.columns],
                chunk: Some(spec.chunk),
                deflate_level: Some(spec.deflate_level),
                values: DatasetValues::I32(vec![0; spec.rows * spec.columns]),
            },
        )
    }

    fn write_sample_column(
        &mut self,
        dataset: &str,
        column: usize,
        source: &[i32],
        selection: StridedSelection,
    ) -> Result<()> {
        let target = self
            .datasets
            .get_mut(dataset)
            .ok_or_else(|| ConvertError::container_write(dataset, "dataset does not exist"))?;

        let (DatasetValues::I32(values), &[rows, columns]) =
            (&mut target.values, target.shape.as_slice())
        else {
            return Err(ConvertError::container_write(dataset, "not a two-dimensional i32 dataset"));
        };
        if column >= columns {
            return Err(ConvertError::container_write(
                dataset,
                format!("column {} out of range (0..{})", column, columns),
            ));
        }
        if selection.count != rows {
            return Err(ConvertError::container_write(
                dataset,
                format!("selection of {} elements for {} rows", selection.count, rows),
            ));
        }

        let slots = values.iter_mut().skip(column).step_by(columns);
        for (slot, value) in slots.zip(selection.iter(source)?) {
            *slot = value;
        }
        Ok(())
    }

    fn write_u32_series(&mut self, name: &str, values: &[u32]) -> Result<()> {
        self.insert_dataset(
            name,
            MemoryDataset {
                shape: vec![values.len()],
                chunk: None,
                deflate_level: None,
                values: DatasetValues::U32(values.to_vec()),
            },
        )
    }

    fn write_i64_series(&mut self, name: &str, values: &[i64]) -> Result<()> {
        self.insert_dataset(
            name,
            MemoryDataset {
                shape: vec![values.len()],
                chunk: None,
                deflate_level: None,
                values: DatasetValues::I64(values.to_vec()),
            },
        )
    }

    fn finish(self) -> Result<MemoryContainer> {
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(rows: usize, chunk: (usize, usize)) -> SampleDatasetSpec<'static> {
        SampleDatasetSpec { name: "data_a", rows, columns: 3, chunk, deflate_level: 6 }
    }

    #[test]
    fn strided_column_writes_fill_the_matrix() {
        let mut sink = MemoryFormat.create(Path::new("m.gp5"), "G").expect("create");
        sink.create_sample_dataset(&spec(2, (2, 1))).expect("dataset");

        let interleaved = [10, 11, 12, 13, 20, 21, 22, 23];
        // order of column writes is immaterial
        for column in [2, 0, 1] {
            let selection = StridedSelection::channel(column, 2);
            sink.write_sample_column("data_a", column, &interleaved, selection)
                .expect("column write");
        }

        let container = sink.finish().expect("finish");
        assert_eq!(
            container.datasets["data_a"].values,
            DatasetValues::I32(vec![10, 11, 12, 20, 21, 22])
        );
    }

    #[test]
    fn invalid_layouts_are_rejected() {
        let mut sink = MemoryFormat.create(Path::new("m.gp5"), "G").expect("create");
        assert!(sink.create_sample_dataset(&spec(10, (20, 1))).is_err());
        assert!(sink.create_sample_dataset(&spec(10, (0, 1))).is_err());

        sink.create_sample_dataset(&spec(2, (2, 1))).expect("dataset");
        assert!(sink.create_sample_dataset(&spec(2, (2, 1))).is_err());
        assert!(
            sink.write_sample_column("data_a", 3, &[0; 8], StridedSelection::channel(0, 2)).is_err()
        );
        assert!(
            sink.write_sample_column("data_a", 0, &[0; 8], StridedSelection::channel(0, 1)).is_err()
        );
        assert!(
            sink.write_sample_column("missing", 0, &[0; 8], StridedSelection::channel(0, 2))
                .is_err()
        );

        assert!(MemoryFormat.create(Path::new("m.gp5"), "").is_err());
    }
}
