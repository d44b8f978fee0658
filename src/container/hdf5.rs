//! HDF5 container engine
//!
//! Writes to `<path>.partial` and renames into place on [`finish`]. A sink
//! dropped before `finish` removes its partial file, so an aborted run never
//! leaves a half-written container under the final name.
//!
//! [`finish`]: ContainerSink::finish

use std::path::{Path, PathBuf};

use hdf5::types::VarLenUnicode;
use hdf5::{File, Group};
use tracing::{debug, warn};

use super::{AttributeValue, ContainerFormat, ContainerSink, SampleDatasetSpec, StridedSelection};
use crate::paths::partial_path;
use crate::{ConvertError, Result};

/// Engine producing HDF5 files.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hdf5Format;

impl ContainerFormat for Hdf5Format {
    type Sink = Hdf5Container;

    fn create(&self, path: &Path, group: &str) -> Result<Hdf5Container> {
        let partial = partial_path(path);
        let file = File::create(&partial).map_err(|e| ConvertError::container_creation(path, e))?;

        let group = match file.create_group(group) {
            Ok(group) => group,
            Err(e) => {
                drop(file);
                let _ = std::fs::remove_file(&partial);
                return Err(ConvertError::container_creation(path, e));
            }
        };

        debug!("Opened container staging file {}", partial.display());
        Ok(Hdf5Container {
            final_path: path.to_path_buf(),
            partial_path: partial,
            group: Some(group),
            file: Some(file),
            committed: false,
        })
    }
}

/// An open HDF5 file scoped to one device group.
pub struct Hdf5Container {
    final_path: PathBuf,
    partial_path: PathBuf,
    group: Option<Group>,
    file: Option<File>,
    committed: bool,
}

impl Hdf5Container {
    fn group(&self) -> Result<&Group> {
        self.group.as_ref().ok_or_else(|| {
            ConvertError::container_write(
                self.final_path.display().to_string(),
                "container is closed",
            )
        })
    }
}

impl ContainerSink for Hdf5Container {
    type Output = PathBuf;

    fn write_attribute(&mut self, name: &str, value: &AttributeValue) -> Result<()> {
        let group = self.group()?;
        let written = match value {
            AttributeValue::Text(text) => {
                let text: VarLenUnicode =
                    text.parse().map_err(|e| ConvertError::container_write(name, e))?;
                group
                    .new_attr::<VarLenUnicode>()
                    .create(name)
                    .and_then(|attr| attr.write_scalar(&text))
            }
            AttributeValue::Float64(number) => {
                group.new_attr::<f64>().create(name).and_then(|attr| attr.write_scalar(number))
            }
        };
        written.map_err(|e| ConvertError::container_write(name, e))
    }

    fn create_sample_dataset(&mut self, spec: &SampleDatasetSpec<'_>) -> Result<()> {
        self.group()?
            .new_dataset::<i32>()
            .shape((spec.rows, spec.columns))
            .chunk(spec.chunk)
            .deflate(spec.deflate_level)
            .create(spec.name)
            .map(|_| ())
            .map_err(|e| ConvertError::dataset_creation(spec.name, e))
    }

    fn write_sample_column(
        &mut self,
        dataset: &str,
        column: usize,
        source: &[i32],
        selection: StridedSelection,
    ) -> Result<()> {
        // write_slice needs a standard-layout view, so the column is gathered first
        let values = selection.gather(source)?;
        self.group()?
            .dataset(dataset)
            .and_then(|ds| ds.write_slice(values.as_slice(), (.., column)))
            .map_err(|e| ConvertError::container_write(dataset, e))
    }

    fn write_u32_series(&mut self, name: &str, values: &[u32]) -> Result<()> {
        let ds = self
            .group()?
            .new_dataset::<u32>()
            .shape(values.len())
            .create(name)
            .map_err(|e| ConvertError::dataset_creation(name, e))?;
        ds.write(values).map_err(|e| ConvertError::container_write(name, e))
    }

    fn write_i64_series(&mut self, name: &str, values: &[i64]) -> Result<()> {
        let ds = self
            .group()?
            .new_dataset::<i64>()
            .shape(values.len())
            .create(name)
            .map_err(|e| ConvertError::dataset_creation(name, e))?;
        ds.write(values).map_err(|e| ConvertError::container_write(name, e))
    }

    fn finish(mut self) -> Result<PathBuf> {
        drop(self.group.take());
        if let Some(file) = self.file.take() {
            file.close().map_err(|e| {
                ConvertError::container_write(self.final_path.display().to_string(), e)
            })?;
        }

        std::fs::rename(&self.partial_path, &self.final_path)
            .map_err(|e| ConvertError::io(&self.final_path, e))?;
        self.committed = true;
        Ok(self.final_path.clone())
    }
}

impl Drop for Hdf5Container {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        drop(self.group.take());
        drop(self.file.take());
        if let Err(e) = std::fs::remove_file(&self.partial_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove {}: {}", self.partial_path.display(), e);
            }
        }
    }
}
