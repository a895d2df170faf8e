pub mod budget_pipeline;
pub mod tracking_pipeline;

pub use budget_pipeline::BudgetPipeline;
pub use tracking_pipeline::TrackingPipeline;

use crate::core::Storage;
use crate::utils::error::{EtlError, Result};
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

/// 固定時間戳，重跑時 ZIP 內容不變
pub(crate) fn bundle_files(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default().last_modified_time(zip::DateTime::default());
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for (name, data) in files {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(data)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// Write the rendered files, or a single ZIP named `bundle` holding them all.
/// Returns the location of the primary output.
pub(crate) fn write_outputs<S: Storage>(
    storage: &S,
    files: &[(String, Vec<u8>)],
    bundle: Option<String>,
) -> Result<String> {
    let primary = match bundle {
        Some(name) => {
            let zip_data = bundle_files(files)?;
            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            storage.write_file(&name, &zip_data)?;
            name
        }
        None => {
            for (name, data) in files {
                storage.write_file(name, data)?;
            }
            files
                .first()
                .map(|(name, _)| name.clone())
                .ok_or_else(|| EtlError::MissingConfigError {
                    field: "load.output_formats".to_string(),
                })?
        }
    };

    Ok(storage.location(&primary))
}
