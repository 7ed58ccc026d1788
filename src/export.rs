//! Spreadsheet export: serialise tasks into an `.xlsx` workbook.
//!
//! One worksheet, one header row, one row per task:
//!
//! | Task ID | Title | Description | Estimated Time |
//! |---------|-------|-------------|----------------|
//!
//! Titles are passed through [`normalize_title`] again so a hand-edited task
//! list exports the same way a freshly analysed one does.

use crate::error::ExportError;
use crate::normalize::normalize_title;
use crate::output::Task;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::Path;
use tracing::{debug, info};

/// Sheet name used when no usable hint is given.
pub const DEFAULT_SHEET_NAME: &str = "Tasks";

/// Longest worksheet name the xlsx format accepts.
pub const MAX_SHEET_NAME_LEN: usize = 31;

const HEADERS: [&str; 4] = ["Task ID", "Title", "Description", "Estimated Time"];
const COLUMN_WIDTHS: [f64; 4] = [12.0, 40.0, 80.0, 16.0];

impl From<XlsxError> for ExportError {
    fn from(e: XlsxError) -> Self {
        ExportError::Workbook(e.to_string())
    }
}

/// Serialise `tasks` into the bytes of an `.xlsx` workbook.
///
/// # Errors
/// - [`ExportError::InvalidTasks`] for an empty list or a task with an empty
///   id, title or description
/// - [`ExportError::Workbook`] if the writer fails
pub fn serialize_to_spreadsheet(
    tasks: &[Task],
    sheet_hint: Option<&str>,
) -> Result<Vec<u8>, ExportError> {
    validate(tasks)?;
    let sheet_name = sanitize_sheet_name(sheet_hint);
    debug!("Exporting {} tasks to sheet '{}'", tasks.len(), sheet_name);

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(&sheet_name)?;

    let bold = Format::new().set_bold();
    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        sheet.set_column_width(col as u16, *width)?;
    }

    for (i, task) in tasks.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_string(row, 0, &task.id)?;
        sheet.write_string(row, 1, normalize_title(&task.title))?;
        sheet.write_string(row, 2, &task.description)?;
        sheet.write_string(row, 3, task.estimated_time.as_deref().unwrap_or(""))?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// Export `tasks` and write the workbook to `path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn export_to_file(
    tasks: &[Task],
    sheet_hint: Option<&str>,
    path: impl AsRef<Path>,
) -> Result<(), ExportError> {
    let path = path.as_ref();
    let bytes = serialize_to_spreadsheet(tasks, sheet_hint)?;
    let write_failed = |source| ExportError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("xlsx.tmp");
    tokio::fs::write(&tmp_path, &bytes).await.map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_failed)?;

    info!("Wrote {} tasks to {}", tasks.len(), path.display());
    Ok(())
}

/// Keep ASCII letters and digits, cap at [`MAX_SHEET_NAME_LEN`].
///
/// Falls back to [`DEFAULT_SHEET_NAME`] when nothing is left.
pub fn sanitize_sheet_name(hint: Option<&str>) -> String {
    let name: String = hint
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(MAX_SHEET_NAME_LEN)
        .collect();
    if name.is_empty() {
        DEFAULT_SHEET_NAME.to_string()
    } else {
        name
    }
}

fn validate(tasks: &[Task]) -> Result<(), ExportError> {
    if tasks.is_empty() {
        return Err(ExportError::InvalidTasks {
            reason: "task list is empty".into(),
        });
    }
    for (i, task) in tasks.iter().enumerate() {
        let missing = [
            ("id", &task.id),
            ("title", &task.title),
            ("description", &task.description),
        ]
        .into_iter()
        .find(|(_, v)| v.trim().is_empty());
        if let Some((field, _)) = missing {
            return Err(ExportError::InvalidTasks {
                reason: format!("task {} has an empty {}", i + 1, field),
            });
        }
    }
    Ok(())
}
