use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::core::message::{Role, TranscriptEntry};

/// Plain-text log of settled transcript entries.
pub struct LoggingState {
    file_path: Option<String>,
}

impl LoggingState {
    pub fn new(log_file: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        if let Some(path) = &log_file {
            test_file_access(path)?;
        }
        Ok(LoggingState {
            file_path: log_file,
        })
    }

    pub fn is_active(&self) -> bool {
        self.file_path.is_some()
    }

    /// Append entries in display form. Pending entries are skipped; they are
    /// logged once the response settles.
    pub fn log_entries<'a>(
        &self,
        entries: impl IntoIterator<Item = &'a TranscriptEntry>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let Some(file_path) = &self.file_path else {
            return Ok(());
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        let mut writer = BufWriter::new(file);

        for entry in entries.into_iter().filter(|entry| !entry.pending) {
            let text = entry_display(entry);
            if text.trim().is_empty() {
                continue;
            }
            for line in text.lines() {
                writeln!(writer, "{line}")?;
            }
            writeln!(writer)?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn get_status_string(&self) -> String {
        match &self.file_path {
            None => "disabled".to_string(),
            Some(path) => format!(
                "active ({})",
                Path::new(path)
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
            ),
        }
    }
}

fn entry_display(entry: &TranscriptEntry) -> String {
    if let Some(tool) = &entry.tool_interaction {
        return format!(
            "## {} {}: {}",
            tool.tool_name,
            tool.phase.as_str(),
            entry.text_content()
        );
    }
    match entry.role {
        Role::User => format!("You: {}", entry.text_content()),
        Role::System => format!("## {}", entry.text_content()),
        Role::Assistant | Role::Tool => entry.text_content(),
    }
}

fn test_file_access(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.flush()?;
    Ok(())
}
