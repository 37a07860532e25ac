use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::models::requests::GenerateContentRequest;

/// Log an outgoing request in verbose mode. The API key travels in a header
/// and is never printed.
pub fn log_request(url: &str, request: &GenerateContentRequest, verbose: bool) {
    if !verbose {
        return;
    }

    println!("\n{}", "═".repeat(80).bright_cyan());
    println!("{}", "🔍 HTTP REQUEST".bright_cyan().bold());
    println!("{}: {}", "URL".bright_yellow(), url);
    println!("\n{}", "Headers:".bright_yellow());
    println!("  Content-Type: application/json");
    println!("  x-goog-api-key: ***");

    println!("\n{}", "Request Body:".bright_yellow());
    match serde_json::to_string_pretty(&request) {
        Ok(json) => {
            // Truncate very long requests for readability
            if json.chars().count() > 5000 {
                let truncated: String = json.chars().take(5000).collect();
                println!("{}", truncated);
                println!(
                    "\n{}",
                    format!("... (truncated, total {} bytes)", json.len()).bright_black()
                );
            } else {
                println!("{}", json);
            }
        }
        Err(e) => println!("{}", format!("Error serializing request: {}", e).red()),
    }

    println!("{}", "═".repeat(80).bright_cyan());
    println!();
}

/// Log one raw SSE payload in verbose mode.
pub fn log_stream_chunk(chunk_number: usize, data: &str, verbose: bool) {
    if !verbose {
        return;
    }
    println!("{}", format!("── chunk {} ──", chunk_number).bright_black());
    println!("{}", data.bright_black());
}

#[derive(Serialize)]
struct LogEntry<'a> {
    timestamp: String, // ISO‑8601 UTC
    role: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

/// Appends one JSONL record per logged turn under `<storage>/logs/`.
pub struct ConversationLogger {
    file: File,
}

impl ConversationLogger {
    /// Create a new logger; generates the file name based on the current UTC time.
    pub fn new(storage_dir: &Path) -> Result<Self> {
        let logs_dir = storage_dir.join("logs");
        fs::create_dir_all(&logs_dir)?;

        let filename = format!("arkcom-{}.jsonl", Utc::now().format("%Y-%m-%d-%H%M%S"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(logs_dir.join(filename))?;
        Ok(Self { file })
    }

    /// Append a single log entry. Logging failures are reported, never fatal.
    pub fn log(&mut self, role: &str, content: &str, model: Option<&str>) {
        let entry = LogEntry {
            timestamp: Utc::now().to_rfc3339(),
            role,
            content,
            model,
        };
        if let Ok(json) = serde_json::to_string(&entry) {
            if let Err(e) = writeln!(self.file, "{}", json) {
                eprintln!("[Logging error] {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn logger_writes_jsonl_lines() {
        let dir = TempDir::new().unwrap();
        let mut logger = ConversationLogger::new(dir.path()).unwrap();
        logger.log("user", "hello", None);
        logger.log("model", "hi there", Some("gemini-2.5-flash"));

        let logs_dir = dir.path().join("logs");
        let entry = fs::read_dir(&logs_dir).unwrap().next().unwrap().unwrap();
        let contents = fs::read_to_string(entry.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"role\":\"user\""));
        assert!(lines[1].contains("gemini-2.5-flash"));
    }
}
