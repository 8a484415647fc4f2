use chrono::Local;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const LOG_DIR: &str = "logs";

fn log_path(filename: &str) -> io::Result<PathBuf> {
    let log_dir = Path::new(LOG_DIR);
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)?;
    }
    Ok(log_dir.join(filename))
}

/// Appends a timestamped entry to `logs/<filename>`.
pub fn log_to_file(filename: &str, message: &str) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path(filename)?)?;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    writeln!(file, "[{}] {}", timestamp, message)?;
    file.flush()?;

    Ok(())
}

/// Logs a message to a file with a detailed formatted header
///
/// # Arguments
///
/// * `filename` - The name of the log file
/// * `header` - A descriptive header for this log entry
/// * `message` - The message to log
pub fn log_with_header(filename: &str, header: &str, message: &str) -> io::Result<()> {
    let formatted_message = format!(
        "===== {} =====\n{}\n====================",
        header, message
    );
    log_to_file(filename, &formatted_message)
}

/// Appends a row to a CSV file under `logs/`, writing `headers` first when the
/// file is new.
pub fn log_csv(filename: &str, headers: &[&str], data: &[String]) -> io::Result<()> {
    let path = log_path(filename)?;
    let file_exists = path.exists();

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let mut writer = csv::Writer::from_writer(file);

    if !file_exists && !headers.is_empty() {
        writer.write_record(headers)?;
    }
    writer.write_record(data)?;
    writer.flush()?;

    Ok(())
}
