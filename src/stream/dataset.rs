use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use super::{is_corrupt, CorruptInterval, GroundTruthBlink, Sample, StreamSource};
use crate::config::StreamConfig;
use crate::error::{BlinkError, Result};
use crate::processing::filters::lowpass::lowpass;

/// Column layout of a recording, chosen from the dataset folder name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    /// EEG-VR / EEG-VV: comma separated, five header rows, timestamps rebuilt
    /// from the sample index.
    Headset,
    /// EEG-IO / EEG-MB: semicolon separated, one header row.
    Semicolon,
}

impl DatasetFormat {
    pub fn for_folder(folder: &Path) -> Self {
        let name = folder.to_string_lossy();
        if name.contains("EEG-IO") || name.contains("EEG-MB") {
            DatasetFormat::Semicolon
        } else {
            DatasetFormat::Headset
        }
    }

    fn delimiter(&self) -> u8 {
        match self {
            DatasetFormat::Headset => b',',
            DatasetFormat::Semicolon => b';',
        }
    }

    fn header_rows(&self) -> usize {
        match self {
            DatasetFormat::Headset => 5,
            DatasetFormat::Semicolon => 1,
        }
    }
}

/// A recorded session replayed sample by sample.
pub struct DatasetStream {
    samples: Vec<Sample>,
    corrupt_intervals: Vec<CorruptInterval>,
    blinks: Vec<GroundTruthBlink>,
    fs: f64,
    current_index: usize,
}

impl DatasetStream {
    /// Data files (`*_data*`) in `folder`, sorted by name.
    pub fn discover<P: AsRef<Path>>(folder: P) -> Result<Vec<PathBuf>> {
        let folder = folder.as_ref();
        if !folder.is_dir() {
            return Err(BlinkError::DatasetFolderNotFound(folder.to_path_buf()));
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(folder)? {
            let path = entry?.path();
            let is_data = path
                .file_name()
                .map_or(false, |name| name.to_string_lossy().contains("_data"));
            if path.is_file() && is_data {
                files.push(path);
            }
        }

        if files.is_empty() {
            return Err(BlinkError::NoDataFiles(folder.to_path_buf()));
        }
        files.sort();
        Ok(files)
    }

    /// Loads `data_path` and its sibling `_labels` file, low-pass filtering
    /// both channels.
    pub fn open<P: AsRef<Path>>(data_path: P, config: &StreamConfig) -> Result<Self> {
        let data_path = data_path.as_ref();
        if !data_path.is_file() {
            return Err(BlinkError::DataFileNotFound(data_path.to_path_buf()));
        }
        let labels_path = labels_path_for(data_path)?;
        if !labels_path.is_file() {
            return Err(BlinkError::DataFileNotFound(labels_path));
        }

        let format = data_path
            .parent()
            .map_or(DatasetFormat::Headset, DatasetFormat::for_folder);

        let mut samples = read_samples(File::open(data_path)?, data_path, format, config)?;

        let last_timestamp = samples.last().map_or(0.0, |s| s.timestamp);
        let (corrupt_intervals, blinks) =
            decode_labels(File::open(&labels_path)?, &labels_path, last_timestamp)?;

        let channel_a: Vec<f64> = samples.iter().map(|s| s.channel_a).collect();
        let channel_b: Vec<f64> = samples.iter().map(|s| s.channel_b).collect();
        let cutoff = config.lowpass_cutoff_hz;
        let order = config.lowpass_order;
        let filtered_a = lowpass(&channel_a, cutoff, config.fs, order)?;
        let filtered_b = lowpass(&channel_b, cutoff, config.fs, order)?;
        for ((sample, a), b) in samples.iter_mut().zip(filtered_a).zip(filtered_b) {
            sample.channel_a = a;
            sample.channel_b = b;
        }

        Ok(Self::from_parts(samples, corrupt_intervals, blinks, config.fs))
    }

    pub fn from_parts(
        samples: Vec<Sample>,
        corrupt_intervals: Vec<CorruptInterval>,
        blinks: Vec<GroundTruthBlink>,
        fs: f64,
    ) -> Self {
        Self {
            samples,
            corrupt_intervals,
            blinks,
            fs,
            current_index: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl StreamSource for DatasetStream {
    fn next_sample(&mut self) -> Option<Sample> {
        let sample = self.samples.get(self.current_index).copied()?;
        self.current_index += 1;
        Some(sample)
    }

    fn is_corrupt(&self, timestamp: f64) -> bool {
        is_corrupt(&self.corrupt_intervals, timestamp)
    }

    fn ground_truth_blinks(&self) -> &[GroundTruthBlink] {
        &self.blinks
    }

    fn sampling_rate(&self) -> f64 {
        self.fs
    }
}

fn labels_path_for(data_path: &Path) -> Result<PathBuf> {
    let file_name = data_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| BlinkError::DataFileNotFound(data_path.to_path_buf()))?;
    Ok(data_path.with_file_name(file_name.replace("_data", "_labels")))
}

fn parse_field(record: &csv::StringRecord, column: usize) -> std::result::Result<f64, String> {
    let field = record
        .get(column)
        .ok_or_else(|| format!("missing column {}", column))?;
    field
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("column {} ({:?}): {}", column, field, e))
}

/// Reads time, channel A and channel B from the first three columns.
pub fn read_samples<R: Read>(
    reader: R,
    path: &Path,
    format: DatasetFormat,
    config: &StreamConfig,
) -> Result<Vec<Sample>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(format.delimiter())
        .from_reader(reader);

    let mut samples = Vec::new();
    for (row, record) in rdr.records().enumerate().skip(format.header_rows()) {
        let record = record?;
        let parse = |column| {
            parse_field(&record, column).map_err(|reason| BlinkError::MalformedData {
                path: path.to_path_buf(),
                row,
                reason,
            })
        };
        samples.push(Sample::new(parse(0)?, parse(1)?, parse(2)?));
    }

    if format == DatasetFormat::Headset {
        let max_samples = (config.max_duration_s * config.fs) as usize + 1;
        samples.truncate(max_samples);
        for (i, sample) in samples.iter_mut().enumerate() {
            sample.timestamp = i as f64 / config.fs;
        }
    }

    Ok(samples)
}

/// Parses a label file: `corrupt,N` followed by N `start,end` rows (an end
/// of -1 runs to `last_timestamp`), then a `blinks` marker and
/// `timestamp,label` rows.
pub fn decode_labels<R: Read>(
    reader: R,
    path: &Path,
    last_timestamp: f64,
) -> Result<(Vec<CorruptInterval>, Vec<GroundTruthBlink>)> {
    let malformed = |reason: String| BlinkError::MalformedLabels {
        path: path.to_path_buf(),
        reason,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut corrupt_intervals = Vec::new();
    let mut blinks = Vec::new();
    let mut pending_corrupt = 0usize;

    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let first = record.get(0).map(str::trim).unwrap_or_default();

        if first == "corrupt" {
            let count = record
                .get(1)
                .map(str::trim)
                .unwrap_or_default()
                .parse::<usize>()
                .map_err(|e| malformed(format!("row {}: bad corrupt count: {}", row, e)))?;
            pending_corrupt = count;
        } else if first == "blinks" {
            if pending_corrupt != 0 {
                return Err(malformed(format!(
                    "row {}: {} corrupt intervals missing before blinks marker",
                    row, pending_corrupt
                )));
            }
        } else if pending_corrupt > 0 {
            let field = |column| {
                parse_field(&record, column).map_err(|e| malformed(format!("row {}: {}", row, e)))
            };
            let start = field(0)?;
            let end = field(1)?;
            let end = if end == -1.0 { last_timestamp } else { end };
            corrupt_intervals.push(CorruptInterval { start, end });
            pending_corrupt -= 1;
        } else {
            let timestamp =
                parse_field(&record, 0).map_err(|e| malformed(format!("row {}: {}", row, e)))?;
            let label = record
                .get(1)
                .map(str::trim)
                .unwrap_or_default()
                .parse::<i64>()
                .map_err(|e| malformed(format!("row {}: bad blink label: {}", row, e)))?;
            blinks.push(GroundTruthBlink { timestamp, label });
        }
    }

    if pending_corrupt != 0 {
        return Err(malformed(format!(
            "{} corrupt intervals missing at end of file",
            pending_corrupt
        )));
    }

    Ok((corrupt_intervals, blinks))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> PathBuf {
        PathBuf::from("S01_labels.csv")
    }

    #[test]
    fn test_decode_labels() {
        let labels = "corrupt,2\n10.5,12.0\n150.0,-1\nblinks\n3.2,0\n7.75,1\n9.0,2\n";
        let (corrupt, blinks) = decode_labels(labels.as_bytes(), &path(), 199.996).unwrap();

        assert_eq!(
            corrupt,
            vec![
                CorruptInterval {
                    start: 10.5,
                    end: 12.0
                },
                CorruptInterval {
                    start: 150.0,
                    end: 199.996
                },
            ]
        );
        assert_eq!(blinks.len(), 3);
        assert_eq!(blinks[1].timestamp, 7.75);
        assert_eq!(blinks[2].label, 2);
    }

    #[test]
    fn test_count_mismatch_is_fatal() {
        let labels = "corrupt,2\n10.5,12.0\nblinks\n3.2,0\n";
        assert!(matches!(
            decode_labels(labels.as_bytes(), &path(), 100.0),
            Err(BlinkError::MalformedLabels { .. })
        ));

        let labels = "corrupt,3\n1.0,2.0\n";
        assert!(matches!(
            decode_labels(labels.as_bytes(), &path(), 100.0),
            Err(BlinkError::MalformedLabels { .. })
        ));
    }

    #[test]
    fn test_no_corrupt_section() {
        let labels = "corrupt,0\nblinks\n1.5,0\n";
        let (corrupt, blinks) = decode_labels(labels.as_bytes(), &path(), 100.0).unwrap();
        assert!(corrupt.is_empty());
        assert_eq!(blinks.len(), 1);
    }

    #[test]
    fn test_headset_format_rebuilds_timestamps_and_truncates() {
        let mut data = String::from("h1\nh2\nh3\nh4\nh5\n");
        for i in 0..20 {
            data.push_str(&format!("{},{},{},99\n", 1000 + i, i, -i));
        }
        let config = StreamConfig {
            fs: 4.0,
            max_duration_s: 2.0,
            ..StreamConfig::default()
        };
        let samples =
            read_samples(data.as_bytes(), Path::new("x"), DatasetFormat::Headset, &config).unwrap();

        assert_eq!(samples.len(), 9);
        assert_eq!(samples[4].timestamp, 1.0);
        assert_eq!(samples[4].channel_a, 4.0);
        assert_eq!(samples[4].channel_b, -4.0);
    }

    #[test]
    fn test_semicolon_format_keeps_timestamps() {
        let data = "Time;Fp1;Fp2\n0.000;1.5;2.5\n0.004;1.0;2.0\n";
        let samples = read_samples(
            data.as_bytes(),
            Path::new("x"),
            DatasetFormat::Semicolon,
            &StreamConfig::default(),
        )
        .unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].timestamp, 0.004);
        assert_eq!(samples[0].channel_b, 2.5);
    }

    #[test]
    fn test_bad_sample_reports_row() {
        let data = "Time;Fp1;Fp2\n0.000;abc;2.5\n";
        let err = read_samples(
            data.as_bytes(),
            Path::new("x"),
            DatasetFormat::Semicolon,
            &StreamConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BlinkError::MalformedData { row: 1, .. }));
    }

    #[test]
    fn test_format_from_folder_name() {
        assert_eq!(
            DatasetFormat::for_folder(Path::new("/data/EEG-IO")),
            DatasetFormat::Semicolon
        );
        assert_eq!(
            DatasetFormat::for_folder(Path::new("/data/EEG-VR")),
            DatasetFormat::Headset
        );
    }

    #[test]
    fn test_missing_folder() {
        let missing = std::env::temp_dir().join("eyeblink-no-such-folder");
        assert!(matches!(
            DatasetStream::discover(&missing),
            Err(BlinkError::DatasetFolderNotFound(_))
        ));
    }

    #[test]
    fn test_stream_replays_in_order() {
        let samples = (0..3)
            .map(|i| Sample::new(i as f64, i as f64, 0.0))
            .collect();
        let mut stream = DatasetStream::from_parts(
            samples,
            vec![CorruptInterval {
                start: 1.0,
                end: 1.0,
            }],
            vec![],
            1.0,
        );
        assert_eq!(stream.next_sample().map(|s| s.timestamp), Some(0.0));
        assert!(stream.is_corrupt(1.0));
        assert_eq!(stream.next_sample().map(|s| s.timestamp), Some(1.0));
        assert_eq!(stream.next_sample().map(|s| s.timestamp), Some(2.0));
        assert_eq!(stream.next_sample(), None);
    }
}
