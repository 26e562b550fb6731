//! Metadata probing with ffprobe.
//!
//! Reads codec name, channel count, sample rate, bit depth and duration of
//! the first audio stream. Malformed or missing numbers read as 0 and are
//! exposed as `None`.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{BuildError, BuildResult};
use crate::logging::BuildLogger;
use crate::models::{AudioAttributes, AudioItem};
use crate::process::ProcessRunner;

/// ffprobe arguments placed before the input path.
pub const PROBE_ARGS: &[&str] = &[
    "-v",
    "error",
    "-select_streams",
    "a:0",
    "-show_entries",
    "stream=codec_name,channels,sample_rate,bits_per_raw_sample,bits_per_sample:format=duration",
    "-of",
    "json",
];

/// Probe one file.
pub fn probe_file(
    runner: &ProcessRunner,
    ffprobe: &Path,
    path: &Path,
) -> BuildResult<AudioAttributes> {
    if !path.exists() {
        return Err(BuildError::custom(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let mut args: Vec<std::ffi::OsString> = PROBE_ARGS.iter().map(Into::into).collect();
    args.push(path.as_os_str().to_os_string());

    let output = runner.run_checked("ffprobe", ffprobe, &args)?;
    parse_probe_json(output.stdout.as_bytes())
}

/// Parse ffprobe JSON output.
pub fn parse_probe_json(json: &[u8]) -> BuildResult<AudioAttributes> {
    let value: Value = serde_json::from_slice(json)
        .map_err(|e| BuildError::custom(format!("Invalid ffprobe output: {}", e)))?;

    let stream = value
        .get("streams")
        .and_then(|s| s.as_array())
        .and_then(|s| s.first());
    let format = value.get("format");

    let field = |obj: Option<&Value>, key: &str| obj.map(|o| number_field(o, key)).unwrap_or(0.0);

    let bits_raw = field(stream, "bits_per_raw_sample");
    let bits = if bits_raw > 0.0 {
        bits_raw
    } else {
        field(stream, "bits_per_sample")
    };

    let codec_name = stream
        .and_then(|s| s.get("codec_name"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(AudioAttributes {
        duration_secs: positive(field(format, "duration")),
        sample_rate: positive(field(stream, "sample_rate")).map(|r| r as u32),
        bit_depth: positive(bits).map(|b| b.min(u8::MAX as f64) as u8),
        channels: positive(field(stream, "channels")).map(|c| c.min(u8::MAX as f64) as u8),
        codec_name,
    })
}

/// Numeric field given either as a JSON number or a numeric string.
fn number_field(obj: &Value, key: &str) -> f64 {
    let value = match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    value.max(0.0)
}

fn positive(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Import files as audio items, probing each one.
///
/// A probe failure never fails the import: the item is kept with unknown
/// attributes and the failure is logged.
pub fn probe_items(
    runner: &ProcessRunner,
    ffprobe: &Path,
    paths: &[PathBuf],
    logger: Option<&BuildLogger>,
) -> Vec<AudioItem> {
    paths
        .iter()
        .map(|path| {
            let item = AudioItem::new(path.clone());
            match probe_file(runner, ffprobe, path) {
                Ok(attributes) => item.with_attributes(attributes),
                Err(e) => {
                    let message = format!("Probe failed for {}: {}", path.display(), e);
                    match logger {
                        Some(logger) => logger.warn(&message),
                        None => tracing::warn!("{}", message),
                    }
                    item
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flac_probe() {
        let json = br#"{
            "programs": [],
            "streams": [{
                "codec_name": "flac",
                "sample_rate": "96000",
                "channels": 2,
                "bits_per_sample": 0,
                "bits_per_raw_sample": "24"
            }],
            "format": { "duration": "245.333000" }
        }"#;
        let attrs = parse_probe_json(json).unwrap();
        assert_eq!(attrs.codec_name.as_deref(), Some("flac"));
        assert_eq!(attrs.sample_rate, Some(96_000));
        assert_eq!(attrs.bit_depth, Some(24));
        assert_eq!(attrs.channels, Some(2));
        assert!((attrs.duration_secs.unwrap() - 245.333).abs() < 1e-9);
    }

    #[test]
    fn bit_depth_falls_back_to_bits_per_sample() {
        let json = br#"{
            "streams": [{ "codec_name": "pcm_s16le", "sample_rate": "48000",
                          "channels": 2, "bits_per_sample": 16 }],
            "format": { "duration": "10.0" }
        }"#;
        let attrs = parse_probe_json(json).unwrap();
        assert_eq!(attrs.bit_depth, Some(16));
    }

    #[test]
    fn malformed_numbers_are_unknown() {
        let json = br#"{
            "streams": [{ "codec_name": "truehd", "sample_rate": "N/A", "channels": "x" }],
            "format": { "duration": "N/A" }
        }"#;
        let attrs = parse_probe_json(json).unwrap();
        assert_eq!(attrs.codec_name.as_deref(), Some("truehd"));
        assert_eq!(attrs.sample_rate, None);
        assert_eq!(attrs.channels, None);
        assert_eq!(attrs.duration_secs, None);
    }

    #[test]
    fn no_audio_stream() {
        let attrs = parse_probe_json(br#"{"streams": [], "format": {}}"#).unwrap();
        assert_eq!(attrs, AudioAttributes::default());
    }

    #[test]
    fn invalid_json_is_error() {
        assert!(parse_probe_json(b"not json").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn import_keeps_unprobeable_files() {
        use crate::process::{CancelToken, ProcessSupervisor};
        use crate::test_support::write_script;
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.flac");
        std::fs::write(&good, b"x").unwrap();
        let ffprobe = write_script(
            dir.path(),
            "ffprobe",
            r#"case "$*" in
  *good.flac*) echo '{"streams":[{"codec_name":"flac","sample_rate":"48000","channels":2}],"format":{"duration":"3.5"}}' ;;
  *) echo 'bad input' >&2; exit 1 ;;
esac"#,
        );

        let runner = ProcessRunner::new(Arc::new(ProcessSupervisor::new()), CancelToken::new());
        let items = probe_items(
            &runner,
            &ffprobe,
            &[good, dir.path().join("missing.flac")],
            None,
        );

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].duration_secs(), Some(3.5));
        assert!(!items[1].is_probed());
    }
}
