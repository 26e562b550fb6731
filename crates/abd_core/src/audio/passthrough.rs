//! TrueHD / DTS-HD pass-through.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::{duration_or_probe, AudioRequest};
use crate::error::{BuildError, BuildResult};
use crate::models::{AudioItem, OutputCodec, PreparedAudio};
use crate::process::ProcessRunner;

/// How the single input reaches the disc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum PassthroughSource {
    /// Already a raw elementary stream.
    Raw(PathBuf),
    /// Stream to demux out of a container.
    Demux(PathBuf),
}

/// Decide how to carry the input, or reject it.
pub(super) fn classify(items: &[AudioItem], codec: OutputCodec) -> BuildResult<PassthroughSource> {
    if items.len() != 1 {
        return Err(BuildError::ExpectedSingleElementaryStream { count: items.len() });
    }
    let item = &items[0];

    if codec.raw_extensions().contains(&item.extension().as_str()) {
        return Ok(PassthroughSource::Raw(item.path.clone()));
    }
    if item.codec_name().contains(codec.probe_codec_marker()) {
        return Ok(PassthroughSource::Demux(item.path.clone()));
    }

    Err(match codec {
        OutputCodec::TrueHd => BuildError::expected_truehd(&item.path),
        OutputCodec::DtsHd => BuildError::expected_dtshd(&item.path),
        OutputCodec::Lpcm => BuildError::custom("LPCM is not a pass-through codec"),
    })
}

fn demux_args(source: &Path, target: &Path, muxer: &str) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-hide_banner", "-i"].map(OsString::from).to_vec();
    args.push(source.as_os_str().to_os_string());
    args.extend(["-map", "0:a:0", "-c:a", "copy", "-f", muxer].map(OsString::from));
    args.push(target.as_os_str().to_os_string());
    args
}

pub(super) fn prepare_passthrough(
    request: &AudioRequest<'_>,
    runner: &ProcessRunner,
) -> BuildResult<PreparedAudio> {
    let codec = request.codec;
    let stream = match classify(request.items, codec)? {
        PassthroughSource::Raw(path) => {
            tracing::info!("Passing {} through unchanged", path.display());
            path
        }
        PassthroughSource::Demux(source) => {
            fs::create_dir_all(request.work_dir)
                .map_err(|e| BuildError::io("creating audio work directory", e))?;
            let (muxer, extension) = codec.output_format();
            let target = request.work_dir.join(format!("audio.{}", extension));
            runner.run_checked("ffmpeg", request.ffmpeg, demux_args(&source, &target, muxer))?;
            target
        }
    };

    let duration = duration_or_probe(&request.items[0], &stream, request, runner)?;
    Ok(PreparedAudio::new(stream, codec, vec![duration]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AudioAttributes;

    fn item(path: &str, codec: Option<&str>) -> AudioItem {
        AudioItem::new(path).with_attributes(AudioAttributes {
            codec_name: codec.map(str::to_string),
            duration_secs: Some(300.0),
            ..Default::default()
        })
    }

    #[test]
    fn rejects_track_count_other_than_one() {
        for count in [0usize, 2, 3] {
            let items: Vec<_> = (0..count).map(|_| item("a.thd", None)).collect();
            let err = classify(&items, OutputCodec::TrueHd).unwrap_err();
            assert!(
                matches!(err, BuildError::ExpectedSingleElementaryStream { count: c } if c == count)
            );
        }
    }

    #[test]
    fn raw_extensions_pass_through() {
        assert_eq!(
            classify(&[item("/m/album.MLP", None)], OutputCodec::TrueHd).unwrap(),
            PassthroughSource::Raw(PathBuf::from("/m/album.MLP"))
        );
        assert_eq!(
            classify(&[item("/m/album.dtshd", None)], OutputCodec::DtsHd).unwrap(),
            PassthroughSource::Raw(PathBuf::from("/m/album.dtshd"))
        );
    }

    #[test]
    fn container_with_matching_codec_is_demuxed() {
        assert_eq!(
            classify(&[item("/m/concert.mkv", Some("TrueHD"))], OutputCodec::TrueHd).unwrap(),
            PassthroughSource::Demux(PathBuf::from("/m/concert.mkv"))
        );
        assert_eq!(
            classify(&[item("/m/concert.m2ts", Some("dts"))], OutputCodec::DtsHd).unwrap(),
            PassthroughSource::Demux(PathBuf::from("/m/concert.m2ts"))
        );
    }

    #[test]
    fn mismatched_extension_and_codec_rejected() {
        let err = classify(&[item("/m/song.flac", Some("flac"))], OutputCodec::TrueHd).unwrap_err();
        assert!(matches!(err, BuildError::ExpectedTrueHd { .. }));

        let err = classify(&[item("/m/song.thd", Some("truehd"))], OutputCodec::DtsHd).unwrap_err();
        assert!(matches!(err, BuildError::ExpectedDtsHd { .. }));
    }

    #[test]
    fn demux_args_stream_copy() {
        let args: Vec<String> = demux_args(Path::new("in.mkv"), Path::new("audio.thd"), "truehd")
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            args.join(" "),
            "-y -hide_banner -i in.mkv -map 0:a:0 -c:a copy -f truehd audio.thd"
        );
    }

    #[test]
    fn raw_stream_needs_no_tools() {
        use crate::process::{CancelToken, ProcessSupervisor};
        use std::sync::Arc;

        let items = [item("/m/album.thd", Some("truehd"))];
        let request = AudioRequest {
            items: &items,
            codec: OutputCodec::TrueHd,
            lpcm_format: None,
            work_dir: Path::new("/nonexistent"),
            ffmpeg: Path::new("/nonexistent/ffmpeg"),
            ffprobe: Path::new("/nonexistent/ffprobe"),
        };
        let runner = ProcessRunner::new(Arc::new(ProcessSupervisor::new()), CancelToken::new());
        let prepared = prepare_passthrough(&request, &runner).unwrap();
        assert_eq!(prepared.path, PathBuf::from("/m/album.thd"));
        assert_eq!(prepared.mux_token(), "A_AC3");
        assert_eq!(prepared.segment_durations, vec![300.0]);
    }
}
