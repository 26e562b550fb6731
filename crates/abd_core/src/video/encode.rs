//! H.264 encoder arguments shared by both video modes.

use std::ffi::OsString;

/// Keyframe interval in frames. Scene-cut detection is off so every
/// chapter mark lands on a keyframe.
pub const KEYFRAME_INTERVAL: u32 = 48;

/// x264 settings for Blu-ray compatible H.264.
pub fn x264_args(fps: f64) -> Vec<OsString> {
    let gop = KEYFRAME_INTERVAL.to_string();
    [
        "-c:v".to_string(),
        "libx264".to_string(),
        "-profile:v".to_string(),
        "high".to_string(),
        "-level:v".to_string(),
        "4.1".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-r".to_string(),
        ffmpeg_rate(fps),
        "-g".to_string(),
        gop.clone(),
        "-keyint_min".to_string(),
        gop,
        "-sc_threshold".to_string(),
        "0".to_string(),
        "-x264-params".to_string(),
        format!(
            "keyint={0}:min-keyint={0}:scenecut=0",
            KEYFRAME_INTERVAL
        ),
    ]
    .into_iter()
    .map(OsString::from)
    .collect()
}

/// Frame rate as written in the mux descriptor (`23.976`, `24`).
pub fn format_fps(fps: f64) -> String {
    let rounded = (fps * 1000.0).round() / 1000.0;
    format!("{}", rounded)
}

/// Frame rate for ffmpeg, using exact NTSC rationals where they apply.
pub fn ffmpeg_rate(fps: f64) -> String {
    const NTSC: [(f64, &str); 3] = [
        (23.976, "24000/1001"),
        (29.97, "30000/1001"),
        (59.94, "60000/1001"),
    ];
    NTSC.iter()
        .find(|(approx, _)| (fps - approx).abs() < 0.005)
        .map(|(_, exact)| exact.to_string())
        .unwrap_or_else(|| format_fps(fps))
}

/// Seconds with millisecond precision for `-t` / `d=`.
pub fn format_seconds(secs: f64) -> String {
    format!("{:.3}", secs.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gop_is_fixed() {
        let args: Vec<String> = x264_args(24.0)
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        let joined = args.join(" ");
        assert!(joined.contains("-g 48 -keyint_min 48 -sc_threshold 0"));
        assert!(joined.contains("keyint=48:min-keyint=48:scenecut=0"));
        assert!(joined.contains("-profile:v high -level:v 4.1 -pix_fmt yuv420p"));
    }

    #[test]
    fn rates() {
        assert_eq!(format_fps(23.976), "23.976");
        assert_eq!(format_fps(24.0), "24");
        assert_eq!(ffmpeg_rate(23.976), "24000/1001");
        assert_eq!(ffmpeg_rate(25.0), "25");
        assert_eq!(format_seconds(61.5), "61.500");
    }
}
