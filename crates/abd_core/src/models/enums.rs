//! Core enums used throughout the build.
//!
//! Each enum carries its behaviour as exhaustive `match` mappings so a new
//! variant cannot be added without updating every mapping site.

use serde::{Deserialize, Serialize};

/// Audio format written to the disc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputCodec {
    /// Uncompressed PCM, normalised from any source.
    #[default]
    Lpcm,
    /// Dolby TrueHD / Atmos elementary stream carried as-is.
    TrueHd,
    /// DTS-HD Master Audio elementary stream carried as-is.
    DtsHd,
}

impl OutputCodec {
    /// Codec token used on the audio line of the tsMuxeR descriptor.
    pub fn mux_token(&self) -> &'static str {
        match self {
            OutputCodec::Lpcm => "A_LPCM",
            OutputCodec::TrueHd => "A_AC3",
            OutputCodec::DtsHd => "A_DTS",
        }
    }

    /// File extensions that denote a raw elementary stream of this codec.
    pub fn raw_extensions(&self) -> &'static [&'static str] {
        match self {
            OutputCodec::Lpcm => &[],
            OutputCodec::TrueHd => &["thd", "truehd", "mlp"],
            OutputCodec::DtsHd => &["dtshd", "dts"],
        }
    }

    /// Substring that identifies this codec in an ffprobe `codec_name`.
    pub fn probe_codec_marker(&self) -> &'static str {
        match self {
            OutputCodec::Lpcm => "pcm",
            OutputCodec::TrueHd => "truehd",
            OutputCodec::DtsHd => "dts",
        }
    }

    /// ffmpeg muxer and extension for the demuxed/prepared stream.
    pub fn output_format(&self) -> (&'static str, &'static str) {
        match self {
            OutputCodec::Lpcm => ("wav", "wav"),
            OutputCodec::TrueHd => ("truehd", "thd"),
            OutputCodec::DtsHd => ("dts", "dtshd"),
        }
    }

    /// Whether this codec is carried without re-encoding.
    pub fn is_passthrough(&self) -> bool {
        match self {
            OutputCodec::Lpcm => false,
            OutputCodec::TrueHd | OutputCodec::DtsHd => true,
        }
    }

    /// Get the display name.
    pub fn name(&self) -> &'static str {
        match self {
            OutputCodec::Lpcm => "LPCM",
            OutputCodec::TrueHd => "TrueHD/Atmos (pass-through)",
            OutputCodec::DtsHd => "DTS-HD MA (pass-through)",
        }
    }
}

impl std::fmt::Display for OutputCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for OutputCodec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lpcm" | "pcm" => Ok(OutputCodec::Lpcm),
            "truehd" | "atmos" | "thd" => Ok(OutputCodec::TrueHd),
            "dtshd" | "dts-hd" | "dts" => Ok(OutputCodec::DtsHd),
            other => Err(format!("unknown output codec '{other}'")),
        }
    }
}

/// Target LPCM format all tracks are normalised to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LpcmFormat {
    #[default]
    #[serde(rename = "24/48")]
    Bits24Hz48000,
    #[serde(rename = "24/96")]
    Bits24Hz96000,
    #[serde(rename = "24/192")]
    Bits24Hz192000,
}

impl LpcmFormat {
    /// All supported formats, lowest rate first.
    pub const ALL: [LpcmFormat; 3] = [
        LpcmFormat::Bits24Hz48000,
        LpcmFormat::Bits24Hz96000,
        LpcmFormat::Bits24Hz192000,
    ];

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        match self {
            LpcmFormat::Bits24Hz48000 => 48_000,
            LpcmFormat::Bits24Hz96000 => 96_000,
            LpcmFormat::Bits24Hz192000 => 192_000,
        }
    }

    /// Bit depth (always 24 for disc LPCM here).
    pub fn bit_depth(&self) -> u8 {
        match self {
            LpcmFormat::Bits24Hz48000 | LpcmFormat::Bits24Hz96000 | LpcmFormat::Bits24Hz192000 => {
                24
            }
        }
    }

    /// Format with exactly this sample rate, if disc-legal.
    pub fn from_sample_rate(rate: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.sample_rate() == rate)
    }

    /// Pick a format for a set of source sample rates.
    ///
    /// The shared rate wins when every track has the same disc-legal rate;
    /// mixed, unknown or non-disc rates fall back to 48 kHz.
    pub fn for_sources(rates: &[Option<u32>]) -> Self {
        let mut known = rates.iter().copied();
        let first = match known.next() {
            Some(Some(rate)) => rate,
            _ => return LpcmFormat::Bits24Hz48000,
        };
        if known.all(|r| r == Some(first)) {
            Self::from_sample_rate(first).unwrap_or(LpcmFormat::Bits24Hz48000)
        } else {
            LpcmFormat::Bits24Hz48000
        }
    }
}

impl std::fmt::Display for LpcmFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-bit/{} kHz",
            self.bit_depth(),
            self.sample_rate() / 1000
        )
    }
}

impl std::str::FromStr for LpcmFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "48" | "48000" | "24/48" => Ok(LpcmFormat::Bits24Hz48000),
            "96" | "96000" | "24/96" => Ok(LpcmFormat::Bits24Hz96000),
            "192" | "192000" | "24/192" => Ok(LpcmFormat::Bits24Hz192000),
            other => Err(format!("unknown LPCM format '{other}'")),
        }
    }
}

/// Disc size budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DiscCapacity {
    #[default]
    #[serde(rename = "BD-25")]
    Bd25,
    #[serde(rename = "BD-50")]
    Bd50,
    #[serde(rename = "BD-100")]
    Bd100,
}

impl DiscCapacity {
    /// Byte budget for this disc size.
    pub fn bytes(&self) -> u64 {
        match self {
            DiscCapacity::Bd25 => 25_000_000_000,
            DiscCapacity::Bd50 => 50_000_000_000,
            DiscCapacity::Bd100 => 100_000_000_000,
        }
    }

    /// Whether `size` bytes overflows this disc.
    pub fn is_exceeded_by(&self, size: u64) -> bool {
        size > self.bytes()
    }
}

impl std::fmt::Display for DiscCapacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscCapacity::Bd25 => write!(f, "BD-25"),
            DiscCapacity::Bd50 => write!(f, "BD-50"),
            DiscCapacity::Bd100 => write!(f, "BD-100"),
        }
    }
}

impl std::str::FromStr for DiscCapacity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().trim_start_matches("BD-") {
            "25" => Ok(DiscCapacity::Bd25),
            "50" => Ok(DiscCapacity::Bd50),
            "100" => Ok(DiscCapacity::Bd100),
            other => Err(format!("unknown disc capacity '{other}'")),
        }
    }
}

/// How the video track is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoMode {
    /// A single black clip covering the whole program.
    #[default]
    BlackScreen,
    /// One rendered still per track (cover art + text).
    CustomFrames,
}

/// Background of a rendered still frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundMode {
    #[default]
    Solid,
    Gradient,
    Image,
}
