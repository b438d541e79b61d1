use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use image::Rgba;
use palette::Srgb;
use serde::Deserialize;
use serde::de::{self, Deserializer};

use crate::frames::FrameSource;
use crate::overlay::beats::{BeatAlign, TextBeat};
use crate::processing::layout::{CropSpec, FocalPoint};

/// `#RRGGBB` colour as written in the YAML file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor(pub Srgb<u8>);

impl HexColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(Srgb::new(r, g, b))
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.0.red, self.0.green, self.0.blue, 255])
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02X}{:02X}{:02X}",
            self.0.red, self.0.green, self.0.blue
        )
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Srgb::<u8>::from_str(raw.trim())
            .map(HexColor)
            .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(&raw), &"a #RRGGBB colour"))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct FramesConfig {
    /// Directory holding the numbered frame files.
    pub directory: PathBuf,
    /// Number of frames in the sequence.
    pub count: usize,
    /// Number used for the first file on disk (`00001.webp` → 1).
    pub first_number: usize,
    /// Zero-padded width of the file number.
    pub pad_width: usize,
    /// File extension, without the dot.
    pub extension: String,
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("public/frames"),
            count: 192,
            first_number: 1,
            pad_width: 5,
            extension: "webp".to_string(),
        }
    }
}

impl FramesConfig {
    pub fn file_name(&self, index: usize) -> String {
        format!(
            "{:0width$}.{}",
            index + self.first_number,
            self.extension,
            width = self.pad_width
        )
    }

    pub fn sources(&self) -> Vec<FrameSource> {
        (0..self.count)
            .map(|index| FrameSource {
                index,
                path: self.directory.join(self.file_name(index)),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CropConfig {
    pub top: f32,
    pub bottom: f32,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            top: 0.05,
            bottom: 0.08,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SpringConfig {
    pub stiffness: f64,
    pub damping: f64,
    pub mass: f64,
    /// Distance to the target under which the spring may come to rest.
    pub rest_delta: f64,
    /// Speed under which the spring may come to rest.
    pub rest_speed: f64,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            stiffness: 60.0,
            damping: 22.0,
            mass: 1.0,
            rest_delta: 0.0005,
            rest_speed: 0.01,
        }
    }
}

impl SpringConfig {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("stiffness", self.stiffness),
            ("damping", self.damping),
            ("mass", self.mass),
            ("rest-delta", self.rest_delta),
            ("rest-speed", self.rest_speed),
        ] {
            ensure!(
                value.is_finite() && value > 0.0,
                "spring.{name} must be a positive number"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ScrollConfig {
    /// Height of the scroll region as a multiple of the viewport height.
    pub height_multiple: f32,
    /// CSS pixels scrolled per mouse-wheel line.
    pub wheel_line_px: f32,
    /// CSS pixels scrolled per arrow key press.
    pub key_step_px: f32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            height_multiple: 4.0,
            wheel_line_px: 100.0,
            key_step_px: 40.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PortraitBackgroundConfig {
    pub opacity: f32,
    /// Long edge of the downsampled background, in pixels.
    pub sample_px: u32,
    /// Extra Gaussian blur applied to the downsampled background.
    pub sigma: f32,
}

impl Default for PortraitBackgroundConfig {
    fn default() -> Self {
        Self {
            opacity: 0.92,
            sample_px: 48,
            sigma: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ExitConfig {
    pub blur_from: f32,
    pub blur_to: f32,
    pub blur_max_px: f32,
    pub fade_from: f32,
    pub fade_to: f32,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            blur_from: 0.80,
            blur_to: 0.96,
            blur_max_px: 14.0,
            fade_from: 0.90,
            fade_to: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct LoadingConfig {
    #[serde(with = "humantime_serde")]
    pub fade_duration: Duration,
    #[serde(with = "humantime_serde")]
    pub ready_grace: Duration,
    /// One full turn of the spinner ring.
    #[serde(with = "humantime_serde")]
    pub spin_period: Duration,
    /// Title shown above the progress bar, upper-cased when drawn.
    pub label: String,
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self {
            fade_duration: Duration::from_millis(600),
            ready_grace: Duration::from_millis(700),
            spin_period: Duration::from_millis(750),
            label: "Loading Sahil's Portfolio…".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct NudgeConfig {
    #[serde(with = "humantime_serde")]
    pub idle_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub toggle_interval: Duration,
}

impl Default for NudgeConfig {
    fn default() -> Self {
        Self {
            idle_delay: Duration::from_secs(3),
            toggle_interval: Duration::from_millis(900),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Portfolio".to_string(),
            width: 1600,
            height: 900,
            fullscreen: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    pub frames: FramesConfig,
    /// Letterbox fractions trimmed from the top and bottom of every frame.
    pub crop: CropConfig,
    /// Anchor used when a landscape viewport crops the frame.
    pub focal_point: [f32; 2],
    /// Surface fill behind and around the frames.
    pub fog_color: HexColor,
    /// Colour the exit transition fades into.
    pub page_background: HexColor,
    /// Weight of the smoothed progress in the frame index blend.
    pub frame_blend: f32,
    pub spring: SpringConfig,
    pub scroll: ScrollConfig,
    pub portrait_background: PortraitBackgroundConfig,
    pub exit: ExitConfig,
    pub loading: LoadingConfig,
    pub nudge: NudgeConfig,
    /// Maximum number of concurrent frame decodes in the loader.
    pub loader_max_concurrent_decodes: usize,
    pub window: WindowConfig,
    pub beats: Vec<TextBeat>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            frames: FramesConfig::default(),
            crop: CropConfig::default(),
            focal_point: [0.5, 0.5],
            fog_color: HexColor::rgb(0xE8, 0xE8, 0xE8),
            page_background: HexColor::rgb(0xF5, 0xF5, 0xF7),
            frame_blend: 0.7,
            spring: SpringConfig::default(),
            scroll: ScrollConfig::default(),
            portrait_background: PortraitBackgroundConfig::default(),
            exit: ExitConfig::default(),
            loading: LoadingConfig::default(),
            nudge: NudgeConfig::default(),
            loader_max_concurrent_decodes: 8,
            window: WindowConfig::default(),
            beats: default_beats(),
        }
    }
}

fn default_beats() -> Vec<TextBeat> {
    vec![
        TextBeat::new(
            0.0,
            0.12,
            "Sahil's Portfolio.",
            "Engineered clarity.",
            BeatAlign::Center,
        ),
        TextBeat::new(
            0.22,
            0.37,
            "Built for Precision.",
            "Every detail, measured.",
            BeatAlign::Left,
        ),
        TextBeat::new(
            0.54,
            0.70,
            "Layered Engineering.",
            "See what's inside.",
            BeatAlign::Right,
        ),
        TextBeat::new(
            0.84,
            1.0,
            "Assembled. Ready.",
            "Scroll to explore.",
            BeatAlign::Center,
        ),
    ]
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(self.frames.count > 0, "frames.count must be greater than zero");
        ensure!(
            !self.frames.extension.trim().is_empty(),
            "frames.extension must not be empty"
        );
        ensure!(
            self.loader_max_concurrent_decodes > 0,
            "loader-max-concurrent-decodes must be greater than zero"
        );
        self.crop_spec().context("invalid crop configuration")?;
        ensure!(
            self.focal_point
                .iter()
                .all(|v| v.is_finite() && (0.0..=1.0).contains(v)),
            "focal-point components must lie in [0, 1]"
        );
        ensure!(
            self.frame_blend.is_finite() && (0.0..=1.0).contains(&self.frame_blend),
            "frame-blend must lie in [0, 1]"
        );
        self.spring.validate()?;
        ensure!(
            self.scroll.height_multiple.is_finite() && self.scroll.height_multiple > 1.0,
            "scroll.height-multiple must be greater than one"
        );
        ensure!(
            self.scroll.wheel_line_px > 0.0 && self.scroll.key_step_px > 0.0,
            "scroll step sizes must be positive"
        );
        let bg = &self.portrait_background;
        ensure!(
            (0.0..=1.0).contains(&bg.opacity),
            "portrait-background.opacity must lie in [0, 1]"
        );
        ensure!(
            bg.sample_px > 0,
            "portrait-background.sample-px must be greater than zero"
        );
        ensure!(
            bg.sigma.is_finite() && bg.sigma >= 0.0,
            "portrait-background.sigma must be non-negative"
        );
        let exit = &self.exit;
        ensure!(
            exit.blur_from < exit.blur_to,
            "exit.blur-from must be less than exit.blur-to"
        );
        ensure!(
            exit.fade_from < exit.fade_to,
            "exit.fade-from must be less than exit.fade-to"
        );
        ensure!(
            exit.blur_max_px.is_finite() && exit.blur_max_px >= 0.0,
            "exit.blur-max-px must be non-negative"
        );
        ensure!(
            !self.loading.spin_period.is_zero(),
            "loading.spin-period must be greater than zero"
        );
        ensure!(
            self.window.width > 0 && self.window.height > 0,
            "window dimensions must be positive"
        );
        for (i, beat) in self.beats.iter().enumerate() {
            beat.validate()
                .with_context(|| format!("invalid beat #{i}"))?;
        }
        Ok(self)
    }

    pub fn crop_spec(&self) -> Result<CropSpec> {
        CropSpec::new(self.crop.top, self.crop.bottom)
    }

    pub fn focal(&self) -> FocalPoint {
        FocalPoint::new(self.focal_point[0], self.focal_point[1])
    }

    pub fn frame_sources(&self) -> Vec<FrameSource> {
        self.frames.sources()
    }
}
