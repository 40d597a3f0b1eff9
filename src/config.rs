//! Startup configuration.
//!
//! [`Config`] holds raw user values exactly as given: from defaults, then an
//! optional JSON file (`--config`), then command-line flags. Nothing is
//! validated at that stage. [`Config::normalize`] turns it into [`Settings`],
//! replacing non-positive or out-of-range values with defaults.
//!
//! Numeric flag values are read leniently: a value that is not a number
//! counts as 0 and is then normalized like any other non-positive value.

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::controller::LifecycleSettings;
use crate::emitter::Emitter;
use crate::error::ConfigError;
use crate::export::default_encoder;
use crate::gravity::Gravity;

pub const DEFAULT_WORLD_SIZE: i64 = 200;
/// Replacement for a non-positive world dimension.
pub const FALLBACK_WORLD_SIZE: i64 = 150;
pub const DEFAULT_CAPACITY: i64 = 26_000;
pub const DEFAULT_DESTROY_DELAY: i64 = 120;
pub const DEFAULT_REVERSE_DELAY: i64 = 60;
pub const DEFAULT_EMISSION: i64 = 15;
pub const DEFAULT_FPS: i64 = 30;
pub const DEFAULT_THREADS: i64 = 10;
pub const DEFAULT_SUB_STEPS: i64 = 8;
pub const DEFAULT_WINDOW: i64 = 1000;

/// Duration of one simulation frame in seconds.
pub const FRAME_DT: f32 = 1.0 / 60.0;

pub const USAGE: &str = "\
Usage: dispersal -i <image> [options]

  -i <path>        target image (required)
  -ff <path>       encoder executable (default: ffmpeg)
  -ww <n>          world width (default: 200)
  -wh <n>          world height (default: 200)
  -c <n>           particle capacity (default: 26000, <= 0 means width*height)
  -p <n>           emission preset: 0 single, 1 dual, 2 quadruple (default: 2)
  -n <n>           particles per emission (default: 15)
  -s <x>           emission growth per tick (default: 0)
  -g <n>           gravity: 0 normal, 1 uneven central, 2 uniform central (default: 1)
  -gf <x>          gravity force (default: 1)
  -dd <n>          ticks held at capacity before the snapshot (default: 120)
  -dr <n>          reverse bursts per cycle (default: 60)
  -d               keep the borders, do not collapse the image
  -f <n>           video frame rate (default: 30)

  --config <path>  read options from a JSON file first
  --threads <n>    worker threads (default: 10)
  --substeps <n>   solver substeps per frame (default: 8)
  --window <n>     longest window side in pixels (default: 1000)
  --out <dir>      frame directory (default: images)
  --video <path>   output video (default: res.mp4)
  --headless       run without a window
  -h, --help       print this message
";

/// Raw startup values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub world_width: i64,
    pub world_height: i64,
    pub capacity: i64,
    pub preset: i64,
    pub emission: i64,
    pub emission_step: f32,
    pub gravity: i64,
    pub gravity_force: f32,
    pub reverse_delay: i64,
    pub destroy_delay: i64,
    /// Collapse the image once the second hold ends.
    pub disable_borders: bool,
    pub fps: i64,
    pub image: PathBuf,
    pub encoder: PathBuf,
    pub threads: i64,
    pub sub_steps: i64,
    pub window: i64,
    pub out_dir: PathBuf,
    pub video: PathBuf,
    pub headless: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            world_width: DEFAULT_WORLD_SIZE,
            world_height: DEFAULT_WORLD_SIZE,
            capacity: DEFAULT_CAPACITY,
            preset: 2,
            emission: DEFAULT_EMISSION,
            emission_step: 0.0,
            gravity: 1,
            gravity_force: 1.0,
            reverse_delay: DEFAULT_REVERSE_DELAY,
            destroy_delay: DEFAULT_DESTROY_DELAY,
            disable_borders: true,
            fps: DEFAULT_FPS,
            image: PathBuf::new(),
            encoder: default_encoder(),
            threads: DEFAULT_THREADS,
            sub_steps: DEFAULT_SUB_STEPS,
            window: DEFAULT_WINDOW,
            out_dir: PathBuf::from("images"),
            video: PathBuf::from("res.mp4"),
            headless: false,
        }
    }
}

/// What the command line asked for.
#[derive(Clone, Debug, PartialEq)]
pub enum Invocation {
    Run(Config),
    Help,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse command-line arguments, program name excluded.
    pub fn from_args<I, S>(args: I) -> Result<Invocation, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();

        let mut config = match args.iter().position(|a| a == "--config") {
            Some(i) => {
                let path = args
                    .get(i + 1)
                    .ok_or_else(|| ConfigError::MissingValue("--config".into()))?;
                Config::load(path)?
            }
            None => Config::default(),
        };

        let mut iter = args.iter();
        while let Some(flag) = iter.next() {
            let mut value = || {
                iter.next()
                    .map(String::as_str)
                    .ok_or_else(|| ConfigError::MissingValue(flag.clone()))
            };
            match flag.as_str() {
                "-h" | "--help" => return Ok(Invocation::Help),
                "-ff" => config.encoder = PathBuf::from(value()?),
                "-i" => config.image = PathBuf::from(value()?),
                "-ww" => config.world_width = parse_int(value()?),
                "-wh" => config.world_height = parse_int(value()?),
                "-c" => config.capacity = parse_int(value()?),
                "-d" => config.disable_borders = false,
                "-dd" => config.destroy_delay = parse_int(value()?),
                "-dr" => config.reverse_delay = parse_int(value()?),
                "-p" => config.preset = parse_int(value()?),
                "-n" => config.emission = parse_int(value()?),
                "-s" => config.emission_step = parse_float(value()?),
                "-g" => config.gravity = parse_int(value()?),
                "-gf" => config.gravity_force = parse_float(value()?),
                "-f" => config.fps = parse_int(value()?),
                "--config" => {
                    value()?;
                }
                "--threads" => config.threads = parse_int(value()?),
                "--substeps" => config.sub_steps = parse_int(value()?),
                "--window" => config.window = parse_int(value()?),
                "--out" => config.out_dir = PathBuf::from(value()?),
                "--video" => config.video = PathBuf::from(value()?),
                "--headless" => config.headless = true,
                other => tracing::warn!(target: "config", argument = other, "ignoring unknown argument"),
            }
        }
        Ok(Invocation::Run(config))
    }

    /// Validate and fill in defaults.
    pub fn normalize(&self) -> Settings {
        let world_width = positive_or("world_width", self.world_width, FALLBACK_WORLD_SIZE);
        let world_height = positive_or("world_height", self.world_height, FALLBACK_WORLD_SIZE);
        let capacity = positive_or("capacity", self.capacity, world_width.saturating_mul(world_height));

        let emitter = Emitter::from_index(self.preset);
        if self.preset < 0 || self.preset as usize >= Emitter::ALL.len() {
            tracing::debug!(target: "config", preset = self.preset, "preset out of range, using single");
        }
        let gravity = Gravity::from_index(self.gravity);
        if self.gravity < 0 || self.gravity as usize >= Gravity::ALL.len() {
            tracing::debug!(target: "config", gravity = self.gravity, "gravity out of range, using normal");
        }

        let gravity_force = if self.gravity_force.is_finite() && self.gravity_force > 0.0 {
            self.gravity_force
        } else {
            tracing::debug!(target: "config", gravity_force = self.gravity_force, "using 1");
            1.0
        };
        let emission_step = if self.emission_step.is_finite() && self.emission_step > 0.0 {
            self.emission_step
        } else {
            0.0
        };
        let threads = if self.threads > 0 {
            self.threads as usize
        } else {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        };

        Settings {
            world_size: Vec2::new(world_width as f32, world_height as f32),
            lifecycle: LifecycleSettings {
                capacity: capacity as usize,
                emission: positive_or("emission", self.emission, DEFAULT_EMISSION) as f32,
                emission_step,
                reverse_delay: to_u32(positive_or("reverse_delay", self.reverse_delay, DEFAULT_REVERSE_DELAY)),
                destroy_delay: to_u32(positive_or("destroy_delay", self.destroy_delay, DEFAULT_DESTROY_DELAY)),
                release_borders: self.disable_borders,
                emitter,
            },
            gravity,
            gravity_force,
            fps: to_u32(positive_or("fps", self.fps, DEFAULT_FPS)),
            image: self.image.clone(),
            encoder: self.encoder.clone(),
            threads,
            sub_steps: to_u32(positive_or("sub_steps", self.sub_steps, DEFAULT_SUB_STEPS)),
            window: to_u32(positive_or("window", self.window, DEFAULT_WINDOW)),
            out_dir: self.out_dir.clone(),
            video: self.video.clone(),
            headless: self.headless,
        }
    }
}

/// Validated startup values.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub world_size: Vec2,
    pub lifecycle: LifecycleSettings,
    pub gravity: Gravity,
    pub gravity_force: f32,
    pub fps: u32,
    pub image: PathBuf,
    pub encoder: PathBuf,
    pub threads: usize,
    pub sub_steps: u32,
    /// Longest window side in pixels.
    pub window: u32,
    pub out_dir: PathBuf,
    pub video: PathBuf,
    pub headless: bool,
}

impl Settings {
    /// Print the effective settings.
    pub fn log(&self) {
        tracing::info!(
            target: "config",
            world = %format_args!("{}x{}", self.world_size.x, self.world_size.y),
            capacity = self.lifecycle.capacity,
            preset = self.lifecycle.emitter.name(),
            emission = self.lifecycle.emission,
            step = self.lifecycle.emission_step,
            gravity = self.gravity.name(),
            gravity_force = self.gravity_force,
            destroy_image = self.lifecycle.release_borders,
            destroy_delay = self.lifecycle.destroy_delay,
            reverse_delay = self.lifecycle.reverse_delay,
            fps = self.fps,
            image = %self.image.display(),
            encoder = %self.encoder.display(),
            threads = self.threads,
            "starting settings"
        );
    }
}

fn positive_or(field: &'static str, value: i64, fallback: i64) -> i64 {
    if value > 0 {
        value
    } else {
        tracing::debug!(target: "config", field, value, fallback, "non-positive value replaced");
        fallback
    }
}

fn to_u32(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Leading integer of `s`, or 0.
fn parse_int(s: &str) -> i64 {
    let s = s.trim_start();
    let sign_len = usize::from(s.starts_with(['+', '-']));
    let digits = s[sign_len..].bytes().take_while(u8::is_ascii_digit).count();
    s[..sign_len + digits].parse().unwrap_or(0)
}

/// Longest leading float of `s`, or 0.
fn parse_float(s: &str) -> f32 {
    let s = s.trim();
    (1..=s.len())
        .rev()
        .filter(|&end| s.is_char_boundary(end))
        .find_map(|end| s[..end].parse::<f32>().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> Config {
        match Config::from_args(args.iter().copied()).unwrap() {
            Invocation::Run(config) => config,
            Invocation::Help => panic!("unexpected help"),
        }
    }

    #[test]
    fn test_defaults() {
        let settings = Config::default().normalize();
        assert_eq!(settings.world_size, Vec2::new(200.0, 200.0));
        assert_eq!(settings.lifecycle.capacity, 26_000);
        assert_eq!(settings.lifecycle.emitter, Emitter::Quadruple);
        assert_eq!(settings.lifecycle.emission, 15.0);
        assert_eq!(settings.lifecycle.emission_step, 0.0);
        assert_eq!(settings.lifecycle.destroy_delay, 120);
        assert_eq!(settings.lifecycle.reverse_delay, 60);
        assert!(settings.lifecycle.release_borders);
        assert_eq!(settings.gravity, Gravity::CentralUneven);
        assert_eq!(settings.gravity_force, 1.0);
        assert_eq!(settings.fps, 30);
        assert_eq!(settings.threads, 10);
        assert_eq!(settings.out_dir, PathBuf::from("images"));
    }

    #[test]
    fn test_flags() {
        let config = run(&[
            "-i", "cat.png", "-ff", "/usr/bin/ffmpeg", "-ww", "300", "-wh", "100", "-c", "5000",
            "-p", "1", "-n", "20", "-s", "0.5", "-g", "2", "-gf", "2.5", "-dd", "40", "-dr", "7",
            "-d", "-f", "24", "--headless", "--threads", "3",
        ]);
        assert_eq!(config.image, PathBuf::from("cat.png"));
        assert_eq!(config.encoder, PathBuf::from("/usr/bin/ffmpeg"));
        assert!(!config.disable_borders);
        assert!(config.headless);

        let settings = config.normalize();
        assert_eq!(settings.world_size, Vec2::new(300.0, 100.0));
        assert_eq!(settings.lifecycle.capacity, 5000);
        assert_eq!(settings.lifecycle.emitter, Emitter::Dual);
        assert_eq!(settings.lifecycle.emission, 20.0);
        assert_eq!(settings.lifecycle.emission_step, 0.5);
        assert_eq!(settings.gravity, Gravity::CentralUniform);
        assert_eq!(settings.gravity_force, 2.5);
        assert_eq!(settings.lifecycle.destroy_delay, 40);
        assert_eq!(settings.lifecycle.reverse_delay, 7);
        assert!(!settings.lifecycle.release_borders);
        assert_eq!(settings.fps, 24);
        assert_eq!(settings.threads, 3);
    }

    #[test]
    fn test_non_positive_values_fall_back() {
        let settings = run(&[
            "-ww", "0", "-wh", "-5", "-c", "0", "-n", "-1", "-s", "-2", "-dd", "0", "-dr", "0", "-f", "0",
            "-gf", "-3",
        ])
        .normalize();
        assert_eq!(settings.world_size, Vec2::new(150.0, 150.0));
        assert_eq!(settings.lifecycle.capacity, 150 * 150);
        assert_eq!(settings.lifecycle.emission, 15.0);
        assert_eq!(settings.lifecycle.emission_step, 0.0);
        assert_eq!(settings.lifecycle.destroy_delay, 120);
        assert_eq!(settings.lifecycle.reverse_delay, 60);
        assert_eq!(settings.fps, 30);
        assert_eq!(settings.gravity_force, 1.0);
    }

    #[test]
    fn test_out_of_range_indices_use_first() {
        let settings = run(&["-p", "3", "-g", "-1"]).normalize();
        assert_eq!(settings.lifecycle.emitter, Emitter::Single);
        assert_eq!(settings.gravity, Gravity::Normal);
    }

    #[test]
    fn test_non_numeric_values_read_as_zero() {
        let config = run(&["-ww", "wide", "-c", "12abc", "-gf", "x"]);
        assert_eq!(config.world_width, 0);
        assert_eq!(config.capacity, 12);
        assert_eq!(config.gravity_force, 0.0);
        assert_eq!(config.normalize().world_size.x, 150.0);
    }

    #[test]
    fn test_missing_value_is_an_error() {
        let err = Config::from_args(["-i", "a.png", "-ww"]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingValue(flag) if flag == "-ww"));
    }

    #[test]
    fn test_unknown_arguments_are_ignored() {
        let config = run(&["--frobnicate", "-n", "3"]);
        assert_eq!(config.emission, 3);
    }

    #[test]
    fn test_help() {
        assert_eq!(Config::from_args(["-n", "3", "--help"]).unwrap(), Invocation::Help);
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, r#"{ "world_width": 80, "emission": 9, "headless": true }"#).unwrap();

        let config = run(&["--config", path.to_str().unwrap(), "-n", "4"]);
        assert_eq!(config.world_width, 80);
        assert_eq!(config.world_height, DEFAULT_WORLD_SIZE);
        assert_eq!(config.emission, 4);
        assert!(config.headless);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.json");
        let mut config = Config::default();
        config.preset = 0;
        config.image = PathBuf::from("face.jpg");
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_bad_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            Config::load(dir.path().join("missing.json")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_int(" 42"), 42);
        assert_eq!(parse_int("-7px"), -7);
        assert_eq!(parse_int("abc"), 0);
        assert_eq!(parse_int("-"), 0);
        assert_eq!(parse_float("1.5e1x"), 15.0);
        assert_eq!(parse_float(""), 0.0);
    }
}
