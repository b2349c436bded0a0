use clap::Parser;
use image::ImageFormat;
use std::path::PathBuf;

pub const DEFAULT_ICON_DIR: &str = "src/assets/icons";
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Remove the background of every icon in a directory, overwriting the originals.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Directory holding the icons; results are written back in place
    #[arg(default_value = DEFAULT_ICON_DIR)]
    pub icon_dir: PathBuf,

    /// ONNX segmentation model (u2net family)
    #[arg(short, long, env = "ICON_BGREMOVE_MODEL")]
    pub model_path: PathBuf,

    /// File name suffix selecting the icons, also the encoding written back
    #[arg(short, long, default_value = "png", value_parser = check_format)]
    pub extension: String,

    /// Subdirectory created next to the icons and skipped during enumeration
    #[arg(long, default_value = "processed")]
    pub processed_subdir: String,

    /// Descend into subdirectories of the icon directory
    #[arg(short, long)]
    pub recursive: bool,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    /// Input size used when the model declares a dynamic shape
    #[arg(long, default_value_t = 320)]
    pub model_size: u32,

    /// Per-channel mean, three comma-separated values
    #[arg(long, default_value = "0.485,0.456,0.406", value_parser = parse_mean)]
    pub mean: [f32; 3],

    /// Per-channel standard deviation, three comma-separated positive values
    #[arg(long = "std", default_value = "0.229,0.224,0.225", value_parser = parse_std)]
    pub std_dev: [f32; 3],

    /// Scale colour channels by the mask as well as the alpha channel
    #[arg(long)]
    pub premultiply: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}

impl Config {
    /// Config with every default applied, for library callers that don't go
    /// through the command line.
    pub fn with_dirs(icon_dir: impl Into<PathBuf>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            icon_dir: icon_dir.into(),
            model_path: model_path.into(),
            extension: "png".to_string(),
            processed_subdir: "processed".to_string(),
            recursive: false,
            device_id: 0,
            model_size: 320,
            mean: IMAGENET_MEAN,
            std_dev: IMAGENET_STD,
            premultiply: false,
            verbose: false,
            json_logs: false,
        }
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.icon_dir.join(&self.processed_subdir)
    }

    /// Suffix a file name has to end with to count as an icon.
    pub fn icon_suffix(&self) -> String {
        format!(".{}", self.extension)
    }

    pub fn output_format(&self) -> ImageFormat {
        ImageFormat::from_extension(&self.extension).unwrap_or(ImageFormat::Png)
    }

    pub fn normalization(&self) -> Normalization {
        Normalization {
            mean: self.mean,
            std: self.std_dev,
        }
    }
}

/// Per-channel input normalisation applied after scaling pixels to 0..1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }
}

fn parse_triplet(s: &str) -> Result<[f32; 3], String> {
    let values = s
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<f32>()
                .map_err(|e| format!("{} is not a number: {e}", v.trim()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    match values.as_slice() {
        [a, b, c] => Ok([*a, *b, *c]),
        _ => Err(format!("expected 3 comma-separated values, got {}", values.len())),
    }
}

fn parse_mean(s: &str) -> Result<[f32; 3], String> {
    parse_triplet(s)
}

fn parse_std(s: &str) -> Result<[f32; 3], String> {
    let values = parse_triplet(s)?;
    if let Some(bad) = values.iter().find(|v| **v <= 0.0) {
        return Err(format!("{bad} must be greater than zero"));
    }
    Ok(values)
}

fn check_format(s: &str) -> Result<String, String> {
    let supported: Vec<_> = ImageFormat::all()
        .filter(|f| f.writing_enabled() && carries_alpha(*f))
        .flat_map(|f| f.extensions_str())
        .map(|s| format!("`{}`", s))
        .collect();
    let supported_message = format!("Supported formats: {}", supported.join(", "));

    let format = ImageFormat::from_extension(s)
        .ok_or(format!("{} is not supported. {}", s, supported_message))?;
    if !format.writing_enabled() || !carries_alpha(format) {
        return Err(format!("{} is not supported. {}", s, supported_message));
    }

    Ok(s.to_string())
}

fn carries_alpha(format: ImageFormat) -> bool {
    !matches!(
        format,
        ImageFormat::Jpeg | ImageFormat::Pnm | ImageFormat::Farbfeld | ImageFormat::Hdr
    )
}
