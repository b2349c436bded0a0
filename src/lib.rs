pub mod config;
pub mod errors;
pub mod imageops_ai;
pub mod mocks;
pub mod model;
pub mod remover;
pub mod traits;

use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

pub use config::Config;
pub use errors::{IconBgError, Result};
pub use model::Model;
pub use remover::SegmentationRemover;
pub use traits::*;

/// An icon the run could not process, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedIcon {
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of one pass over the icon directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    pub found: usize,
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<FailedIcon>,
}

impl ProcessReport {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Rewrites every icon in a directory through a [`BackgroundRemover`], one
/// file at a time.
pub struct IconProcessor<R: BackgroundRemover> {
    remover: R,
    config: Config,
}

impl<R: BackgroundRemover> IconProcessor<R> {
    pub const fn new(remover: R, config: Config) -> Self {
        Self { remover, config }
    }

    pub const fn remover(&self) -> &R {
        &self.remover
    }

    /// Process all icons. Per-icon failures are logged and collected in the
    /// report; only a missing icon directory or an uncreatable processed
    /// directory fails the whole run.
    pub fn run(&self) -> Result<ProcessReport> {
        let icon_dir = &self.config.icon_dir;
        if !icon_dir.is_dir() {
            return Err(IconBgError::file_system(
                icon_dir,
                "icon directory lookup",
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "icon directory does not exist",
                ),
            ));
        }

        let processed_dir = self.config.processed_dir();
        fs::create_dir_all(&processed_dir)
            .map_err(|e| IconBgError::file_system(&processed_dir, "processed directory creation", e))?;

        let icons = self.collect_icons()?;
        let mut report = ProcessReport {
            found: icons.len(),
            ..ProcessReport::default()
        };
        info!("Found {} icons to process.", icons.len());

        let pb = ProgressBar::new(icons.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        for icon in icons {
            let name = display_name(&icon);
            pb.set_message(name.clone());
            pb.suspend(|| info!("Processing {name}..."));

            match self.process_icon(&icon) {
                Ok(written) => {
                    pb.suspend(|| info!(bytes = written, "Successfully processed {name}"));
                    report.succeeded.push(icon);
                }
                Err(e) => {
                    pb.suspend(|| error!("Failed to process {name}: {e}"));
                    report.failed.push(FailedIcon {
                        path: icon,
                        message: e.to_string(),
                    });
                }
            }
            pb.inc(1);
        }

        pb.finish_and_clear();
        if report.is_clean() {
            info!(processed = report.succeeded.len(), "Done.");
        } else {
            warn!(
                processed = report.succeeded.len(),
                failed = report.failed.len(),
                "Done."
            );
        }
        Ok(report)
    }

    /// Icons in the icon directory, sorted by path. Symlinks are followed;
    /// the processed subdirectory is never entered.
    pub fn collect_icons(&self) -> Result<Vec<PathBuf>> {
        let icon_dir = &self.config.icon_dir;
        let processed_dir = self.config.processed_dir();
        let max_depth = if self.config.recursive { usize::MAX } else { 1 };

        let mut icons = Vec::new();
        let walker = WalkDir::new(icon_dir)
            .follow_links(true)
            .min_depth(1)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|e| e.path() != processed_dir.as_path());

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("skipping unreadable entry: {e}");
                    continue;
                }
            };
            if entry.file_type().is_file() && self.is_target_icon(entry.path()) {
                icons.push(entry.into_path());
            }
        }

        icons.sort();
        Ok(icons)
    }

    /// Whether the file name ends with the configured suffix. Matching is
    /// case-sensitive.
    pub fn is_target_icon(&self, path: &Path) -> bool {
        let suffix = self.config.icon_suffix();
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(&suffix))
    }

    /// Read the icon, remove its background, and overwrite it. The file is
    /// only written once removal has succeeded. Returns the bytes written.
    pub fn process_icon(&self, path: &Path) -> Result<usize> {
        let input = fs::read(path).map_err(|e| IconBgError::file_system(path, "read", e))?;

        let output = self
            .remover
            .remove(&input)
            .map_err(|e| IconBgError::Removal {
                path: path.to_path_buf(),
                source: Box::new(e),
            })?;

        fs::write(path, &output).map_err(|e| IconBgError::file_system(path, "write", e))?;
        debug!(path = %path.display(), before = input.len(), after = output.len(), "icon rewritten");
        Ok(output.len())
    }
}

impl IconProcessor<SegmentationRemover<Model>> {
    /// Processor backed by the ONNX model named in `config`.
    pub fn with_onnx_model(config: Config) -> Result<Self> {
        let model = Model::from_config(&config)?;
        let remover =
            SegmentationRemover::new(model, config.output_format()).with_premultiply(config.premultiply);
        Ok(Self::new(remover, config))
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::StubRemover;
    use tempfile::TempDir;

    fn processor(dir: &Path) -> IconProcessor<StubRemover> {
        IconProcessor::new(
            StubRemover::marking(b"done:", b"BAD"),
            Config::with_dirs(dir, "model.onnx"),
        )
    }

    #[test]
    fn test_is_target_icon() {
        let processor = processor(Path::new("icons"));

        let test_cases = vec![
            ("finder.png", true),
            ("icons/terminal.png", true),
            ("archive.png.bak", false),
            ("photo.PNG", false),
            ("notes.txt", false),
            ("png", false),
        ];

        for (filename, expected) in test_cases {
            assert_eq!(
                processor.is_target_icon(Path::new(filename)),
                expected,
                "{filename}"
            );
        }
    }

    #[test]
    fn test_collect_icons_sorted_and_flat() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        fs::write(root.join("b.png"), b"b")?;
        fs::write(root.join("a.png"), b"a")?;
        fs::write(root.join("readme.md"), b"text")?;
        fs::create_dir_all(root.join("nested"))?;
        fs::write(root.join("nested/c.png"), b"c")?;
        fs::create_dir_all(root.join("folder.png"))?;

        let icons = processor(root).collect_icons()?;

        assert_eq!(icons, vec![root.join("a.png"), root.join("b.png")]);
        Ok(())
    }

    #[test]
    fn test_collect_icons_recursive_skips_processed_dir() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        fs::create_dir_all(root.join("nested"))?;
        fs::create_dir_all(root.join("processed"))?;
        fs::write(root.join("a.png"), b"a")?;
        fs::write(root.join("nested/c.png"), b"c")?;
        fs::write(root.join("processed/old.png"), b"old")?;

        let mut config = Config::with_dirs(root, "model.onnx");
        config.recursive = true;
        let processor = IconProcessor::new(StubRemover::marking(b"", b"BAD"), config);

        let icons = processor.collect_icons()?;

        assert_eq!(icons, vec![root.join("a.png"), root.join("nested/c.png")]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_collect_icons_follows_symlinked_icons() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let icon_dir = temp_dir.path().join("icons");
        let elsewhere = temp_dir.path().join("elsewhere");
        fs::create_dir_all(&icon_dir)?;
        fs::create_dir_all(&elsewhere)?;
        fs::write(icon_dir.join("plain.png"), b"plain")?;
        fs::write(elsewhere.join("real.png"), b"real")?;
        std::os::unix::fs::symlink(elsewhere.join("real.png"), icon_dir.join("linked.png"))?;

        let processor = processor(&icon_dir);
        let report = processor.run()?;

        assert_eq!(
            report.succeeded,
            vec![icon_dir.join("linked.png"), icon_dir.join("plain.png")]
        );
        // writing through the link rewrites the target
        assert_eq!(fs::read(elsewhere.join("real.png"))?, b"done:real");
        Ok(())
    }

    #[test]
    fn test_process_icon_keeps_original_on_failure() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("broken.png");
        fs::write(&path, b"BAD bytes")?;

        let err = processor(temp_dir.path()).process_icon(&path).unwrap_err();

        assert!(matches!(err, IconBgError::Removal { .. }));
        assert_eq!(fs::read(&path)?, b"BAD bytes");
        Ok(())
    }

    #[test]
    fn test_run_missing_directory_fails() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let missing = temp_dir.path().join("missing");

        let result = processor(&missing).run();

        assert!(matches!(result, Err(IconBgError::FileSystem { .. })));
        assert!(!missing.exists());
        Ok(())
    }
}
