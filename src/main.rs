use clap::{Parser, Subcommand};
use photo_upload::config;
use photo_upload::error::UploadError;
use photo_upload::imaging::RustBackend;
use photo_upload::output::{self, FileReport};
use photo_upload::pipeline::UploadPipeline;
use photo_upload::types::{CandidateFile, UploadConstraints};
use photo_upload::validate::has_allowed_extension;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "photo-upload")]
#[command(about = "Validate and compress photo uploads")]
#[command(long_about = "\
Validate and compress photo uploads

Every file goes through the same stages an upload area applies, in order:

  1. type        declared MIME type or file extension must be allowed
  2. size        at most max_size bytes
  3. geometry    decoded width and height within [dimensions]
  4. compress    re-encoded at quality 85, longer side ≤ 2000, when the file
                 is at least 2 MB or either side reaches 2000 px
  5. preview     encoded as a data: URL

Directories are walked recursively; only files with an allowed extension are
picked up from them. Files named explicitly are always checked.

Run 'photo-upload gen-config' to generate a documented upload.toml.")]
#[command(version)]
struct Cli {
    /// Upload configuration file (missing file = stock defaults)
    #[arg(long, default_value = "upload.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run files through the upload pipeline and report the outcome
    Check {
        /// Files or directories to check
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Write accepted (possibly compressed) files here
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock upload.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photo_upload=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Check {
            paths,
            output: out_dir,
            json,
        } => {
            let config = config::load_config(&cli.config)?;
            let pipeline = UploadPipeline::from_config(&config);
            let files = collect_files(&paths, pipeline.constraints());
            tracing::info!(count = files.len(), "checking files");

            let mut plan = out_dir.as_deref().map(OutputPlan::new);
            if let Some(plan) = &plan {
                std::fs::create_dir_all(&plan.dir)?;
            }
            let mut reports = Vec::with_capacity(files.len());
            for target in &files {
                reports.push(check_file(&pipeline, target, plan.as_mut()).await?);
            }

            if json {
                println!("{}", output::format_check_json(&reports)?);
            } else {
                output::print_check_output(&reports);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// A file to check and where its output goes, relative to `--output`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    path: PathBuf,
    relative: PathBuf,
}

/// Expand directories into the image files they contain.
///
/// Files found under a directory keep their place below that directory's
/// name, so `a/photo.jpg` and `b/photo.jpg` stay apart.
fn collect_files(paths: &[PathBuf], constraints: &UploadConstraints) -> Vec<Target> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            let relative = path.file_name().map(PathBuf::from).unwrap_or_else(|| path.clone());
            files.push(Target {
                path: path.clone(),
                relative,
            });
            continue;
        }
        let label = path.file_name().map(PathBuf::from).unwrap_or_default();
        for entry in WalkDir::new(path)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let name = entry.file_name().to_string_lossy();
            if !entry.file_type().is_file()
                || !has_allowed_extension(&name, &constraints.allowed_extensions)
            {
                continue;
            }
            let inner = entry
                .path()
                .strip_prefix(path)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| PathBuf::from(entry.file_name()));
            files.push(Target {
                relative: label.join(inner),
                path: entry.into_path(),
            });
        }
    }
    files
}

/// Destinations handed out during one run. A second claim on the same path
/// gets a numeric suffix instead of overwriting the first.
struct OutputPlan {
    dir: PathBuf,
    claimed: HashSet<PathBuf>,
}

impl OutputPlan {
    fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            claimed: HashSet::new(),
        }
    }

    fn claim(&mut self, relative: &Path) -> PathBuf {
        let mut dest = self.dir.join(relative);
        let stem = relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = relative.extension().map(|e| e.to_string_lossy().into_owned());
        let mut n = 2;
        while !self.claimed.insert(dest.clone()) {
            let name = match &ext {
                Some(ext) => format!("{stem}-{n}.{ext}"),
                None => format!("{stem}-{n}"),
            };
            dest = self.dir.join(relative.with_file_name(name));
            n += 1;
        }
        dest
    }
}

async fn check_file(
    pipeline: &UploadPipeline<RustBackend>,
    target: &Target,
    plan: Option<&mut OutputPlan>,
) -> std::io::Result<FileReport> {
    let path = target.path.as_path();
    let candidate = match CandidateFile::from_path(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot stat file");
            return Ok(FileReport::rejected(path, 0, &UploadError::ReadFailure));
        }
    };
    let original_bytes = candidate.byte_length();

    let accepted = match pipeline.run(candidate).await {
        Ok(accepted) => accepted,
        Err(e) => return Ok(FileReport::rejected(path, original_bytes, &e)),
    };
    // Accepted contents are already in memory.
    let bytes = accepted.file.read()?;

    let report = FileReport::accepted(path, original_bytes, &accepted, &bytes);
    match plan {
        Some(plan) => {
            let dest = plan.claim(&target.relative);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&dest, &bytes)?;
            Ok(report.with_written(&dest))
        }
        None => Ok(report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use photo_upload::config::UploadConfig;
    use photo_upload::output::FileOutcome;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn write_jpeg(path: &Path, shade: u8) {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(320, 240, Rgb([shade, 90, 40])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, buf).unwrap();
    }

    #[test]
    fn collect_keeps_directory_names() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        write_jpeg(&a.join("photo.jpg"), 10);
        write_jpeg(&b.join("nested/photo.jpg"), 20);
        std::fs::write(a.join("notes.txt"), "x").unwrap();

        let files = collect_files(&[a.clone(), b.clone()], &UploadConstraints::default());

        let relative: Vec<_> = files.iter().map(|t| t.relative.clone()).collect();
        assert_eq!(
            relative,
            vec![PathBuf::from("a/photo.jpg"), PathBuf::from("b/nested/photo.jpg")]
        );
        assert_eq!(files[0].path, a.join("photo.jpg"));
    }

    #[test]
    fn explicit_file_is_kept_regardless_of_extension() {
        let tmp = TempDir::new().unwrap();
        let notes = tmp.path().join("notes.txt");
        std::fs::write(&notes, "x").unwrap();

        let files = collect_files(&[notes.clone()], &UploadConstraints::default());

        assert_eq!(
            files,
            vec![Target {
                path: notes,
                relative: PathBuf::from("notes.txt"),
            }]
        );
    }

    #[test]
    fn repeated_claims_get_suffixes() {
        let mut plan = OutputPlan::new(Path::new("out"));
        assert_eq!(plan.claim(Path::new("photo.jpg")), PathBuf::from("out/photo.jpg"));
        assert_eq!(plan.claim(Path::new("photo.jpg")), PathBuf::from("out/photo-2.jpg"));
        assert_eq!(plan.claim(Path::new("photo.jpg")), PathBuf::from("out/photo-3.jpg"));
        assert_eq!(plan.claim(Path::new("x/photo.jpg")), PathBuf::from("out/x/photo.jpg"));
    }

    #[tokio::test]
    async fn same_named_files_are_both_written() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("a/photo.jpg");
        let second = tmp.path().join("b/photo.jpg");
        write_jpeg(&first, 10);
        write_jpeg(&second, 200);
        let out = tmp.path().join("out");

        let pipeline = UploadPipeline::from_config(&UploadConfig::default());
        let mut plan = OutputPlan::new(&out);
        let mut written = Vec::new();
        for target in collect_files(&[first.clone(), second.clone()], pipeline.constraints()) {
            let report = check_file(&pipeline, &target, Some(&mut plan)).await.unwrap();
            let FileOutcome::Accepted { written: Some(dest), .. } = report.outcome else {
                panic!("expected a written file");
            };
            written.push(PathBuf::from(dest));
        }

        assert_eq!(written, vec![out.join("photo.jpg"), out.join("photo-2.jpg")]);
        assert_eq!(std::fs::read(&written[0]).unwrap(), std::fs::read(&first).unwrap());
        assert_eq!(std::fs::read(&written[1]).unwrap(), std::fs::read(&second).unwrap());
    }
}
