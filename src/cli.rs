// ============================================================================
// Pixmark CLI — headless batch processing via command-line arguments
// ============================================================================
//
// Usage examples:
//   pixmark -i photo.png --effect gaussian_blur --set radius=4 -o result.png
//   pixmark -i shot.png --project markup.pxm -o annotated.png
//   pixmark -i "*.jpg" --effect sepia --output-dir processed/ --format webp
//   pixmark -i photo.png --params '{"effect": "twirl", "angle": 180}' --gpu
//   pixmark --list-effects
//
// Each input is loaded into an editor session, the effect (if any) runs
// through the dispatcher, project annotations are composited on top and the
// snapshot is exported.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use serde_json::{Map, Value};

use pixmark::annotation::Annotation;
use pixmark::config::EditorConfig;
use pixmark::effect::{Effect, EffectSpec};
use pixmark::gpu::{EffectDispatcher, SharedGpuContext};
use pixmark::session::{EditorSession, ExportFormat};
use pixmark::{log_info, log_warn, project};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Pixmark headless image processor.
///
/// Apply effects and composite saved annotations without a GUI.
#[derive(Parser, Debug)]
#[command(
    name = "pixmark",
    about = "Pixmark headless batch image processor",
    long_about = "Apply image effects and composite annotation projects without a GUI.\n\
                  Reads PNG, JPEG, WEBP, BMP, GIF and PXM project files; writes\n\
                  PNG, JPEG, WEBP, BMP and GIF.\n\n\
                  Example:\n  \
                  pixmark -i photo.png --effect gaussian_blur --set radius=4 -o out.png\n  \
                  pixmark -i *.jpg --effect sepia --output-dir out/ --format png"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    /// PXM project files load with their annotations.
    #[arg(short, long, num_args = 1.., required_unless_present = "list_effects")]
    pub input: Vec<String>,

    /// Effect to apply to each input (see --list-effects).
    #[arg(short, long, value_name = "NAME")]
    pub effect: Option<String>,

    /// Effect parameter as key=value; values are parsed as JSON when possible.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Effect parameters as a JSON object, e.g. '{"effect": "twirl", "angle": 180}'.
    #[arg(long, value_name = "JSON")]
    pub params: Option<String>,

    /// Project whose annotations are composited over every input.
    #[arg(long, value_name = "FILE.pxm")]
    pub project: Option<PathBuf>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and the target format's extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpg, jpeg, bmp, gif, webp.
    /// When omitted, the format is inferred from --output's extension, then from settings.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1–100). Defaults to the settings value.
    #[arg(short, long, value_name = "1-100")]
    pub quality: Option<u8>,

    /// Run eligible effects on the GPU when an adapter is available.
    #[arg(long)]
    pub gpu: bool,

    /// Print every effect name and exit.
    #[arg(long)]
    pub list_effects: bool,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    if args.list_effects {
        for name in EffectSpec::names() {
            let category = EffectSpec::default_for(name)
                .map(|spec| spec.category().label())
                .unwrap_or("?");
            println!("{:<20} {}", name, category);
        }
        return ExitCode::SUCCESS;
    }

    let config = EditorConfig::load();
    if args.verbose {
        if let Some(path) = pixmark::logger::log_path() {
            println!("log: {}", path.display());
        }
    }

    // Resolve glob patterns / literal paths → concrete PathBufs
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    // Multiple inputs require --output-dir, not --output
    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let format = match resolve_format(args.format.as_deref(), args.output.as_deref(), &config) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let quality = args.quality.unwrap_or(config.default_quality).clamp(1, 100);

    let effect = match resolve_effect(&args) {
        Ok(effect) => effect,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let overlay: Vec<Annotation> = match &args.project {
        Some(path) => match project::load(path) {
            Ok(session) => session.annotations().to_vec(),
            Err(e) => {
                eprintln!("error: could not load project '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Vec::new(),
    };

    let dispatcher = build_dispatcher(&config, args.gpu);

    // Create output directory if specified
    if let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
            return ExitCode::FAILURE;
        }
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let Some(output_path) =
            build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref(), format)
        else {
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            any_failure = true;
            continue;
        };

        let job = Job {
            config: &config,
            dispatcher: &dispatcher,
            effect: effect.as_ref(),
            overlay: &overlay,
            format,
            quality,
        };
        match job.run(input_path, &output_path) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                log_warn!("CLI: {} failed: {}", input_path.display(), e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

struct Job<'a> {
    config: &'a EditorConfig,
    dispatcher: &'a EffectDispatcher,
    effect: Option<&'a EffectSpec>,
    overlay: &'a [Annotation],
    format: ExportFormat,
    quality: u8,
}

impl Job<'_> {
    fn run(&self, input: &Path, output: &Path) -> Result<(), String> {
        // -- Step 1: Load ----------------------------------------------------
        let mut session = if is_project(input) {
            project::load(input).map_err(|e| format!("load failed: {}", e))?
        } else {
            let bytes = std::fs::read(input).map_err(|e| format!("load failed: {}", e))?;
            let mut session = EditorSession::with_config(self.config);
            session.load_image_bytes(&bytes).map_err(|e| format!("load failed: {}", e))?;
            session
        };

        // -- Step 2: Effect (optional) ---------------------------------------
        if let Some(spec) = self.effect {
            let effect = spec.build();
            session.apply_effect(self.dispatcher, effect.as_ref());
        }

        // -- Step 3: Annotations from --project -------------------------------
        if !self.overlay.is_empty() {
            session.import_annotations(self.overlay.iter().cloned());
        }

        // -- Step 4: Export ---------------------------------------------------
        let bytes = session
            .export(self.format, self.quality)
            .map_err(|e| format!("export failed: {}", e))?;
        std::fs::write(output, bytes).map_err(|e| format!("save failed: {}", e))?;
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn is_project(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pxm"))
}

/// GPU only with `--gpu`, settings permitting, and a working adapter.
fn build_dispatcher(config: &EditorConfig, want_gpu: bool) -> EffectDispatcher {
    let mut dispatcher = EffectDispatcher::from_config(config);
    if !want_gpu {
        return dispatcher;
    }
    if !config.gpu_enabled {
        log_warn!("--gpu ignored: GPU disabled in settings");
        return dispatcher;
    }
    match SharedGpuContext::try_create(&config.preferred_gpu) {
        Some(ctx) => {
            log_info!("CLI: GPU context ready");
            dispatcher.register_gpu_lease_provider(Some(Arc::new(ctx)));
        }
        None => {
            eprintln!("warning: no GPU adapter found; running on CPU.");
            dispatcher.register_gpu_lease_provider(None);
        }
    }
    dispatcher
}

/// Merge `--params`, `--effect` and `--set` into one effect, or `None` when
/// no effect was requested.
fn resolve_effect(args: &CliArgs) -> Result<Option<EffectSpec>, String> {
    let mut map = match &args.params {
        Some(json) => match serde_json::from_str::<Value>(json) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err("--params must be a JSON object".to_string()),
            Err(e) => return Err(format!("invalid --params JSON: {}", e)),
        },
        None => Map::new(),
    };
    if let Some(name) = &args.effect {
        map.insert("effect".to_string(), Value::String(name.clone()));
    }
    for pair in &args.set {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| format!("--set expects key=value, got '{}'", pair))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        map.insert(key.trim().to_string(), value);
    }
    if map.is_empty() {
        return Ok(None);
    }
    if !map.contains_key("effect") {
        return Err("effect parameters given without --effect".to_string());
    }
    EffectSpec::from_json(&Value::Object(map).to_string())
        .map(Some)
        .map_err(|e| e.to_string())
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            // Literal path — use directly
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        // Treat as glob pattern
        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Choose the export format from `--format`, else the output extension, else
/// the settings default.
fn resolve_format(format_arg: Option<&str>, output: Option<&Path>, config: &EditorConfig) -> Result<ExportFormat, String> {
    if let Some(f) = format_arg {
        return ExportFormat::parse(f).map_err(|e| e.to_string());
    }
    if let Some(ext) = output.and_then(|o| o.extension()).and_then(|e| e.to_str()) {
        if let Ok(format) = ExportFormat::parse(ext) {
            return Ok(format);
        }
    }
    Ok(ExportFormat::parse(&config.default_export_format).unwrap_or_default())
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, new extension
///    (appends `_out` to stem if it would collide with the input path)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: ExportFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));

    // Avoid silent overwrite of the input
    if candidate == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["pixmark", "-i", "in.png"];
        argv.extend_from_slice(extra);
        CliArgs::parse_from(argv)
    }

    #[test]
    fn output_path_avoids_overwriting_input() {
        let out = build_output_path(Path::new("dir/shot.png"), None, None, ExportFormat::Png).unwrap();
        assert_eq!(out, PathBuf::from("dir/shot_out.png"));
        let out = build_output_path(Path::new("dir/shot.png"), None, Some(Path::new("o")), ExportFormat::Jpeg).unwrap();
        assert_eq!(out, PathBuf::from("o/shot.jpg"));
    }

    #[test]
    fn format_falls_back_to_output_extension() {
        let cfg = EditorConfig::default();
        assert_eq!(resolve_format(None, Some(Path::new("x.webp")), &cfg).unwrap(), ExportFormat::WebP);
        assert_eq!(resolve_format(None, Some(Path::new("x.unknown")), &cfg).unwrap(), ExportFormat::Png);
        assert!(resolve_format(Some("tga"), None, &cfg).is_err());
    }

    #[test]
    fn effect_from_set_pairs() {
        let spec = resolve_effect(&args(&["--effect", "solarize", "--set", "threshold=200"])).unwrap().unwrap();
        assert_eq!(spec.name(), "solarize");
        assert!(resolve_effect(&args(&[])).unwrap().is_none());
        assert!(resolve_effect(&args(&["--set", "radius=3"])).is_err());
        assert!(resolve_effect(&args(&["--effect", "no_such_effect"])).is_err());
    }

    #[test]
    fn params_json_merges_with_effect_flag() {
        let spec = resolve_effect(&args(&["--params", r#"{"angle": 45}"#, "--effect", "twirl"])).unwrap().unwrap();
        assert_eq!(spec.name(), "twirl");
        assert!(resolve_effect(&args(&["--params", "[1,2]"])).is_err());
    }
}
