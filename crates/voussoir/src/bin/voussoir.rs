//! voussoir CLI: flatten the pages of a photographed book spread.

use clap::{Args, Parser};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use voussoir::encode::{check_input_path, check_output_path};
use voussoir::glyph::{DetectorParams, PageSide};
use voussoir::page::{
    estimate_page_size, load_detector_params, EdgeOffsets, PageSpec, DEFAULT_GLYPH_SIZE,
};
use voussoir::{load_image, PageRenderer, RenderRequest, SideEstimate, SideRequest};

type CliError = Box<dyn std::error::Error>;

const DEFAULT_PAGE_WIDTH: f64 = 6.0;
const DEFAULT_PAGE_HEIGHT: f64 = 9.5;

#[derive(Parser, Debug)]
#[command(name = "voussoir")]
#[command(
    about = "Detect corner glyphs in a photographed book spread and write de-keystoned, cropped page images"
)]
#[command(version)]
#[command(after_help = PLACEMENT_HELP)]
struct Cli {
    /// The input image.
    #[arg(short = 'i', long)]
    input_image: PathBuf,

    /// Output image for the left page (or for the only requested page).
    output_image_one: Option<PathBuf>,

    /// Output image for the right page.
    output_image_two: Option<PathBuf>,

    /// Width of each page, in any unit [default: 6.0].
    #[arg(short = 'w', long)]
    page_width: Option<f64>,

    /// Height of each page, in the unit of --page-width ('t' is for 'tall') [default: 9.5].
    #[arg(short = 't', long)]
    page_height: Option<f64>,

    /// Output resolution in pixels per page unit, 0 < dpi <= 1200.
    #[arg(short = 'd', long, default_value_t = 600.0)]
    dpi: f64,

    /// Only process the right page (glyphs 4-7).
    #[arg(long)]
    no_left_page: bool,

    /// Only process the left page (glyphs 0-3).
    #[arg(long)]
    no_right_page: bool,

    #[command(flatten)]
    offsets: OffsetArgs,

    /// Show additional output, including the value of every option.
    #[arg(long)]
    verbose: bool,

    /// Only show warnings and errors.
    #[arg(short = 'q', long)]
    quiet: bool,

    /// JSON file with glyph detector parameters; missing fields keep their defaults.
    #[arg(long)]
    detector_config: Option<PathBuf>,

    /// Write a JSON report with detections and per-page outcomes.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Replace existing output files.
    #[arg(long)]
    overwrite: bool,

    /// Estimate the page size from the apparent glyph size and use it when
    /// --page-width/--page-height are not given.
    #[arg(long)]
    estimate_size: bool,

    /// Printed glyph side length, in page units (used by --estimate-size).
    #[arg(long, default_value_t = DEFAULT_GLYPH_SIZE)]
    glyph_size: f64,

    /// Emit JSON-formatted tracing events.
    #[cfg(feature = "tracing")]
    #[arg(long)]
    json_log: bool,
}

/// Crop offsets in page units. Positive values move an edge inward.
#[derive(Args, Debug, Clone, Copy)]
struct OffsetArgs {
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    offset_left_page_left_side: f64,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    offset_left_page_right_side: f64,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    offset_left_page_top_side: f64,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    offset_left_page_bottom_side: f64,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    offset_right_page_left_side: f64,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    offset_right_page_right_side: f64,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    offset_right_page_top_side: f64,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    offset_right_page_bottom_side: f64,
}

impl OffsetArgs {
    fn side(&self, side: PageSide) -> EdgeOffsets {
        match side {
            PageSide::Left => EdgeOffsets {
                left: self.offset_left_page_left_side,
                right: self.offset_left_page_right_side,
                top: self.offset_left_page_top_side,
                bottom: self.offset_left_page_bottom_side,
            },
            PageSide::Right => EdgeOffsets {
                left: self.offset_right_page_left_side,
                right: self.offset_right_page_right_side,
                top: self.offset_right_page_top_side,
                bottom: self.offset_right_page_bottom_side,
            },
        }
    }
}

const PLACEMENT_HELP: &str = "\
Placing glyphs:
    Print glyphs 0-7 and fix them around the platen. Starting at the top left
    of the left page and moving clockwise, place glyphs 0, 1, 2 and 3; do the
    same with glyphs 4, 5, 6 and 7 on the right page. Glyphs sit just outside
    the page horizontally and just inside it vertically, so the crop follows
    their inner vertical edges and outer horizontal edges. Page width and
    height are measured along those lines. Offsets move the crop line of one
    edge inward (positive) or outward (negative), in page units.";

/// Everything validated before the image is decoded.
struct Plan {
    request: RenderRequest,
    detector: DetectorParams,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);
    debug!("options: {cli:#?}");

    let plan = match plan(&cli) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    match run(&cli, plan) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}

#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) {
    let _ = tracing_log::LogTracer::init();
    let level = voussoir::core::level_from_flags(cli.verbose, cli.quiet);
    voussoir::core::init_tracing(cli.json_log, level);
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) {
    let level = voussoir::core::level_from_flags(cli.verbose, cli.quiet);
    let _ = voussoir::core::init_with_level(level);
}

fn plan(cli: &Cli) -> Result<Plan, CliError> {
    check_input_path(&cli.input_image)?;

    let page = PageSpec::new(
        cli.page_width.unwrap_or(DEFAULT_PAGE_WIDTH),
        cli.page_height.unwrap_or(DEFAULT_PAGE_HEIGHT),
        cli.dpi,
    )?;
    if cli.estimate_size && !(cli.glyph_size.is_finite() && cli.glyph_size > 0.0) {
        return Err(format!(
            "glyph size must be a finite positive number, got {}",
            cli.glyph_size
        )
        .into());
    }

    let wanted: Vec<PageSide> = PageSide::BOTH
        .into_iter()
        .filter(|side| match side {
            PageSide::Left => !cli.no_left_page,
            PageSide::Right => !cli.no_right_page,
        })
        .collect();
    if wanted.is_empty() {
        return Err("both pages are disabled; nothing to do".into());
    }

    let outputs = assign_outputs(cli, &wanted)?;
    let mut request = RenderRequest {
        page,
        left: None,
        right: None,
        overwrite: cli.overwrite,
    };
    for (side, output) in outputs {
        check_output_path(&output, cli.overwrite)?;
        let req = Some(SideRequest {
            output,
            offsets: cli.offsets.side(side),
        });
        match side {
            PageSide::Left => request.left = req,
            PageSide::Right => request.right = req,
        }
    }
    if let (Some(l), Some(r)) = (&request.left, &request.right) {
        if l.output == r.output {
            return Err(format!("both pages would be written to {}", l.output.display()).into());
        }
    }
    request.validate()?;

    let detector = match &cli.detector_config {
        Some(path) => {
            let params = load_detector_params(path)?;
            info!("detector parameters loaded from {}", path.display());
            params
        }
        None => DetectorParams::default(),
    };

    Ok(Plan { request, detector })
}

/// Outputs go to the requested sides in order, so a single output with
/// `--no-left-page` names the right page.
fn assign_outputs(cli: &Cli, wanted: &[PageSide]) -> Result<Vec<(PageSide, PathBuf)>, CliError> {
    let given: Vec<PathBuf> = [&cli.output_image_one, &cli.output_image_two]
        .into_iter()
        .flatten()
        .cloned()
        .collect();

    if given.len() < wanted.len() {
        let missing = wanted[given.len()];
        let flag = match missing {
            PageSide::Left => "--no-left-page",
            PageSide::Right => "--no-right-page",
        };
        return Err(
            format!("no output image for the {missing} page; give one or pass {flag}").into(),
        );
    }
    if given.len() > wanted.len() {
        return Err(format!(
            "{} output image(s) given but only {} page(s) requested",
            given.len(),
            wanted.len()
        )
        .into());
    }
    Ok(wanted.iter().copied().zip(given).collect())
}

fn run(cli: &Cli, plan: Plan) -> Result<bool, CliError> {
    let Plan {
        mut request,
        detector,
    } = plan;

    let image = load_image(&cli.input_image)
        .map_err(|e| format!("failed to decode {}: {e}", cli.input_image.display()))?;
    info!(
        "loaded {} ({}x{} px)",
        cli.input_image.display(),
        image.width,
        image.height
    );

    let renderer = PageRenderer::new(detector);
    let detections = renderer.detect(&image);

    let mut estimates = Vec::new();
    if cli.estimate_size {
        for side in PageSide::BOTH {
            match estimate_page_size(&detections, side, cli.glyph_size) {
                Ok(estimate) => {
                    info!(
                        "{side} page size estimate: {:.3} x {:.3} (std {:.3}, {:.3})",
                        estimate.width, estimate.height, estimate.width_std, estimate.height_std
                    );
                    estimates.push(SideEstimate { side, estimate });
                }
                Err(e) => warn!("no size estimate for the {side} page: {e}"),
            }
        }
        apply_estimates(cli, &mut request, &estimates)?;
    }

    let mut report = renderer.render_detections(&image, detections, &request);
    report.input = Some(cli.input_image.clone());
    report.size_estimates = estimates;

    if let Some(path) = &cli.report {
        report.write_json(path)?;
        info!("report written to {}", path.display());
    }

    if report.succeeded() {
        return Ok(true);
    }
    let causes: Vec<String> = report.failures().map(|e| e.to_string()).collect();
    eprintln!("error: no page was written: {}", causes.join("; "));
    Ok(false)
}

/// Replace the page dimensions not given on the command line with the
/// averaged estimate.
fn apply_estimates(
    cli: &Cli,
    request: &mut RenderRequest,
    estimates: &[SideEstimate],
) -> Result<(), CliError> {
    if estimates.is_empty() || (cli.page_width.is_some() && cli.page_height.is_some()) {
        return Ok(());
    }
    let n = estimates.len() as f64;
    let width = estimates.iter().map(|e| e.estimate.width).sum::<f64>() / n;
    let height = estimates.iter().map(|e| e.estimate.height).sum::<f64>() / n;

    let page = PageSpec::new(
        cli.page_width.unwrap_or(width),
        cli.page_height.unwrap_or(height),
        request.page.dpi,
    )?;
    info!("using page size {:.3} x {:.3}", page.width, page.height);
    request.page = page;
    request.validate()?;
    Ok(())
}
