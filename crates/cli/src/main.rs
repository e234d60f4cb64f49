mod settings;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use facecensus_core::annotation::infrastructure::label_annotator::LabelAnnotator;
use facecensus_core::catalog::domain::person_record::{PersonId, PersonRecord};
use facecensus_core::catalog::domain::result_store::ResultStore;
use facecensus_core::catalog::infrastructure::json_result_store::JsonResultStore;
use facecensus_core::detection::domain::age_gender_detector::AgeGenderDetector;
use facecensus_core::detection::domain::face_detector::FaceDetector;
use facecensus_core::detection::infrastructure::onnx_age_gender_classifier::OnnxAgeGenderClassifier;
use facecensus_core::detection::infrastructure::onnx_yolo_locator::OnnxYoloLocator;
use facecensus_core::pipeline::pipeline_logger::SummaryPipelineLogger;
use facecensus_core::pipeline::process_video_use_case::{ProcessVideoUseCase, ProcessingReport};
use facecensus_core::pipeline::processing_config::ProcessingConfig;
use facecensus_core::shared::model_resolver::{ModelLocations, ModelPaths, NamedProgressFn};
use facecensus_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use facecensus_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;

use settings::Settings;

/// Catalog the people seen in a video: track faces, settle each person's
/// age and gender, and write an annotated copy of the video.
#[derive(Parser)]
#[command(name = "facecensus", version)]
struct Cli {
    /// Settings file (JSON). Defaults to the per-user settings file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the catalog and face crops.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process one video and catalog every person confirmed in it.
    Process(ProcessArgs),
    /// List every stored person.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Print one stored person as JSON.
    Show { id: String },
    /// Export a stored face crop.
    Face { id: String, dest: PathBuf },
    /// Remove every stored person and face crop.
    Clear,
    /// Download any missing models and print where they live.
    Models,
}

#[derive(Args)]
struct ProcessArgs {
    /// Input video file.
    input: PathBuf,

    /// Annotated output video. Defaults to `<output_dir>/output_<stem>.mp4`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Pixels added on every side of a face before classification.
    #[arg(long)]
    padding: Option<u32>,

    /// Observations needed before a person's label is frozen.
    #[arg(long)]
    frames_to_stabilize: Option<usize>,

    /// Frames a face may go unseen before its track is dropped.
    #[arg(long)]
    max_track_age: Option<usize>,

    /// Minimum box overlap (IoU) to continue a track.
    #[arg(long)]
    min_iou: Option<f64>,

    /// Print the full report as JSON.
    #[arg(long)]
    json: bool,
}

fn main() {
    // Progress is reported through the pipeline logger at info
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        settings.data_dir = Some(dir);
    }

    match cli.command {
        Command::Process(args) => run_process(&settings, args),
        Command::List { json } => {
            let records = open_store(&settings)?.list_records()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                print_records(&records);
            }
            Ok(())
        }
        Command::Show { id } => {
            let id: PersonId = id.parse()?;
            let record = open_store(&settings)?.get_record(&id)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Command::Face { id, dest } => {
            let id: PersonId = id.parse()?;
            let crop = open_store(&settings)?.get_face_crop(&id)?;
            crop.to_rgb_image().save(&dest)?;
            log::info!("Face crop for {id} written to {}", dest.display());
            Ok(())
        }
        Command::Clear => {
            let store = open_store(&settings)?;
            let count = store.list_records()?.len();
            store.clear_all()?;
            println!("Removed {count} persons");
            Ok(())
        }
        Command::Models => {
            let paths = resolve_models(&settings)?;
            println!("face:   {}", paths.face.display());
            println!("age:    {}", paths.age.display());
            println!("gender: {}", paths.gender.display());
            Ok(())
        }
    }
}

fn run_process(settings: &Settings, args: ProcessArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.input.exists() {
        return Err(format!("Input file not found: {}", args.input.display()).into());
    }
    let config = processing_config(settings, &args);
    config.validate()?;

    let output = match &args.output {
        Some(path) => path.clone(),
        None => default_output_path(&settings.output_dir()?, &args.input),
    };
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let detector = build_detector(settings, &config)?;
    let store: Arc<dyn ResultStore> = Arc::new(open_store(settings)?);

    let use_case = ProcessVideoUseCase::new(
        Box::new(FfmpegReader::new()),
        Box::new(FfmpegWriter::new()),
        detector,
        Box::new(LabelAnnotator::new()),
        store,
        config,
    )
    .with_logger(Box::new(SummaryPipelineLogger::default()));
    let report = use_case.execute(&args.input, &output)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    for id in &report.unpersisted {
        eprintln!("Warning: person {id} was not saved to the catalog");
    }
    Ok(())
}

/// Settings file values, overridden by whichever flags were given.
fn processing_config(settings: &Settings, args: &ProcessArgs) -> ProcessingConfig {
    let base = settings.processing_config();
    ProcessingConfig {
        conf_threshold: args.confidence.unwrap_or(base.conf_threshold),
        padding: args.padding.unwrap_or(base.padding),
        frames_to_stabilize: args.frames_to_stabilize.unwrap_or(base.frames_to_stabilize),
        max_track_age: args.max_track_age.unwrap_or(base.max_track_age),
        min_iou: args.min_iou.unwrap_or(base.min_iou),
    }
}

fn default_output_path(output_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    output_dir.join(format!("output_{stem}.mp4"))
}

fn open_store(settings: &Settings) -> Result<JsonResultStore, Box<dyn std::error::Error>> {
    Ok(JsonResultStore::open(settings.data_dir()?)?)
}

fn model_locations(settings: &Settings) -> ModelLocations {
    let bundled_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")));
    ModelLocations {
        cache_dir: settings.models_dir.clone(),
        bundled_dir,
    }
}

fn resolve_models(settings: &Settings) -> Result<ModelPaths, Box<dyn std::error::Error>> {
    let progress: NamedProgressFn = Arc::new(download_progress);
    let paths = model_locations(settings).resolve_all(Some(progress))?;
    Ok(paths)
}

fn build_detector(
    settings: &Settings,
    config: &ProcessingConfig,
) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    let paths = resolve_models(settings)?;
    log::info!("Loading models from {}", paths.face.display());

    let locator = OnnxYoloLocator::new(&paths.face, config.conf_threshold)?;
    let classifier =
        OnnxAgeGenderClassifier::new(&paths.age, &paths.gender, settings.age_buckets())?;
    Ok(Box::new(AgeGenderDetector::from_config(
        Box::new(locator),
        Box::new(classifier),
        config,
    )))
}

fn print_report(report: &ProcessingReport) {
    println!("Run:     {}", report.run_id);
    println!("Output:  {}", report.output_video.display());
    println!("Frames:  {}", report.frames_processed);
    if report.detection_failures > 0 {
        println!("Detector failures: {}", report.detection_failures);
    }
    println!();
    print_records(&report.persons);
}

fn print_records(records: &[PersonRecord]) {
    if records.is_empty() {
        println!("No persons.");
        return;
    }
    println!(
        "{:<20} {:<7} {:<9} {:<20} IMAGE",
        "ID", "GENDER", "AGE", "ENTRY (UTC)"
    );
    for r in records {
        println!(
            "{:<20} {:<7} {:<9} {:<20} {}",
            r.id.to_string(),
            r.gender.to_string(),
            r.age.as_str(),
            r.entry_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            r.image.as_deref().unwrap_or("-")
        );
    }
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
}
