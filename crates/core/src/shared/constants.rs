pub const FACE_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const FACE_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const AGE_MODEL_NAME: &str = "age_googlenet.onnx";
pub const AGE_MODEL_URL: &str =
    "https://github.com/onnx/models/raw/main/validated/vision/body_analysis/age_gender/models/age_googlenet.onnx";

pub const GENDER_MODEL_NAME: &str = "gender_googlenet.onnx";
pub const GENDER_MODEL_URL: &str =
    "https://github.com/onnx/models/raw/main/validated/vision/body_analysis/age_gender/models/gender_googlenet.onnx";

/// Age head of the Levi-Hassner style classifiers, in output order.
pub const DEFAULT_AGE_BUCKETS: &[&str] = &[
    "(0-2)", "(4-6)", "(8-12)", "(15-20)", "(25-32)", "(38-43)", "(48-53)", "(60-100)",
];

pub const DEFAULT_CONFIDENCE: f64 = 0.5;
/// Pixels added on every side of a detected face before cropping.
pub const DEFAULT_PADDING: u32 = 20;
pub const DEFAULT_FRAMES_TO_STABILIZE: usize = 3;
/// Frames a track may go unmatched before it is dropped.
pub const DEFAULT_MAX_TRACK_AGE: usize = 5;
pub const DEFAULT_MIN_IOU: f64 = 0.3;

pub const CATALOG_FILE_NAME: &str = "detections.json";
pub const FACES_DIR_NAME: &str = "faces";

pub const APP_DIR_NAME: &str = "FaceCensus";

/// Output frame rate used when the source container reports none.
pub const FALLBACK_FPS: f64 = 30.0;
