pub mod onnx_age_gender_classifier;
pub mod onnx_session;
pub mod onnx_yolo_locator;
