/// Age and gender classification with two Levi-Hassner style ONNX models.
///
/// Both models take a mean-subtracted BGR face crop (Caffe convention) and
/// emit one score per class. The highest-scoring class is mapped onto the
/// configured labels.
use std::path::Path;

use image::imageops::FilterType;

use crate::detection::domain::age_gender_classifier::AgeGenderClassifier;
use crate::shared::frame::Frame;
use crate::shared::labels::{AgeBucket, Gender, Prediction};

use super::onnx_session;

/// Fallback input resolution when the model doesn't declare one.
const DEFAULT_INPUT_SIZE: u32 = 224;

/// Per-channel means in B, G, R order.
const BGR_MEAN: [f32; 3] = [104.0, 117.0, 123.0];

pub struct OnnxAgeGenderClassifier {
    age_session: ort::session::Session,
    gender_session: ort::session::Session,
    age_input: u32,
    gender_input: u32,
    age_buckets: Vec<AgeBucket>,
}

impl OnnxAgeGenderClassifier {
    pub fn new(
        age_model: &Path,
        gender_model: &Path,
        age_buckets: Vec<AgeBucket>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        if age_buckets.is_empty() {
            return Err("age bucket list is empty".into());
        }
        let age_session = onnx_session::open_session(age_model)?;
        let gender_session = onnx_session::open_session(gender_model)?;
        let age_input = onnx_session::input_size(&age_session, DEFAULT_INPUT_SIZE);
        let gender_input = onnx_session::input_size(&gender_session, DEFAULT_INPUT_SIZE);

        Ok(Self {
            age_session,
            gender_session,
            age_input,
            gender_input,
            age_buckets,
        })
    }
}

impl AgeGenderClassifier for OnnxAgeGenderClassifier {
    fn classify(&mut self, crop: &Frame) -> Result<Prediction, Box<dyn std::error::Error>> {
        let gender_scores = run_scores(&mut self.gender_session, crop, self.gender_input)?;
        let gender = *pick_label(&gender_scores, &Gender::ALL, "gender")?;

        let age_scores = run_scores(&mut self.age_session, crop, self.age_input)?;
        let age = pick_label(&age_scores, &self.age_buckets, "age")?.clone();

        Ok(Prediction { age, gender })
    }
}

fn run_scores(
    session: &mut ort::session::Session,
    crop: &Frame,
    input_size: u32,
) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
    let input = preprocess(crop, input_size)?;
    let input_value = ort::value::Tensor::from_array(input)?;
    let outputs = session.run(ort::inputs![input_value])?;
    if outputs.len() == 0 {
        return Err("classifier produced no outputs".into());
    }
    let scores = outputs[0].try_extract_array::<f32>()?;
    Ok(scores.iter().copied().collect())
}

/// Resizes `crop` to `size`×`size` and lays it out as a `[1, 3, H, W]` BGR
/// tensor with the channel means removed.
fn preprocess(crop: &Frame, size: u32) -> Result<ndarray::Array4<f32>, Box<dyn std::error::Error>> {
    if crop.width() == 0 || crop.height() == 0 {
        return Err("cannot classify an empty crop".into());
    }
    let resized = image::imageops::resize(&crop.to_rgb_image(), size, size, FilterType::Triangle);

    let s = size as usize;
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));
    for (x, y, px) in resized.enumerate_pixels() {
        let [r, g, b] = px.0;
        let (x, y) = (x as usize, y as usize);
        tensor[[0, 0, y, x]] = b as f32 - BGR_MEAN[0];
        tensor[[0, 1, y, x]] = g as f32 - BGR_MEAN[1];
        tensor[[0, 2, y, x]] = r as f32 - BGR_MEAN[2];
    }
    Ok(tensor)
}

/// Label at the index of the highest score. A score vector whose length
/// differs from the label list means the model and labels disagree.
fn pick_label<'a, T>(
    scores: &[f32],
    labels: &'a [T],
    head: &str,
) -> Result<&'a T, Box<dyn std::error::Error>> {
    if scores.len() != labels.len() {
        return Err(format!(
            "{head} model emits {} classes but {} labels are configured",
            scores.len(),
            labels.len()
        )
        .into());
    }
    let best = scores
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .ok_or_else(|| format!("{head} model produced no scores"))?;
    Ok(&labels[best])
}
