#![allow(dead_code)]

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use mineral_id::classifier::{InferenceError, LabelDecoder, MineralClassifier};
use mineral_id::preprocess::{
    FittedScaler, ImageNormalizer, ImageTensor, TabularFeatures, TabularNormalizer,
};
use mineral_id::server::AppState;
use mineral_id::{ArtifactContext, Predictor, PropertyBounds};

pub const BOUNDARY: &str = "----mineral-test-boundary";

/// A model stand-in that always returns the same output.
#[derive(Debug)]
pub struct StubClassifier(pub Result<Vec<f32>, InferenceError>);

impl MineralClassifier for StubClassifier {
    fn name(&self) -> &str {
        "stub"
    }

    fn predict_proba(
        &self,
        image: &ImageTensor,
        _features: &TabularFeatures,
    ) -> Result<Vec<f32>, InferenceError> {
        assert_eq!(image.shape(), &[380, 380, 3]);
        self.0.clone()
    }
}

pub fn labels() -> Vec<String> {
    ["Calcite", "Diamant", "Feldspath", "Gypse", "Quartz"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn app_state(model: Option<StubClassifier>) -> AppState {
    let tabular = TabularNormalizer::new(FittedScaler::Standard {
        mean: vec![5.0, 3.0],
        scale: vec![2.0, 1.0],
    })
    .unwrap();
    let labels = LabelDecoder::new(labels()).unwrap();
    let model = model.map(|m| Box::new(m) as Box<dyn MineralClassifier>);
    let artifacts = ArtifactContext::from_parts(tabular, labels, model);
    let predictor = Predictor::new(
        artifacts,
        ImageNormalizer::default(),
        PropertyBounds::default(),
    );
    AppState::new(predictor, 1024 * 1024)
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::from(RgbImage::from_pixel(width, height, Rgb([120, 80, 200])))
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}
