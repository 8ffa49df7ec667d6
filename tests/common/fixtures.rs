use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use seefood::app::PresentationSink;
use seefood::{
    Classification, ClassificationPipeline, Decision, DecisionRule, ImageClassifier, InferenceError,
    NormalizedImage, RawImage,
};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

pub const RED: [u8; 3] = [255, 0, 0];
pub const BLUE: [u8; 3] = [0, 0, 255];
pub const GREEN: [u8; 3] = [0, 255, 0];

/// Encodes a solid-color 64x48 image in the given format.
pub fn encoded_image(color: [u8; 3], format: ImageFormat) -> Vec<u8> {
    let img = ImageBuffer::from_fn(64, 48, |_, _| Rgb(color));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("Failed to encode test image");
    bytes
}

/// A solid-color PNG wrapped as a RawImage without a format hint.
pub fn png_image(color: [u8; 3]) -> RawImage {
    RawImage::new(encoded_image(color, ImageFormat::Png), None)
}

pub fn corrupt_image() -> RawImage {
    RawImage::new(b"\x89PNG\r\n\x1a\nthis is not really a png".to_vec(), Some(ImageFormat::Png))
}

pub fn ranking(pairs: &[(&str, f32)]) -> Vec<Classification> {
    pairs
        .iter()
        .map(|(label, confidence)| Classification::new(*label, *confidence))
        .collect()
}

pub fn pipeline_with(classifier: Arc<dyn ImageClassifier>) -> ClassificationPipeline {
    ClassificationPipeline::new(classifier, DecisionRule::default())
}

/// Answers according to the color of the image's first pixel.
///
/// A color can be gated: its classification then waits until the test
/// releases the gate, which lets tests control completion order.
pub struct ColorClassifier {
    responses: HashMap<[u8; 3], Vec<Classification>>,
    gates: Mutex<HashMap<[u8; 3], oneshot::Receiver<()>>>,
}

impl ColorClassifier {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn respond(mut self, color: [u8; 3], pairs: &[(&str, f32)]) -> Self {
        self.responses.insert(color, ranking(pairs));
        self
    }

    /// Gate `color`; the returned sender releases it.
    pub fn gate(&self, color: [u8; 3]) -> oneshot::Sender<()> {
        let (sender, receiver) = oneshot::channel();
        self.gates.lock().unwrap().insert(color, receiver);
        sender
    }
}

#[async_trait]
impl ImageClassifier for ColorClassifier {
    fn input_size(&self) -> (u32, u32) {
        (32, 32)
    }

    async fn classify(&self, image: &NormalizedImage) -> Result<Vec<Classification>, InferenceError> {
        let color = image.pixels.get_pixel(0, 0).0;

        let gate = self.gates.lock().unwrap().remove(&color);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        self.responses
            .get(&color)
            .cloned()
            .ok_or_else(|| InferenceError::Runtime(format!("no response scripted for {color:?}")))
    }

    fn name(&self) -> &str {
        "color"
    }
}

/// Always fails the way a broken model run would.
pub struct FailingClassifier;

#[async_trait]
impl ImageClassifier for FailingClassifier {
    fn input_size(&self) -> (u32, u32) {
        (16, 16)
    }

    async fn classify(&self, _image: &NormalizedImage) -> Result<Vec<Classification>, InferenceError> {
        Err(InferenceError::Runtime("model exploded".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// What a sink was asked to show.
#[derive(Debug, Clone, PartialEq)]
pub enum Shown {
    Decision { origin: String, label: String },
    Error { origin: String, message: String },
}

/// Sink that forwards everything to a channel so tests can watch it live.
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<Shown>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Shown>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl PresentationSink for ChannelSink {
    fn present(&mut self, image: &RawImage, decision: &Decision) {
        let _ = self.sender.send(Shown::Decision {
            origin: image.display_name(),
            label: decision.label.clone(),
        });
    }

    fn report_error(&mut self, origin: &str, message: &str) {
        let _ = self.sender.send(Shown::Error {
            origin: origin.to_string(),
            message: message.to_string(),
        });
    }
}

/// Drain whatever the sink has produced so far.
pub fn drain(receiver: &mut mpsc::UnboundedReceiver<Shown>) -> Vec<Shown> {
    let mut shown = Vec::new();
    while let Ok(item) = receiver.try_recv() {
        shown.push(item);
    }
    shown
}
