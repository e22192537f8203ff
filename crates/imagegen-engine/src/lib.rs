pub mod transport;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use imagegen_contracts::events::{EventPayload, EventWriter, GeneratorEvent};
use imagegen_contracts::prompts::{enhance_prompt, mock_prompt};
use imagegen_contracts::results::{
    count_successful, image_filename, now_utc_iso, write_results, ArtifactKind, GenerationRequest,
    GenerationResult, DEFAULT_RESULTS_FILENAME,
};
use log::{debug, info, warn};
use rand::Rng;
use serde_json::{json, Value};

pub use crate::transport::{
    ImageGenerationPayload, ImageTransport, OpenAiTransport, TransportError, DEFAULT_API_BASE,
};

pub const DEFAULT_OUTPUT_DIR: &str = "generated_images";
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_secs(2);

const PLACEHOLDER_BASE: &str = "https://picsum.photos/1024/1024";
const RANDOM_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const RANDOM_ID_LEN: usize = 8;

/// Chosen once at construction; there is no way to switch modes afterwards.
pub enum GeneratorMode {
    Live(Box<dyn ImageTransport>),
    Mock,
}

#[derive(Debug)]
pub enum GenerationFailure {
    Transport(TransportError),
    Save { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationFailure::Transport(err) => write!(f, "{}", err),
            GenerationFailure::Save { path, source } => {
                write!(f, "failed to save {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for GenerationFailure {}

impl From<TransportError> for GenerationFailure {
    fn from(err: TransportError) -> Self {
        GenerationFailure::Transport(err)
    }
}

pub struct Generator {
    mode: GeneratorMode,
    output_dir: PathBuf,
    batch_delay: Duration,
    events: Option<EventWriter>,
}

impl Generator {
    /// Builds a generator talking to the default OpenAI endpoint. A missing or
    /// blank key puts the instance in mock mode for its whole lifetime.
    pub fn new(api_key: Option<String>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_api_base(api_key, output_dir, DEFAULT_API_BASE)
    }

    pub fn with_api_base(
        api_key: Option<String>,
        output_dir: impl Into<PathBuf>,
        api_base: &str,
    ) -> Result<Self> {
        let api_key = api_key
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let mode = match api_key {
            Some(key) => {
                info!("OpenAI API key loaded: {}", mask_key(&key));
                GeneratorMode::Live(Box::new(OpenAiTransport::new(key, api_base)))
            }
            None => {
                warn!("No OpenAI API key found. Will use mock responses.");
                GeneratorMode::Mock
            }
        };
        Self::with_mode(mode, output_dir)
    }

    pub fn with_transport(
        transport: Box<dyn ImageTransport>,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        Self::with_mode(GeneratorMode::Live(transport), output_dir)
    }

    pub fn with_mode(mode: GeneratorMode, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).with_context(|| {
            format!("failed to create output directory {}", output_dir.display())
        })?;
        Ok(Self {
            mode,
            output_dir,
            batch_delay: DEFAULT_BATCH_DELAY,
            events: None,
        })
    }

    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        info!(
            "Recording events for run {} to {}",
            events.run_id(),
            events.path().display()
        );
        self.events = Some(events);
        let mut payload = EventPayload::new();
        payload.insert("mock_mode".to_string(), json!(self.is_mock()));
        payload.insert(
            "output_dir".to_string(),
            json!(self.output_dir.to_string_lossy()),
        );
        self.emit(GeneratorEvent::GeneratorReady, payload);
        self
    }

    pub fn is_mock(&self) -> bool {
        matches!(self.mode, GeneratorMode::Mock)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn batch_delay(&self) -> Duration {
        self.batch_delay
    }

    pub fn enhance_prompt(&self, description: &str, business_name: &str) -> String {
        enhance_prompt(description, business_name)
    }

    /// Always returns a successful result; provider failures are logged and
    /// replaced by a mock result.
    pub fn generate_image(&self, description: &str, business_name: &str) -> GenerationResult {
        info!("Generating image: {description}");
        self.emit(
            GeneratorEvent::GenerationStarted,
            payload_of(json!({
                "description": description,
                "business_name": business_name,
                "mock_mode": self.is_mock(),
            })),
        );

        let transport = match &self.mode {
            GeneratorMode::Mock => {
                info!("Mock mode: returning a placeholder image");
                return self.generate_mock_result(description);
            }
            GeneratorMode::Live(transport) => transport.as_ref(),
        };

        self.generate_live(transport, description, business_name)
            .unwrap_or_else(|failure| self.fall_back(description, failure))
    }

    pub fn generate_mock_result(&self, description: &str) -> GenerationResult {
        let stamp = chrono::Utc::now().timestamp_millis();
        let filename = image_filename(ArtifactKind::MockGenerated, stamp, &random_id());

        GenerationResult {
            success: true,
            image_url: format!("{}?random={}", PLACEHOLDER_BASE, stamp),
            local_path: self.output_dir.join(&filename).to_string_lossy().to_string(),
            filename,
            description: description.to_string(),
            prompt: mock_prompt(description),
            business_name: None,
            mock: true,
            generated_at: now_utc_iso(),
        }
    }

    pub fn generate_batch(&self, requests: &[GenerationRequest]) -> Vec<GenerationResult> {
        let total = requests.len();
        info!("Generating {total} images...");
        let mut results = Vec::with_capacity(total);

        for (idx, request) in requests.iter().enumerate() {
            info!("--- Image {}/{} ---", idx + 1, total);
            results.push(self.generate_image(&request.description, &request.business_name));

            if idx + 1 < total && !self.is_mock() {
                info!(
                    "Waiting {} ms between requests...",
                    self.batch_delay.as_millis()
                );
                self.emit(
                    GeneratorEvent::BatchWait,
                    payload_of(json!({
                        "after": idx + 1,
                        "delay_ms": self.batch_delay.as_millis() as u64,
                    })),
                );
                thread::sleep(self.batch_delay);
            }
        }

        let successful = count_successful(&results);
        info!("Completed: {successful}/{total} images generated successfully");
        self.emit(
            GeneratorEvent::BatchFinished,
            payload_of(json!({
                "total": total,
                "successful": successful,
                "mock_count": results.iter().filter(|result| result.mock).count(),
            })),
        );
        results
    }

    pub fn save_results(&self, results: &[GenerationResult]) -> Result<PathBuf> {
        self.save_results_as(results, DEFAULT_RESULTS_FILENAME)
    }

    pub fn save_results_as(&self, results: &[GenerationResult], filename: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(filename);
        write_results(&path, results)?;
        info!("Results saved to: {}", path.display());
        self.emit(
            GeneratorEvent::ResultsSaved,
            payload_of(json!({
                "path": path.to_string_lossy(),
                "count": results.len(),
            })),
        );
        Ok(path)
    }

    fn generate_live(
        &self,
        transport: &dyn ImageTransport,
        description: &str,
        business_name: &str,
    ) -> Result<GenerationResult, GenerationFailure> {
        let prompt = enhance_prompt(description, business_name);
        let payload = ImageGenerationPayload::for_prompt(prompt.as_str());

        info!("Sending request to OpenAI DALL-E...");
        let image_url = transport.request_image(&payload)?;

        info!("Downloading generated image...");
        let bytes = transport.download(&image_url)?;
        let stamp = chrono::Utc::now().timestamp_millis();
        let filename = image_filename(ArtifactKind::Generated, stamp, &random_id());
        let path = self.output_dir.join(&filename);
        fs::write(&path, &bytes).map_err(|source| GenerationFailure::Save {
            path: path.clone(),
            source,
        })?;
        debug!("wrote {} bytes to {}", bytes.len(), path.display());
        info!("Image generated successfully: {filename}");

        self.emit(
            GeneratorEvent::ImageSaved,
            payload_of(json!({
                "filename": &filename,
                "bytes": bytes.len(),
                "image_url": &image_url,
            })),
        );

        Ok(GenerationResult {
            success: true,
            image_url,
            local_path: path.to_string_lossy().to_string(),
            filename,
            description: description.to_string(),
            prompt,
            business_name: Some(business_name.to_string()),
            mock: false,
            generated_at: now_utc_iso(),
        })
    }

    fn fall_back(&self, description: &str, failure: GenerationFailure) -> GenerationResult {
        warn!("Image generation failed, using a mock response instead: {failure}");
        self.emit(
            GeneratorEvent::GenerationFallback,
            payload_of(json!({
                "description": description,
                "error": failure.to_string(),
            })),
        );
        self.generate_mock_result(description)
    }

    fn emit(&self, event: GeneratorEvent, payload: EventPayload) {
        let Some(events) = &self.events else {
            return;
        };
        if let Err(err) = events.emit(event, payload) {
            warn!("failed to record {} event: {err:#}", event.as_str());
        }
    }
}

fn random_id() -> String {
    let mut rng = rand::thread_rng();
    (0..RANDOM_ID_LEN)
        .map(|_| RANDOM_ID_ALPHABET[rng.gen_range(0..RANDOM_ID_ALPHABET.len())] as char)
        .collect()
}

fn mask_key(key: &str) -> String {
    let visible: String = key.chars().take(8).collect();
    format!("{visible}…")
}

fn payload_of(value: Value) -> EventPayload {
    value.as_object().cloned().unwrap_or_default()
}
