use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::{Map, Value};

use crate::results::now_utc_iso;

pub type EventPayload = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorEvent {
    GeneratorReady,
    GenerationStarted,
    GenerationFallback,
    ImageSaved,
    BatchWait,
    BatchFinished,
    ResultsSaved,
}

impl GeneratorEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            GeneratorEvent::GeneratorReady => "generator_ready",
            GeneratorEvent::GenerationStarted => "generation_started",
            GeneratorEvent::GenerationFallback => "generation_fallback",
            GeneratorEvent::ImageSaved => "image_saved",
            GeneratorEvent::BatchWait => "batch_wait",
            GeneratorEvent::BatchFinished => "batch_finished",
            GeneratorEvent::ResultsSaved => "results_saved",
        }
    }
}

/// Append-only `events.jsonl` writer.
///
/// Every line is one compact object with `type`, `run_id` and `ts`; payload
/// keys are merged afterwards and win on collision.
#[derive(Debug, Clone)]
pub struct EventWriter {
    path: PathBuf,
    run_id: String,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            run_id: run_id.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn emit(&self, event: GeneratorEvent, payload: EventPayload) -> anyhow::Result<Value> {
        let mut row = Map::new();
        row.insert("type".to_string(), Value::String(event.as_str().to_string()));
        row.insert("run_id".to_string(), Value::String(self.run_id.clone()));
        row.insert("ts".to_string(), Value::String(now_utc_iso()));
        row.extend(payload);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let mut line = serde_json::to_string(&row)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;

        Ok(Value::Object(row))
    }
}
