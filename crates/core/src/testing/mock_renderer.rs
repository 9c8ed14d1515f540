//! Mock document renderer for testing.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use crate::render::{DocumentRenderer, RenderError, RenderedDocument};
use crate::source::{CandidateLot, TrackedEntity};

/// Mock implementation of the DocumentRenderer trait.
///
/// Writes a small placeholder file per render into `output_dir` and
/// records which lots were rendered.
#[derive(Debug, Clone)]
pub struct MockRenderer {
    output_dir: PathBuf,
    rendered: Arc<Mutex<Vec<(String, CandidateLot)>>>,
    paths: Arc<Mutex<Vec<PathBuf>>>,
    failing: Arc<Mutex<bool>>,
    delay: Arc<Mutex<Duration>>,
}

impl MockRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            rendered: Arc::new(Mutex::new(Vec::new())),
            paths: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(Mutex::new(false)),
            delay: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    /// Block the calling thread this long on every render.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// (entity, lot) pairs rendered so far.
    pub fn rendered(&self) -> Vec<(String, CandidateLot)> {
        self.rendered.lock().unwrap().clone()
    }

    /// Paths of every file written so far.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.lock().unwrap().clone()
    }
}

impl DocumentRenderer for MockRenderer {
    fn name(&self) -> &str {
        "mock"
    }

    fn render(
        &self,
        entity: &TrackedEntity,
        lot: &CandidateLot,
    ) -> Result<RenderedDocument, RenderError> {
        if *self.failing.lock().unwrap() {
            return Err(RenderError::Pdf("mock failure".to_string()));
        }

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let path = self.output_dir.join(format!("{}.pdf", Uuid::new_v4()));
        std::fs::write(&path, b"%PDF-mock").map_err(|source| RenderError::Io {
            path: path.clone(),
            source,
        })?;

        self.rendered
            .lock()
            .unwrap()
            .push((entity.name().to_string(), lot.clone()));
        self.paths.lock().unwrap().push(path.clone());

        Ok(RenderedDocument::new(path, "Заявка.pdf", "application/pdf"))
    }
}
