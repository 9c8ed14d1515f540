//! PDF application form.

use std::fs::File;
use std::io::BufWriter;

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{ApplicantConfig, DocumentConfig};
use crate::source::{CandidateLot, TrackedEntity};

use super::{DocumentRenderer, RenderError, RenderedDocument};

const TITLE: &str = "ЗАЯВКА";
const DISPLAY_NAME: &str = "Заявка.pdf";
const CONTENT_TYPE: &str = "application/pdf";

// US letter.
const PAGE_WIDTH_MM: f32 = 215.9;
const PAGE_HEIGHT_MM: f32 = 279.4;
const MARGIN_MM: f32 = 25.4;

const TITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 11.0;
const LEADING_MM: f32 = 14.0 * PT_TO_MM;
const SPACER_MM: f32 = 20.0 * PT_TO_MM;
const PT_TO_MM: f32 = 0.3528;

/// Wrap width for body text, in characters.
const WRAP_CHARS: usize = 80;

/// One line of the application form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentLine {
    Title(String),
    Text(String),
    Spacer,
}

/// Lines of the application form for `lot`, top to bottom.
pub fn application_lines(
    entity: &TrackedEntity,
    lot: &CandidateLot,
    applicant: &ApplicantConfig,
) -> Vec<DocumentLine> {
    fn or_na(value: &Option<String>) -> &str {
        value.as_deref().unwrap_or("N/A")
    }

    let passport = match (&applicant.passport_series, &applicant.passport_number) {
        (None, None) => "N/A".to_string(),
        (series, number) => format!("{} {}", or_na(series), or_na(number)),
    };
    let ogrnip = match &applicant.ogrnip_date {
        Some(date) => format!("{} от {}", or_na(&applicant.ogrnip), date),
        None => or_na(&applicant.ogrnip).to_string(),
    };

    vec![
        DocumentLine::Title(TITLE.to_string()),
        DocumentLine::Spacer,
        DocumentLine::Text(format!("Лот №: {}", lot.lot_number_or_na())),
        DocumentLine::Text(format!("Должник: {}", lot.debtor_name_or_na())),
        DocumentLine::Text(format!("Управляющий: {}", entity)),
        DocumentLine::Spacer,
        DocumentLine::Text("ИНФОРМАЦИЯ О ЗАЯВИТЕЛЕ:".to_string()),
        DocumentLine::Text(format!("ФИО: {}", or_na(&applicant.full_name))),
        DocumentLine::Text(format!("Дата рождения: {}", or_na(&applicant.birth_date))),
        DocumentLine::Text(format!("Паспорт: {}", passport)),
        DocumentLine::Text(format!("ИНН: {}", or_na(&applicant.inn))),
        DocumentLine::Text(format!("ОГРНИП: {}", ogrnip)),
        DocumentLine::Text(format!("Адрес: {}", or_na(&applicant.residence_address))),
        DocumentLine::Text(format!("Телефон: {}", or_na(&applicant.phone))),
        DocumentLine::Text(format!("Email: {}", or_na(&applicant.email))),
        DocumentLine::Spacer,
        DocumentLine::Text(format!(
            "___________________ / {}",
            or_na(&applicant.short_name)
        )),
    ]
}

/// Renders the application form to a PDF with `printpdf`.
pub struct PdfRenderer {
    config: DocumentConfig,
    applicant: ApplicantConfig,
    font: Option<Vec<u8>>,
}

impl PdfRenderer {
    /// Create a renderer. The font is read once here; if it cannot be read
    /// documents fall back to a built-in font without Cyrillic glyphs.
    pub fn new(config: DocumentConfig, applicant: ApplicantConfig) -> Self {
        let font = match std::fs::read(&config.font_path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(
                    font = %config.font_path.display(),
                    error = %e,
                    "Font not readable, using built-in Helvetica"
                );
                None
            }
        };

        Self {
            config,
            applicant,
            font,
        }
    }

    fn font(&self, doc: &PdfDocumentReference) -> Result<IndirectFontRef, RenderError> {
        if let Some(bytes) = &self.font {
            match doc.add_external_font(bytes.as_slice()) {
                Ok(font) => return Ok(font),
                Err(e) => warn!(
                    font = %self.config.font_path.display(),
                    error = ?e,
                    "Font not usable, using built-in Helvetica"
                ),
            }
        }

        doc.add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| RenderError::Pdf(format!("{:?}", e)))
    }
}

impl DocumentRenderer for PdfRenderer {
    fn name(&self) -> &str {
        "pdf"
    }

    fn render(
        &self,
        entity: &TrackedEntity,
        lot: &CandidateLot,
    ) -> Result<RenderedDocument, RenderError> {
        let (doc, page, layer) =
            PdfDocument::new(TITLE, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let font = self.font(&doc)?;

        let mut layer = doc.get_page(page).get_layer(layer);
        let mut y = PAGE_HEIGHT_MM - MARGIN_MM;

        for line in application_lines(entity, lot, &self.applicant) {
            match line {
                DocumentLine::Title(text) => {
                    let width = approx_width_mm(&text, TITLE_SIZE);
                    let x = ((PAGE_WIDTH_MM - width) / 2.0).max(MARGIN_MM);
                    layer.use_text(text, TITLE_SIZE, Mm(x), Mm(y), &font);
                    y -= TITLE_SIZE * PT_TO_MM + SPACER_MM;
                }
                DocumentLine::Spacer => y -= SPACER_MM,
                DocumentLine::Text(text) => {
                    for chunk in wrap(&text, WRAP_CHARS) {
                        if y < MARGIN_MM {
                            let (next_page, next_layer) =
                                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
                            layer = doc.get_page(next_page).get_layer(next_layer);
                            y = PAGE_HEIGHT_MM - MARGIN_MM;
                        }
                        layer.use_text(chunk, BODY_SIZE, Mm(MARGIN_MM), Mm(y), &font);
                        y -= LEADING_MM;
                    }
                }
            }
        }

        let path = self
            .config
            .output_dir
            .join(format!("application-{}.pdf", Uuid::new_v4()));
        let file = File::create(&path).map_err(|source| RenderError::Io {
            path: path.clone(),
            source,
        })?;
        let document = RenderedDocument::new(&path, DISPLAY_NAME, CONTENT_TYPE);

        doc.save(&mut BufWriter::new(file))
            .map_err(|e| RenderError::Pdf(format!("{:?}", e)))?;

        debug!(path = %path.display(), entity = %entity, "Rendered application");
        Ok(document)
    }
}

fn approx_width_mm(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.6 * PT_TO_MM
}

/// Split `text` on whitespace into lines of at most `width` characters.
/// Words longer than `width` get a line of their own.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_len > 0 && current_len + 1 + word_len > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
