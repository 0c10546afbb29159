//! Text-recognition collaborator boundary.
//!
//! The engine never performs OCR. A recognizer turns one page image into text;
//! pages are concatenated in order and only then segmented. A failed page
//! fails the whole exam so garbled text never reaches the segmenter.

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::error::RecognitionError;

/// Text recognized on one page.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recognition {
  pub full_text: String,
  pub confidence: f64,
}

#[async_trait]
pub trait TextRecognizer: Send + Sync {
  fn name(&self) -> &'static str;

  /// Recognize one page. Errors carry a human-readable reason.
  async fn recognize(&self, image_path: &Path) -> Result<Recognition, String>;
}

/// Recognize every page in order and join the text. Average page confidence is returned.
#[instrument(level = "info", skip(recognizer, pages), fields(recognizer = recognizer.name(), pages = pages.len()))]
pub async fn recognize_pages<P: AsRef<Path> + Sync>(
  recognizer: &dyn TextRecognizer,
  pages: &[P],
) -> Result<Recognition, RecognitionError> {
  if pages.is_empty() {
    return Err(RecognitionError::NoPages);
  }

  let mut texts = Vec::with_capacity(pages.len());
  let mut confidence_sum = 0.0;
  for (i, page) in pages.iter().enumerate() {
    let page_no = i + 1;
    match recognizer.recognize(page.as_ref()).await {
      Ok(r) => {
        confidence_sum += r.confidence;
        texts.push(r.full_text);
      }
      Err(reason) => {
        error!(target: "exam_grader", page = page_no, %reason, "Text recognition failed");
        return Err(RecognitionError::Failed { page: page_no, reason });
      }
    }
  }

  let confidence = confidence_sum / pages.len() as f64;
  info!(target: "exam_grader", confidence, "Recognition finished");
  Ok(Recognition { full_text: texts.join("\n"), confidence })
}

/// Canned recognizer for development and tests: every page reads as the same
/// ten-question English exam sheet.
#[derive(Clone, Debug, Default)]
pub struct MockRecognizer;

pub const MOCK_EXAM_TEXT: &str = r#"English Exam

1. What is the capital of England?
   ③

2. She ___ to school every day.
   goes

3. Choose the correct sentence.
   ②

4. The weather is ___ today.
   beautiful

5. Which word means "happy"?
   ④

6. Write the past tense of "go".
   went

7. She is ___ than her sister.
   taller

8. What does "enormous" mean?
   ①

9. Translate: "나는 학생입니다"
   I am a student

10. Write a sentence using "because".
    I study hard because I want to get good grades."#;

#[async_trait]
impl TextRecognizer for MockRecognizer {
  fn name(&self) -> &'static str {
    "mock"
  }

  async fn recognize(&self, image_path: &Path) -> Result<Recognition, String> {
    if image_path.as_os_str().is_empty() {
      return Err("empty image path".into());
    }
    Ok(Recognition { full_text: MOCK_EXAM_TEXT.to_string(), confidence: 0.92 })
  }
}
