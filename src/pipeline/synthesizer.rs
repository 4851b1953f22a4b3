//! # Context Synthesizer
//!
//! Best-effort translation and summarization of a user message into a
//! provider-facing context record. Either collaborator call may fail; the
//! original text and payload are propagated unchanged and the context row is
//! always written. A bounded, TTL-evicting memo cache in front of the
//! translator keeps repeated phrases from paying for repeat calls.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use sea_orm::{DatabaseConnection, DbErr};
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::clients::LanguageService;
use crate::models::provider_context::Model as ProviderContext;
use crate::repositories::ContextRepository;

/// Lingua franca providers receive context in.
const TARGET_LANGUAGE: &str = "en";

/// Share of non-Latin letters above which a message is translated.
const NON_LATIN_THRESHOLD: f64 = 0.5;

/// Memo cache bounds.
const MEMO_CAPACITY: usize = 256;
const MEMO_TTL: Duration = Duration::from_secs(3600);

/// Producer tag recorded on context rows.
const CREATED_BY: &str = "synthesizer";

/// Coarse character-class ratio, not full language identification: the share
/// of alphabetic characters outside the Latin ranges.
pub fn non_latin_ratio(text: &str) -> f64 {
    let mut letters = 0usize;
    let mut non_latin = 0usize;

    for ch in text.chars() {
        if !ch.is_alphabetic() {
            continue;
        }
        letters += 1;
        if !is_latin_letter(ch) {
            non_latin += 1;
        }
    }

    if letters == 0 {
        return 0.0;
    }
    non_latin as f64 / letters as f64
}

fn is_latin_letter(ch: char) -> bool {
    matches!(ch,
        'A'..='Z' | 'a'..='z'
        // Latin-1 supplement and Latin Extended-A/B
        | '\u{00C0}'..='\u{024F}'
    )
}

pub struct ContextSynthesizer {
    language: Arc<dyn LanguageService>,
    contexts: ContextRepository,
    memo: Mutex<LruCache<String, (Instant, String)>>,
}

impl ContextSynthesizer {
    pub fn new(db: DatabaseConnection, language: Arc<dyn LanguageService>) -> Self {
        Self {
            language,
            contexts: ContextRepository::new(db),
            memo: Mutex::new(LruCache::new(
                NonZeroUsize::new(MEMO_CAPACITY).expect("memo capacity is non-zero"),
            )),
        }
    }

    /// Build and persist the provider context for a request. Never fails on
    /// collaborator errors; only a store failure propagates.
    pub async fn synthesize(
        &self,
        request_id: Uuid,
        user_message: &str,
        request_payload: JsonValue,
    ) -> Result<ProviderContext, DbErr> {
        let english = self.to_english(user_message).await;

        let (summary, extracted_payload) = match self.language.summarize(&english).await {
            Ok(result) => {
                let merged = merge_payloads(request_payload, result.payload);
                (Some(result.summary), merged)
            }
            Err(err) => {
                warn!(
                    request_id = %request_id,
                    error = %err,
                    "Summarization failed; persisting context without summary"
                );
                (None, request_payload)
            }
        };

        self.contexts
            .create(
                request_id,
                &english,
                summary.as_deref(),
                extracted_payload,
                CREATED_BY,
            )
            .await
    }

    /// Translate when the text is predominantly non-Latin; otherwise pass it
    /// through. Translation failures fall back to the original text.
    async fn to_english(&self, text: &str) -> String {
        if non_latin_ratio(text) <= NON_LATIN_THRESHOLD {
            return text.to_string();
        }

        if let Some(memoized) = self.memo_get(text).await {
            return memoized;
        }

        match self.language.translate(text, TARGET_LANGUAGE).await {
            Ok(translated) => {
                self.memo_put(text, &translated).await;
                translated
            }
            Err(err) => {
                warn!(error = %err, "Translation failed; using original text");
                text.to_string()
            }
        }
    }

    async fn memo_get(&self, text: &str) -> Option<String> {
        let mut memo = self.memo.lock().await;
        match memo.get(text) {
            Some((inserted, translated)) if inserted.elapsed() < MEMO_TTL => {
                Some(translated.clone())
            }
            Some(_) => {
                memo.pop(text);
                None
            }
            None => None,
        }
    }

    async fn memo_put(&self, text: &str, translated: &str) {
        self.memo
            .lock()
            .await
            .put(text.to_string(), (Instant::now(), translated.to_string()));
    }
}

/// Shallow object merge, summary fields winning over request fields.
fn merge_payloads(base: JsonValue, overlay: JsonValue) -> JsonValue {
    match (base, overlay) {
        (JsonValue::Object(mut base_map), JsonValue::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                base_map.insert(key, value);
            }
            JsonValue::Object(base_map)
        }
        (base, JsonValue::Null) => base,
        (_, overlay) => overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_zero_for_english() {
        assert_eq!(non_latin_ratio("I need a hotel room tonight"), 0.0);
    }

    #[test]
    fn test_ratio_high_for_cjk() {
        assert!(non_latin_ratio("我想订一间酒店") > NON_LATIN_THRESHOLD);
    }

    #[test]
    fn test_ratio_ignores_digits_and_punctuation() {
        assert_eq!(non_latin_ratio("room 404, $99!!"), 0.0);
    }

    #[test]
    fn test_ratio_mixed_text() {
        // Mostly Latin with one CJK char stays below the threshold
        let ratio = non_latin_ratio("hotel please 谢");
        assert!(ratio > 0.0 && ratio < NON_LATIN_THRESHOLD);
    }

    #[test]
    fn test_ratio_empty_text() {
        assert_eq!(non_latin_ratio(""), 0.0);
        assert_eq!(non_latin_ratio("123 456"), 0.0);
    }

    #[test]
    fn test_accented_latin_not_flagged() {
        assert_eq!(non_latin_ratio("réservation d'hôtel à Genève"), 0.0);
    }

    #[test]
    fn test_merge_payloads_overlay_wins() {
        let merged = merge_payloads(
            serde_json::json!({"city": "guangzhou", "beds": 2}),
            serde_json::json!({"beds": 3, "nights": 1}),
        );
        assert_eq!(
            merged,
            serde_json::json!({"city": "guangzhou", "beds": 3, "nights": 1})
        );
    }

    #[test]
    fn test_merge_payloads_null_overlay_keeps_base() {
        let merged = merge_payloads(serde_json::json!({"city": "gz"}), JsonValue::Null);
        assert_eq!(merged, serde_json::json!({"city": "gz"}));
    }
}
