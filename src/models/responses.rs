//! Response types for the Generative Language API.
//!
//! The same candidate shape is used by both streaming chunks and one-shot
//! `generateContent` responses; only the adapter in `api::streaming` deals
//! with chunk accumulation.

use serde::Deserialize;

use super::GroundingSource;

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
pub struct WebSource {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts.
    pub fn text(&self) -> String {
        let Some(candidate) = self.candidates.first() else {
            return String::new();
        };
        let Some(content) = &candidate.content else {
            return String::new();
        };
        content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect()
    }

    /// Web citations of the first candidate; entries without a URI are
    /// dropped, a missing title falls back to "Untitled".
    pub fn sources(&self) -> Vec<GroundingSource> {
        let Some(candidate) = self.candidates.first() else {
            return Vec::new();
        };
        let Some(metadata) = &candidate.grounding_metadata else {
            return Vec::new();
        };
        metadata
            .grounding_chunks
            .iter()
            .filter_map(|chunk| chunk.web.as_ref())
            .filter_map(|web| {
                let uri = web.uri.clone().unwrap_or_default();
                if uri.is_empty() {
                    return None;
                }
                Some(GroundingSource {
                    uri,
                    title: web
                        .title
                        .clone()
                        .unwrap_or_else(|| "Untitled".to_string()),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_text_from_a_chunk() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}],"role":"model"}}]}"#;
        let chunk: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(chunk.text(), "Hello world");
        assert!(chunk.sources().is_empty());
    }

    #[test]
    fn extracts_citations_and_fills_missing_titles() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "answer"}]},
                "groundingMetadata": {
                    "groundingChunks": [
                        {"web": {"uri": "https://a.example", "title": "A"}},
                        {"web": {"uri": "https://b.example"}},
                        {"web": {"uri": ""}},
                        {}
                    ]
                }
            }]
        }"#;
        let chunk: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let sources = chunk.sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].title, "A");
        assert_eq!(sources[1].title, "Untitled");
    }

    #[test]
    fn tolerates_empty_and_partial_chunks() {
        let chunk: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(chunk.text(), "");
        let chunk: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"STOP"}]}"#).unwrap();
        assert_eq!(chunk.text(), "");
        assert!(chunk.sources().is_empty());
    }
}
