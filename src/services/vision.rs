use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::config::VisionConfig;
use crate::error::{AppError, AppResult};
use crate::services::media::{parse_data_url, DataUrlImage};

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub const LISTING_PROMPT: &str = r#"Analyze this car image and extract the following information:
1. Make (manufacturer)
2. Model
3. Year (approximately)
4. Color
5. Body type (SUV, Sedan, Hatchback, etc.)
6. Mileage
7. Fuel type (your best guess)
8. Transmission type (your best guess)
9. Price (your best guess)
10. Short description to be added to a car listing

Format your response as a clean JSON object with these fields:
{
  "make": "",
  "model": "",
  "year": 0000,
  "color": "",
  "price": "",
  "mileage": "",
  "bodyType": "",
  "fuelType": "",
  "transmission": "",
  "description": "",
  "confidence": 0.0
}

For confidence, provide a value between 0 and 1 representing how confident you are in your overall identification.
Only respond with the JSON object, nothing else."#;

pub const SEARCH_PROMPT: &str = r#"Analyze this car image and extract the following information for a search query:
1. Make (manufacturer)
2. Body type (SUV, Sedan, Hatchback, etc.)
3. Color

Format your response as a clean JSON object with these fields:
{
  "make": "",
  "bodyType": "",
  "color": "",
  "confidence": 0.0
}

For confidence, provide a value between 0 and 1 representing how confident you are in your overall identification.
Only respond with the JSON object, nothing else."#;

const LISTING_FIELDS: [&str; 11] = [
    "make",
    "model",
    "year",
    "color",
    "bodyType",
    "price",
    "mileage",
    "fuelType",
    "transmission",
    "description",
    "confidence",
];

/// A multimodal model that answers a text prompt about one image
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn describe(&self, image: &DataUrlImage, prompt: &str) -> AppResult<String>;
}

/// Google Gemini over the `generateContent` REST endpoint
pub struct GeminiVision {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl GeminiVision {
    pub fn new(config: &VisionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl VisionModel for GeminiVision {
    async fn describe(&self, image: &DataUrlImage, prompt: &str) -> AppResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Upstream("Gemini API key is not configured".to_string()))?;

        let body = json!({
            "contents": [{
                "parts": [
                    { "inline_data": { "mime_type": image.mime_type(), "data": image.to_base64() } },
                    { "text": prompt }
                ]
            }]
        });

        let response = self
            .client
            .post(format!("{}/{}:generateContent", GEMINI_ENDPOINT, self.model))
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Vision request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Vision request failed: {}",
                response.status()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid vision response: {}", e)))?;

        let text: String = payload["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(AppError::Upstream("Vision model returned no text".to_string()));
        }

        Ok(text)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExtractedCar {
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub color: String,
    pub price: Option<f64>,
    pub mileage: Option<i32>,
    pub body_type: String,
    pub fuel_type: String,
    pub transmission: String,
    pub description: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchHints {
    pub make: String,
    pub body_type: String,
    pub color: String,
    pub confidence: f64,
}

/// Models often wrap JSON answers in markdown fences
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

fn parse_object(text: &str) -> AppResult<Map<String, Value>> {
    match serde_json::from_str::<Value>(strip_code_fences(text)) {
        Ok(Value::Object(map)) => Ok(map),
        _ => {
            tracing::warn!(raw = %text, "Failed to parse vision response");
            Err(AppError::Upstream("Failed to parse AI response".to_string()))
        }
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Numbers may come back as JSON numbers or as strings like "$24,500"
fn number_field(map: &Map<String, Value>, key: &str) -> Option<f64> {
    match map.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let digits: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

pub fn parse_listing(text: &str) -> AppResult<ExtractedCar> {
    let map = parse_object(text)?;

    let missing: Vec<&str> = LISTING_FIELDS
        .iter()
        .copied()
        .filter(|field| !map.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Upstream(format!(
            "AI response missing required fields: {}",
            missing.join(", ")
        )));
    }

    Ok(ExtractedCar {
        make: text_field(&map, "make"),
        model: text_field(&map, "model"),
        year: number_field(&map, "year").map(|y| y as i32),
        color: text_field(&map, "color"),
        price: number_field(&map, "price"),
        mileage: number_field(&map, "mileage").map(|m| m as i32),
        body_type: text_field(&map, "bodyType"),
        fuel_type: text_field(&map, "fuelType"),
        transmission: text_field(&map, "transmission"),
        description: text_field(&map, "description"),
        confidence: number_field(&map, "confidence").unwrap_or(0.0).clamp(0.0, 1.0),
    })
}

pub fn parse_search(text: &str) -> AppResult<SearchHints> {
    let map = parse_object(text)?;

    Ok(SearchHints {
        make: text_field(&map, "make"),
        body_type: text_field(&map, "bodyType"),
        color: text_field(&map, "color"),
        confidence: number_field(&map, "confidence").unwrap_or(0.0).clamp(0.0, 1.0),
    })
}

fn decode_image(image: &str) -> AppResult<DataUrlImage> {
    parse_data_url(image)
        .ok_or_else(|| AppError::Validation("Image must be a base64 image data URL".to_string()))
}

/// Prefill listing fields from a photo of the car
pub async fn extract_car_details(model: &dyn VisionModel, image: &str) -> AppResult<ExtractedCar> {
    let image = decode_image(image)?;
    let text = model.describe(&image, LISTING_PROMPT).await?;
    parse_listing(&text)
}

/// Make, body type and colour for searching by photo
pub async fn search_hints(model: &dyn VisionModel, image: &str) -> AppResult<SearchHints> {
    let image = decode_image(image)?;
    let text = model.describe(&image, SEARCH_PROMPT).await?;
    parse_search(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedModel(&'static str);

    #[async_trait]
    impl VisionModel for CannedModel {
        async fn describe(&self, _image: &DataUrlImage, _prompt: &str) -> AppResult<String> {
            Ok(self.0.to_string())
        }
    }

    const LISTING: &str = r#"```json
{
  "make": "Toyota",
  "model": "Corolla",
  "year": 2019,
  "color": "White",
  "price": "$18,500",
  "mileage": "42000",
  "bodyType": "Sedan",
  "fuelType": "Petrol",
  "transmission": "Automatic",
  "description": "Clean compact sedan.",
  "confidence": 0.87
}
```"#;

    #[test]
    fn test_parse_listing_handles_fences_and_string_numbers() {
        let car = parse_listing(LISTING).unwrap();
        assert_eq!(car.make, "Toyota");
        assert_eq!(car.year, Some(2019));
        assert_eq!(car.price, Some(18500.0));
        assert_eq!(car.mileage, Some(42000));
        assert_eq!(car.body_type, "Sedan");
        assert_eq!(car.confidence, 0.87);
    }

    #[test]
    fn test_parse_listing_reports_missing_fields() {
        let err = parse_listing(r#"{"make": "Ford", "model": "Focus"}"#).unwrap_err();
        match err {
            AppError::Upstream(msg) => {
                assert!(msg.contains("year"));
                assert!(msg.contains("confidence"));
                assert!(!msg.contains("make,"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_json_answer_is_upstream_error() {
        assert!(matches!(
            parse_search("I think this is a red SUV"),
            Err(AppError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn test_search_hints_from_model_answer() {
        let model = CannedModel(r#"{"make":"Honda","bodyType":"SUV","color":"Red","confidence":0.6}"#);
        let hints = search_hints(&model, "data:image/png;base64,aGVsbG8=").await.unwrap();
        assert_eq!(hints.make, "Honda");
        assert_eq!(hints.body_type, "SUV");
    }

    #[tokio::test]
    async fn test_invalid_image_is_rejected_before_calling_model() {
        let model = CannedModel("{}");
        let err = extract_car_details(&model, "not-an-image").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
