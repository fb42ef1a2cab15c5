use crate::services::insights_api::{ClassScheduleRow, InsightsApi};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use studio_board::fetch::{BasicClient, HttpClient, auth::UrlParam};
use tracing::{debug, warn};

const MAX_ATTEMPTS: u32 = 3;

const EXTRACTION_PROMPT: &str = "\
You are an expert data processor. Analyze the raw text of a CSV file \
holding a weekly class schedule and convert it into structured JSON. The \
CSV has a non-tabular layout with weekly blocks repeating horizontally.

Rules:
1. A weekly block is a row of dates followed by a row of weekday names.
2. Within a block each day owns a group of columns, typically 'Location', \
'Class', 'Trainer 1', 'Trainer 2', 'Cover'. The 'Time' column is the very \
first column of the row and is shared by all days.
3. For every time-slot row and every day that has class information, emit \
one schedule object with fields: id (unique, e.g. date+time+location), \
date (YYYY-MM-DD), day, time, location, className, trainer1, trainer2, \
cover, and status ('Canceled' when the class cell reads 'Class canceled', \
otherwise 'Scheduled').
4. Skip fully empty rows and non-schedule notes such as guidelines. Treat \
placeholder cells like '#REF!' as null. Ignore trailing non-schedule \
columns and 'Trainer Off' columns.
5. Combine every week's rows into one flat array.

Your output MUST be a JSON object with a single key \"schedules\" holding \
that array, conforming to the response schema.";

/// Client for the Gemini `generateContent` REST endpoint.
///
/// The API key rides along as a `key` query parameter on every request.
pub struct GeminiClient {
    base_url: String,
    model: String,
    http: UrlParam<BasicClient>,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
            http: UrlParam {
                inner: BasicClient::new(),
                param_name: "key".to_string(),
                key: api_key,
            },
        }
    }

    fn request_body(csv_text: &str) -> Value {
        json!({
            "contents": [{
                "parts": [{
                    "text": format!("{EXTRACTION_PROMPT}\n\nHere is the CSV data:\n\n{csv_text}")
                }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            }
        })
    }

    async fn generate(&self, body: &Value) -> Result<Value> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let req = reqwest::Client::new()
            .post(&url)
            .timeout(Duration::from_secs(120))
            .json(body)
            .build()?;

        let response = self
            .http
            .execute(req)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send request: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("API returned status {}: {}", status, text));
        }

        response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse response: {}", e))
    }
}

#[async_trait]
impl InsightsApi for GeminiClient {
    async fn extract_schedule(&self, csv_text: &str) -> Result<Vec<ClassScheduleRow>> {
        let body = Self::request_body(csv_text);

        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.generate(&body).await {
                Ok(response) => {
                    debug!(attempt, "Gemini response received");
                    return parse_schedules(&response);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Gemini request failed");
                    last_err = Some(e);
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Gemini request failed")))
    }
}

/// JSON schema constraining the model output to flat schedule rows.
fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "schedules": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING", "description": "Unique ID for the entry" },
                        "date": { "type": "STRING", "description": "Date of the class (YYYY-MM-DD)" },
                        "day": { "type": "STRING", "description": "Day of the week" },
                        "time": { "type": "STRING", "description": "Time of the class" },
                        "location": { "type": "STRING", "description": "Location of the class" },
                        "className": { "type": "STRING", "description": "Name of the class" },
                        "trainer1": { "type": "STRING", "description": "Primary trainer" },
                        "trainer2": { "type": "STRING", "description": "Secondary trainer" },
                        "cover": { "type": "STRING", "description": "Covering trainer" },
                        "status": { "type": "STRING", "enum": ["Scheduled", "Canceled"], "description": "Status of the class" }
                    },
                    "required": ["id", "date", "day", "time", "status"]
                }
            }
        }
    })
}

fn parse_schedules(response: &Value) -> Result<Vec<ClassScheduleRow>> {
    let text = response["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("Gemini response did not contain a text part"))?;

    let parsed: Value = serde_json::from_str(strip_code_fences(text))?;
    let schedules = parsed
        .get("schedules")
        .ok_or_else(|| anyhow::anyhow!("AI response did not contain a 'schedules' array"))?;

    Ok(serde_json::from_value(schedules.clone())?)
}

/// The model sometimes wraps its JSON in markdown code fences despite the
/// response MIME type; strip them before parsing.
fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        rest.strip_suffix("```").unwrap_or(rest).trim()
    } else if let Some(rest) = text.strip_prefix("```") {
        rest.strip_suffix("```").unwrap_or(rest).trim()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::insights_api::ScheduleStatus;

    fn wrap_response(text: &str) -> Value {
        json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }] }
            }]
        })
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn test_parse_schedules() {
        let text = r#"{"schedules":[{"id":"2025-08-25-0900-kemps","date":"2025-08-25","day":"Monday","time":"9:00 AM","location":"Kemps Corner","className":"Barre57","trainer1":"Karan","trainer2":null,"cover":null,"status":"Scheduled"}]}"#;
        let rows = parse_schedules(&wrap_response(text)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].day, "Monday");
        assert_eq!(rows[0].class_name.as_deref(), Some("Barre57"));
        assert_eq!(rows[0].status, ScheduleStatus::Scheduled);
        assert!(rows[0].trainer2.is_none());
    }

    #[test]
    fn test_parse_schedules_fenced_output() {
        let text = "```json\n{\"schedules\":[]}\n```";
        let rows = parse_schedules(&wrap_response(text)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_parse_schedules_missing_array() {
        let err = parse_schedules(&wrap_response("{}")).unwrap_err();
        assert!(err.to_string().contains("schedules"));
    }
}
