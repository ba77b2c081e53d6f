use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::utils::auth::add_auth_headers;
use crate::utils::url::construct_api_url;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pricing {
    pub prompt: f64,
    pub completion: f64,
    pub image: f64,
    pub request: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub pricing: Pricing,
    pub context_length: Option<u64>,
    pub input_modalities: Vec<String>,
}

impl ModelInfo {
    pub fn supports_images(&self) -> bool {
        self.input_modalities
            .iter()
            .any(|modality| modality.eq_ignore_ascii_case("image"))
    }
}

#[derive(Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<RawModel>,
}

#[derive(Deserialize)]
struct RawModel {
    id: String,
    name: Option<String>,
    #[serde(default)]
    pricing: RawPricing,
    context_length: Option<u64>,
    #[serde(default)]
    architecture: RawArchitecture,
}

// Catalogs quote prices as decimal strings; some send bare numbers.
#[derive(Deserialize, Default)]
struct RawPricing {
    #[serde(default, deserialize_with = "price")]
    prompt: f64,
    #[serde(default, deserialize_with = "price")]
    completion: f64,
    #[serde(default, deserialize_with = "price")]
    image: f64,
    #[serde(default, deserialize_with = "price")]
    request: f64,
}

#[derive(Deserialize, Default)]
struct RawArchitecture {
    #[serde(default)]
    input_modalities: Vec<String>,
}

fn price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(text) => text.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

impl From<RawModel> for ModelInfo {
    fn from(raw: RawModel) -> Self {
        Self {
            name: raw.name.unwrap_or_else(|| raw.id.clone()),
            id: raw.id,
            pricing: Pricing {
                prompt: raw.pricing.prompt,
                completion: raw.pricing.completion,
                image: raw.pricing.image,
                request: raw.pricing.request,
            },
            context_length: raw.context_length,
            input_modalities: raw.architecture.input_modalities,
        }
    }
}

pub fn parse_models(body: &str) -> Result<Vec<ModelInfo>, serde_json::Error> {
    let response: ModelsResponse = serde_json::from_str(body)?;
    Ok(response.data.into_iter().map(ModelInfo::from).collect())
}

pub async fn fetch_models(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
) -> Result<Vec<ModelInfo>, Box<dyn std::error::Error>> {
    let models_url = construct_api_url(base_url, "models");
    let request = client
        .get(models_url)
        .header("Content-Type", "application/json");
    let response = add_auth_headers(request, api_key).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(format!("API request failed with status {status}: {error_text}").into());
    }

    let body = response.text().await?;
    Ok(parse_models(&body)?)
}

pub fn sort_models(models: &mut [ModelInfo]) {
    models.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "data": [
            {
                "id": "openai/gpt-4o",
                "name": "OpenAI: GPT-4o",
                "pricing": {"prompt": "0.0000025", "completion": "0.00001", "image": "0.003613"},
                "context_length": 128000,
                "architecture": {"input_modalities": ["text", "image"]}
            },
            {
                "id": "deepseek/deepseek-r1",
                "pricing": {"prompt": 0.5, "completion": "bogus"}
            }
        ]
    }"#;

    #[test]
    fn parses_prices_and_modalities() {
        let models = parse_models(CATALOG).expect("parse");
        assert_eq!(models.len(), 2);

        let gpt = &models[0];
        assert_eq!(gpt.name, "OpenAI: GPT-4o");
        assert_eq!(gpt.pricing.prompt, 0.0000025);
        assert_eq!(gpt.pricing.request, 0.0);
        assert_eq!(gpt.context_length, Some(128000));
        assert!(gpt.supports_images());

        let deepseek = &models[1];
        assert_eq!(deepseek.name, "deepseek/deepseek-r1");
        assert_eq!(deepseek.pricing.prompt, 0.5);
        assert_eq!(deepseek.pricing.completion, 0.0);
        assert!(!deepseek.supports_images());
    }

    #[test]
    fn missing_data_yields_empty_catalog() {
        assert!(parse_models("{}").expect("parse").is_empty());
    }

    #[test]
    fn sort_models_orders_by_display_name() {
        let mut models = parse_models(CATALOG).expect("parse");
        sort_models(&mut models);
        let ids: Vec<_> = models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["deepseek/deepseek-r1", "openai/gpt-4o"]);
    }
}
