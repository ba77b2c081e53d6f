//! Model listing functionality

use std::error::Error;

use crate::api::models::{fetch_models, sort_models, ModelInfo};
use crate::core::config::Config;
use crate::core::keyring::resolve_api_key;

pub async fn list_models() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let (api_key, _) = resolve_api_key()?
        .ok_or("No API key found. Run 'parley auth' or set PARLEY_API_KEY.")?;

    println!("🤖 Available Models at {}", config.base_url());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    if let Some(default_model) = &config.default_model {
        println!("🎯 Default model: {default_model} (from config)");
        println!();
    }

    let client = reqwest::Client::new();
    let mut models = fetch_models(&client, config.base_url(), &api_key).await?;

    if models.is_empty() {
        println!("No models found.");
        return Ok(());
    }

    println!("Found {} models:", models.len());
    println!();
    sort_models(&mut models);
    for model in &models {
        println!("{}", model_line(model, config.default_model.as_deref()));
    }
    Ok(())
}

fn model_line(model: &ModelInfo, default_model: Option<&str>) -> String {
    let marker = if default_model == Some(model.id.as_str()) {
        "*"
    } else {
        " "
    };
    let mut line = format!("{marker} {}", model.id);
    if model.name != model.id {
        line.push_str(&format!(" ({})", model.name));
    }
    if let Some(context_length) = model.context_length {
        line.push_str(&format!("  ctx {context_length}"));
    }
    line.push_str(&format!(
        "  ${}/M in, ${}/M out",
        per_million(model.pricing.prompt),
        per_million(model.pricing.completion)
    ));
    if model.supports_images() {
        line.push_str("  🖼");
    }
    line
}

// Catalog prices are per token.
fn per_million(price: f64) -> String {
    let scaled = price * 1_000_000.0;
    let text = format!("{scaled:.4}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::parse_models;

    #[test]
    fn model_line_shows_price_context_and_images() {
        let models = parse_models(
            r#"{"data": [{
                "id": "openai/gpt-4o",
                "name": "OpenAI: GPT-4o",
                "pricing": {"prompt": "0.0000025", "completion": "0.00001"},
                "context_length": 128000,
                "architecture": {"input_modalities": ["text", "image"]}
            }]}"#,
        )
        .expect("parse");

        assert_eq!(
            model_line(&models[0], Some("openai/gpt-4o")),
            "* openai/gpt-4o (OpenAI: GPT-4o)  ctx 128000  $2.5/M in, $10/M out  🖼"
        );
    }

    #[test]
    fn model_line_omits_missing_details() {
        let models =
            parse_models(r#"{"data": [{"id": "free/model"}]}"#).expect("parse");
        assert_eq!(
            model_line(&models[0], None),
            "  free/model  $0/M in, $0/M out"
        );
    }
}
