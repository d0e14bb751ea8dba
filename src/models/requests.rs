use serde::{de, Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Query string of the text search endpoint
///
/// Numeric filters are kept as raw text so the normalizer can report
/// malformed values as a user-correctable error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default, alias = "goldOnly", alias = "verifiedOnly")]
    pub gold: Option<String>,
    #[serde(default, rename = "maxPrice")]
    pub max_price: Option<String>,
    #[serde(default, rename = "minRating")]
    pub min_rating: Option<String>,
}

/// Query string of the protected scrape endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeParams {
    pub keyword: String,
}

/// Buyer inquiry sent to a supplier
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ContactSupplierRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(range(min = 1))]
    #[serde(deserialize_with = "u32_from_number_or_text")]
    pub quantity: u32,
    #[serde(default)]
    pub message: String,
    #[validate(length(min = 1))]
    #[serde(alias = "supplier_id", rename = "supplierId", deserialize_with = "string_from_number_or_text")]
    pub supplier_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "product_id", rename = "productId", deserialize_with = "string_from_number_or_text")]
    pub product_id: String,
}

/// Form values arrive either as JSON numbers or as the text of an input field
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(serde_json::Number),
    Text(String),
}

fn u32_from_number_or_text<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| de::Error::custom(format!("expected a whole number, got {}", n))),
        NumberOrText::Text(text) => text
            .trim()
            .parse::<u32>()
            .map_err(|_| de::Error::custom(format!("expected a whole number, got '{}'", text))),
    }
}

fn string_from_number_or_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => n.to_string(),
        NumberOrText::Text(text) => text,
    })
}
