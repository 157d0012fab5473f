// storefront/src/services/chat_service.rs

//! Keyword-driven shop assistant. Stateless: every reply depends only on the
//! query text and, for catalog questions, the current products.

use crate::db::Store;
use crate::errors::Result;
use crate::models::Product;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, instrument};
use uuid::Uuid;

pub const EMPTY_REPLY: &str = "I didn't catch that. How can I help?";
pub const CATALOG_MISS_REPLY: &str = "We have a wide variety of fresh fish! You can check our products page or ask about a specific one like Salmon or Tuna.";
pub const RECIPE_REPLY: &str = "I have some great recipes! For example, Pan-Seared Salmon or Garlic Butter Shrimp. Which fish are you planning to cook?";
pub const DELIVERY_REPLY: &str = "Experience 24-hour global delivery! We use temperature-controlled logistics to ensure maximum freshness.";
pub const FALLBACK_REPLY: &str = "Ahoy! 🌊 I'm still learning, but I can help you find products, recipes, or track your delivery. What's on your mind?";

const CATALOG_KEYWORDS: &[&str] = &["fish", "product", "catalog", "buy", "stock", "have", "sell"];
const RECIPE_KEYWORDS: &[&str] = &["recipe", "cook", "make", "eat"];
const DELIVERY_KEYWORDS: &[&str] = &["delivery", "ship", "track", "time"];

// Never used as product search terms.
const STOP_WORDS: &[&str] = &[
  "the", "and", "for", "you", "your", "have", "has", "any", "some", "what", "which", "with", "sell", "buy", "product",
  "products", "catalog", "stock", "show", "can", "get", "want", "would", "like", "there", "are", "today", "please",
  "does", "fresh",
];

const MIN_TERM_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
  Catalog,
  Recipe,
  Delivery,
  Other,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ChatProduct {
  pub id: Uuid,
  pub name: String,
  pub price: Decimal,
  pub image: Option<String>,
  pub category: String,
}

impl From<Product> for ChatProduct {
  fn from(p: Product) -> Self {
    Self { id: p.id, name: p.name, price: p.price, image: p.image, category: p.category }
  }
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
  pub response: String,
  pub extras: Map<String, Value>,
}

impl ChatReply {
  fn text(response: &str) -> Self {
    Self { response: response.to_string(), extras: Map::new() }
  }
}

/// Splits a lower-cased query into alphanumeric words.
fn words(query: &str) -> Vec<String> {
  query
    .split(|c: char| !c.is_alphanumeric())
    .filter(|w| !w.is_empty())
    .map(str::to_string)
    .collect()
}

fn mentions(words: &[String], keywords: &[&str]) -> bool {
  words.iter().any(|w| keywords.iter().any(|k| w.starts_with(k)))
}

/// Picks the first topic, in priority order, whose keywords appear in the query.
pub fn classify(query: &str) -> Topic {
  let words = words(&query.to_lowercase());
  if mentions(&words, CATALOG_KEYWORDS) {
    Topic::Catalog
  } else if mentions(&words, RECIPE_KEYWORDS) {
    Topic::Recipe
  } else if mentions(&words, DELIVERY_KEYWORDS) {
    Topic::Delivery
  } else {
    Topic::Other
  }
}

/// Words worth looking up in the catalog.
pub fn search_terms(query: &str) -> Vec<String> {
  words(&query.to_lowercase())
    .into_iter()
    .filter(|w| w.chars().count() >= MIN_TERM_LEN && !STOP_WORDS.contains(&w.as_str()))
    .collect()
}

#[instrument(name = "chat_service::respond", skip(store))]
pub async fn respond(store: &dyn Store, query: &str) -> Result<ChatReply> {
  let query = query.trim().to_lowercase();
  if query.is_empty() {
    return Ok(ChatReply::text(EMPTY_REPLY));
  }

  let topic = classify(&query);
  debug!(?topic, "Classified chat query.");
  let reply = match topic {
    Topic::Catalog => {
      let terms = search_terms(&query);
      let found = if terms.is_empty() {
        None
      } else {
        store.find_first_product_matching(&terms).await?
      };
      match found {
        Some(product) => {
          let product = ChatProduct::from(product);
          let mut extras = Map::new();
          extras.insert("product".to_string(), json!(product));
          ChatReply {
            response: format!(
              "We have fresh {} available for ${}/kg. Would you like to see it?",
              product.name, product.price
            ),
            extras,
          }
        }
        None => ChatReply::text(CATALOG_MISS_REPLY),
      }
    }
    Topic::Recipe => ChatReply::text(RECIPE_REPLY),
    Topic::Delivery => ChatReply::text(DELIVERY_REPLY),
    Topic::Other => ChatReply::text(FALLBACK_REPLY),
  };
  Ok(reply)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::MemoryStore;

  #[test]
  fn classifies_by_priority_and_word_prefix() {
    assert_eq!(classify("Do you have salmon?"), Topic::Catalog);
    assert_eq!(classify("how do I cook fish"), Topic::Catalog);
    assert_eq!(classify("any recipes?"), Topic::Recipe);
    assert_eq!(classify("how long does delivery take"), Topic::Delivery);
    assert_eq!(classify("free shipping?"), Topic::Delivery);
    assert_eq!(classify("great weather"), Topic::Other);
  }

  #[test]
  fn search_terms_drop_short_and_stop_words() {
    assert_eq!(search_terms("Do you have SALMON?"), vec!["salmon".to_string()]);
    assert!(search_terms("what do you sell").is_empty());
  }

  #[tokio::test]
  async fn catalog_question_returns_matching_product() {
    let store = MemoryStore::new();
    let reply = respond(&store, "do you have salmon").await.unwrap();
    assert_eq!(reply.response, CATALOG_MISS_REPLY);
    assert!(reply.extras.is_empty());

    let mut salmon = Product::draft();
    salmon.name = "Atlantic Salmon".to_string();
    salmon.category = "Fish".to_string();
    salmon.price = Decimal::new(2450, 2);
    store.insert_product(&salmon).await.unwrap();

    let reply = respond(&store, "  Do you have SALMON ").await.unwrap();
    assert_eq!(
      reply.response,
      "We have fresh Atlantic Salmon available for $24.50/kg. Would you like to see it?"
    );
    assert_eq!(reply.extras["product"]["id"], json!(salmon.id));
  }

  #[tokio::test]
  async fn fixed_replies() {
    let store = MemoryStore::new();
    assert_eq!(respond(&store, "   ").await.unwrap().response, EMPTY_REPLY);
    assert_eq!(respond(&store, "how long does delivery take").await.unwrap().response, DELIVERY_REPLY);
    assert_eq!(respond(&store, "what should I make tonight").await.unwrap().response, RECIPE_REPLY);
    assert_eq!(respond(&store, "hello there").await.unwrap().response, FALLBACK_REPLY);
  }
}
