use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::{Address, AddressSelection};
use crate::ids::{ProductId, UserId};

/// A product listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ProductDocument")]
pub struct Product {
    pub id: ProductId,
    pub seller_id: UserId,
    pub title: String,
    pub description: String,
    pub category: String,
    /// Price in the smallest currency unit.
    pub price: u64,
    pub images: Vec<String>,
    pub address: Address,
    pub created_at: DateTime<Utc>,
}

/// A listing as the backend writes it, with `_id`, `id` or both.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductDocument {
    #[serde(rename = "_id")]
    object_id: Option<ProductId>,
    id: Option<ProductId>,
    seller_id: UserId,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: String,
    price: u64,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    address: Address,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductDocument> for Product {
    type Error = &'static str;

    fn try_from(doc: ProductDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: doc.object_id.or(doc.id).ok_or("missing field `id`")?,
            seller_id: doc.seller_id,
            title: doc.title,
            description: doc.description,
            category: doc.category,
            price: doc.price,
            images: doc.images,
            address: doc.address,
            created_at: doc.created_at,
        })
    }
}

/// Search and filter criteria for the listing page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingQuery {
    pub text: String,
    pub address: AddressSelection,
    pub category: Option<String>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
}

impl ListingQuery {
    pub fn matches(&self, product: &Product) -> bool {
        let text = self.text.trim().to_lowercase();
        if !text.is_empty()
            && !product.title.to_lowercase().contains(&text)
            && !product.description.to_lowercase().contains(&text)
        {
            return false;
        }
        if let Some(category) = &self.category {
            if !product.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        self.address.matches(&product.address)
    }

    /// Matching products, in their original order.
    pub fn filter<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Distinct categories across `products`, sorted.
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut out: Vec<String> = products
        .iter()
        .map(|p| p.category.clone())
        .filter(|c| !c.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{AddressFilter, AddressLevel};

    fn product(id: &str, title: &str, category: &str, price: u64, division: &str) -> Product {
        Product {
            id: ProductId::new(id),
            seller_id: UserId::new("seller"),
            title: title.into(),
            description: format!("Barely used {title}"),
            category: category.into(),
            price,
            images: Vec::new(),
            address: Address {
                division: division.into(),
                district: "Central".into(),
                ward: "Ward 3".into(),
                area: "Market".into(),
            },
            created_at: Utc::now(),
        }
    }

    fn catalogue() -> Vec<Product> {
        vec![
            product("1", "Bicycle", "Sports", 8_000, "Dhaka"),
            product("2", "Desk lamp", "Home", 1_200, "Khulna"),
            product("3", "Road bike helmet", "Sports", 2_500, "Dhaka"),
        ]
    }

    #[test]
    fn empty_query_matches_everything() {
        let products = catalogue();
        assert_eq!(ListingQuery::default().filter(&products).len(), 3);
    }

    #[test]
    fn text_search_is_case_insensitive() {
        let products = catalogue();
        let query = ListingQuery {
            text: "BIKE".into(),
            ..Default::default()
        };
        let ids: Vec<_> = query.filter(&products).iter().map(|p| p.id.0.clone()).collect();
        assert_eq!(ids, vec!["3"]);
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let products = catalogue();
        let query = ListingQuery {
            min_price: Some(1_200),
            max_price: Some(2_500),
            ..Default::default()
        };
        let ids: Vec<_> = query.filter(&products).iter().map(|p| p.id.0.clone()).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn address_and_category_combine() {
        let products = catalogue();
        let mut filter = AddressFilter::new();
        filter.select(AddressLevel::Division, Some("Dhaka".into()));
        let query = ListingQuery {
            address: filter.selection().clone(),
            category: Some("sports".into()),
            ..Default::default()
        };
        let ids: Vec<_> = query.filter(&products).iter().map(|p| p.id.0.clone()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn categories_are_sorted_and_unique() {
        assert_eq!(categories(&catalogue()), vec!["Home", "Sports"]);
    }

    #[test]
    fn listing_with_both_id_spellings_parses() {
        let json = r#"{
            "_id": "p9",
            "id": "p9",
            "sellerId": "seller",
            "title": "Jute bag",
            "price": 15000,
            "createdAt": "2026-01-05T10:00:00Z"
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, ProductId::new("p9"));
        assert!(product.description.is_empty());
        assert_eq!(product.address, Address::default());
    }
}
