use serde::Deserialize;
use std::collections::BTreeSet;

use crate::entities::product;

/// Search box plus category dropdown of the product listing.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListingFilter {
    pub search: Option<String>,
    pub category: Option<String>,
}

impl ListingFilter {
    fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    fn category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .filter(|c| !c.is_empty() && *c != "all")
    }

    pub fn matches(&self, product: &product::Model) -> bool {
        let text_ok = match self.needle() {
            Some(needle) => {
                product.name.to_lowercase().contains(&needle)
                    || product
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            }
            None => true,
        };
        let category_ok = self.category().map_or(true, |c| product.category == c);

        text_ok && category_ok
    }

    pub fn apply(&self, products: Vec<product::Model>) -> Vec<product::Model> {
        products.into_iter().filter(|p| self.matches(p)).collect()
    }
}

/// Distinct categories, for populating the dropdown.
pub fn categories(products: &[product::Model]) -> Vec<String> {
    products
        .iter()
        .map(|p| p.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
