use crate::{collection_type::CollectionType, record::entity_view};

entity_view! {
    Category => CollectionType::Categories
}

impl Category {
    pub fn name(&self) -> &str {
        self.0.str_field("name").unwrap_or_default()
    }

    pub fn slug(&self) -> &str {
        self.0.str_field("slug").unwrap_or_default()
    }

    /// `productCount` as stored, if it is a whole number.
    pub fn stored_product_count(&self) -> Option<u64> {
        self.0.get("productCount").and_then(serde_json::Value::as_u64)
    }

    pub fn product_count(&self) -> u64 {
        self.stored_product_count().unwrap_or(0)
    }

    pub fn set_product_count(&mut self, count: u64) {
        self.0.set("productCount", count);
    }
}

/// URL slug derived from a display name: lowercase ascii alphanumerics joined by `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Dress Watches"), "dress-watches");
        assert_eq!(slugify("  Smart & Hybrid!! "), "smart-hybrid");
        assert_eq!(slugify("GMT"), "gmt");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn missing_product_count_reads_as_zero_and_is_not_written() {
        let raw = r#"{"id":1,"name":"Diver","slug":"diver"}"#;
        let mut c: Category = serde_json::from_str(raw).unwrap();
        assert_eq!(c.stored_product_count(), None);
        assert_eq!(c.product_count(), 0);
        assert_eq!(serde_json::to_string(&c).unwrap(), raw);

        c.set_product_count(3);
        assert_eq!(c.product_count(), 3);
    }
}
