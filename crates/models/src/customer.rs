use crate::{collection_type::CollectionType, record::entity_view};

entity_view! {
    Customer => CollectionType::Customers
}

impl Customer {
    pub fn name(&self) -> &str {
        self.0.str_field("name").unwrap_or_default()
    }

    pub fn email(&self) -> &str {
        self.0.str_field("email").unwrap_or_default()
    }

    pub fn orders(&self) -> i64 {
        self.0.i64_field("orders").unwrap_or(0)
    }

    pub fn total_spent(&self) -> f64 {
        self.0.f64_field("totalSpent").unwrap_or(0.0)
    }
}
