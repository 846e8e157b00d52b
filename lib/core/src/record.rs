use serde::{Deserialize, Serialize};

/// Reviews per bucket in the `reviews_{n}` feature token.
pub const REVIEW_BUCKET: u64 = 50;

/// Source fields of a business as received from ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessFields {
    pub business_id: String,
    pub name: String,
    /// One or more comma-separated category tags, e.g. `"Coffee & Tea, Bakeries"`.
    pub category: String,
    pub city: String,
    pub price: String,
    /// Raw star rating in `[0, 5]`.
    pub rating: f64,
    pub review_count: u64,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub url: String,
}

/// A catalog entry: source fields plus the text the index vectorizes.
///
/// Derived text is recomputed whenever the fields change, so the only way to
/// edit a record is through [`BusinessFeatureRecord::update`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BusinessFields", into = "BusinessFields")]
pub struct BusinessFeatureRecord {
    fields: BusinessFields,
    tags: Vec<String>,
    feature_text: String,
    category_text: String,
}

impl BusinessFeatureRecord {
    #[must_use]
    pub fn new(fields: BusinessFields) -> Self {
        let tags = parse_tags(&fields.category);
        let feature_text = build_feature_text(&fields);
        let category_text = tags.join(" ");
        Self {
            fields,
            tags,
            feature_text,
            category_text,
        }
    }

    /// Apply an edit to the source fields and regenerate the derived text.
    pub fn update(&mut self, edit: impl FnOnce(&mut BusinessFields)) {
        let mut fields = self.fields.clone();
        edit(&mut fields);
        *self = Self::new(fields);
    }

    #[inline]
    pub fn fields(&self) -> &BusinessFields {
        &self.fields
    }

    #[inline]
    pub fn business_id(&self) -> &str {
        &self.fields.business_id
    }

    #[inline]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Category, city, price and bucketed rating/review tokens (matrix mode input).
    #[inline]
    pub fn feature_text(&self) -> &str {
        &self.feature_text
    }

    /// Raw category tokens (query-vector mode input).
    #[inline]
    pub fn category_text(&self) -> &str {
        &self.category_text
    }

    /// The subset of fields exposed to callers.
    pub fn to_item(&self) -> RecommendationItem {
        let f = &self.fields;
        RecommendationItem {
            name: f.name.clone(),
            category: f.category.clone(),
            rating: (f.rating * 100.0).round() / 100.0,
            review_count: f.review_count,
            city: f.city.clone(),
            address: f.address.clone(),
            phone: f.phone.clone(),
            price: f.price.clone(),
            image_url: f.image_url.clone(),
            url: f.url.clone(),
        }
    }
}

impl From<BusinessFields> for BusinessFeatureRecord {
    fn from(fields: BusinessFields) -> Self {
        Self::new(fields)
    }
}

impl From<BusinessFeatureRecord> for BusinessFields {
    fn from(record: BusinessFeatureRecord) -> Self {
        record.fields
    }
}

/// Projection of a record returned to callers and stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub name: String,
    pub category: String,
    pub rating: f64,
    pub review_count: u64,
    pub city: String,
    pub address: String,
    pub phone: String,
    pub price: String,
    pub image_url: String,
    pub url: String,
}

fn parse_tags(category: &str) -> Vec<String> {
    category
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// `"{category} {city} price_{n} rating_{r} reviews_{b}"`
///
/// Price and rating tokens are spelled with word characters only (`$$` becomes
/// `price_2`, `4.5` becomes `rating_4_5`) so the tokenizer keeps them whole.
fn build_feature_text(f: &BusinessFields) -> String {
    let dollars = f.price.chars().filter(|c| *c == '$').count();
    let rating = format!("{:.1}", (f.rating * 10.0).round() / 10.0).replace('.', "_");
    format!(
        "{} {} price_{} rating_{} reviews_{}",
        f.category,
        f.city,
        dollars,
        rating,
        f.review_count / REVIEW_BUCKET
    )
}
