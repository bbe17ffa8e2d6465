use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use farmlink_core::{DomainError, DomainResult, Entity, Money, ProductId, Quantity, UserId};

/// Listing status, derived from the current stock level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Active,
    OutOfStock,
}

impl ProductStatus {
    /// Status implied by a stock level: nothing on hand means out of stock,
    /// anything positive keeps the listing active.
    pub fn for_stock(level: Quantity) -> Self {
        if level.is_zero() {
            Self::OutOfStock
        } else {
            Self::Active
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::OutOfStock => "out_of_stock",
        }
    }
}

impl core::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ProductStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "out_of_stock" => Ok(Self::OutOfStock),
            other => Err(DomainError::validation(format!(
                "unknown product status: {other}"
            ))),
        }
    }
}

/// Input for creating a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub farmer_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub unit: String,
    pub price: Money,
    pub initial_stock: Quantity,
    pub low_stock_threshold: Quantity,
    pub harvested_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Partial edit of listing metadata. Stock fields are deliberately absent;
/// those move only through the stock ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub price: Option<Money>,
    pub low_stock_threshold: Option<Quantity>,
    pub harvested_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Copy of a listing's stock position, handed to the pure ledger math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub current: Quantity,
    pub reserved: Quantity,
}

impl StockSnapshot {
    pub fn new(current: Quantity, reserved: Quantity) -> Self {
        Self { current, reserved }
    }

    /// Signed availability: current minus reserved.
    pub fn available(&self) -> Decimal {
        self.current.signed_sub(self.reserved)
    }
}

/// A farmer's listing: the crop for sale plus its live stock position.
///
/// `current_stock` is what is physically on hand; `reserved_stock` is the
/// portion promised to open orders. Both are owned by the stock ledger once
/// the listing exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub farmer_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub unit: String,
    pub price: Money,
    pub current_stock: Quantity,
    pub reserved_stock: Quantity,
    pub low_stock_threshold: Quantity,
    pub status: ProductStatus,
    pub total_sales: u64,
    pub harvested_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Create a listing. Nothing is reserved or sold yet; status follows the
    /// initial stock level.
    pub fn create(new: NewProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        if new.name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if new.unit.trim().is_empty() {
            return Err(DomainError::validation("product unit cannot be empty"));
        }
        if !new.price.is_positive() {
            return Err(DomainError::validation("price must be greater than zero"));
        }

        Ok(Self {
            id: ProductId::new(),
            farmer_id: new.farmer_id,
            name: new.name,
            description: new.description,
            unit: new.unit,
            price: new.price,
            current_stock: new.initial_stock,
            reserved_stock: Quantity::ZERO,
            low_stock_threshold: new.low_stock_threshold,
            status: ProductStatus::for_stock(new.initial_stock),
            total_sales: 0,
            harvested_at: new.harvested_at,
            expires_at: new.expires_at,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a metadata edit. Validates every field before touching any, so a
    /// rejected edit leaves the listing unchanged.
    pub fn revise(&mut self, update: ProductUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("product name cannot be empty"));
            }
        }
        if let Some(unit) = &update.unit {
            if unit.trim().is_empty() {
                return Err(DomainError::validation("product unit cannot be empty"));
            }
        }
        if let Some(price) = update.price {
            if !price.is_positive() {
                return Err(DomainError::validation("price must be greater than zero"));
            }
        }

        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(unit) = update.unit {
            self.unit = unit;
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(threshold) = update.low_stock_threshold {
            self.low_stock_threshold = threshold;
        }
        if let Some(harvested_at) = update.harvested_at {
            self.harvested_at = Some(harvested_at);
        }
        if let Some(expires_at) = update.expires_at {
            self.expires_at = Some(expires_at);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Stock not yet promised to an order, as a signed value.
    ///
    /// Reserved can exceed current after an `out` clamp, so this may be
    /// negative; callers treat anything below the requested quantity as
    /// insufficient.
    pub fn available(&self) -> Decimal {
        self.current_stock.signed_sub(self.reserved_stock)
    }

    pub fn is_owned_by(&self, farmer: UserId) -> bool {
        self.farmer_id == farmer
    }

    pub fn stock(&self) -> StockSnapshot {
        StockSnapshot::new(self.current_stock, self.reserved_stock)
    }

    /// Whether the listing carries an expiry date on or before `cutoff`.
    pub fn expires_by(&self, cutoff: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at <= cutoff)
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &ProductId {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn qty(n: i64) -> Quantity {
        Quantity::new(Decimal::from(n)).unwrap()
    }

    fn money(n: i64) -> Money {
        Money::new(Decimal::from(n)).unwrap()
    }

    fn new_product(initial_stock: i64) -> NewProduct {
        NewProduct {
            farmer_id: UserId::new(),
            name: "Heirloom Tomatoes".to_string(),
            description: Some("Vine ripened".to_string()),
            unit: "kg".to_string(),
            price: money(4),
            initial_stock: qty(initial_stock),
            low_stock_threshold: qty(5),
            harvested_at: None,
            expires_at: None,
        }
    }

    #[test]
    fn create_rejects_blank_name() {
        let mut new = new_product(10);
        new.name = "   ".to_string();

        let err = Product::create(new, Utc::now()).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_rejects_blank_unit() {
        let mut new = new_product(10);
        new.unit = String::new();

        let err = Product::create(new, Utc::now()).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_rejects_zero_price() {
        let mut new = new_product(10);
        new.price = Money::ZERO;

        let err = Product::create(new, Utc::now()).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_starts_with_nothing_reserved_or_sold() {
        let product = Product::create(new_product(10), Utc::now()).unwrap();

        assert_eq!(product.current_stock, qty(10));
        assert_eq!(product.reserved_stock, Quantity::ZERO);
        assert_eq!(product.total_sales, 0);
        assert_eq!(product.status, ProductStatus::Active);
    }

    #[test]
    fn create_with_empty_stock_is_out_of_stock() {
        let product = Product::create(new_product(0), Utc::now()).unwrap();
        assert_eq!(product.status, ProductStatus::OutOfStock);
    }

    #[test]
    fn available_is_current_minus_reserved() {
        let mut product = Product::create(new_product(10), Utc::now()).unwrap();
        product.reserved_stock = qty(3);

        assert_eq!(product.available(), Decimal::from(7));
    }

    #[test]
    fn available_can_be_negative_after_clamped_deductions() {
        let mut product = Product::create(new_product(10), Utc::now()).unwrap();
        product.current_stock = qty(1);
        product.reserved_stock = qty(4);

        assert_eq!(product.available(), Decimal::from(-3));
    }

    #[test]
    fn revise_updates_metadata_and_timestamp() {
        let created = Utc::now();
        let mut product = Product::create(new_product(10), created).unwrap();

        let revised = created + Duration::minutes(5);
        product
            .revise(
                ProductUpdate {
                    name: Some("Cherry Tomatoes".to_string()),
                    price: Some(money(6)),
                    low_stock_threshold: Some(qty(2)),
                    ..ProductUpdate::default()
                },
                revised,
            )
            .unwrap();

        assert_eq!(product.name, "Cherry Tomatoes");
        assert_eq!(product.price, money(6));
        assert_eq!(product.low_stock_threshold, qty(2));
        assert_eq!(product.updated_at, revised);
    }

    #[test]
    fn rejected_revise_leaves_listing_untouched() {
        let created = Utc::now();
        let mut product = Product::create(new_product(10), created).unwrap();
        let before = product.clone();

        let err = product
            .revise(
                ProductUpdate {
                    name: Some("Cherry Tomatoes".to_string()),
                    price: Some(Money::ZERO),
                    ..ProductUpdate::default()
                },
                created + Duration::minutes(5),
            )
            .unwrap_err();

        match err {
            DomainError::Validation(_) => {}
            other => panic!("expected Validation error, got {other:?}"),
        }
        assert_eq!(product, before);
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [ProductStatus::Active, ProductStatus::OutOfStock] {
            let parsed: ProductStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("archived".parse::<ProductStatus>().is_err());
    }

    #[test]
    fn expires_by_checks_the_cutoff() {
        let now = Utc::now();
        let mut product = Product::create(new_product(10), now).unwrap();
        let cutoff = now + Duration::days(3);

        assert!(!product.expires_by(cutoff));

        product.expires_at = Some(now + Duration::days(2));
        assert!(product.expires_by(cutoff));

        product.expires_at = Some(now + Duration::days(10));
        assert!(!product.expires_by(cutoff));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: status always mirrors whether any stock is on hand.
            #[test]
            fn status_mirrors_stock_level(cents in 0i64..1_000_000) {
                let level = Quantity::new(Decimal::new(cents, 2)).unwrap();
                let status = ProductStatus::for_stock(level);

                if level.is_zero() {
                    prop_assert_eq!(status, ProductStatus::OutOfStock);
                } else {
                    prop_assert_eq!(status, ProductStatus::Active);
                }
            }

            /// Property: availability is the signed difference of the two
            /// stock columns, whatever their relative sizes.
            #[test]
            fn available_is_signed_difference(
                current in 0i64..1_000_000,
                reserved in 0i64..1_000_000,
            ) {
                let mut product = Product::create(
                    NewProduct {
                        farmer_id: UserId::new(),
                        name: "Produce".to_string(),
                        description: None,
                        unit: "kg".to_string(),
                        price: Money::new(Decimal::ONE).unwrap(),
                        initial_stock: Quantity::ZERO,
                        low_stock_threshold: Quantity::ZERO,
                        harvested_at: None,
                        expires_at: None,
                    },
                    Utc::now(),
                )
                .unwrap();
                product.current_stock = Quantity::new(Decimal::new(current, 2)).unwrap();
                product.reserved_stock = Quantity::new(Decimal::new(reserved, 2)).unwrap();

                prop_assert_eq!(
                    product.available(),
                    Decimal::new(current, 2) - Decimal::new(reserved, 2)
                );
            }
        }
    }
}
