//! Demo data for manual end-to-end checkout.
//!
//! # Usage
//!
//! ```bash
//! cartage seed catalog
//! cartage seed cart --variant TEE-BLK-M:2 --variant MUG-WHT:1
//! ```

use cartage_api::db::{self, NewProduct, NewVariant, PgStore, Store};
use cartage_core::{CartId, Money};

/// One `--variant <sku>:<qty>` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub sku: String,
    pub qty: i32,
}

impl CartLine {
    /// Parse `<sku>:<qty>`; the quantity must be positive.
    ///
    /// # Errors
    ///
    /// Returns a message suitable for clap if the input is malformed.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (sku, qty) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("expected <sku>:<qty>, got `{s}`"))?;
        let sku = sku.trim();
        if sku.is_empty() {
            return Err("sku cannot be empty".to_owned());
        }
        let qty: i32 = qty
            .trim()
            .parse()
            .map_err(|_| format!("invalid quantity `{qty}`"))?;
        if qty <= 0 {
            return Err(format!("quantity must be positive, got {qty}"));
        }
        Ok(Self {
            sku: sku.to_owned(),
            qty,
        })
    }
}

struct DemoProduct {
    slug: &'static str,
    name: &'static str,
    is_active: bool,
    variants: &'static [(&'static str, &'static str, i64, bool)],
}

const DEMO_CATALOG: &[DemoProduct] = &[
    DemoProduct {
        slug: "cartage-tee",
        name: "Cartage Tee",
        is_active: true,
        variants: &[
            ("TEE-BLK-S", "Black / S", 150_000, true),
            ("TEE-BLK-M", "Black / M", 150_000, true),
            ("TEE-BLK-L", "Black / L", 165_000, true),
            ("TEE-WHT-M", "White / M", 150_000, false),
        ],
    },
    DemoProduct {
        slug: "enamel-mug",
        name: "Enamel Mug",
        is_active: true,
        variants: &[("MUG-WHT", "White", 85_000, true)],
    },
    DemoProduct {
        slug: "winter-hoodie",
        name: "Winter Hoodie (discontinued)",
        is_active: false,
        variants: &[("HOOD-GRY-M", "Grey / M", 350_000, true)],
    },
];

/// Insert the demo catalog. Existing rows are updated in place.
///
/// # Errors
///
/// Returns an error if the connection or any insert fails.
pub async fn catalog() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    for product in DEMO_CATALOG {
        let variants: Vec<NewVariant<'_>> = product
            .variants
            .iter()
            .map(|&(sku, name, price, is_active)| NewVariant {
                sku,
                name,
                price: Money::from_minor(price),
                is_active,
            })
            .collect();

        let (product_id, variant_ids) = db::seed_product(
            &pool,
            &NewProduct {
                slug: product.slug,
                name: product.name,
                is_active: product.is_active,
            },
            &variants,
        )
        .await?;

        tracing::info!(
            product_id = %product_id,
            slug = product.slug,
            variants = variant_ids.len(),
            "Seeded product"
        );
    }

    tracing::info!(products = DEMO_CATALOG.len(), "Catalog seeded");
    Ok(())
}

/// Create an active cart holding `lines` and return its id.
///
/// # Errors
///
/// Returns an error if a SKU is unknown or a write fails.
pub async fn cart(lines: &[CartLine]) -> Result<CartId, Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    // Resolve every SKU first so a typo doesn't leave a half-filled cart.
    let mut resolved = Vec::with_capacity(lines.len());
    for line in lines {
        let variant = db::variant_by_sku(&pool, &line.sku)
            .await
            .map_err(|e| format!("variant {}: {e}", line.sku))?;
        resolved.push((variant, line.qty));
    }

    let store = PgStore::new(pool);
    let cart = store.create_cart().await?;
    for (variant, qty) in resolved {
        store.upsert_cart_item(cart, variant, qty).await?;
    }

    tracing::info!(cart_id = %cart, lines = lines.len(), "Cart created");
    Ok(cart)
}
