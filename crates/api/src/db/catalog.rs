//! Catalog writes used by seeding and tests.
//!
//! The catalog is owned elsewhere; checkout only reads it through
//! [`UnitOfWork::priced_cart_lines`](super::UnitOfWork::priced_cart_lines).

use sqlx::PgPool;

use cartage_core::{Money, ProductId, VariantId};

use super::RepositoryError;

/// A product to seed.
#[derive(Debug, Clone)]
pub struct NewProduct<'a> {
    pub slug: &'a str,
    pub name: &'a str,
    pub is_active: bool,
}

/// A variant to seed under a product.
#[derive(Debug, Clone)]
pub struct NewVariant<'a> {
    pub sku: &'a str,
    pub name: &'a str,
    pub price: Money,
    pub is_active: bool,
}

/// Upsert a product and its variants, keyed on slug and SKU.
///
/// Running it twice leaves the catalog unchanged apart from refreshed
/// names, prices and flags.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any statement fails.
pub async fn seed_product(
    pool: &PgPool,
    product: &NewProduct<'_>,
    variants: &[NewVariant<'_>],
) -> Result<(ProductId, Vec<VariantId>), RepositoryError> {
    let mut tx = pool.begin().await?;

    let product_id = sqlx::query_scalar::<_, ProductId>(
        r"
        INSERT INTO products (slug, name, is_active)
        VALUES ($1, $2, $3)
        ON CONFLICT (slug)
        DO UPDATE SET name = EXCLUDED.name, is_active = EXCLUDED.is_active, updated_at = now()
        RETURNING id
        ",
    )
    .bind(product.slug)
    .bind(product.name)
    .bind(product.is_active)
    .fetch_one(&mut *tx)
    .await?;

    let mut variant_ids = Vec::with_capacity(variants.len());
    for variant in variants {
        let id = sqlx::query_scalar::<_, VariantId>(
            r"
            INSERT INTO product_variants (product_id, sku, name, price, is_active)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (sku)
            DO UPDATE SET
                product_id = EXCLUDED.product_id,
                name = EXCLUDED.name,
                price = EXCLUDED.price,
                is_active = EXCLUDED.is_active,
                updated_at = now()
            RETURNING id
            ",
        )
        .bind(product_id)
        .bind(variant.sku)
        .bind(variant.name)
        .bind(variant.price.minor())
        .bind(variant.is_active)
        .fetch_one(&mut *tx)
        .await?;
        variant_ids.push(id);
    }

    tx.commit().await?;
    Ok((product_id, variant_ids))
}

/// Look up a variant id by SKU.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if no variant has this SKU.
pub async fn variant_by_sku(pool: &PgPool, sku: &str) -> Result<VariantId, RepositoryError> {
    sqlx::query_scalar::<_, VariantId>(r"SELECT id FROM product_variants WHERE sku = $1")
        .bind(sku)
        .fetch_optional(pool)
        .await?
        .ok_or(RepositoryError::NotFound)
}
