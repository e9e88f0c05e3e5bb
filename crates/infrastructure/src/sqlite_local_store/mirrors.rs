//! Whole-snapshot mirror persistence for third parties and products.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use dolimirror_core::AppResult;
use dolimirror_domain::{Product, ProductKind, ThirdParty, ThirdPartyStatus};

use super::{SqliteLocalStore, storage_error};

#[derive(Debug, sqlx::FromRow)]
struct ThirdPartyRow {
    id: i64,
    name: String,
    name_alias: Option<String>,
    address: Option<String>,
    zip: Option<String>,
    town: Option<String>,
    state: Option<String>,
    country: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    website: Option<String>,
    client: bool,
    supplier: bool,
    prospect: bool,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_contact: Option<DateTime<Utc>>,
}

impl From<ThirdPartyRow> for ThirdParty {
    fn from(row: ThirdPartyRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            name_alias: row.name_alias,
            address: row.address,
            zip: row.zip,
            town: row.town,
            state: row.state,
            country: row.country,
            phone: row.phone,
            email: row.email,
            website: row.website,
            client: row.client,
            supplier: row.supplier,
            prospect: row.prospect,
            status: ThirdPartyStatus::from_str(&row.status).unwrap_or_default(),
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_contact: row.last_contact,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    reference: String,
    label: String,
    description: Option<String>,
    kind: String,
    price: f64,
    price_incl_tax: f64,
    status: i32,
    category: String,
    stock: i64,
    stock_alert: i64,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            reference: row.reference,
            label: row.label,
            description: row.description,
            kind: ProductKind::from_str(&row.kind).unwrap_or_default(),
            price: row.price,
            price_incl_tax: row.price_incl_tax,
            status: row.status,
            category: row.category,
            stock: row.stock,
            stock_alert: row.stock_alert,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_THIRD_PARTY: &str =
    "SELECT id, name, name_alias, address, zip, town, state, country, phone, email, website, \
     client, supplier, prospect, status, notes, created_at, updated_at, last_contact \
     FROM third_parties";

const SELECT_PRODUCT: &str =
    "SELECT id, reference, label, description, kind, price, price_incl_tax, status, category, \
     stock, stock_alert, image_url, created_at, updated_at FROM products";

impl SqliteLocalStore {
    pub(super) async fn third_parties_impl(&self) -> AppResult<Vec<ThirdParty>> {
        let sql = format!("{SELECT_THIRD_PARTY} ORDER BY id");
        let rows = sqlx::query_as::<_, ThirdPartyRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error("list third parties"))?;

        Ok(rows.into_iter().map(ThirdParty::from).collect())
    }

    pub(super) async fn third_party_impl(&self, id: i64) -> AppResult<Option<ThirdParty>> {
        let sql = format!("{SELECT_THIRD_PARTY} WHERE id = ?");
        let row = sqlx::query_as::<_, ThirdPartyRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("find third party"))?;

        Ok(row.map(ThirdParty::from))
    }

    pub(super) async fn upsert_third_party_impl(&self, row: &ThirdParty) -> AppResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO third_parties (id, name, name_alias, address, zip, town, state,
                country, phone, email, website, client, supplier, prospect, status, notes,
                created_at, updated_at, last_contact)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                name_alias = excluded.name_alias,
                address = excluded.address,
                zip = excluded.zip,
                town = excluded.town,
                state = excluded.state,
                country = excluded.country,
                phone = excluded.phone,
                email = excluded.email,
                website = excluded.website,
                client = excluded.client,
                supplier = excluded.supplier,
                prospect = excluded.prospect,
                status = excluded.status,
                notes = excluded.notes,
                updated_at = excluded.updated_at,
                last_contact = excluded.last_contact
            "#,
        )
        .bind(row.id)
        .bind(&row.name)
        .bind(&row.name_alias)
        .bind(&row.address)
        .bind(&row.zip)
        .bind(&row.town)
        .bind(&row.state)
        .bind(&row.country)
        .bind(&row.phone)
        .bind(&row.email)
        .bind(&row.website)
        .bind(row.client)
        .bind(row.supplier)
        .bind(row.prospect)
        .bind(row.status.as_str())
        .bind(&row.notes)
        .bind(now)
        .bind(now)
        .bind(row.last_contact)
        .execute(&self.pool)
        .await
        .map_err(storage_error("upsert third party"))?;

        Ok(())
    }

    pub(super) async fn delete_third_party_impl(&self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM third_parties WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error("delete third party"))?;

        Ok(())
    }

    pub(super) async fn replace_third_parties_impl(&self, rows: &[ThirdParty]) -> AppResult<()> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage_error("begin third-party replacement"))?;

        sqlx::query("DELETE FROM third_parties")
            .execute(&mut *tx)
            .await
            .map_err(storage_error("clear third parties"))?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO third_parties (id, name, name_alias, address, zip, town, state,
                    country, phone, email, website, client, supplier, prospect, status, notes,
                    created_at, updated_at, last_contact)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(row.id)
            .bind(&row.name)
            .bind(&row.name_alias)
            .bind(&row.address)
            .bind(&row.zip)
            .bind(&row.town)
            .bind(&row.state)
            .bind(&row.country)
            .bind(&row.phone)
            .bind(&row.email)
            .bind(&row.website)
            .bind(row.client)
            .bind(row.supplier)
            .bind(row.prospect)
            .bind(row.status.as_str())
            .bind(&row.notes)
            .bind(now)
            .bind(now)
            .bind(row.last_contact)
            .execute(&mut *tx)
            .await
            .map_err(storage_error("insert third party"))?;
        }

        tx.commit()
            .await
            .map_err(storage_error("commit third-party replacement"))?;

        Ok(())
    }

    pub(super) async fn products_impl(&self) -> AppResult<Vec<Product>> {
        let sql = format!("{SELECT_PRODUCT} ORDER BY id");
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error("list products"))?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    pub(super) async fn product_impl(&self, id: i64) -> AppResult<Option<Product>> {
        let sql = format!("{SELECT_PRODUCT} WHERE id = ?");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("find product"))?;

        Ok(row.map(Product::from))
    }

    pub(super) async fn upsert_product_impl(&self, row: &Product) -> AppResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO products (id, reference, label, description, kind, price,
                price_incl_tax, status, category, stock, stock_alert, image_url,
                created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                reference = excluded.reference,
                label = excluded.label,
                description = excluded.description,
                kind = excluded.kind,
                price = excluded.price,
                price_incl_tax = excluded.price_incl_tax,
                status = excluded.status,
                category = excluded.category,
                stock = excluded.stock,
                stock_alert = excluded.stock_alert,
                image_url = excluded.image_url,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(row.id)
        .bind(&row.reference)
        .bind(&row.label)
        .bind(&row.description)
        .bind(row.kind.as_str())
        .bind(row.price)
        .bind(row.price_incl_tax)
        .bind(row.status)
        .bind(&row.category)
        .bind(row.stock)
        .bind(row.stock_alert)
        .bind(&row.image_url)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(storage_error("upsert product"))?;

        Ok(())
    }

    pub(super) async fn delete_product_impl(&self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error("delete product"))?;

        Ok(())
    }

    pub(super) async fn replace_products_impl(&self, rows: &[Product]) -> AppResult<()> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage_error("begin product replacement"))?;

        sqlx::query("DELETE FROM products")
            .execute(&mut *tx)
            .await
            .map_err(storage_error("clear products"))?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO products (id, reference, label, description, kind, price,
                    price_incl_tax, status, category, stock, stock_alert, image_url,
                    created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(row.id)
            .bind(&row.reference)
            .bind(&row.label)
            .bind(&row.description)
            .bind(row.kind.as_str())
            .bind(row.price)
            .bind(row.price_incl_tax)
            .bind(row.status)
            .bind(&row.category)
            .bind(row.stock)
            .bind(row.stock_alert)
            .bind(&row.image_url)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(storage_error("insert product"))?;
        }

        tx.commit()
            .await
            .map_err(storage_error("commit product replacement"))?;

        Ok(())
    }
}
