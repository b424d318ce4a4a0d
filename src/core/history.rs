//! Order history - Rebuilding nested orders from the flat joined row stream.
//!
//! The store hands back one row per (order, line, key) combination: the outer join of
//! `orders`, `order_lines` (with the product name) and `license_keys`. This module groups
//! those rows back into order → line → keys.
//!
//! Grouping is by identifier, never by adjacency, so rows need not be contiguous:
//! - orders come out most recent first (`placed_at` desc, then `order_id` desc)
//! - lines within an order by `line_id` ascending
//! - keys within a line by `license_id` ascending, duplicates collapsed
//!
//! Identifiers are handed out in insertion order, so this is the same as first-seen order
//! for the query below, and reordering rows inside a group never changes the result.

use crate::{
    entities::{Order, User, license_key, order, order_line, product, user},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Select,
};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

/// One row of the orders ⟕ order lines ⟕ license keys join.
///
/// Line and key columns are `NULL` when an order has no lines or a line has no keys.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct OrderRow {
    /// Order identifier
    pub order_id: i64,
    /// Customer who placed the order
    pub user_id: i64,
    /// When the order was placed
    pub placed_at: DateTime<Utc>,
    /// Order status
    pub status: String,
    /// Order total in cents
    pub total_cents: i64,
    /// Order line identifier
    pub line_id: Option<i64>,
    /// Name of the product on the line
    pub product_name: Option<String>,
    /// Unit price at sale time
    pub sale_price_cents: Option<i64>,
    /// Units on the line
    pub quantity: Option<i32>,
    /// License identifier
    pub license_id: Option<i64>,
    /// The license key
    pub key_string: Option<String>,
}

/// An order with its lines, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderView {
    /// Order identifier
    pub order_id: i64,
    /// Customer who placed the order
    pub user_id: i64,
    /// When the order was placed
    pub placed_at: DateTime<Utc>,
    /// Order status
    pub status: String,
    /// Order total in cents, as recorded at checkout
    pub total_cents: i64,
    /// Lines by ascending line id
    pub lines: Vec<OrderLineView>,
}

/// One line of an [`OrderView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineView {
    /// Order line identifier
    pub line_id: i64,
    /// Product name
    pub product_name: String,
    /// Unit price at sale time
    pub sale_price_cents: i64,
    /// Units bought
    pub quantity: i32,
    /// Issued keys, empty if none were found
    pub keys: Vec<String>,
}

impl OrderView {
    /// Number of keys across all lines.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.lines.iter().map(|line| line.keys.len()).sum()
    }
}

struct OrderGroup {
    user_id: i64,
    placed_at: DateTime<Utc>,
    status: String,
    total_cents: i64,
    lines: BTreeMap<i64, LineGroup>,
}

struct LineGroup {
    product_name: String,
    sale_price_cents: i64,
    quantity: i32,
    keys: BTreeMap<i64, String>,
}

/// Groups flat order rows into nested order views.
///
/// Never fails. Header columns of the first row seen for an order or line win. A row
/// carrying a key but no line, or a key without its license id, is dropped.
pub fn aggregate_order_rows<I>(rows: I) -> Vec<OrderView>
where
    I: IntoIterator<Item = OrderRow>,
{
    let mut orders: BTreeMap<i64, OrderGroup> = BTreeMap::new();

    for row in rows {
        let group = orders.entry(row.order_id).or_insert_with(|| OrderGroup {
            user_id: row.user_id,
            placed_at: row.placed_at,
            status: row.status.clone(),
            total_cents: row.total_cents,
            lines: BTreeMap::new(),
        });

        let Some(line_id) = row.line_id else {
            if row.key_string.is_some() {
                debug!("Dropping key row without a line on order {}", row.order_id);
            }
            continue;
        };

        let line = group.lines.entry(line_id).or_insert_with(|| LineGroup {
            product_name: row.product_name.clone().unwrap_or_default(),
            sale_price_cents: row.sale_price_cents.unwrap_or_default(),
            quantity: row.quantity.unwrap_or_default(),
            keys: BTreeMap::new(),
        });

        match (row.license_id, row.key_string) {
            (Some(license_id), Some(key)) => {
                line.keys.entry(license_id).or_insert(key);
            }
            (None, Some(_)) => debug!("Dropping key without license id on line {line_id}"),
            _ => {}
        }
    }

    let mut views: Vec<OrderView> = orders
        .into_iter()
        .map(|(order_id, group)| OrderView {
            order_id,
            user_id: group.user_id,
            placed_at: group.placed_at,
            status: group.status,
            total_cents: group.total_cents,
            lines: group
                .lines
                .into_iter()
                .map(|(line_id, line)| OrderLineView {
                    line_id,
                    product_name: line.product_name,
                    sale_price_cents: line.sale_price_cents,
                    quantity: line.quantity,
                    keys: line.keys.into_values().collect(),
                })
                .collect(),
        })
        .collect();

    views.sort_by(|a, b| {
        b.placed_at
            .cmp(&a.placed_at)
            .then_with(|| b.order_id.cmp(&a.order_id))
    });
    views
}

fn order_rows_query() -> Select<Order> {
    Order::find()
        .select_only()
        .column_as(order::Column::Id, "order_id")
        .column_as(order::Column::UserId, "user_id")
        .column_as(order::Column::PlacedAt, "placed_at")
        .column_as(order::Column::Status, "status")
        .column_as(order::Column::TotalCents, "total_cents")
        .column_as(order_line::Column::Id, "line_id")
        .column_as(product::Column::Name, "product_name")
        .column_as(order_line::Column::SalePriceCents, "sale_price_cents")
        .column_as(order_line::Column::Quantity, "quantity")
        .column_as(license_key::Column::Id, "license_id")
        .column_as(license_key::Column::KeyString, "key_string")
        .join(JoinType::LeftJoin, order::Relation::Lines.def())
        .join(JoinType::LeftJoin, order_line::Relation::Product.def())
        .join(JoinType::LeftJoin, order_line::Relation::Licenses.def())
        .order_by_desc(order::Column::PlacedAt)
        .order_by_desc(order::Column::Id)
        .order_by_asc(order_line::Column::Id)
        .order_by_asc(license_key::Column::Id)
}

/// Flat history rows for one user, most recent order first.
pub async fn order_rows_for_user<C>(db: &C, user_id: i64) -> Result<Vec<OrderRow>>
where
    C: ConnectionTrait,
{
    order_rows_query()
        .filter(order::Column::UserId.eq(user_id))
        .into_model::<OrderRow>()
        .all(db)
        .await
        .map_err(Into::into)
}

/// The user's orders with lines and keys, most recent first.
#[instrument(skip(db))]
pub async fn order_history_for_user<C>(db: &C, user_id: i64) -> Result<Vec<OrderView>>
where
    C: ConnectionTrait,
{
    let rows = order_rows_for_user(db, user_id).await?;
    debug!("Loaded {} history rows for user {user_id}", rows.len());
    Ok(aggregate_order_rows(rows))
}

/// One row of the admin order list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminOrderSummary {
    /// Order identifier
    pub order_id: i64,
    /// Customer who placed the order
    pub user_id: i64,
    /// "First Last" of the customer
    pub customer_name: String,
    /// When the order was placed
    pub placed_at: DateTime<Utc>,
    /// Order status
    pub status: String,
    /// Order total in cents
    pub total_cents: i64,
    /// Number of lines
    pub line_count: usize,
    /// Number of keys issued
    pub key_count: usize,
}

/// Every order in the store, most recent first, with the customer's name.
#[instrument(skip(db))]
pub async fn admin_order_listing<C>(db: &C) -> Result<Vec<AdminOrderSummary>>
where
    C: ConnectionTrait,
{
    let rows = order_rows_query().into_model::<OrderRow>().all(db).await?;
    let orders = aggregate_order_rows(rows);

    let user_ids: Vec<i64> = orders.iter().map(|o| o.user_id).collect();
    let names: HashMap<i64, String> = User::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.display_name()))
        .collect();

    Ok(orders
        .into_iter()
        .map(|order| AdminOrderSummary {
            customer_name: names
                .get(&order.user_id)
                .cloned()
                .unwrap_or_else(|| format!("user #{}", order.user_id)),
            key_count: order.key_count(),
            line_count: order.lines.len(),
            order_id: order.order_id,
            user_id: order.user_id,
            placed_at: order.placed_at,
            status: order.status,
            total_cents: order.total_cents,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::{cart, checkout},
        test_utils::*,
    };
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
    }

    fn row(order_id: i64, hour: u32, line: Option<(i64, &str)>, key: Option<(i64, &str)>) -> OrderRow {
        OrderRow {
            order_id,
            user_id: 1,
            placed_at: at(hour),
            status: "paid".to_string(),
            total_cents: 1_000,
            line_id: line.map(|(id, _)| id),
            product_name: line.map(|(_, name)| name.to_string()),
            sale_price_cents: line.map(|_| 500),
            quantity: line.map(|_| 2),
            license_id: key.map(|(id, _)| id),
            key_string: key.map(|(_, k)| k.to_string()),
        }
    }

    fn sample_rows() -> Vec<OrderRow> {
        vec![
            row(2, 12, Some((20, "Editor")), Some((200, "K-200"))),
            row(2, 12, Some((20, "Editor")), Some((201, "K-201"))),
            row(2, 12, Some((21, "Game")), Some((202, "K-202"))),
            row(1, 9, Some((10, "Antivirus")), Some((100, "K-100"))),
            row(1, 9, Some((10, "Antivirus")), Some((101, "K-101"))),
        ]
    }

    #[test]
    fn test_empty_stream() {
        assert!(aggregate_order_rows(Vec::new()).is_empty());
    }

    #[test]
    fn test_groups_orders_lines_and_keys() {
        let orders = aggregate_order_rows(sample_rows());

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_id, 2);
        assert_eq!(orders[1].order_id, 1);

        let lines = &orders[0].lines;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_name, "Editor");
        assert_eq!(lines[0].keys, vec!["K-200", "K-201"]);
        assert_eq!(lines[1].keys, vec!["K-202"]);
        assert_eq!(orders[0].key_count(), 3);

        assert_eq!(orders[1].lines[0].keys, vec!["K-100", "K-101"]);
    }

    #[test]
    fn test_is_idempotent() {
        assert_eq!(
            aggregate_order_rows(sample_rows()),
            aggregate_order_rows(sample_rows())
        );
    }

    #[test]
    fn test_reordering_rows_within_groups_changes_nothing() {
        let expected = aggregate_order_rows(sample_rows());

        let mut shuffled = sample_rows();
        shuffled.swap(0, 1);
        shuffled.swap(3, 4);
        assert_eq!(aggregate_order_rows(shuffled), expected);

        // Lines of one order interleaved out of id order
        let interleaved = vec![
            row(2, 12, Some((21, "Game")), Some((202, "K-202"))),
            row(2, 12, Some((20, "Editor")), Some((201, "K-201"))),
            row(1, 9, Some((10, "Antivirus")), Some((101, "K-101"))),
            row(2, 12, Some((20, "Editor")), Some((200, "K-200"))),
            row(1, 9, Some((10, "Antivirus")), Some((100, "K-100"))),
        ];
        assert_eq!(aggregate_order_rows(interleaved), expected);
    }

    #[test]
    fn test_line_without_keys_has_empty_list() {
        let orders = aggregate_order_rows(vec![row(5, 8, Some((50, "Fonts")), None)]);
        assert_eq!(orders[0].lines.len(), 1);
        assert!(orders[0].lines[0].keys.is_empty());
    }

    #[test]
    fn test_malformed_rows_are_dropped() {
        let orders = aggregate_order_rows(vec![
            // key with no line
            row(6, 8, None, Some((60, "K-ORPHAN"))),
            // key with no license id
            OrderRow {
                license_id: None,
                ..row(7, 8, Some((70, "Fonts")), Some((0, "K-NOID")))
            },
        ]);

        assert_eq!(orders.len(), 2);
        let order_6 = orders.iter().find(|o| o.order_id == 6).unwrap();
        assert!(order_6.lines.is_empty());
        let order_7 = orders.iter().find(|o| o.order_id == 7).unwrap();
        assert!(order_7.lines[0].keys.is_empty());
    }

    #[test]
    fn test_duplicate_key_rows_collapse() {
        let orders = aggregate_order_rows(vec![
            row(3, 10, Some((30, "Editor")), Some((300, "K-300"))),
            row(3, 10, Some((30, "Editor")), Some((300, "K-300"))),
        ]);
        assert_eq!(orders[0].lines[0].keys, vec!["K-300"]);
    }

    #[test]
    fn test_same_timestamp_orders_by_id() {
        let orders = aggregate_order_rows(vec![
            row(8, 10, Some((80, "A")), None),
            row(9, 10, Some((90, "B")), None),
        ]);
        assert_eq!(orders[0].order_id, 9);
        assert_eq!(orders[1].order_id, 8);
    }

    #[tokio::test]
    async fn test_history_for_user_without_orders() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "fresh@example.com").await?;

        assert!(order_history_for_user(&db, user.id).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_history_after_checkouts() -> Result<()> {
        let (db, user, product_a, product_b) = setup_with_cart().await?;
        let first = checkout::finalize_checkout(&db, user.id, &test_settings()).await?;

        cart::add_to_cart(&db, user.id, product_b.id).await?;
        let second = checkout::finalize_checkout(&db, user.id, &test_settings()).await?;

        let rows = order_rows_for_user(&db, user.id).await?;
        assert_eq!(rows.len(), 4);

        let orders = order_history_for_user(&db, user.id).await?;
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_id, second);
        assert_eq!(orders[1].order_id, first);

        let first_order = &orders[1];
        assert_eq!(first_order.total_cents, 25_000);
        assert_eq!(first_order.lines[0].product_name, product_a.name);
        assert_eq!(first_order.lines[0].keys.len(), 2);
        assert_eq!(first_order.lines[1].product_name, product_b.name);
        assert_eq!(first_order.lines[1].keys.len(), 1);

        assert_eq!(orders[0].lines.len(), 1);
        assert_eq!(orders[0].total_cents, 5_000);

        Ok(())
    }

    #[tokio::test]
    async fn test_history_is_scoped_to_user() -> Result<()> {
        let (db, user, product_a, _product_b) = setup_with_cart().await?;
        checkout::finalize_checkout(&db, user.id, &test_settings()).await?;

        let other = create_test_user(&db, "other@example.com").await?;
        cart::add_to_cart(&db, other.id, product_a.id).await?;
        checkout::finalize_checkout(&db, other.id, &test_settings()).await?;

        let mine = order_history_for_user(&db, user.id).await?;
        assert_eq!(mine.len(), 1);
        assert!(mine.iter().all(|o| o.user_id == user.id));

        Ok(())
    }

    #[tokio::test]
    async fn test_admin_listing() -> Result<()> {
        let (db, user, product_a, _product_b) = setup_with_cart().await?;
        checkout::finalize_checkout(&db, user.id, &test_settings()).await?;

        let other = create_test_user(&db, "other@example.com").await?;
        cart::add_to_cart(&db, other.id, product_a.id).await?;
        let latest = checkout::finalize_checkout(&db, other.id, &test_settings()).await?;

        let listing = admin_order_listing(&db).await?;
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].order_id, latest);
        assert_eq!(listing[0].customer_name, other.display_name());
        assert_eq!(listing[0].key_count, 1);
        assert_eq!(listing[1].customer_name, user.display_name());
        assert_eq!(listing[1].line_count, 2);
        assert_eq!(listing[1].key_count, 3);

        Ok(())
    }
}
