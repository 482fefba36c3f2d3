use chrono::{NaiveDate, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{NewOrder, Order, OrderStatus, PaymentStatus};
use crate::domain::ports::OrderRepository;
use crate::domain::{ListResult, PageRequest};
use crate::schema::{order_counters, order_lines, orders};

use super::models::{NewOrderCounterRow, NewOrderLineRow, NewOrderRow, OrderLineRow, OrderRow};

#[derive(AsChangeset)]
#[diesel(table_name = orders)]
struct PaymentChangesRow {
    payment_status: String,
    payment_id: Option<String>,
    updated_at: chrono::DateTime<Utc>,
}

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn load_order(conn: &mut PgConnection, id: Uuid) -> Result<Option<Order>, DomainError> {
    let order = orders::table
        .find(id)
        .select(OrderRow::as_select())
        .first(conn)
        .optional()?;

    let Some(order) = order else {
        return Ok(None);
    };

    let lines = order_lines::table
        .filter(order_lines::order_id.eq(order.id))
        .order(order_lines::position.asc())
        .select(OrderLineRow::as_select())
        .load(conn)?;

    order.into_order(lines).map(Some)
}

/// Loads the lines of every order in one query and stitches them back on.
fn with_lines(conn: &mut PgConnection, rows: Vec<OrderRow>) -> Result<Vec<Order>, DomainError> {
    let lines = OrderLineRow::belonging_to(&rows)
        .order(order_lines::position.asc())
        .select(OrderLineRow::as_select())
        .load(conn)?;

    lines
        .grouped_by(&rows)
        .into_iter()
        .zip(rows)
        .map(|(lines, order)| order.into_order(lines))
        .collect()
}

impl OrderRepository for DieselOrderRepository {
    fn next_sequence(&self, day: NaiveDate) -> Result<i32, DomainError> {
        let mut conn = self.pool.get()?;

        // Upsert-and-return runs as one statement, so two callers can never
        // observe the same value for a day.
        let value = diesel::insert_into(order_counters::table)
            .values(&NewOrderCounterRow { day, last_value: 1 })
            .on_conflict(order_counters::day)
            .do_update()
            .set(order_counters::last_value.eq(order_counters::last_value + 1))
            .returning(order_counters::last_value)
            .get_result::<i32>(&mut conn)?;
        Ok(value)
    }

    fn insert(&self, order: NewOrder) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Insert the order header
            let address = &order.shipping_address;
            let row = diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order.id,
                    order_number: order.order_number.clone(),
                    user_id: order.user_id,
                    total_amount: order.total_amount.clone(),
                    status: OrderStatus::Pending.as_str().to_string(),
                    payment_status: PaymentStatus::Pending.as_str().to_string(),
                    payment_method: order.payment_method.as_str().to_string(),
                    ship_name: address.name.clone(),
                    ship_phone: address.phone.clone(),
                    ship_street: address.street.clone(),
                    ship_city: address.city.clone(),
                    ship_state: address.state.clone(),
                    ship_zip_code: address.zip_code.clone(),
                    ship_country: address.country.clone(),
                    notes: order.notes.clone(),
                })
                .returning(OrderRow::as_returning())
                .get_result(conn)?;

            // 2. Insert the frozen lines, keeping request order
            let new_lines: Vec<NewOrderLineRow> = order
                .lines
                .iter()
                .enumerate()
                .map(|(position, l)| NewOrderLineRow {
                    id: Uuid::new_v4(),
                    order_id: order.id,
                    position: position as i32,
                    product_id: l.product_id,
                    name: l.name.clone(),
                    quantity: l.quantity,
                    unit_price: l.unit_price.clone(),
                    image: l.image.clone(),
                    size: l.size.clone(),
                    color: l.color.clone(),
                })
                .collect();
            let lines = diesel::insert_into(order_lines::table)
                .values(&new_lines)
                .returning(OrderLineRow::as_returning())
                .get_results(conn)?;

            row.into_order(lines)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        load_order(&mut conn, id)
    }

    fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let rows = orders::table
                .filter(orders::user_id.eq(user_id))
                .order(orders::created_at.desc())
                .select(OrderRow::as_select())
                .load(conn)?;
            with_lines(conn, rows)
        })
    }

    fn list(
        &self,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<ListResult<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let filtered = || -> orders::BoxedQuery<'static, Pg> {
            let mut query = orders::table.into_boxed();
            if let Some(status) = status {
                query = query.filter(orders::status.eq(status.as_str()));
            }
            query
        };

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = filtered().count().get_result(conn)?;

            let rows = filtered()
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(page.limit)
                .offset(page.offset())
                .load(conn)?;

            Ok(ListResult {
                items: with_lines(conn, rows)?,
                total,
            })
        })
    }

    fn update_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let updated = diesel::update(
                orders::table
                    .filter(orders::id.eq(id))
                    .filter(orders::status.eq(from.as_str())),
            )
            .set((
                orders::status.eq(to.as_str()),
                orders::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;

            if updated == 0 {
                return Ok(None);
            }
            load_order(conn, id)
        })
    }

    fn update_payment(
        &self,
        id: Uuid,
        status: PaymentStatus,
        payment_id: Option<String>,
    ) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let updated = diesel::update(orders::table.find(id))
                .set(&PaymentChangesRow {
                    payment_status: status.as_str().to_string(),
                    payment_id,
                    updated_at: Utc::now(),
                })
                .execute(conn)?;

            if updated == 0 {
                return Ok(None);
            }
            load_order(conn, id)
        })
    }
}
