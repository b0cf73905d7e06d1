//! Manual order creation and order reads.
//!
//! Creation runs in this order:
//!
//! 1. validate the payload and resolve every line against the catalog
//! 2. price the order
//! 3. raise the orders `AUTO_INCREMENT` past every used post ID
//! 4. in one transaction: allocate the order number, write the HPOS and
//!    legacy rows, decrement stock and queue the e-mail trigger
//! 5. after commit: drop WooCommerce's order transients and start the
//!    e-mail trigger in the background
//!
//! Re-submitting the same payload creates a second order; there is no
//! deduplication.

mod collision_guard;
mod error;
pub mod numbering;
pub mod projection;
mod persister;
pub mod stock;

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;

use woo_backoffice_core::store_time::to_store_local;
use woo_backoffice_core::{
    Email, LineAmounts, LineInput, OrderId, OrderNumber, OrderStatus, OrderTotals, PageRequest,
    ProductId, TaxSplit,
};

pub use collision_guard::ensure_headroom;
pub use error::OrderError;

use crate::config::OrderConfig;
use crate::db::email_outbox;
use crate::db::{OptionRepository, OrderFilter, OrderRepository, ProductRepository, Tables};
use crate::models::{
    Address, CurrentUser, OrderDetail, OrderLine, OrderRecord, OrderSummary, ProductListing,
    ProductSearchHit, ProductType,
};
use crate::woocommerce::email_trigger::spawn_delivery;
use crate::woocommerce::{EmailJob, EmailTrigger, OrderTransport};

/// Option holding the installed WooCommerce version.
const WOOCOMMERCE_VERSION_OPTION: &str = "woocommerce_version";
const DEFAULT_WOOCOMMERCE_VERSION: &str = "9.0.0";

/// Results returned by the order form's product search.
const SEARCH_LIMIT: u32 = 10;
const MIN_SEARCH_LENGTH: usize = 2;

/// Stored user agents are cut to this many characters.
const USER_AGENT_MAX_CHARS: usize = 200;

const ORDER_KEY_RANDOM_CHARS: usize = 13;

/// One requested line.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    /// `0` from older clients means no variation.
    #[serde(default)]
    pub variation_id: Option<ProductId>,
    pub quantity: u32,
    /// Unit price with tax; the product's `_price` when absent.
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// `POST /orders/save-order` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRequest {
    pub customer: Address,
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub shipping_cost: Decimal,
    #[serde(default)]
    pub discount_percentage: Decimal,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    #[serde(default = "default_payment_method_title")]
    pub payment_method_title: String,
    #[serde(default)]
    pub customer_note: String,
}

fn default_payment_method() -> String {
    "cod".to_string()
}

fn default_payment_method_title() -> String {
    "Pago manual".to_string()
}

/// Where the request came from, for the order's audit fields.
#[derive(Debug, Clone, Default)]
pub struct RequestOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Response of a successful creation.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedOrder {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub total: Decimal,
    pub tax: Decimal,
    pub subtotal: Decimal,
}

/// Order service.
pub struct OrderService<'a> {
    pool: &'a MySqlPool,
    tables: &'a Tables,
    config: &'a OrderConfig,
    uploads_base: &'a str,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a MySqlPool,
        tables: &'a Tables,
        config: &'a OrderConfig,
        uploads_base: &'a str,
    ) -> Self {
        Self {
            pool,
            tables,
            config,
            uploads_base,
        }
    }

    const fn orders(&self) -> OrderRepository<'a> {
        OrderRepository::new(self.pool, self.tables)
    }

    const fn products(&self) -> ProductRepository<'a> {
        ProductRepository::new(self.pool, self.tables, self.uploads_base)
    }

    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn list(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<(Vec<OrderSummary>, u64), OrderError> {
        Ok(self.orders().list(filter, page).await?)
    }

    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn detail(&self, id: OrderId) -> Result<Option<OrderDetail>, OrderError> {
        Ok(self.orders().detail(id).await?)
    }

    /// Product search for the order form.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Validation` for terms shorter than two characters.
    pub async fn search_products(&self, term: &str) -> Result<Vec<ProductSearchHit>, OrderError> {
        let term = term.trim();
        if term.chars().count() < MIN_SEARCH_LENGTH {
            return Err(OrderError::Validation(format!(
                "search term must have at least {MIN_SEARCH_LENGTH} characters"
            )));
        }
        Ok(self.products().search_for_order(term, SEARCH_LIMIT).await?)
    }

    /// Create a manual order and start its e-mail trigger.
    ///
    /// If another writer takes the order's ID between the collision guard
    /// and the insert, the whole creation is retried once.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Validation` or `OrderError::ProductNotFound` for
    /// bad payloads, `OrderError::Repository` if the transaction fails (it is
    /// rolled back).
    #[tracing::instrument(skip_all, fields(user = %actor.username, order_id, order_number))]
    pub async fn create<T>(
        &self,
        request: &OrderRequest,
        actor: &CurrentUser,
        origin: &RequestOrigin,
        trigger: &Arc<EmailTrigger<T>>,
    ) -> Result<CreatedOrder, OrderError>
    where
        T: OrderTransport + 'static,
    {
        let customer = validate(request)?;
        let lines = self.resolve_lines(&request.items).await?;
        let (totals, lines, split) = price_lines(lines, request)?;

        let template = RecordTemplate {
            customer,
            lines,
            totals,
            shipping_amounts: split.shipping,
            discount_amounts: split.discount,
            request,
            actor,
            origin,
        };

        let (order_id, record, job) = match self.create_once(&template).await {
            Err(e) if e.is_id_conflict() => {
                tracing::warn!(error = %e, "order ID taken by a concurrent writer, retrying once");
                self.create_once(&template).await?
            }
            other => other?,
        };

        let span = tracing::Span::current();
        span.record("order_id", tracing::field::display(order_id));
        span.record("order_number", tracing::field::display(&record.number));

        if let Err(e) = OptionRepository::new(self.pool, self.tables)
            .delete_order_transients()
            .await
        {
            tracing::warn!(error = %e, "failed to clear order transients");
        }

        spawn_delivery(self.pool.clone(), Arc::clone(trigger), job);

        tracing::info!(
            order_id = %order_id,
            order_number = %record.number,
            total = %record.totals.total,
            items = record.item_count(),
            "order created"
        );

        Ok(CreatedOrder {
            order_id,
            order_number: record.number,
            total: record.totals.total,
            tax: record.totals.tax,
            subtotal: record.totals.subtotal,
        })
    }

    /// One attempt: guard, then the whole write in a single transaction.
    async fn create_once(
        &self,
        template: &RecordTemplate<'_>,
    ) -> Result<(OrderId, OrderRecord, EmailJob), OrderError> {
        ensure_headroom(&self.orders()).await?;
        let version = self.woocommerce_version().await;

        let mut tx = self.pool.begin().await?;

        let number = numbering::allocate(&mut *tx, self.tables, &self.config.number_prefix).await?;
        let record = template.build(number, &self.config.currency);

        let order_id = persister::persist(&mut *tx, self.tables, &record, &version).await?;
        stock::decrement(&mut *tx, self.tables, &record).await?;

        let outbox_id = email_outbox::enqueue(
            &mut *tx,
            order_id,
            record.number.as_str(),
            &record.payment_method,
            &record.payment_method_title,
        )
        .await?;

        tx.commit().await?;

        let job = EmailJob {
            outbox_id,
            order_id,
            order_number: record.number.to_string(),
            payment_method: record.payment_method.clone(),
            payment_method_title: record.payment_method_title.clone(),
        };
        Ok((order_id, record, job))
    }

    async fn woocommerce_version(&self) -> String {
        match OptionRepository::new(self.pool, self.tables)
            .get(WOOCOMMERCE_VERSION_OPTION)
            .await
        {
            Ok(Some(version)) if !version.trim().is_empty() => version,
            Ok(_) => DEFAULT_WOOCOMMERCE_VERSION.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read woocommerce_version option");
                DEFAULT_WOOCOMMERCE_VERSION.to_string()
            }
        }
    }

    /// Look up every requested product and fix its price.
    async fn resolve_lines(
        &self,
        items: &[OrderItemRequest],
    ) -> Result<Vec<OrderLine>, OrderError> {
        let products = self.products();
        let mut lines = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            let variation_id = item.variation_id.filter(|v| v.as_u64() != 0);
            let product = products
                .sellable(item.product_id)
                .await?
                .ok_or(OrderError::ProductNotFound(item.product_id))?;

            let line = match variation_id {
                Some(variation_id) => {
                    let variation = products
                        .sellable(variation_id)
                        .await?
                        .ok_or(OrderError::ProductNotFound(variation_id))?;
                    if variation.parent_id != Some(product.id) {
                        return Err(OrderError::Validation(format!(
                            "variation {variation_id} does not belong to product {}",
                            product.id
                        )));
                    }
                    line_for(index, item, product.id, &variation)?
                }
                None => {
                    let parent = match product.product_type {
                        ProductType::Variation => product.parent_id.unwrap_or(product.id),
                        ProductType::Simple | ProductType::Variable => product.id,
                    };
                    line_for(index, item, parent, &product)?
                }
            };
            lines.push(line);
        }
        Ok(lines)
    }
}

/// Price one line. `listing` is the post being sold: the variation when
/// there is one, else the product itself.
fn line_for(
    index: usize,
    item: &OrderItemRequest,
    product_id: ProductId,
    listing: &ProductListing,
) -> Result<OrderLine, OrderError> {
    let unit_price = item.price.or(listing.price).ok_or_else(|| {
        OrderError::Validation(format!(
            "item {}: product {} has no price",
            index + 1,
            listing.id
        ))
    })?;
    Ok(OrderLine {
        product_id,
        variation_id: (listing.id != product_id).then_some(listing.id),
        name: listing.title.clone(),
        sku: listing.sku.clone(),
        quantity: item.quantity,
        unit_price,
        amounts: LineAmounts::from_gross(LineInput::new(unit_price, item.quantity).gross()?),
    })
}

/// Price the order and give each line its share of the order's net and tax.
fn price_lines(
    mut lines: Vec<OrderLine>,
    request: &OrderRequest,
) -> Result<(OrderTotals, Vec<OrderLine>, TaxSplit), OrderError> {
    let inputs: Vec<LineInput> = lines
        .iter()
        .map(|l| LineInput::new(l.unit_price, l.quantity))
        .collect();
    let totals =
        OrderTotals::calculate(&inputs, request.shipping_cost, request.discount_percentage)?;
    let split = totals.split(&inputs)?;
    for (line, amounts) in lines.iter_mut().zip(&split.lines) {
        line.amounts = *amounts;
    }
    Ok((totals, lines, split))
}

/// Required customer fields, with the name used in error messages.
const REQUIRED_CUSTOMER_FIELDS: [&str; 6] =
    ["first_name", "last_name", "phone", "address_1", "city", "state"];

/// Check the payload shape and normalize the customer address.
fn validate(request: &OrderRequest) -> Result<Address, OrderError> {
    if request.items.is_empty() {
        return Err(OrderError::Validation(
            "the order needs at least one product".into(),
        ));
    }

    let mut customer = request.customer.clone();
    for (field, value) in customer.fields() {
        if REQUIRED_CUSTOMER_FIELDS.contains(&field) && value.trim().is_empty() {
            return Err(OrderError::Validation(format!("customer {field} is required")));
        }
    }

    customer.email = match customer.email.trim() {
        "" => String::new(),
        raw => Email::parse(raw)
            .map_err(|e| OrderError::Validation(format!("customer email: {e}")))?
            .into_inner(),
    };
    if customer.country.trim().is_empty() {
        customer.country = "PE".to_string();
    }
    Ok(customer)
}

/// `wc_order_` plus random alphanumerics, as WooCommerce generates them.
fn order_key() -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(ORDER_KEY_RANDOM_CHARS)
        .map(char::from)
        .collect();
    format!("wc_order_{suffix}")
}

/// Everything of the record except what the transaction allocates.
struct RecordTemplate<'r> {
    customer: Address,
    lines: Vec<OrderLine>,
    totals: OrderTotals,
    shipping_amounts: LineAmounts,
    discount_amounts: LineAmounts,
    request: &'r OrderRequest,
    actor: &'r CurrentUser,
    origin: &'r RequestOrigin,
}

impl RecordTemplate<'_> {
    fn build(&self, number: OrderNumber, currency: &str) -> OrderRecord {
        let created_at_gmt = Utc::now().naive_utc().trunc_subsecs(0);
        OrderRecord {
            number,
            order_key: order_key(),
            status: OrderStatus::Pending,
            currency: currency.to_string(),
            created_at_gmt,
            created_at_local: to_store_local(created_at_gmt),
            billing: self.customer.clone(),
            shipping: self.customer.clone(),
            lines: self.lines.clone(),
            totals: self.totals,
            shipping_amounts: self.shipping_amounts,
            discount_amounts: self.discount_amounts,
            payment_method: self.request.payment_method.trim().to_string(),
            payment_method_title: self.request.payment_method_title.trim().to_string(),
            customer_note: self.request.customer_note.trim().to_string(),
            created_by: self.actor.audit_name().to_string(),
            ip_address: self.origin.ip_address.clone(),
            user_agent: self
                .origin
                .user_agent
                .as_deref()
                .map(|ua| ua.chars().take(USER_AGENT_MAX_CHARS).collect()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use woo_backoffice_core::{PricingError, UserId, UserRole};

    use super::*;

    fn request(value: serde_json::Value) -> OrderRequest {
        serde_json::from_value(value).unwrap()
    }

    fn payload() -> serde_json::Value {
        json!({
            "customer": {
                "first_name": "Juan",
                "last_name": "Pérez",
                "phone": "987654321",
                "address_1": "Av. Principal 123",
                "city": "Lima",
                "state": "LIM",
                "email": "Juan@Example.com"
            },
            "items": [{"product_id": 1, "quantity": 2, "price": 59.00}],
            "shipping_cost": 10.00,
            "discount_percentage": 10
        })
    }

    #[test]
    fn test_payload_defaults() {
        let request = request(payload());
        assert_eq!(request.payment_method, "cod");
        assert_eq!(request.customer.country, "PE");
        assert_eq!(request.items[0].price, Some(Decimal::new(59, 0)));
        assert_eq!(request.items[0].variation_id, None);
    }

    #[test]
    fn test_validate_normalizes_email() {
        let customer = validate(&request(payload())).unwrap();
        assert_eq!(customer.email, "juan@example.com");
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let mut value = payload();
        value["customer"]["city"] = json!("  ");
        assert!(matches!(
            validate(&request(value)),
            Err(OrderError::Validation(m)) if m.contains("city")
        ));

        let mut value = payload();
        value["items"] = json!([]);
        assert!(matches!(
            validate(&request(value)),
            Err(OrderError::Validation(_))
        ));
    }

    #[test]
    fn test_line_falls_back_to_listed_price() {
        let listing = ProductListing {
            id: ProductId::new(11),
            parent_id: Some(ProductId::new(10)),
            parent_title: Some("Polo".into()),
            title: "Polo - Rojo".into(),
            status: "publish".into(),
            product_type: ProductType::Variation,
            sku: Some("POL0001-R".into()),
            regular_price: Some(Decimal::new(5990, 2)),
            sale_price: Some(Decimal::new(4990, 2)),
            price: Some(Decimal::new(4990, 2)),
            stock: Some(3),
            stock_status: None,
            manage_stock: true,
            variations_count: 0,
            image_url: None,
            date: None,
        };
        let item = OrderItemRequest {
            product_id: ProductId::new(10),
            variation_id: Some(ProductId::new(11)),
            quantity: 2,
            price: None,
        };
        let line = line_for(0, &item, ProductId::new(10), &listing).unwrap();
        assert_eq!(line.unit_price, Decimal::new(4990, 2));
        assert_eq!(line.variation_id, Some(ProductId::new(11)));
        assert_eq!(line.amounts.gross, Decimal::new(9980, 2));

        let unpriced = ProductListing { price: None, ..listing };
        assert!(matches!(
            line_for(0, &item, ProductId::new(10), &unpriced),
            Err(OrderError::Validation(_))
        ));
    }

    #[test]
    fn test_built_record_prices_the_scenario() {
        let request = request(payload());
        let actor = CurrentUser {
            id: UserId::new(1),
            username: "ana".into(),
            full_name: None,
            role: UserRole::Advisor,
        };
        let origin = RequestOrigin {
            ip_address: None,
            user_agent: Some("x".repeat(300)),
        };
        let price = Decimal::new(5900, 2);
        let lines = vec![OrderLine {
            product_id: ProductId::new(1),
            variation_id: None,
            name: "Polo".into(),
            sku: None,
            quantity: 2,
            unit_price: price,
            amounts: LineAmounts::from_gross(price * Decimal::from(2)),
        }];
        let (totals, lines, split) = price_lines(lines, &request).unwrap();
        let template = RecordTemplate {
            customer: validate(&request).unwrap(),
            lines,
            totals,
            shipping_amounts: split.shipping,
            discount_amounts: split.discount,
            request: &request,
            actor: &actor,
            origin: &origin,
        };

        let record = template.build(OrderNumber::format("W", 1).unwrap(), "PEN");
        assert_eq!(record.number.as_str(), "W-00001");
        assert_eq!(record.status, OrderStatus::Pending);
        assert_eq!(record.totals.products_total, Decimal::new(11800, 2));
        assert_eq!(record.totals.discount_amount, Decimal::new(1180, 2));
        assert_eq!(record.totals.total, Decimal::new(11620, 2));
        assert_eq!(record.totals.tax, Decimal::new(1773, 2));
        assert_eq!(record.totals.subtotal, Decimal::new(9847, 2));
        assert_eq!(record.created_by, "ana");
        assert_eq!(record.user_agent.unwrap().len(), USER_AGENT_MAX_CHARS);
        assert!(record.order_key.starts_with("wc_order_"));
        assert_eq!(record.order_key.len(), "wc_order_".len() + ORDER_KEY_RANDOM_CHARS);
        assert_eq!(
            record.created_at_gmt - record.created_at_local,
            chrono::Duration::hours(5)
        );
    }

    fn line(price: &str, quantity: u32) -> OrderLine {
        let unit_price: Decimal = price.parse().unwrap();
        OrderLine {
            product_id: ProductId::new(1),
            variation_id: None,
            name: "Polo".into(),
            sku: None,
            quantity,
            unit_price,
            amounts: LineAmounts::from_gross(unit_price * Decimal::from(quantity)),
        }
    }

    #[test]
    fn test_line_amounts_add_up_to_order_totals() {
        let mut value = payload();
        value["shipping_cost"] = json!(0);
        value["discount_percentage"] = json!(0);
        let request = request(value);

        let lines = vec![line("1.00", 1), line("1.00", 1), line("1.00", 1)];
        let (totals, lines, split) = price_lines(lines, &request).unwrap();
        let net: Decimal = lines.iter().map(|l| l.amounts.net).sum();
        let tax: Decimal = lines.iter().map(|l| l.amounts.tax).sum();
        assert_eq!(net + split.shipping.net + split.discount.net, totals.subtotal);
        assert_eq!(tax + split.shipping.tax + split.discount.tax, totals.tax);
        assert_eq!(tax, Decimal::new(46, 2));
    }

    #[test]
    fn test_huge_price_is_a_pricing_error() {
        let mut value = payload();
        value["items"][0]["price"] = json!(Decimal::MAX.to_string());
        let request = request(value);
        let item = &request.items[0];
        let listing = ProductListing {
            id: ProductId::new(1),
            parent_id: None,
            parent_title: None,
            title: "Polo".into(),
            status: "publish".into(),
            product_type: ProductType::Simple,
            sku: None,
            regular_price: None,
            sale_price: None,
            price: None,
            stock: None,
            stock_status: None,
            manage_stock: false,
            variations_count: 0,
            image_url: None,
            date: None,
        };
        assert!(matches!(
            line_for(0, item, ProductId::new(1), &listing),
            Err(OrderError::Pricing(PricingError::Overflow))
        ));

        let lines = vec![line("79228162514264337593543950335", 1), line("1", 1)];
        assert!(matches!(
            price_lines(lines, &request),
            Err(OrderError::Pricing(PricingError::Overflow))
        ));
    }
}
