//! Populates the database with sample records.
//!
//! Usage: `DATABASE_URL=postgres://... seed [--count N]` (default 10 records
//! per entity). Runs migrations first, then writes through the domain
//! services so every seeded record passes the same validation as live
//! traffic.

use common::Money;
use domain::{
    CartService, CatalogService, CustomerService, ModerationService, NewAddress, NewCategory,
    NewComment, NewCustomer, NewDiscount, NewOrderItem, NewProduct, OrderService,
};
use store::PostgresStore;
use tracing_subscriber::EnvFilter;

const CATEGORY_TITLES: &[&str] = &[
    "Furniture", "Lighting", "Kitchen", "Textiles", "Outdoor", "Storage", "Decor", "Office",
];
const MATERIALS: &[&str] = &[
    "Walnut", "Oak", "Brass", "Ceramic", "Linen", "Steel", "Rattan", "Marble", "Copper", "Glass",
];
const OBJECTS: &[&str] = &[
    "Chair", "Table", "Lamp", "Vase", "Shelf", "Mirror", "Stool", "Basket", "Plate", "Clock",
];
const FIRST_NAMES: &[&str] = &[
    "Ada", "Grace", "Alan", "Edsger", "Barbara", "Donald", "Radia", "Dennis", "Margaret", "Ken",
];
const LAST_NAMES: &[&str] = &[
    "Hopper", "Lovelace", "Turing", "Dijkstra", "Liskov", "Knuth", "Perlman", "Ritchie",
    "Hamilton", "Thompson",
];
const PROVINCES: &[&str] = &["ON", "BC", "QC", "AB", "NS"];
const CITIES: &[&str] = &["Toronto", "Vancouver", "Montreal", "Calgary", "Halifax"];
const COMMENT_BODIES: &[&str] = &[
    "Exactly as pictured.",
    "Sturdier than expected.",
    "Arrived with a small scratch.",
    "Would buy again.",
    "The color is slightly off.",
];

/// Small deterministic xorshift generator; reproducible runs need no RNG
/// dependency.
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Rng(seed.max(1))
    }

    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len() as u64) as usize]
    }
}

fn parse_count() -> u64 {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--count" {
            let value = args.next().unwrap_or_default();
            return value.parse().unwrap_or_else(|_| {
                eprintln!("invalid --count value: {value}");
                std::process::exit(2);
            });
        }
    }
    10
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let count = parse_count();
    let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
        eprintln!("DATABASE_URL must be set");
        std::process::exit(2);
    });

    let store = PostgresStore::connect(&url)
        .await
        .expect("failed to connect to PostgreSQL");
    store
        .run_migrations()
        .await
        .expect("failed to run migrations");

    let catalog = CatalogService::new(store.clone());
    let customers = CustomerService::new(store.clone());
    let carts = CartService::new(store.clone());
    let orders = OrderService::new(store.clone());
    let moderation = ModerationService::new(store);

    let mut rng = Rng::new(0x5eed_cafe_f00d);

    let mut categories = Vec::new();
    for title in CATEGORY_TITLES.iter().take(count.min(CATEGORY_TITLES.len() as u64) as usize) {
        let category = catalog
            .create_category(NewCategory {
                title: (*title).to_string(),
                description: format!("Everything {}", title.to_lowercase()),
            })
            .await
            .expect("failed to seed category");
        categories.push(category);
    }

    let mut discounts = Vec::new();
    for n in 0..count.min(5) {
        let discount = catalog
            .create_discount(NewDiscount {
                percentage: (5 * (n + 1)) as f64,
                description: format!("{}% off", 5 * (n + 1)),
            })
            .await
            .expect("failed to seed discount");
        discounts.push(discount);
    }

    let mut products = Vec::new();
    for _ in 0..count {
        let name = format!("{} {}", rng.pick(MATERIALS), rng.pick(OBJECTS));
        let category = &categories[rng.below(categories.len() as u64) as usize];
        let discount_ids = if rng.below(3) == 0 && !discounts.is_empty() {
            vec![discounts[rng.below(discounts.len() as u64) as usize].id]
        } else {
            vec![]
        };
        let product = catalog
            .create_product(NewProduct {
                name,
                description: "Seeded sample product.".to_string(),
                price: Money::from_cents((500 + rng.below(49_500)) as i64),
                inventory: rng.below(100) as i32,
                category_id: category.id,
                discount_ids,
            })
            .await
            .expect("failed to seed product");
        products.push(product);
    }

    let mut customer_ids = Vec::new();
    for n in 0..count {
        let first = rng.pick(FIRST_NAMES);
        let last = rng.pick(LAST_NAMES);
        let customer = customers
            .create_customer(
                NewCustomer {
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                    email: format!("{}.{}.{n}@example.com", first.to_lowercase(), last.to_lowercase()),
                    phone_number: format!("555-{:04}", rng.below(10_000)),
                    birth_date: None,
                },
                NewAddress {
                    province: rng.pick(PROVINCES).to_string(),
                    city: rng.pick(CITIES).to_string(),
                    street: format!("{} Main St", 1 + rng.below(999)),
                },
            )
            .await
            .expect("failed to seed customer");
        customer_ids.push(customer.id);
    }

    for _ in 0..count {
        let cart = carts.create_cart().await.expect("failed to seed cart");
        for _ in 0..=rng.below(3) {
            let product = &products[rng.below(products.len() as u64) as usize];
            carts
                .add_item(cart.id, product.id, 1 + rng.below(4) as u32)
                .await
                .expect("failed to seed cart item");
        }
    }

    for customer_id in &customer_ids {
        // Distinct products per order; duplicates are rejected.
        let start = rng.below(products.len() as u64) as usize;
        let lines: Vec<NewOrderItem> = (0..=rng.below(2) as usize)
            .map(|offset| NewOrderItem {
                product_id: products[(start + offset) % products.len()].id,
                quantity: 1 + rng.below(3) as u32,
            })
            .collect();
        orders
            .create_order(*customer_id, lines)
            .await
            .expect("failed to seed order");
    }

    for _ in 0..count {
        let product = &products[rng.below(products.len() as u64) as usize];
        moderation
            .add_comment(
                product.id,
                NewComment {
                    name: rng.pick(FIRST_NAMES).to_string(),
                    body: rng.pick(COMMENT_BODIES).to_string(),
                },
            )
            .await
            .expect("failed to seed comment");
    }

    tracing::info!(count, "seeding complete");
}
