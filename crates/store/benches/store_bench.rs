use chrono::Utc;
use common::{CartId, CategoryId, Money, ProductId};
use criterion::{Criterion, criterion_group, criterion_main};
use store::{Cart, CartStore, CatalogStore, Category, MemoryStore, Product, ProductFilter};

fn make_product(category_id: CategoryId, n: usize) -> Product {
    let now = Utc::now();
    Product {
        id: ProductId::new(),
        name: format!("Sample Product {n}"),
        slug: format!("sample-product-{n}"),
        description: String::new(),
        price: Money::from_cents(500 + n as i64),
        inventory: 10,
        category_id,
        discount_ids: vec![],
        created_at: now,
        updated_at: now,
    }
}

async fn seed(store: &MemoryStore, products: usize) -> (CartId, Vec<ProductId>) {
    let category = store
        .insert_category(Category {
            id: CategoryId::new(),
            title: "Furniture".to_string(),
            description: String::new(),
            top_product: None,
        })
        .await
        .unwrap();
    let mut ids = Vec::with_capacity(products);
    for n in 0..products {
        let product = store
            .insert_product(make_product(category.id, n))
            .await
            .unwrap();
        ids.push(product.id);
    }
    let cart = store
        .insert_cart(Cart {
            id: CartId::new(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    (cart.id, ids)
}

fn bench_upsert_new_item(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("store/upsert_new_item", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = MemoryStore::new();
                let (cart_id, products) = seed(&store, 1).await;
                store.upsert_cart_item(cart_id, products[0], 1).await.unwrap();
            });
        });
    });
}

fn bench_upsert_merge_existing(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = MemoryStore::new();
    let (cart_id, products) = rt.block_on(seed(&store, 1));
    rt.block_on(async {
        store.upsert_cart_item(cart_id, products[0], 1).await.unwrap();
    });

    c.bench_function("store/upsert_merge_existing", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.upsert_cart_item(cart_id, products[0], 1).await.unwrap();
            });
        });
    });
}

fn bench_list_cart_items_50(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = MemoryStore::new();
    let (cart_id, products) = rt.block_on(seed(&store, 50));
    rt.block_on(async {
        for product_id in &products {
            store.upsert_cart_item(cart_id, *product_id, 2).await.unwrap();
        }
    });

    c.bench_function("store/list_cart_items_50", |b| {
        b.iter(|| {
            rt.block_on(async {
                let items = store.list_cart_items(cart_id).await.unwrap();
                assert_eq!(items.len(), 50);
            });
        });
    });
}

fn bench_list_products_filtered(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = MemoryStore::new();
    rt.block_on(seed(&store, 200));

    c.bench_function("store/list_products_filtered", |b| {
        b.iter(|| {
            rt.block_on(async {
                let page = store
                    .list_products(ProductFilter::new().search("product 1").page_size(20))
                    .await
                    .unwrap();
                assert!(!page.items.is_empty());
            });
        });
    });
}

criterion_group!(
    benches,
    bench_upsert_new_item,
    bench_upsert_merge_existing,
    bench_list_cart_items_50,
    bench_list_products_filtered
);
criterion_main!(benches);
