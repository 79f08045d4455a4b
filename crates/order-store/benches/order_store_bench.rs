use common::{OrderId, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{CartItem, Order, OrderStatus};
use order_store::{
    InMemoryOrderStore, OrderStore, OrderStoreExt, StatusChange, UpdateOptions, UserLookup,
    Version,
};

fn make_order(order_id: &str, user_id: &str) -> Order {
    Order {
        order_id: OrderId::new(order_id),
        user_id: UserId::new(user_id),
        firstname: Some("Ada".to_string()),
        lastname: Some("Lovelace".to_string()),
        email: Some("ada@example.com".to_string()),
        address: None,
        delivery: "UPS/FedEx".to_string(),
        cart: vec![CartItem::new("A1", "Yoga mat", 2, "21.00")],
        total: "42.00".to_string(),
    }
}

async fn populated_store(lookup: UserLookup, count: usize) -> InMemoryOrderStore {
    let store = InMemoryOrderStore::with_lookup(lookup);
    for i in 0..count {
        store
            .create(
                make_order(&format!("o-{i:05}"), &format!("u{}", i % 20)),
                OrderStatus::PendingPayment,
            )
            .await
            .unwrap();
    }
    store
}

fn bench_create_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("order_store/create", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryOrderStore::new();
                store
                    .create(make_order("", "u1"), OrderStatus::PendingPayment)
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_update_status_with_version_check(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("order_store/update_status_with_version_check", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryOrderStore::new();
                let record = store
                    .create(make_order("o-1", "u1"), OrderStatus::PendingPayment)
                    .await
                    .unwrap();
                store
                    .update_status(
                        record.order_id(),
                        StatusChange::to(OrderStatus::PendingShipment),
                        UpdateOptions::expect_version(Version::first()),
                    )
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_get_required(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = rt.block_on(populated_store(UserLookup::Index, 1_000));
    let order_id = OrderId::new("o-00500");

    c.bench_function("order_store/get_required", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.get_required(&order_id).await.unwrap();
            });
        });
    });
}

fn bench_get_by_user(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("order_store/get_by_user");

    for lookup in [UserLookup::Index, UserLookup::Scan] {
        let store = rt.block_on(populated_store(lookup, 1_000));
        let user_id = UserId::new("u7");

        group.bench_function(lookup.to_string(), |b| {
            b.iter(|| {
                rt.block_on(async {
                    store.get_by_user(&user_id).await.unwrap();
                });
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_create_order,
    bench_update_status_with_version_check,
    bench_get_required,
    bench_get_by_user,
);
criterion_main!(benches);
