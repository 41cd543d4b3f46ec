use super::*;
use crate::auth::CurrentUser;
use crate::db::DbService;
use crate::db::repository::user::NewUser;
use crate::db::repository::{OrderRepository, ProductRepository, UserRepository};
use crate::live::EventPublisher;
use rust_decimal::Decimal;
use shared::models::{LineItemInput, OrderCreate, ProductCreate, Role};
use shared::{LiveEvent, LiveEventKind};
use std::sync::{Arc, Mutex};

mod test_workflow;

/// 记录所有事件的 publisher
#[derive(Default)]
struct RecordingPublisher {
    events: Mutex<Vec<(Option<String>, LiveEvent)>>,
}

impl RecordingPublisher {
    fn kinds(&self) -> Vec<LiveEventKind> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, e)| e.event)
            .collect()
    }

    fn scoped_to(&self, kind: LiveEventKind) -> Vec<Option<String>> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, e)| e.event == kind)
            .map(|(user, _)| user.clone())
            .collect()
    }

    fn last(&self) -> Option<LiveEvent> {
        self.events.lock().unwrap().last().map(|(_, e)| e.clone())
    }
}

impl EventPublisher for RecordingPublisher {
    fn broadcast(&self, event: LiveEvent) {
        self.events.lock().unwrap().push((None, event));
    }

    fn publish_to_user(&self, user_id: &str, event: LiveEvent) {
        self.events
            .lock()
            .unwrap()
            .push((Some(user_id.to_string()), event));
    }
}

struct Harness {
    workflow: OrderWorkflow,
    events: Arc<RecordingPublisher>,
    products: ProductRepository,
    orders: OrderRepository,
    users: UserRepository,
}

async fn create_harness() -> Harness {
    let db = DbService::memory().await.unwrap();
    let events = Arc::new(RecordingPublisher::default());
    let workflow = OrderWorkflow::new(db.db.clone(), events.clone(), RewardAccrual::default());
    Harness {
        workflow,
        events,
        products: ProductRepository::new(db.db.clone()),
        orders: OrderRepository::new(db.db.clone()),
        users: UserRepository::new(db.db),
    }
}

impl Harness {
    async fn create_user(&self, username: &str, role: Role, approved: bool) -> CurrentUser {
        let user = self
            .users
            .create(NewUser {
                username: username.to_string(),
                hash_pass: "unused".to_string(),
                name: format!("{} name", username),
                mobile: "0400000000".to_string(),
                role,
                approved,
            })
            .await
            .unwrap();
        CurrentUser {
            id: user.id_string(),
            username: user.username,
            role,
        }
    }

    async fn customer(&self, username: &str) -> CurrentUser {
        self.create_user(username, Role::Customer, true).await
    }

    async fn admin(&self) -> CurrentUser {
        self.create_user("admin", Role::Admin, true).await
    }

    /// 返回 "product:xxx"
    async fn add_product(&self, name: &str, price_cents: i64, stock: i64) -> String {
        self.products
            .create(ProductCreate {
                name: name.to_string(),
                description: None,
                price: Decimal::new(price_cents, 2),
                discount: Decimal::ZERO,
                stock,
                size: None,
                category: None,
            })
            .await
            .unwrap()
            .id_string()
    }

    async fn stock(&self, product: &str) -> i64 {
        self.products
            .find_by_id(product)
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    async fn reward_points(&self, user: &CurrentUser) -> i64 {
        self.users
            .find_by_id(&user.id)
            .await
            .unwrap()
            .unwrap()
            .reward_points
    }
}

fn line(product: &str, quantity: i64) -> LineItemInput {
    LineItemInput {
        product: product.to_string(),
        quantity,
    }
}

fn order_input(products: Vec<LineItemInput>) -> OrderCreate {
    OrderCreate {
        products,
        delivery_address: "1 Main St".to_string(),
        pickup_date: "2024-05-01".to_string(),
        pickup_time: "09:30".to_string(),
    }
}
