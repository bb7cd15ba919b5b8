use std::{sync::Arc, time::Duration};

use mailer::{MailQueue, MailQueueConfig, MemoryMailer};
use shared::domain::{DeliveryId, UserId};
use storage::{NewRecipient, Storage, StoredDeliveryman};
use tokio::task::JoinHandle;

use crate::ApiContext;

pub(crate) struct Fixture {
    pub ctx: ApiContext,
    pub mailer: Arc<MemoryMailer>,
    pub worker: JoinHandle<()>,
    pub admin: UserId,
    pub courier: StoredDeliveryman,
    pub delivery: DeliveryId,
}

impl Fixture {
    /// Closes the mail queue and waits for the worker to drain it.
    pub async fn drain_mail(self) -> Arc<MemoryMailer> {
        let Fixture { ctx, mailer, worker, .. } = self;
        drop(ctx);
        worker.await.expect("mail worker");
        mailer
    }
}

pub(crate) async fn fixture() -> Fixture {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let admin = storage
        .create_user("Distribuidora", "admin@fastfeet.test", true)
        .await
        .expect("admin");
    let courier = storage
        .create_deliveryman("Dana", "dana@fastfeet.test", None)
        .await
        .expect("deliveryman");
    let recipient = storage
        .create_recipient(&NewRecipient {
            name: "Ludwig".into(),
            ..NewRecipient::default()
        })
        .await
        .expect("recipient");
    let delivery = storage
        .create_delivery("Standing desk", recipient, Some(courier.id))
        .await
        .expect("delivery");

    let mailer = Arc::new(MemoryMailer::default());
    let (mail_queue, worker) = MailQueue::start(
        mailer.clone(),
        MailQueueConfig {
            retry_delay: Duration::from_millis(1),
            ..MailQueueConfig::default()
        },
    );

    Fixture {
        ctx: ApiContext {
            storage,
            mail_queue,
        },
        mailer,
        worker,
        admin,
        courier,
        delivery,
    }
}
