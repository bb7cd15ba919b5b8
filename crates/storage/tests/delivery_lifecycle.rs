use chrono::Utc;
use shared::domain::FileId;
use storage::{NewRecipient, Storage};

#[tokio::test]
async fn problem_then_cancellation_then_late_signature() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");

    let courier = storage
        .create_deliveryman("Dana", "dana@fastfeet.test", None)
        .await
        .expect("courier");
    let recipient = storage
        .create_recipient(&NewRecipient {
            name: "Ludwig".into(),
            street: Some("Rua dos Andradas".into()),
            number: Some("1001".into()),
            city: Some("Porto Alegre".into()),
            state: Some("RS".into()),
            zip_code: Some("90020-007".into()),
            ..NewRecipient::default()
        })
        .await
        .expect("recipient");
    let delivery = storage
        .create_delivery("Standing desk", recipient, None)
        .await
        .expect("delivery");

    assert!(!storage
        .delivery_belongs_to(delivery, courier.id)
        .await
        .expect("unassigned"));
    storage
        .assign_delivery(delivery, courier.id)
        .await
        .expect("assign");
    storage
        .start_delivery(delivery, Utc::now())
        .await
        .expect("start");

    let problem = storage
        .insert_problem(delivery, courier.id, "Recipient moved")
        .await
        .expect("problem");
    let found = storage
        .find_problem(problem.id)
        .await
        .expect("find")
        .expect("problem exists");
    assert_eq!(found.delivery_id, delivery);
    assert_eq!(found.created_at, found.updated_at);

    assert!(storage
        .mark_delivery_canceled(delivery, Utc::now())
        .await
        .expect("cancel"));
    let cancelled = storage
        .load_delivery(delivery)
        .await
        .expect("load")
        .expect("delivery");
    assert!(cancelled.canceled_at.is_some());
    assert!(!cancelled.is_finished());

    storage
        .finish_delivery(delivery, FileId(1), Utc::now())
        .await
        .expect("finish");
    let finished = storage
        .load_delivery(delivery)
        .await
        .expect("load")
        .expect("delivery");
    assert!(finished.is_finished());
    assert!(finished.canceled_at.is_some());
}
