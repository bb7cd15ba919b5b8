use super::*;
use crate::support::fixture;
use shared::domain::FileId;

fn create_req(name: &str, email: &str) -> CreateDeliverymanRequest {
    CreateDeliverymanRequest {
        name: Some(name.into()),
        email: Some(email.into()),
        avatar_id: None,
    }
}

#[tokio::test]
async fn lists_deliverymen_in_id_order() {
    let fx = fixture().await;
    create_deliveryman(&fx.ctx, create_req("Eli", "eli@fastfeet.test"))
        .await
        .expect("create");

    let listed = list_deliverymen(&fx.ctx).await.expect("list");
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, fx.courier.id);
    assert_eq!(listed[1].email, "eli@fastfeet.test");
}

#[tokio::test]
async fn create_returns_name_and_email() {
    let fx = fixture().await;
    let created = create_deliveryman(
        &fx.ctx,
        CreateDeliverymanRequest {
            avatar_id: Some(FileId(2)),
            ..create_req("Eli", "eli@fastfeet.test")
        },
    )
    .await
    .expect("create");
    assert_eq!(created.name, "Eli");
    assert_eq!(created.email, "eli@fastfeet.test");

    let stored = fx
        .ctx
        .storage
        .find_deliveryman_by_email("eli@fastfeet.test")
        .await
        .expect("lookup")
        .expect("stored");
    assert_eq!(stored.avatar_id, Some(FileId(2)));
}

#[tokio::test]
async fn create_rejects_invalid_payloads() {
    let fx = fixture().await;
    for req in [
        CreateDeliverymanRequest::default(),
        create_req("", "eli@fastfeet.test"),
        create_req("Eli", "not-an-email"),
        CreateDeliverymanRequest {
            email: None,
            ..create_req("Eli", "x@y.z")
        },
    ] {
        let err = create_deliveryman(&fx.ctx, req).await.expect_err("invalid");
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(err.message, "Validation fails");
    }
}

#[tokio::test]
async fn create_rejects_duplicate_email() {
    let fx = fixture().await;
    let err = create_deliveryman(&fx.ctx, create_req("Other Dana", "dana@fastfeet.test"))
        .await
        .expect_err("duplicate");
    assert_eq!(err.message, "User already exists.");
}

#[tokio::test]
async fn update_changes_only_given_fields() {
    let fx = fixture().await;
    let updated = update_deliveryman(
        &fx.ctx,
        UpdateDeliverymanRequest {
            id: Some(fx.courier.id),
            name: Some("Dana Souza".into()),
            ..UpdateDeliverymanRequest::default()
        },
    )
    .await
    .expect("update");
    assert_eq!(updated.id, fx.courier.id);
    assert_eq!(updated.name, "Dana Souza");
    assert_eq!(updated.email, "dana@fastfeet.test");
    assert_eq!(updated.avatar_id, None);
}

#[tokio::test]
async fn update_allows_keeping_own_email() {
    let fx = fixture().await;
    let updated = update_deliveryman(
        &fx.ctx,
        UpdateDeliverymanRequest {
            id: Some(fx.courier.id),
            email: Some("dana@fastfeet.test".into()),
            avatar_id: Some(FileId(5)),
            ..UpdateDeliverymanRequest::default()
        },
    )
    .await
    .expect("update");
    assert_eq!(updated.avatar_id, Some(FileId(5)));
}

#[tokio::test]
async fn update_rejects_email_owned_by_someone_else() {
    let fx = fixture().await;
    create_deliveryman(&fx.ctx, create_req("Eli", "eli@fastfeet.test"))
        .await
        .expect("create");

    let err = update_deliveryman(
        &fx.ctx,
        UpdateDeliverymanRequest {
            id: Some(fx.courier.id),
            email: Some("eli@fastfeet.test".into()),
            ..UpdateDeliverymanRequest::default()
        },
    )
    .await
    .expect_err("taken");
    assert_eq!(err.message, "Deliveryman already exists.");
}

#[tokio::test]
async fn update_requires_existing_id() {
    let fx = fixture().await;
    let missing_id = update_deliveryman(&fx.ctx, UpdateDeliverymanRequest::default())
        .await
        .expect_err("no id");
    assert_eq!(missing_id.message, "Validation fails");

    let unknown = update_deliveryman(
        &fx.ctx,
        UpdateDeliverymanRequest {
            id: Some(DeliverymanId(404)),
            ..UpdateDeliverymanRequest::default()
        },
    )
    .await
    .expect_err("unknown");
    assert_eq!(unknown.message, "Deliveryman does not exist");

    let bad_email = update_deliveryman(
        &fx.ctx,
        UpdateDeliverymanRequest {
            id: Some(fx.courier.id),
            email: Some("dana-at-fastfeet".into()),
            ..UpdateDeliverymanRequest::default()
        },
    )
    .await
    .expect_err("bad email");
    assert_eq!(bad_email.code, ErrorCode::Validation);
}

#[tokio::test]
async fn update_rejects_blank_name_and_keeps_record() {
    let fx = fixture().await;
    let err = update_deliveryman(
        &fx.ctx,
        UpdateDeliverymanRequest {
            id: Some(fx.courier.id),
            name: Some(String::new()),
            ..UpdateDeliverymanRequest::default()
        },
    )
    .await
    .expect_err("blank name");
    assert_eq!(err.code, ErrorCode::Validation);
    assert_eq!(err.message, "Validation fails");

    let stored = fx
        .ctx
        .storage
        .find_deliveryman(fx.courier.id)
        .await
        .expect("find")
        .expect("deliveryman");
    assert_eq!(stored.name, "Dana");
}

#[tokio::test]
async fn delete_removes_deliveryman_once() {
    let fx = fixture().await;
    delete_deliveryman(&fx.ctx, fx.courier.id)
        .await
        .expect("delete");
    assert!(list_deliverymen(&fx.ctx).await.expect("list").is_empty());

    let err = delete_deliveryman(&fx.ctx, fx.courier.id)
        .await
        .expect_err("gone");
    assert_eq!(err.message, "Deliveryman does not exist");
}
