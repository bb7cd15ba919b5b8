use shared::{
    domain::DeliverymanId,
    error::{ApiError, ErrorCode},
    protocol::{
        CreateDeliverymanRequest, CreatedDeliveryman, DeliverymanSummary, UpdateDeliverymanRequest,
    },
};
use storage::{DeliverymanChanges, StoredDeliveryman};
use tracing::info;

use crate::{
    internal, not_found,
    validation::{optional_email, required, required_text},
    ApiContext,
};

pub async fn list_deliverymen(ctx: &ApiContext) -> Result<Vec<DeliverymanSummary>, ApiError> {
    let deliverymen = ctx.storage.list_deliverymen().await.map_err(internal)?;
    Ok(deliverymen.into_iter().map(summary).collect())
}

pub async fn create_deliveryman(
    ctx: &ApiContext,
    req: CreateDeliverymanRequest,
) -> Result<CreatedDeliveryman, ApiError> {
    let name = required_text(req.name.as_deref())?;
    let email = required_text(req.email.as_deref())?;
    optional_email(Some(email))?;

    let existing = ctx
        .storage
        .find_deliveryman_by_email(email)
        .await
        .map_err(internal)?;
    if existing.is_some() {
        return Err(ApiError::new(ErrorCode::Conflict, "User already exists."));
    }

    let created = ctx
        .storage
        .create_deliveryman(name, email, req.avatar_id)
        .await
        .map_err(internal)?;
    info!(deliveryman_id = created.id.0, "deliveryman created");

    Ok(CreatedDeliveryman {
        name: created.name,
        email: created.email,
    })
}

pub async fn update_deliveryman(
    ctx: &ApiContext,
    req: UpdateDeliverymanRequest,
) -> Result<DeliverymanSummary, ApiError> {
    let id = required(req.id)?;
    if req.name.as_deref() == Some("") {
        return Err(ApiError::validation());
    }
    let email = optional_email(req.email.as_deref())?;

    let current = ctx
        .storage
        .find_deliveryman(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Deliveryman does not exist"))?;

    if let Some(email) = email.filter(|email| *email != current.email) {
        let taken = ctx
            .storage
            .find_deliveryman_by_email(email)
            .await
            .map_err(internal)?;
        if taken.is_some() {
            return Err(ApiError::new(
                ErrorCode::Conflict,
                "Deliveryman already exists.",
            ));
        }
    }

    let changes = DeliverymanChanges {
        name: req.name.clone(),
        email: email.map(str::to_string),
        avatar_id: req.avatar_id,
    };
    let updated = ctx
        .storage
        .update_deliveryman(id, &changes)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Deliveryman does not exist"))?;
    info!(deliveryman_id = id.0, "deliveryman updated");

    Ok(summary(updated))
}

pub async fn delete_deliveryman(ctx: &ApiContext, id: DeliverymanId) -> Result<(), ApiError> {
    let deleted = ctx.storage.delete_deliveryman(id).await.map_err(internal)?;
    if !deleted {
        return Err(not_found("Deliveryman does not exist"));
    }
    info!(deliveryman_id = id.0, "deliveryman deleted");
    Ok(())
}

fn summary(deliveryman: StoredDeliveryman) -> DeliverymanSummary {
    DeliverymanSummary {
        id: deliveryman.id,
        name: deliveryman.name,
        email: deliveryman.email,
        avatar_id: deliveryman.avatar_id,
    }
}

#[cfg(test)]
#[path = "tests/deliverymen_tests.rs"]
mod tests;
