use chrono::Utc;
use mailer::{CancellationMail, MailJob};
use shared::{
    domain::{page_offset, DeliveryId, ProblemId, PROBLEMS_PAGE_SIZE},
    error::{ApiError, ErrorCode},
    protocol::{
        CancelledDelivery, CreateProblemRequest, DeliveryProblemListing, DeliveryProblemRecord,
        ProblemDelivery,
    },
};
use storage::{StoredDelivery, StoredProblemListing};
use tracing::{info, warn};

use crate::{
    internal, not_found,
    validation::{required, required_text},
    ApiContext,
};

const DELIVERY_FINISHED: &str = "The delivery has been finished";

pub async fn list_problems(
    ctx: &ApiContext,
    page: Option<i64>,
) -> Result<Vec<DeliveryProblemListing>, ApiError> {
    let problems = ctx
        .storage
        .list_problems(None, PROBLEMS_PAGE_SIZE, page_offset(page))
        .await
        .map_err(internal)?;
    Ok(problems.into_iter().map(listing).collect())
}

pub async fn list_delivery_problems(
    ctx: &ApiContext,
    delivery_id: DeliveryId,
    page: Option<i64>,
) -> Result<Vec<DeliveryProblemListing>, ApiError> {
    existing_delivery(ctx, delivery_id).await?;

    let problems = ctx
        .storage
        .list_problems(Some(delivery_id), PROBLEMS_PAGE_SIZE, page_offset(page))
        .await
        .map_err(internal)?;
    Ok(problems.into_iter().map(listing).collect())
}

/// Records a problem reported by the courier assigned to `delivery_id` and
/// leaves a notification for the administrator.
pub async fn create_problem(
    ctx: &ApiContext,
    delivery_id: DeliveryId,
    req: CreateProblemRequest,
) -> Result<DeliveryProblemRecord, ApiError> {
    let description = required_text(req.description.as_deref())?;
    let deliveryman_id = required(req.deliveryman_id)?;

    let delivery = existing_delivery(ctx, delivery_id).await?;
    if delivery.is_finished() {
        return Err(ApiError::new(ErrorCode::Validation, DELIVERY_FINISHED));
    }

    let deliveryman = ctx
        .storage
        .find_deliveryman(deliveryman_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Deliveryman does not exist"))?;

    let belongs = ctx
        .storage
        .delivery_belongs_to(delivery_id, deliveryman_id)
        .await
        .map_err(internal)?;
    if !belongs {
        return Err(ApiError::new(
            ErrorCode::Forbidden,
            "Delivery does not belong deliveryman",
        ));
    }

    let problem = ctx
        .storage
        .insert_problem(delivery_id, deliveryman_id, description)
        .await
        .map_err(internal)?;
    info!(
        problem_id = problem.id.0,
        delivery_id = delivery_id.0,
        deliveryman_id = deliveryman_id.0,
        "delivery problem reported"
    );

    match ctx.storage.first_administrator().await.map_err(internal)? {
        Some(administrator) => {
            let content = format!(
                "New delivery problem by {} for delivery {}",
                deliveryman.name, delivery_id.0
            );
            ctx.storage
                .insert_notification(administrator, &content)
                .await
                .map_err(internal)?;
        }
        None => warn!(
            problem_id = problem.id.0,
            "no administrator to notify about delivery problem"
        ),
    }

    Ok(DeliveryProblemRecord {
        id: problem.id,
        delivery_id: problem.delivery_id,
        deliveryman_id: problem.deliveryman_id,
        description: problem.description,
        created_at: problem.created_at,
        updated_at: problem.updated_at,
    })
}

/// Soft-cancels the delivery a problem was reported for and queues a mail to
/// its courier.
pub async fn cancel_delivery(
    ctx: &ApiContext,
    problem_id: ProblemId,
) -> Result<CancelledDelivery, ApiError> {
    let problem = ctx
        .storage
        .find_problem(problem_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Delivery problem does not exist"))?;

    let mut delivery = existing_delivery(ctx, problem.delivery_id).await?;
    if delivery.is_finished() {
        return Err(ApiError::new(ErrorCode::Validation, DELIVERY_FINISHED));
    }

    let canceled_at = Utc::now();
    ctx.storage
        .mark_delivery_canceled(delivery.id, canceled_at)
        .await
        .map_err(internal)?;
    delivery.canceled_at = Some(canceled_at);
    info!(
        delivery_id = delivery.id.0,
        problem_id = problem_id.0,
        "delivery cancelled"
    );

    let job = MailJob::Cancellation(CancellationMail {
        delivery_id: delivery.id,
        deliveryman: delivery.deliveryman.clone(),
        recipient: delivery.recipient.clone(),
        product: delivery.product.clone(),
    });
    if let Err(error) = ctx.mail_queue.enqueue(job) {
        warn!(delivery_id = delivery.id.0, %error, "cancellation mail not queued");
    }

    Ok(cancelled(delivery))
}

async fn existing_delivery(
    ctx: &ApiContext,
    delivery_id: DeliveryId,
) -> Result<StoredDelivery, ApiError> {
    ctx.storage
        .load_delivery(delivery_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Delivery does not exist"))
}

fn listing(problem: StoredProblemListing) -> DeliveryProblemListing {
    DeliveryProblemListing {
        id: problem.id,
        description: problem.description,
        created_at: problem.created_at,
        delivery: ProblemDelivery {
            product: problem.product,
            recipient: problem.recipient,
            deliveryman: problem.deliveryman,
        },
    }
}

fn cancelled(delivery: StoredDelivery) -> CancelledDelivery {
    CancelledDelivery {
        id: delivery.id,
        product: delivery.product,
        canceled_at: delivery.canceled_at,
        start_date: delivery.start_date,
        end_date: delivery.end_date,
        signature_id: delivery.signature_id,
        recipient: delivery.recipient,
        deliveryman: delivery.deliveryman,
    }
}

#[cfg(test)]
#[path = "tests/problems_tests.rs"]
mod tests;
