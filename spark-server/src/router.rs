use crate::context::SparkContext;
use crate::subsystems::{elements, ideas, mini_spark, scouts, spark};
use serde::Serialize;
use spark_core::error::Result;
use spark_core::models::IdeaStatus;
use spark_core::{SparkRequest, SparkResponse};

fn respond<T: Serialize>(result: Result<T>) -> SparkResponse {
    match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(data) => SparkResponse::ok(data),
            Err(e) => SparkResponse::err(format!("Failed to serialize response: {}", e)),
        },
        Err(e) => {
            if e.status_code() >= 500 {
                tracing::error!(code = e.status_code(), "Request failed: {}", e);
            } else {
                tracing::debug!(code = e.status_code(), "Request rejected: {}", e);
            }
            SparkResponse::from_error(&e)
        }
    }
}

pub async fn handle_request(request: SparkRequest, ctx: &SparkContext) -> SparkResponse {
    let pool = &ctx.pool;
    let limits = &ctx.config.limits;

    match request {
        SparkRequest::Ping => SparkResponse::pong(),
        SparkRequest::Health => handle_health(ctx).await,
        SparkRequest::ListIdeas { user_id, status } => {
            respond(ideas::list_ideas(pool, user_id, status.unwrap_or(IdeaStatus::Active)).await)
        }
        SparkRequest::GetIdea { user_id, id } => respond(ideas::get_idea(pool, user_id, id).await),
        SparkRequest::CreateIdea {
            user_id,
            title,
            current_thinking,
        } => respond(
            ideas::create_idea(pool, limits, user_id, &title, current_thinking.as_deref()).await,
        ),
        SparkRequest::UpdateIdea {
            user_id,
            id,
            title,
            current_thinking,
        } => respond(
            ideas::update_idea(pool, user_id, id, title.as_deref(), current_thinking.as_deref())
                .await,
        ),
        SparkRequest::ArchiveIdea { user_id, id } => {
            respond(ideas::archive_idea(pool, user_id, id).await)
        }
        SparkRequest::RestoreIdea { user_id, id } => {
            respond(ideas::restore_idea(pool, limits, user_id, id).await)
        }
        SparkRequest::DeleteIdea { user_id, id } => respond(
            ideas::delete_idea(pool, user_id, id)
                .await
                .map(|_| serde_json::json!({"deleted": true, "id": id})),
        ),
        SparkRequest::ListElements { user_id, idea_id } => match idea_id {
            Some(idea_id) => respond(elements::list_idea_elements(pool, user_id, idea_id).await),
            None => respond(elements::list_inbox(pool, user_id).await),
        },
        SparkRequest::CaptureElement { user_id, element } => {
            respond(elements::capture_element(ctx, user_id, element).await)
        }
        SparkRequest::UpdateElement {
            user_id,
            id,
            changes,
        } => respond(elements::update_element(pool, user_id, id, &changes).await),
        SparkRequest::DeleteElement { user_id, id } => respond(
            elements::delete_element(pool, user_id, id)
                .await
                .map(|_| serde_json::json!({"deleted": true, "id": id})),
        ),
        SparkRequest::Spark {
            user_id,
            idea_id,
            spark_type,
            save,
        } => respond(spark::run_spark(ctx, user_id, idea_id, &spark_type, save).await),
        SparkRequest::MiniSpark {
            user_id,
            element_id,
            mini_action,
        } => respond(mini_spark::run_mini_spark(ctx, user_id, element_id, &mini_action).await),
        SparkRequest::GenerateScouts {
            user_id,
            topic,
            count,
        } => respond(scouts::generate_scouts(ctx, user_id, &topic, count).await),
        SparkRequest::ConvertScout { user_id, id } => {
            respond(scouts::convert_scout(ctx, user_id, id).await)
        }
    }
}

async fn handle_health(ctx: &SparkContext) -> SparkResponse {
    let pg_ver = match spark_core::db::health_check(&ctx.pool).await {
        Ok(v) => v,
        Err(e) => return SparkResponse::err(format!("DB Health Check failed: {}", e)),
    };
    let ideas = match spark_core::db::check_schema(&ctx.pool).await {
        Ok(n) => n,
        Err(e) => return SparkResponse::err(format!("Schema Check failed: {}", e)),
    };
    SparkResponse::ok(serde_json::json!({
        "postgresql": pg_ver,
        "ideas": ideas,
        "llm": ctx.llm.as_ref().map(|l| l.name().to_string()),
        "status": "healthy"
    }))
}
