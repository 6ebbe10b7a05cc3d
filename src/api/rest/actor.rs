use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::history::{Actor, ActorRole};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| AppError::Unauthorized(format!("missing {name} header")))?
        .to_str()
        .map_err(|_| AppError::Unauthorized(format!("{name} header is not valid ascii")))
}

/// Identity verified upstream and forwarded in request headers.
#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, ACTOR_ID_HEADER)?
            .parse::<Uuid>()
            .map_err(|err| AppError::Unauthorized(format!("invalid {ACTOR_ID_HEADER}: {err}")))?;

        let role = match header(parts, ACTOR_ROLE_HEADER)? {
            "rider" => ActorRole::Rider,
            "admin" => ActorRole::Admin,
            "system" => ActorRole::System,
            other => {
                return Err(AppError::Unauthorized(format!(
                    "unknown actor role: {other}, expected rider/admin/system"
                )));
            }
        };

        Ok(Actor { id, role })
    }
}

pub struct RiderActor(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for RiderActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let actor = Actor::from_request_parts(parts, state).await?;
        match actor.role {
            ActorRole::Rider => Ok(RiderActor(actor.id)),
            role => Err(AppError::Forbidden(format!("{role} cannot act as a rider"))),
        }
    }
}

pub struct AdminActor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for AdminActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let actor = Actor::from_request_parts(parts, state).await?;
        match actor.role {
            ActorRole::Admin => Ok(AdminActor(actor)),
            role => Err(AppError::Forbidden(format!("{role} is not an admin"))),
        }
    }
}
