//! Route handlers. Each one extracts the caller, delegates to the gateway
//! or the share-link store, and maps the outcome to a response.

use std::time::Duration;

use axum::{
    extract::rejection::JsonRejection,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde_json::json;
use tracing::info;
use vinyl_blob::backends::DriveConnection;
use vinyl_blob::{NewShareLink, ObjectId, ShareAccess, ShareLink, SignedUrl, UserPreferences};
use vinyl_core::VinylError;

use crate::auth::{Authenticated, MaybeAuthenticated};
use crate::params::{DriveTokenBody, ObjectView, SignedUrlParams};
use crate::stream::Disposition;
use crate::upload::UploadForm;
use crate::{VinylAxumError, VinylAxumState};

type ApiResult<T> = Result<T, VinylAxumError>;

fn map_json_rejection(rejection: JsonRejection) -> VinylAxumError {
    VinylError::bad_request("Failed to parse the request body as JSON")
        .with_data(json!({ "_schema": [rejection.body_text()] }))
        .into()
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn upload(
    State(state): State<VinylAxumState>,
    auth: Authenticated,
    form: UploadForm,
) -> ApiResult<(StatusCode, Json<ObjectView>)> {
    let record = state.gateway.upload(auth.subject(), form.into_request()).await?;
    Ok((StatusCode::CREATED, Json(ObjectView::from(record))))
}

pub async fn list_objects(State(state): State<VinylAxumState>, auth: Authenticated) -> ApiResult<Json<Vec<ObjectView>>> {
    let records = state.gateway.list(auth.subject()).await?;
    Ok(Json(records.iter().map(ObjectView::from).collect()))
}

pub async fn get_object(
    State(state): State<VinylAxumState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> ApiResult<Json<ObjectView>> {
    let record = state.gateway.describe(&ObjectId(id), auth.subject()).await?;
    Ok(Json(ObjectView::from(record)))
}

pub async fn download(
    State(state): State<VinylAxumState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let object = state.gateway.download(&ObjectId(id), auth.subject()).await?;
    let response = state.streamer.serve(
        &HeaderMap::new(),
        object.bytes,
        &object.record.content_type,
        Disposition::Attachment,
    )?;
    Ok(response)
}

pub async fn delete_object(
    State(state): State<VinylAxumState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.gateway.delete(&ObjectId(id), auth.subject()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn signed_url(
    State(state): State<VinylAxumState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Query(params): Query<SignedUrlParams>,
) -> ApiResult<Json<SignedUrl>> {
    let ttl = params.expiration_seconds.map(Duration::from_secs);
    let signed = state.gateway.signed_url(&ObjectId(id), ttl, auth.subject()).await?;
    Ok(Json(signed))
}

pub async fn get_preferences(State(state): State<VinylAxumState>, auth: Authenticated) -> ApiResult<Json<UserPreferences>> {
    Ok(Json(state.gateway.preferences(auth.subject()).await?))
}

pub async fn put_preferences(
    State(state): State<VinylAxumState>,
    auth: Authenticated,
    body: Result<Json<UserPreferences>, JsonRejection>,
) -> ApiResult<Json<UserPreferences>> {
    let Json(prefs) = body.map_err(map_json_rejection)?;
    state.gateway.set_preferences(auth.subject(), prefs).await?;
    Ok(Json(prefs))
}

pub async fn drive_connection(
    State(state): State<VinylAxumState>,
    auth: Authenticated,
) -> ApiResult<Json<DriveConnection>> {
    Ok(Json(state.drive.status(auth.subject()).await?))
}

pub async fn connect_drive(
    State(state): State<VinylAxumState>,
    auth: Authenticated,
    body: Result<Json<DriveTokenBody>, JsonRejection>,
) -> ApiResult<Json<DriveConnection>> {
    let Json(DriveTokenBody { access_token }) = body.map_err(map_json_rejection)?;
    Ok(Json(state.drive.store(auth.subject(), access_token).await?))
}

pub async fn disconnect_drive(State(state): State<VinylAxumState>, auth: Authenticated) -> ApiResult<StatusCode> {
    state.drive.remove(auth.subject()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn stream(
    State(state): State<VinylAxumState>,
    auth: Authenticated,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let object = state.gateway.download(&ObjectId(id), auth.subject()).await?;
    let response = state.streamer.serve(
        &headers,
        object.bytes,
        &object.record.content_type,
        Disposition::Inline,
    )?;
    Ok(response)
}

pub async fn create_share_link(
    State(state): State<VinylAxumState>,
    auth: Authenticated,
    body: Result<Json<NewShareLink>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ShareLink>)> {
    let Json(request) = body.map_err(map_json_rejection)?;
    // Only the owner may share an object.
    state.gateway.describe(&request.object_id, auth.subject()).await?;
    let link = state.shares.create(auth.subject(), request).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn list_share_links(State(state): State<VinylAxumState>, auth: Authenticated) -> ApiResult<Json<Vec<ShareLink>>> {
    Ok(Json(state.shares.list_for_owner(auth.subject()).await?))
}

pub async fn get_share_link(
    State(state): State<VinylAxumState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> ApiResult<Json<ShareLink>> {
    Ok(Json(state.shares.get(auth.subject(), &id).await?))
}

pub async fn revoke_share_link(
    State(state): State<VinylAxumState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> ApiResult<Json<ShareLink>> {
    Ok(Json(state.shares.revoke(auth.subject(), &id).await?))
}

/// Anonymous access through a share token, served on behalf of the owner.
pub async fn shared(
    State(state): State<VinylAxumState>,
    MaybeAuthenticated(ctx): MaybeAuthenticated,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let link = state.shares.resolve(&token).await?;
    let object = state.gateway.download(&link.object_id, &link.owner_id).await?;

    info!(
        link_id = %link.id,
        object_id = %link.object_id,
        viewer = ctx.subject().map(|s| s.as_str()).unwrap_or("anonymous"),
        "shared object served"
    );

    let response = match link.access {
        ShareAccess::Stream => state.streamer.serve(
            &headers,
            object.bytes,
            &object.record.content_type,
            Disposition::Inline,
        )?,
        ShareAccess::Download => state.streamer.serve(
            &HeaderMap::new(),
            object.bytes,
            &object.record.content_type,
            Disposition::Attachment,
        )?,
    };
    Ok(response)
}
