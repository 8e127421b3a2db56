use shared::{domain::View, protocol::AuthResponse};
use tracing::info;

use crate::{
    form::Navigator,
    pipeline::{FetchPipeline, OutcomeKind},
    transport::RequestDescriptor,
};

/// Ends the session. The login view is shown whatever the server answered.
pub async fn logout(pipeline: &FetchPipeline, endpoint: &str, navigator: &dyn Navigator) -> OutcomeKind {
    let outcome = pipeline
        .execute::<AuthResponse>(RequestDescriptor::post_empty(endpoint))
        .await;
    let kind = outcome.kind();
    info!(outcome = %kind, "logout finished");
    navigator.navigate(View::Login);
    kind
}
