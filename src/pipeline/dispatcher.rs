//! # Provider Dispatch Scheduler
//!
//! Selects the provider set for a service request, records idempotent
//! dispatch rows, and stamps the SLA deadline. Provider notification is
//! best-effort; the dispatch record is the source of truth.

use std::sync::Arc;

use metrics::counter;
use sea_orm::{DatabaseConnection, DbErr};
use tracing::{info, warn};

use crate::clients::OutboundSender;
use crate::config::RoutingConfig;
use crate::models::provider_dispatch::Model as Dispatch;
use crate::models::service_request::Model as ServiceRequest;
use crate::repositories::{DispatchRepository, ProviderRepository, ServiceRequestRepository};

pub struct DispatchScheduler {
    providers: ProviderRepository,
    dispatches: DispatchRepository,
    requests: ServiceRequestRepository,
    sender: Arc<dyn OutboundSender>,
    routing: RoutingConfig,
}

impl DispatchScheduler {
    pub fn new(
        db: DatabaseConnection,
        sender: Arc<dyn OutboundSender>,
        routing: RoutingConfig,
    ) -> Self {
        Self {
            providers: ProviderRepository::new(db.clone()),
            dispatches: DispatchRepository::new(db.clone()),
            requests: ServiceRequestRepository::new(db),
            sender,
            routing,
        }
    }

    /// Dispatch the request to its provider set.
    ///
    /// Single-destination categories cap at one provider, all others at the
    /// configured multi cap. Zero eligible providers leaves the request
    /// undispatched for manual routing, which is not an error. Re-running for
    /// the same request re-affirms existing rows without new sends.
    pub async fn dispatch(
        &self,
        request: ServiceRequest,
        category_key: &str,
    ) -> Result<Vec<Dispatch>, DbErr> {
        let cap = self.routing.dispatch_cap(category_key);
        let eligible = self
            .providers
            .eligible_for_dispatch(category_key, request.city_id)
            .await?;

        if eligible.is_empty() {
            warn!(
                request_id = %request.id,
                category = %category_key,
                "No eligible providers; leaving request undispatched"
            );
            counter!("dispatch_no_providers_total").increment(1);
            return Ok(Vec::new());
        }

        let selected: Vec<_> = eligible.into_iter().take(cap).collect();
        let mut records = Vec::with_capacity(selected.len());

        for candidate in &selected {
            let (dispatch, created) = self
                .dispatches
                .upsert_sent(request.id, candidate.user.id)
                .await?;

            if created {
                counter!("dispatch_sent_total").increment(1);
                self.notify_provider(candidate, &request).await;
            }

            records.push(dispatch);
        }

        let sla_minutes = self.routing.sla_minutes(category_key);
        self.requests.mark_dispatched(request, sla_minutes).await?;

        info!(
            providers = records.len(),
            category = %category_key,
            sla_minutes,
            "Request dispatched"
        );

        Ok(records)
    }

    /// Best-effort provider ping; the dispatch row already records the send.
    async fn notify_provider(
        &self,
        candidate: &crate::repositories::provider::EligibleProvider,
        request: &ServiceRequest,
    ) {
        let Some(phone) = candidate.user.phone.as_deref() else {
            return;
        };

        let body = format!(
            "New service request {} in your category. Please respond before the SLA deadline.",
            request.id
        );
        if let Err(err) = self.sender.send_text(phone, &body).await {
            warn!(
                provider_user_id = %candidate.user.id,
                error = %err,
                "Provider notification failed; dispatch record stands"
            );
        }
    }
}
