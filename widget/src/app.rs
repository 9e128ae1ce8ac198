//! Composition root wiring every service of the widget.
//!
//! Building a [`WidgetApp`] starts the auth supervisor, so it must happen
//! inside a Tokio runtime.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use tracing::{debug, info};

use crate::domain::ports::{BackendConnector, LocalStore, ScreenCapture};
use crate::domain::{
    AdminPanel, AuthService, BackendProvider, ConfigService, Dashboard, Error, FeedbackForm,
    FeedbackPanel, FeedbackStore, FlowSelector, FormDeps, NavigationTracker, SetupService, View,
};

/// Title used by [`WidgetApp::simulate_error`].
pub const SIMULATED_ERROR_TITLE: &str = "Unexpected error: failed to load data";

/// Driven adapters the app runs on.
pub struct AppPorts {
    /// Credentials, appearance and session storage.
    pub local_store: Arc<dyn LocalStore>,
    /// Builds backend clients from credentials.
    pub connector: Arc<dyn BackendConnector>,
    /// Page rasteriser.
    pub capture: Arc<dyn ScreenCapture>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

/// Every service of the widget and admin dashboard.
pub struct WidgetApp {
    /// Backend handle owner.
    pub provider: Arc<BackendProvider>,
    /// Credential storage.
    pub config: ConfigService,
    /// Session and role state.
    pub auth: Arc<AuthService>,
    /// Recent views.
    pub navigation: Arc<NavigationTracker>,
    /// Feedback form visibility.
    pub feedback_panel: Arc<FeedbackPanel>,
    /// Admin dashboard visibility and appearance.
    pub admin_panel: Arc<AdminPanel>,
    /// Which surface the user picked.
    pub flow: FlowSelector,
    /// Feedback CRUD.
    pub feedbacks: FeedbackStore,
    /// End-user form.
    pub form: FeedbackForm,
    /// Admin dashboard.
    pub dashboard: Dashboard,
    /// First-run setup.
    pub setup: SetupService,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for WidgetApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetApp")
            .field("provider", &self.provider)
            .field("flow", &self.flow.current())
            .finish_non_exhaustive()
    }
}

impl WidgetApp {
    /// Wire services over `ports` and start following the session.
    pub fn new(ports: AppPorts) -> Self {
        let AppPorts {
            local_store,
            connector,
            capture,
            clock,
        } = ports;
        let provider = Arc::new(BackendProvider::new(local_store.clone(), connector.clone()));
        let config = ConfigService::new(provider.clone());
        let auth = Arc::new(AuthService::start(provider.clone(), clock.clone()));
        let navigation = Arc::new(NavigationTracker::new());
        let feedback_panel = Arc::new(FeedbackPanel::new(clock.clone()));
        let admin_panel = Arc::new(AdminPanel::new(local_store));
        let feedbacks = FeedbackStore::new(provider.clone(), clock.clone());
        let form = FeedbackForm::new(FormDeps {
            store: feedbacks.clone(),
            auth: auth.clone(),
            navigation: navigation.clone(),
            panel: feedback_panel.clone(),
            capture,
            clock: clock.clone(),
        });
        let dashboard = Dashboard::new(feedbacks.clone(), config.clone(), admin_panel.clone());
        let setup = SetupService::new(connector, config.clone());
        Self {
            provider,
            config,
            auth,
            navigation,
            feedback_panel,
            admin_panel,
            flow: FlowSelector::new(),
            feedbacks,
            form,
            dashboard,
            setup,
            clock,
        }
    }

    /// Sign out and return to the home view. The local session is gone even
    /// when the backend call fails; that failure is still returned.
    pub async fn sign_out(&self) -> Result<(), Error> {
        let result = self.auth.sign_out().await;
        self.navigation.navigate_to(View::Home);
        self.form.sync_session();
        result
    }

    /// Wait until a restored session is either fresh or gone so one-shot
    /// callers do not race the background refresh.
    pub async fn settle_session(&self, limit: Duration) {
        let mut sessions = self.auth.subscribe_session();
        let now = self.clock.utc();
        let settled = tokio::time::timeout(
            limit,
            sessions.wait_for(|session| session.as_ref().is_none_or(|s| !s.is_expired(now))),
        )
        .await;
        if settled.is_err() {
            debug!("session refresh did not settle in time");
        }
    }

    /// Highlight the feedback launcher with an error report prefilled.
    pub fn simulate_error(&self) {
        let view = self.navigation.current();
        let at = self.clock.utc().to_rfc3339();
        info!(%view, "simulating an error report");
        self.feedback_panel.trigger_for_error(
            SIMULATED_ERROR_TITLE,
            format!(
                "An error occurred at {at} on the '{view}' page.\n\n\
                 Details: the user's profile data could not be fetched from the server. \
                 Please check your connection or try again later."
            ),
        );
    }
}
