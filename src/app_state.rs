use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::config::{Config, ConfigError};
use crate::engine::classifier::{is_overdue, returns_report, ReturnsReport};
use crate::engine::policy::ResolvedPolicy;
use crate::engine::stats::{DashboardStats, UserDirectoryStats};
use crate::engine::validator::{prepare_submission, FieldErrors, RequestDraft};
use crate::models::policy::{PolicyError, PolicyTable};
use crate::models::request::{Request, RequestTransition, TransitionError};
use crate::models::resource::{Resource, ResourceDraft};
use crate::models::user::{LoginRequest, Role, SignupRequest, User};
use crate::session::{Session, SessionError, TokenStore};
use crate::utils::policy_cache::PolicyCache;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("Invalid request: {0}")]
    Invalid(FieldErrors),

    #[error("Please fill in all required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Request {0} not found")]
    RequestNotFound(String),

    #[error("Resource {0} not found")]
    ResourceNotFound(String),

    #[error("Only administrators can {0}")]
    AdminOnly(&'static str),
}

/// Everything the terminal dashboard shows, fetched with one call per endpoint.
#[derive(Debug, Clone, Default)]
pub struct Overview {
    pub resources: Vec<Resource>,
    pub requests: Vec<Request>,
    pub stats: DashboardStats,
    pub report: ReturnsReport,
}

/// Everything a command needs: config, backend client, the logged-in session
/// and the cached policy table. The session is always passed explicitly.
pub struct AppState {
    pub config: Arc<Config>,
    pub client: ApiClient,
    pub session: Option<Session>,
    pub policies: PolicyCache,
    tokens: TokenStore,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Result<Self, AppError> {
        let tokens = TokenStore::new(config.token_path.clone());
        let session = match Session::restore(&tokens) {
            Ok(session) => session,
            Err(e @ (SessionError::Expired | SessionError::Invalid(_))) => {
                warn!("{}", e);
                None
            }
            Err(e) => return Err(e.into()),
        };

        let client = ApiClient::from_config(&config)?
            .with_token(session.as_ref().map(|s| s.token().to_string()));

        Ok(Self {
            policies: PolicyCache::new(config.policy_ttl),
            config,
            client,
            session,
            tokens,
        })
    }

    pub fn require_session(&self) -> Result<&Session, SessionError> {
        self.session.as_ref().ok_or(SessionError::Missing)
    }

    /// Role of the logged-in user, `Unknown` when nobody is logged in.
    pub fn role(&self) -> Role {
        self.session.as_ref().map_or(Role::Unknown, Session::role)
    }

    fn require_admin(&self, action: &'static str) -> Result<&Session, AppError> {
        let session = self.require_session()?;
        if !session.role().is_admin() {
            return Err(AppError::AdminOnly(action));
        }
        Ok(session)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<&Session, AppError> {
        let credentials = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let response = self.client.login(&credentials).await?;
        let session = Session::login(&self.tokens, &response.token)?;

        self.client.set_token(Some(response.token));
        self.policies.invalidate();
        let session: &Session = self.session.insert(session);
        Ok(session)
    }

    pub async fn signup(&self, payload: &SignupRequest) -> Result<Value, AppError> {
        Ok(self.client.signup(payload).await?)
    }

    pub fn logout(&mut self) -> Result<(), AppError> {
        Session::logout(&self.tokens)?;
        self.session = None;
        self.client.set_token(None);
        self.policies.invalidate();
        Ok(())
    }

    /// Limits for the current user, refreshing the policy table if it expired.
    pub async fn resolve_policy(&self, resource: Option<&Resource>) -> ResolvedPolicy {
        self.policies.current(&self.client).await;
        self.policies.resolve(self.role(), resource)
    }

    pub async fn find_resource(&self, id: &str) -> Result<Resource, AppError> {
        self.client
            .get_resources()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::ResourceNotFound(id.to_string()))
    }

    /// Checks the draft locally, then posts it. Nothing is sent when a field
    /// is invalid.
    pub async fn submit_request(
        &self,
        resource: &Resource,
        draft: &RequestDraft,
    ) -> Result<Value, AppError> {
        let session = self.require_session()?;
        let policy = self.resolve_policy(Some(resource)).await;

        let body = prepare_submission(
            draft,
            &policy,
            resource,
            session.role(),
            Utc::now().date_naive(),
        )
        .map_err(AppError::Invalid)?;

        let created = self.client.create_request(&body).await?;
        info!("Request for {} x{} submitted", resource.name, body.quantity);
        Ok(created)
    }

    pub async fn requests(&self) -> Result<Vec<Request>, AppError> {
        self.require_session()?;
        Ok(self.client.get_requests().await?)
    }

    /// Checks the transition against the request's current status and the
    /// user's role, sends it, then refetches the whole collection.
    pub async fn apply_transition(
        &self,
        request_id: &str,
        transition: &RequestTransition,
    ) -> Result<Vec<Request>, AppError> {
        let session = self.require_session()?;
        let current = self
            .client
            .get_requests()
            .await?
            .into_iter()
            .find(|r| r.id == request_id)
            .ok_or_else(|| AppError::RequestNotFound(request_id.to_string()))?;

        transition.check(current.status, session.role())?;
        self.client.update_request(request_id, transition).await?;
        info!("Request {} moved to {}", request_id, transition.target());

        Ok(self.client.get_requests().await?)
    }

    pub async fn save_resource(
        &self,
        id: Option<&str>,
        draft: &ResourceDraft,
    ) -> Result<Value, AppError> {
        self.require_admin("manage resources")?;
        let missing = draft.missing_fields();
        if !missing.is_empty() {
            return Err(AppError::MissingFields(missing));
        }

        let saved = match id {
            Some(id) => self.client.update_resource(id, draft).await?,
            None => self.client.create_resource(draft).await?,
        };
        Ok(saved)
    }

    pub async fn delete_resource(&self, id: &str) -> Result<Value, AppError> {
        self.require_admin("manage resources")?;
        Ok(self.client.delete_resource(id).await?)
    }

    pub async fn dashboard(&self) -> Result<DashboardStats, AppError> {
        let session = self.require_session()?;
        let admin = session.role().is_admin();

        let (resources, requests, due) = tokio::try_join!(
            self.client.get_resources(),
            self.client.get_requests(),
            self.client.get_due_returns(),
        )?;
        let overdue = if admin {
            self.client.get_overdue_returns().await?
        } else {
            Vec::new()
        };

        Ok(DashboardStats::compute(
            session.role(),
            &resources,
            &requests,
            &due,
            &overdue,
            Utc::now(),
        ))
    }

    /// Dashboard counts and the returns report built from a single fetch of
    /// each collection.
    pub async fn overview(&self) -> Result<Overview, AppError> {
        let session = self.require_session()?;
        let admin = session.role().is_admin();
        let now = Utc::now();

        let (resources, requests, due) = tokio::try_join!(
            self.client.get_resources(),
            self.client.get_requests(),
            self.client.get_due_returns(),
        )?;
        let overdue = if admin {
            self.client.get_overdue_returns().await?
        } else {
            Vec::new()
        };

        let stats = DashboardStats::compute(session.role(), &resources, &requests, &due, &overdue, now);
        let overdue = if admin {
            overdue
        } else {
            requests.iter().filter(|r| is_overdue(r, now)).cloned().collect()
        };

        Ok(Overview {
            report: returns_report(overdue, due, now),
            resources,
            requests,
            stats,
        })
    }

    /// Overdue and due-soon rows. Administrators see the whole department;
    /// everyone else sees their own overdue items.
    pub async fn returns_report(&self) -> Result<ReturnsReport, AppError> {
        let session = self.require_session()?;
        let now = Utc::now();

        let due = self.client.get_due_returns().await?;
        let overdue = if session.role().is_admin() {
            self.client.get_overdue_returns().await?
        } else {
            self.client
                .get_requests()
                .await?
                .into_iter()
                .filter(|r| is_overdue(r, now))
                .collect()
        };

        Ok(returns_report(overdue, due, now))
    }

    pub async fn user_directory(&self) -> Result<(Vec<User>, UserDirectoryStats), AppError> {
        self.require_admin("view the user directory")?;
        let (users, requests) =
            tokio::try_join!(self.client.get_users(), self.client.get_requests())?;
        let stats = UserDirectoryStats::compute(&users, &requests);
        Ok((users, stats))
    }

    /// Validates the edited table, saves it and primes the cache with it.
    pub async fn update_policies(&self, table: PolicyTable) -> Result<(), AppError> {
        self.require_admin("edit stakeholder policies")?;
        table.validate()?;
        self.client.update_stakeholder_policies(&table).await?;
        self.policies.store(table);
        info!("Stakeholder policies updated");
        Ok(())
    }
}
