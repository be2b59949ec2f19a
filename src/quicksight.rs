//! QuickSight dashboard user provisioning and embed URL issuance.

/// Identity of the dashboard user a request provisions and embeds for.
///
/// The session name is the token subject, so registered users and embed URLs
/// stay traceable to the originating caller.
#[derive(Debug, Clone)]
pub struct DashboardUserSpec {
    pub account_id: String,
    pub namespace: String,
    pub email: String,
    pub user_role: String,
    pub iam_role_arn: String,
    pub session_name: String,
}

impl DashboardUserSpec {
    pub fn new(
        config: &crate::config::Config,
        claims: &crate::token::IdentityClaims,
    ) -> Self {
        Self {
            account_id: config.dashboard.account_id.clone(),
            namespace: config.dashboard.namespace.clone(),
            email: claims.email.clone(),
            user_role: config.dashboard.user_role.clone(),
            iam_role_arn: config.federation.role_arn.clone(),
            session_name: claims.subject.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbedUrl {
    pub url: String,
    pub expiry_seconds: i64,
}

/// Dashboard service operations running under a request's assumed-role
/// credentials.
#[async_trait::async_trait]
pub trait DashboardService: Send + Sync {
    /// Register the dashboard user. Returns
    /// [`Error::UserAlreadyRegistered`](crate::error::Error::UserAlreadyRegistered)
    /// when the user exists, which callers treat as success.
    async fn register_user(
        &self,
        credentials: &crate::federation::RoleCredentials,
        spec: &DashboardUserSpec,
    ) -> Result<(), crate::error::Error>;

    /// Issue a single-use, time-bounded embed URL for the configured
    /// dashboard, scoped to the credentials' session.
    async fn dashboard_embed_url(
        &self,
        credentials: &crate::federation::RoleCredentials,
        spec: &DashboardUserSpec,
    ) -> Result<EmbedUrl, crate::error::Error>;
}

pub struct QuickSight {
    dashboard: crate::config::DashboardConfig,
}

impl QuickSight {
    pub fn new(dashboard: crate::config::DashboardConfig) -> Self {
        Self { dashboard }
    }

    /// Clients are built per request from that request's assumed-role
    /// credentials, so every QuickSight call inherits exactly the caller's
    /// session scope.
    fn client_for(
        &self,
        credentials: &crate::federation::RoleCredentials,
    ) -> aws_sdk_quicksight::Client {
        use secrecy::ExposeSecret;

        let credentials = aws_credential_types::Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.expose_secret().clone(),
            Some(credentials.session_token.clone()),
            Some(std::time::SystemTime::from(credentials.expiration)),
            "CognitoFederatedSession",
        );

        let conf = aws_sdk_quicksight::Config::builder()
            .behavior_version(aws_sdk_quicksight::config::BehaviorVersion::latest())
            .region(aws_sdk_quicksight::config::Region::new(
                self.dashboard.region.clone(),
            ))
            .credentials_provider(credentials)
            .build();

        aws_sdk_quicksight::Client::from_conf(conf)
    }
}

#[async_trait::async_trait]
impl DashboardService for QuickSight {
    async fn register_user(
        &self,
        credentials: &crate::federation::RoleCredentials,
        spec: &DashboardUserSpec,
    ) -> Result<(), crate::error::Error> {
        let resp = self
            .client_for(credentials)
            .register_user()
            .aws_account_id(&spec.account_id)
            .namespace(&spec.namespace)
            .email(&spec.email)
            .identity_type(aws_sdk_quicksight::types::IdentityType::Iam)
            .user_role(aws_sdk_quicksight::types::UserRole::from(
                spec.user_role.as_str(),
            ))
            .iam_arn(&spec.iam_role_arn)
            .session_name(&spec.session_name)
            .send()
            .await;

        match resp {
            Ok(out) => {
                tracing::info!(
                    message = "Registered dashboard user",
                    email = %spec.email,
                    session_name = %spec.session_name,
                    user_arn = ?out.user().and_then(|u| u.arn()),
                );
                Ok(())
            }
            Err(e) => {
                let e = e.into_service_error();
                if e.is_resource_exists_exception() {
                    Err(crate::error::Error::UserAlreadyRegistered)
                } else {
                    Err(crate::error::Error::Provisioning(
                        aws_sdk_quicksight::error::DisplayErrorContext(&e).to_string(),
                    ))
                }
            }
        }
    }

    async fn dashboard_embed_url(
        &self,
        credentials: &crate::federation::RoleCredentials,
        spec: &DashboardUserSpec,
    ) -> Result<EmbedUrl, crate::error::Error> {
        let resp = self
            .client_for(credentials)
            .get_dashboard_embed_url()
            .aws_account_id(&spec.account_id)
            .dashboard_id(&self.dashboard.dashboard_id)
            .identity_type(aws_sdk_quicksight::types::EmbeddingIdentityType::Iam)
            .session_lifetime_in_minutes(self.dashboard.session_lifetime_minutes)
            .reset_disabled(self.dashboard.reset_disabled)
            .undo_redo_disabled(self.dashboard.undo_redo_disabled)
            .send()
            .await
            .map_err(|e| {
                crate::error::Error::EmbedUrl(
                    aws_sdk_quicksight::error::DisplayErrorContext(&e).to_string(),
                )
            })?;

        let url = resp.embed_url().ok_or_else(|| {
            crate::error::Error::Unknown(
                "GetDashboardEmbedUrl returned no EmbedUrl".to_string(),
            )
        })?;

        Ok(EmbedUrl {
            url: url.to_owned(),
            expiry_seconds: self.dashboard.session_lifetime_minutes * 60,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_dashboard_user_spec_traceability() {
        let config = crate::dev::test_config();
        let claims = crate::token::IdentityClaims {
            subject: "user-123".to_string(),
            email: "a@b.com".to_string(),
        };

        let spec = DashboardUserSpec::new(&config, &claims);
        assert_eq!(spec.session_name, "user-123");
        assert_eq!(spec.email, "a@b.com");
        assert_eq!(spec.account_id, config.dashboard.account_id);
        assert_eq!(spec.namespace, config.dashboard.namespace);
        assert_eq!(spec.user_role, "READER");
        assert_eq!(spec.iam_role_arn, config.federation.role_arn);
    }
}
