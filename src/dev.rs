//! Test fixtures and fakes for the service seams.

pub(crate) fn test_config_args() -> crate::config::ConfigArgs {
    crate::config::ConfigArgs {
        identity_pool_id: "eu-west-1:11111111-2222-3333-4444-555555555555".to_string(),
        user_pool_url: "https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_TeStPoOl".to_string(),
        role_arn: "arn:aws:iam::123456789012:role/dashboard-reader".to_string(),
        region: "eu-west-1".to_string(),
        account_id: "123456789012".to_string(),
        dashboard_id: "11111111-2222-3333-4444-666666666666".to_string(),
        namespace: "default".to_string(),
        user_role: "READER".to_string(),
        session_lifetime: 600,
        reset_disabled: false,
        undo_redo_disabled: false,
    }
}

pub(crate) fn test_config() -> crate::config::Config {
    crate::config::Config::new(test_config_args()).unwrap()
}

/// Compact token with the given payload and a bogus signature; decoding never
/// looks at the signature segment.
pub(crate) fn encode_token(payload: &serde_json::Value) -> String {
    use base64ct::Encoding;

    let header = base64ct::Base64UrlUnpadded::encode_string(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = base64ct::Base64UrlUnpadded::encode_string(payload.to_string().as_bytes());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

pub(crate) fn role_credentials() -> crate::federation::RoleCredentials {
    crate::federation::RoleCredentials {
        access_key_id: "ASIATESTACCESSKEY".to_string(),
        secret_access_key: secrecy::SecretString::new("testsecret".to_string()),
        session_token: "testsessiontoken".to_string(),
        expiration: chrono::DateTime::parse_from_rfc3339("2030-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc),
    }
}

#[derive(Default)]
pub(crate) struct FakeBroker {
    fail: bool,
    calls: std::sync::atomic::AtomicUsize,
}

impl FakeBroker {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl crate::federation::CredentialExchange for FakeBroker {
    async fn exchange(
        &self,
        _claims: &crate::token::IdentityClaims,
        _identity_token: &secrecy::SecretString,
    ) -> Result<crate::federation::RoleCredentials, crate::error::Error> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail {
            Err(crate::error::Error::Federation(
                "fake federation outage".to_string(),
            ))
        } else {
            Ok(role_credentials())
        }
    }
}

#[derive(Default)]
pub(crate) enum ProvisioningBehavior {
    #[default]
    Succeed,
    AlreadyExists,
    Fail,
}

#[derive(Default)]
pub(crate) struct FakeDashboard {
    provisioning: ProvisioningBehavior,
    register_calls: std::sync::atomic::AtomicUsize,
    embed_calls: std::sync::atomic::AtomicUsize,
}

impl FakeDashboard {
    pub(crate) fn with_provisioning(provisioning: ProvisioningBehavior) -> Self {
        Self {
            provisioning,
            ..Self::default()
        }
    }

    pub(crate) fn register_calls(&self) -> usize {
        self.register_calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub(crate) fn embed_calls(&self) -> usize {
        self.embed_calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl crate::quicksight::DashboardService for FakeDashboard {
    async fn register_user(
        &self,
        _credentials: &crate::federation::RoleCredentials,
        _spec: &crate::quicksight::DashboardUserSpec,
    ) -> Result<(), crate::error::Error> {
        self.register_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match self.provisioning {
            ProvisioningBehavior::Succeed => Ok(()),
            ProvisioningBehavior::AlreadyExists => {
                Err(crate::error::Error::UserAlreadyRegistered)
            }
            ProvisioningBehavior::Fail => Err(crate::error::Error::Provisioning(
                "fake provisioning outage".to_string(),
            )),
        }
    }

    async fn dashboard_embed_url(
        &self,
        _credentials: &crate::federation::RoleCredentials,
        _spec: &crate::quicksight::DashboardUserSpec,
    ) -> Result<crate::quicksight::EmbedUrl, crate::error::Error> {
        self.embed_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(crate::quicksight::EmbedUrl {
            url: "https://dashboards.example/embed/abc".to_string(),
            expiry_seconds: 600 * 60,
        })
    }
}
