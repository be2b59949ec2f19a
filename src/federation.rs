//! Cognito federated identity exchange and STS role assumption.

/// Temporary credentials produced by one exchange, scoped to one request's
/// subject via the role session name. Never cached or reused across requests.
#[derive(Debug, Clone)]
pub struct RoleCredentials {
    pub access_key_id: String,
    pub secret_access_key: secrecy::SecretString,
    pub session_token: String,
    pub expiration: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<&aws_sdk_sts::types::Credentials> for RoleCredentials {
    type Error = crate::error::Error;

    fn try_from(credentials: &aws_sdk_sts::types::Credentials) -> Result<Self, Self::Error> {
        let expiration = credentials.expiration();
        let expiration =
            chrono::DateTime::from_timestamp(expiration.secs(), expiration.subsec_nanos())
                .ok_or_else(|| {
                    crate::error::Error::Unknown(
                        "credential expiration is out of range".to_string(),
                    )
                })?;

        Ok(Self {
            access_key_id: credentials.access_key_id().to_owned(),
            secret_access_key: secrecy::SecretString::new(
                credentials.secret_access_key().to_owned(),
            ),
            session_token: credentials.session_token().to_owned(),
            expiration,
        })
    }
}

/// Exchange an identity token for temporary role credentials.
#[async_trait::async_trait]
pub trait CredentialExchange: Send + Sync {
    async fn exchange(
        &self,
        claims: &crate::token::IdentityClaims,
        identity_token: &secrecy::SecretString,
    ) -> Result<RoleCredentials, crate::error::Error>;
}

/// https://docs.aws.amazon.com/cognito/latest/developerguide/open-id.html
///
/// GetId and GetOpenIdToken run against the identity pool with the user pool
/// token as the login assertion, then the returned OpenID token is traded at
/// STS for role credentials. Each step needs the previous step's result, so
/// the calls are strictly sequential.
pub struct CognitoStsBroker {
    cognito: aws_sdk_cognitoidentity::Client,
    sts: aws_sdk_sts::Client,
    federation: crate::config::FederationConfig,
}

impl CognitoStsBroker {
    pub fn new(
        sdk_config: &aws_config::SdkConfig,
        federation: crate::config::FederationConfig,
    ) -> Self {
        Self {
            cognito: aws_sdk_cognitoidentity::Client::new(sdk_config),
            sts: aws_sdk_sts::Client::new(sdk_config),
            federation,
        }
    }

    async fn resolve_identity_id(
        &self,
        identity_token: &secrecy::SecretString,
    ) -> Result<String, crate::error::Error> {
        use secrecy::ExposeSecret;

        let resp = self
            .cognito
            .get_id()
            .identity_pool_id(&self.federation.identity_pool_id)
            .logins(
                &self.federation.login_provider,
                identity_token.expose_secret(),
            )
            .send()
            .await
            .map_err(|e| {
                crate::error::Error::Federation(
                    aws_sdk_cognitoidentity::error::DisplayErrorContext(&e).to_string(),
                )
            })?;

        resp.identity_id()
            .map(str::to_owned)
            .ok_or_else(|| crate::error::Error::Unknown("GetId returned no IdentityId".to_string()))
    }

    async fn open_id_token(
        &self,
        identity_id: &str,
        identity_token: &secrecy::SecretString,
    ) -> Result<String, crate::error::Error> {
        use secrecy::ExposeSecret;

        let resp = self
            .cognito
            .get_open_id_token()
            .identity_id(identity_id)
            .logins(
                &self.federation.login_provider,
                identity_token.expose_secret(),
            )
            .send()
            .await
            .map_err(|e| {
                crate::error::Error::Federation(
                    aws_sdk_cognitoidentity::error::DisplayErrorContext(&e).to_string(),
                )
            })?;

        resp.token().map(str::to_owned).ok_or_else(|| {
            crate::error::Error::Unknown("GetOpenIdToken returned no Token".to_string())
        })
    }
}

#[async_trait::async_trait]
impl CredentialExchange for CognitoStsBroker {
    async fn exchange(
        &self,
        claims: &crate::token::IdentityClaims,
        identity_token: &secrecy::SecretString,
    ) -> Result<RoleCredentials, crate::error::Error> {
        let identity_id = self.resolve_identity_id(identity_token).await?;
        tracing::debug!(message = "Resolved federated identity", identity_id = %identity_id);

        let web_identity_token = self.open_id_token(&identity_id, identity_token).await?;

        let resp = self
            .sts
            .assume_role_with_web_identity()
            .role_arn(&self.federation.role_arn)
            .role_session_name(&claims.subject)
            .web_identity_token(web_identity_token)
            .send()
            .await
            .map_err(|e| {
                crate::error::Error::RoleAssumption(
                    aws_sdk_sts::error::DisplayErrorContext(&e).to_string(),
                )
            })?;

        let credentials = resp.credentials().ok_or_else(|| {
            crate::error::Error::Unknown(
                "AssumeRoleWithWebIdentity returned no credentials".to_string(),
            )
        })?;

        RoleCredentials::try_from(credentials)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_role_credentials_from_sts() {
        let credentials = aws_sdk_sts::types::Credentials::builder()
            .access_key_id("ASIATESTACCESSKEY")
            .secret_access_key("testsecret")
            .session_token("testsessiontoken")
            .expiration(aws_sdk_sts::primitives::DateTime::from_secs(1893456000))
            .build()
            .unwrap();

        let converted = RoleCredentials::try_from(&credentials).unwrap();
        assert_eq!(converted.access_key_id, "ASIATESTACCESSKEY");
        assert_eq!(converted.session_token, "testsessiontoken");
        assert_eq!(
            converted.expiration,
            chrono::DateTime::parse_from_rfc3339("2030-01-01T00:00:00Z").unwrap()
        );

        // secrecy must keep the secret key out of Debug output
        assert!(!format!("{converted:?}").contains("testsecret"));
    }
}
