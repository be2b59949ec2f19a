//! Service configuration, read once at startup.

#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    /// Cognito identity pool to resolve federated identities against
    #[clap(long, env = "COGNITO_IDENTITY_POOL_ID")]
    pub(crate) identity_pool_id: String,

    /// Cognito user pool issuer used as the login provider key
    ///
    /// e.g. cognito-idp.<region>.amazonaws.com/<user pool id>; a URL scheme is
    /// stripped if present.
    #[clap(long, env = "COGNITO_USER_POOL_URL")]
    pub(crate) user_pool_url: String,

    /// IAM role to assume with the federated web identity token
    #[clap(long, env = "STS_ROLE_ARN_TO_ASSUME")]
    pub(crate) role_arn: String,

    /// Region hosting the QuickSight account
    #[clap(long, env = "QUICKSIGHT_REGION")]
    pub(crate) region: String,

    /// AWS account id owning the dashboard
    #[clap(long, env = "AWS_ACCOUNT_ID")]
    pub(crate) account_id: String,

    /// Dashboard to issue embed URLs for
    #[clap(long, env = "QUICKSIGHT_DASHBOARD_ID")]
    pub(crate) dashboard_id: String,

    /// QuickSight namespace holding provisioned users
    #[clap(long, env = "QUICKSIGHT_NAMESPACE", default_value = "default")]
    pub(crate) namespace: String,

    /// Role granted to provisioned users
    #[clap(long, env = "QUICKSIGHT_USER_ROLE", default_value = "READER")]
    pub(crate) user_role: String,

    /// Embed session lifetime in minutes
    ///
    /// QuickSight accepts 15 through 600.
    #[clap(long, env = "QUICKSIGHT_SESSION_LIFETIME", default_value_t = 600)]
    pub(crate) session_lifetime: i64,

    /// Remove the reset button from embedded dashboards
    #[clap(long, action = clap::ArgAction::SetTrue)]
    pub(crate) reset_disabled: bool,

    /// Remove the undo/redo buttons from embedded dashboards
    #[clap(long, action = clap::ArgAction::SetTrue)]
    pub(crate) undo_redo_disabled: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub federation: FederationConfig,
    pub dashboard: DashboardConfig,
}

/// Inputs for the identity exchange and role assumption steps.
#[derive(Debug, Clone)]
pub struct FederationConfig {
    pub identity_pool_id: String,
    /// Login provider key for the Cognito `Logins` map, scheme-less.
    pub login_provider: String,
    pub role_arn: String,
}

/// Inputs for dashboard user provisioning and embed URL issuance.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub region: String,
    pub account_id: String,
    pub dashboard_id: String,
    pub namespace: String,
    pub user_role: String,
    pub session_lifetime_minutes: i64,
    pub reset_disabled: bool,
    pub undo_redo_disabled: bool,
}

impl Config {
    pub fn new(args: ConfigArgs) -> Result<Self, crate::error::Error> {
        for (name, value) in [
            ("--identity-pool-id", &args.identity_pool_id),
            ("--role-arn", &args.role_arn),
            ("--region", &args.region),
            ("--account-id", &args.account_id),
            ("--dashboard-id", &args.dashboard_id),
            ("--namespace", &args.namespace),
            ("--user-role", &args.user_role),
        ] {
            if value.is_empty() {
                return Err(crate::error::Error::ConfigError(format!(
                    "{name} must not be empty"
                )));
            }
        }

        if !(15..=600).contains(&args.session_lifetime) {
            return Err(crate::error::Error::ConfigError(format!(
                "--session-lifetime must be between 15 and 600 minutes, got {}",
                args.session_lifetime
            )));
        }

        Ok(Self {
            federation: FederationConfig {
                identity_pool_id: args.identity_pool_id,
                login_provider: normalize_login_provider(&args.user_pool_url)?,
                role_arn: args.role_arn,
            },
            dashboard: DashboardConfig {
                region: args.region,
                account_id: args.account_id,
                dashboard_id: args.dashboard_id,
                namespace: args.namespace,
                user_role: args.user_role,
                session_lifetime_minutes: args.session_lifetime,
                reset_disabled: args.reset_disabled,
                undo_redo_disabled: args.undo_redo_disabled,
            },
        })
    }
}

/// Cognito `Logins` keys carry no scheme, but the issuer is commonly
/// configured as a full URL. Accept either form.
fn normalize_login_provider(input: &str) -> Result<String, crate::error::Error> {
    if input.is_empty() {
        return Err(crate::error::Error::ConfigError(
            "--user-pool-url must not be empty".to_string(),
        ));
    }

    if !input.contains("://") {
        return Ok(input.trim_end_matches('/').to_string());
    }

    let url = url::Url::parse(input).map_err(|_| {
        crate::error::Error::ConfigError("--user-pool-url is malformed".to_string())
    })?;
    let host = url.host_str().ok_or_else(|| {
        crate::error::Error::ConfigError("--user-pool-url is missing a host".to_string())
    })?;

    Ok(format!("{}{}", host, url.path().trim_end_matches('/')))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_normalize_login_provider_plain() {
        assert_eq!(
            normalize_login_provider("cognito-idp.eu-west-1.amazonaws.com/eu-west-1_AbCdEf123")
                .unwrap(),
            "cognito-idp.eu-west-1.amazonaws.com/eu-west-1_AbCdEf123"
        );
    }

    #[test]
    fn test_normalize_login_provider_url() {
        assert_eq!(
            normalize_login_provider(
                "https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_AbCdEf123"
            )
            .unwrap(),
            "cognito-idp.eu-west-1.amazonaws.com/eu-west-1_AbCdEf123"
        );
    }

    #[test]
    fn test_normalize_login_provider_trailing_slash() {
        assert_eq!(
            normalize_login_provider("https://cognito-idp.eu-west-1.amazonaws.com/").unwrap(),
            "cognito-idp.eu-west-1.amazonaws.com"
        );
    }

    #[test]
    fn test_normalize_login_provider_invalid() {
        assert!(normalize_login_provider("").is_err());
        assert!(normalize_login_provider("https://").is_err());
    }

    #[test]
    fn test_config_session_lifetime_bounds() {
        let mut config = crate::dev::test_config_args();
        config.session_lifetime = 601;
        assert!(Config::new(config).is_err());

        let mut config = crate::dev::test_config_args();
        config.session_lifetime = 14;
        assert!(Config::new(config).is_err());

        let mut config = crate::dev::test_config_args();
        config.session_lifetime = 15;
        assert_eq!(
            Config::new(config)
                .unwrap()
                .dashboard
                .session_lifetime_minutes,
            15
        );
    }

    #[test]
    fn test_config_rejects_empty_required_value() {
        let mut config = crate::dev::test_config_args();
        config.account_id = String::new();
        assert!(Config::new(config).is_err());
    }
}
