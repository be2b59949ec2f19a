#[derive(clap::Args)]
pub struct ServeArgs {
    /// Address to listen on when no socket is passed via sd_listen_fds
    #[clap(long)]
    bind: Option<std::net::SocketAddr>,
}

#[tokio::main]
pub async fn run(
    config: &crate::config::Config,
    args: &ServeArgs,
) -> Result<(), anyhow::Error> {
    serve(config.clone(), args).await?;
    Ok(())
}

pub fn make_router(
    arc_config: std::sync::Arc<crate::config::Config>,
    arc_broker: std::sync::Arc<dyn crate::federation::CredentialExchange>,
    arc_dashboard: std::sync::Arc<dyn crate::quicksight::DashboardService>,
) -> axum::Router {
    axum::Router::new()
        .route("/healthz", axum::routing::get(healthz))
        .route("/url", axum::routing::get(get_dashboard_url))
        .route(
            "/quicksight-cognito/url",
            axum::routing::get(get_dashboard_url),
        )
        .layer(axum::extract::Extension(arc_config))
        .layer(axum::extract::Extension(arc_broker))
        .layer(axum::extract::Extension(arc_dashboard))
}

pub async fn serve(config: crate::config::Config, args: &ServeArgs) -> Result<(), anyhow::Error> {
    let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.dashboard.region.clone()))
        .load()
        .await;

    let broker = crate::federation::CognitoStsBroker::new(&sdk_config, config.federation.clone());
    let dashboard = crate::quicksight::QuickSight::new(config.dashboard.clone());

    let arc_config = std::sync::Arc::new(config);
    let arc_broker: std::sync::Arc<dyn crate::federation::CredentialExchange> =
        std::sync::Arc::new(broker);
    let arc_dashboard: std::sync::Arc<dyn crate::quicksight::DashboardService> =
        std::sync::Arc::new(dashboard);

    let mut fds = listenfd::ListenFd::from_env();

    let servers = if fds.len() == 0 {
        let addr = args
            .bind
            .unwrap_or_else(|| std::net::SocketAddr::from(([127, 0, 0, 1], 3000)));
        if args.bind.is_none() {
            tracing::warn!("Using 127.0.0.1:3000 to listen because sd_listen_fds parameters are missing (use systemd.socket or --bind to control listen configuration)");
        }
        vec![axum::Server::bind(&addr)]
    } else {
        let mut ls = Vec::new();
        for idx in 0..fds.len() {
            let l = fds.take_tcp_listener(idx)?.unwrap();
            tracing::info!(message="Starting a server", idx=?idx, listener=?l);
            ls.push(axum::Server::from_tcp(l)?);
        }
        ls
    };

    let services: Vec<_> = servers
        .into_iter()
        .map(|v| {
            tokio::spawn(
                v.serve(
                    make_router(
                        arc_config.clone(),
                        arc_broker.clone(),
                        arc_dashboard.clone(),
                    )
                    .into_make_service(),
                ),
            )
        })
        .collect();

    for service in services {
        service.await.unwrap().unwrap();
    }

    Ok(())
}

async fn healthz() -> axum::response::Result<(axum::http::StatusCode, &'static str)> {
    Ok((axum::http::StatusCode::OK, "ok"))
}

#[derive(Debug, serde::Serialize)]
pub struct GetDashboardUrlResponse {
    url: String,
}

/// Embed URL issuance flow: decode the token claims, exchange the token for
/// role credentials, ensure the dashboard user exists (an already-registered
/// user is fine), then issue the embed URL. Any other failure at any step
/// terminates the flow.
async fn get_dashboard_url(
    ExtractIdentityToken(identity_token): ExtractIdentityToken,
    axum::extract::Extension(config): axum::extract::Extension<
        std::sync::Arc<crate::config::Config>,
    >,
    axum::extract::Extension(broker): axum::extract::Extension<
        std::sync::Arc<dyn crate::federation::CredentialExchange>,
    >,
    axum::extract::Extension(dashboard): axum::extract::Extension<
        std::sync::Arc<dyn crate::quicksight::DashboardService>,
    >,
) -> Result<axum::Json<GetDashboardUrlResponse>, crate::error::Error> {
    use tracing::Instrument;
    let span = tracing::info_span!("get_dashboard_url");
    async move {
        let claims = {
            use secrecy::ExposeSecret;
            match crate::token::IdentityClaims::decode(identity_token.expose_secret()) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(message = "Embed URL endpoint received an undecodable identity token", rejected = true, error = ?e);
                    return Err(e);
                }
            }
        };
        tracing::debug!(message = "Decoded identity token claims", subject = %claims.subject);

        let credentials = match broker.exchange(&claims, &identity_token).await {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(message = "Failed to exchange identity token for role credentials", subject = %claims.subject, error = ?e);
                return Err(e);
            }
        };

        let spec = crate::quicksight::DashboardUserSpec::new(&config, &claims);

        match dashboard.register_user(&credentials, &spec).await {
            Ok(()) => {}
            Err(crate::error::Error::UserAlreadyRegistered) => {
                tracing::debug!(message = "Dashboard user already registered, continuing", email = %spec.email, session_name = %spec.session_name);
            }
            Err(e) => {
                tracing::error!(message = "Failed to provision dashboard user", email = %spec.email, session_name = %spec.session_name, error = ?e);
                return Err(e);
            }
        }

        let embed = match dashboard.dashboard_embed_url(&credentials, &spec).await {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(message = "Failed to issue dashboard embed URL", session_name = %spec.session_name, error = ?e);
                return Err(e);
            }
        };

        tracing::info!(message = "Vending dashboard embed URL", ok = true, subject = %claims.subject, access_key_id = %credentials.access_key_id, credential_expiration = %credentials.expiration, url_expiry_seconds = embed.expiry_seconds);

        Ok(axum::Json(GetDashboardUrlResponse { url: embed.url }))
    }
    .instrument(span)
    .await
}

/// Axum extractor for the raw identity token in the Authorization header.
///
/// The front-end sends the Cognito id token as the bare header value; a
/// `Bearer ` scheme prefix is tolerated and stripped. The token is not
/// validated here (the federated identity exchange is the verifying party),
/// so rejection only covers a missing, ambiguous, or unreadable header.
pub(crate) struct ExtractIdentityToken(pub(crate) secrecy::SecretString);

#[async_trait::async_trait]
impl<S> axum::extract::FromRequestParts<S> for ExtractIdentityToken
where
    S: Send + Sync,
{
    type Rejection = crate::error::Error;

    #[tracing::instrument(skip_all)]
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let mut values = parts
            .headers
            .get_all(axum::http::header::AUTHORIZATION)
            .iter();
        let value = match (values.next(), values.next()) {
            (Some(v), None) => v,
            (None, _) => {
                return Err(crate::error::Error::MalformedToken(
                    "Authorization header is missing".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(crate::error::Error::MalformedToken(
                    "multiple Authorization headers were given".to_string(),
                ));
            }
        };

        let value = value.to_str().map_err(|_| {
            crate::error::Error::MalformedToken(
                "Authorization header is not valid UTF-8".to_string(),
            )
        })?;
        let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
        if token.is_empty() {
            return Err(crate::error::Error::MalformedToken(
                "Authorization header is empty".to_string(),
            ));
        }

        Ok(Self(secrecy::SecretString::new(token.to_owned())))
    }
}
