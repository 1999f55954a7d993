//! Authenticated session acquisition.
//!
//! A cached session is probed first: cookies installed, landing page
//! visited, and the cache discarded if the site bounces back to the
//! login form. Otherwise the full credential + one-time-password flow
//! runs and fresh state is saved.

use std::time::Duration;

use totp_rs::{Algorithm, Secret, TOTP};

use call_assistant_config::SiteConfig;

use crate::browser::{BrowserConnector, BrowserSession};
use crate::cookies::CookieStore;
use crate::WorkflowError;

const USERNAME_INPUT: &str = "input[name='username']";
const PASSWORD_INPUT: &str = "input[name='password']";
const LOGIN_SUBMIT: &str = "button[type='submit']";
const OTP_INPUT: &str = "input#one_time_password";
const OTP_SUBMIT: &str = "#check_otp";

/// Open a browser session that is logged into the roster site.
pub async fn login(
    connector: &dyn BrowserConnector,
    site: &SiteConfig,
    cookies: &CookieStore,
) -> Result<Box<dyn BrowserSession>, WorkflowError> {
    let session = connector.open().await?;

    match establish(session.as_ref(), site, cookies).await {
        Ok(()) => Ok(session),
        Err(e) => {
            let _ = session.close().await;
            Err(e)
        }
    }
}

async fn establish(
    session: &dyn BrowserSession,
    site: &SiteConfig,
    cookies: &CookieStore,
) -> Result<(), WorkflowError> {
    let landing = format!("{}/home", site.base_url);

    if let Some(state) = cookies.load(&site.service) {
        // Cookies can only be installed once we are on the site's origin.
        session.goto(&site.base_url).await?;
        if session.restore_cookies(&state).await.is_ok() {
            session.goto(&landing).await?;
            let url = session.current_url().await?;
            if !url.to_lowercase().contains("login") {
                tracing::info!("reusing saved browser session");
                return Ok(());
            }
            tracing::warn!("saved browser session rejected by the site");
            cookies.discard(&site.service);
        }
    }

    let timeout = Duration::from_secs(site.navigation_timeout_secs);

    tracing::info!("logging into {}", site.base_url);
    session.goto(&format!("{}/login", site.base_url)).await?;
    session
        .wait_for(USERNAME_INPUT, timeout)
        .await
        .map_err(|_| WorkflowError::AuthFailed("login form did not appear".to_string()))?;

    session.fill(USERNAME_INPUT, &site.username).await?;
    session.fill(PASSWORD_INPUT, &site.password).await?;
    session.click(LOGIN_SUBMIT).await?;

    // The one-time-password modal renders after the credential round trip.
    session
        .wait_for(OTP_INPUT, timeout)
        .await
        .map_err(|_| WorkflowError::AuthFailed("one-time-password prompt did not appear".to_string()))?;

    let code = totp_code(&site.totp_secret)?;
    session.fill(OTP_INPUT, &code).await?;
    session.click(OTP_SUBMIT).await?;

    wait_for_landing(session, &landing, timeout).await?;

    match session.cookies().await {
        Ok(state) => cookies.save(&site.service, &state)?,
        Err(e) => tracing::warn!("could not capture session state: {e}"),
    }

    tracing::info!("login successful");
    Ok(())
}

/// Poll until the post-login landing page is reached.
async fn wait_for_landing(
    session: &dyn BrowserSession,
    landing: &str,
    timeout: Duration,
) -> Result<(), WorkflowError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let url = session.current_url().await?;
        if url.trim_end_matches('/').starts_with(landing.trim_end_matches('/')) {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(WorkflowError::AuthFailed(format!(
                "expected to land on {landing}, still on {url}"
            )));
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}

/// Current code for the site's time-based one-time-password challenge.
fn totp_code(secret: &str) -> Result<String, WorkflowError> {
    if secret.is_empty() {
        return Err(WorkflowError::AuthFailed(
            "no one-time-password secret configured".to_string(),
        ));
    }

    let bytes = Secret::Encoded(secret.to_string())
        .to_bytes()
        .map_err(|e| WorkflowError::AuthFailed(format!("bad one-time-password secret: {e:?}")))?;
    let totp = TOTP::new(Algorithm::SHA1, 6, 1, 30, bytes)
        .map_err(|e| WorkflowError::AuthFailed(format!("bad one-time-password secret: {e:?}")))?;
    totp.generate_current()
        .map_err(|e| WorkflowError::AuthFailed(format!("clock error generating code: {e}")))
}
