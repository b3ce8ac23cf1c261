//! Email service module for best-effort notifications.
//!
//! Uses the `lettre` crate over SMTP. Sending is strictly best-effort: the
//! registration ledger must never roll back because a confirmation mail
//! bounced, so callers spawn [`EmailService`] sends and log failures.

use chrono::{DateTime, Utc};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
    message::{Message, MultiPart, SinglePart, header},
    transport::smtp::authentication::Credentials,
};
use util::config::AppConfig;

type Error = Box<dyn std::error::Error + Send + Sync>;

/// Service for handling email-related operations.
pub struct EmailService;

impl EmailService {
    fn transport() -> Result<Option<AsyncSmtpTransport<Tokio1Executor>>, Error> {
        let cfg = AppConfig::global();
        if cfg.smtp_username.is_empty() || cfg.smtp_password.is_empty() {
            // unconfigured environments (dev, CI) simply skip sending
            return Ok(None);
        }

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_relay)?
            .credentials(Credentials::new(
                cfg.smtp_username.clone(),
                cfg.smtp_password.clone(),
            ))
            .build();
        Ok(Some(transport))
    }

    /// Sends a registration confirmation email.
    ///
    /// Returns `Ok(())` without sending when SMTP is not configured.
    pub async fn send_registration_confirmation(
        to_email: &str,
        to_name: &str,
        event_title: &str,
        start_date: DateTime<Utc>,
        location: Option<&str>,
    ) -> Result<(), Error> {
        let Some(transport) = Self::transport()? else {
            tracing::debug!(to = to_email, "SMTP not configured; skipping confirmation email");
            return Ok(());
        };

        let (from_email, from_name) = {
            let cfg = AppConfig::global();
            (cfg.smtp_username.clone(), cfg.email_from_name.clone())
        };
        let location = location.unwrap_or("TBA");
        let when = start_date.format("%e %B %Y, %H:%M UTC");

        let email = Message::builder()
            .from(format!("{} <{}>", from_name, from_email).parse()?)
            .to(to_email.parse()?)
            .subject(format!("Registration Confirmed: {event_title}"))
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(format!(
                                "Hi {to_name},\n\n\
                                You have successfully registered for {event_title}.\n\n\
                                When: {when}\n\
                                Where: {location}\n\n\
                                Thank you!\n\
                                {from_name} Team"
                            )),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(format!(
                                "<html>\
                                <body>\
                                <h2>Registration Confirmed!</h2>\
                                <p>Hi {to_name},</p>\
                                <p>You have successfully registered for <strong>{event_title}</strong>.</p>\
                                <ul>\
                                <li>When: {when}</li>\
                                <li>Where: {location}</li>\
                                </ul>\
                                <p>Thank you!<br>{from_name} Team</p>\
                                </body>\
                                </html>"
                            )),
                    ),
            )?;

        transport.send(email).await?;
        Ok(())
    }
}
