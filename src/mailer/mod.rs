//! Asynchronous email delivery.
//!
//! Producers push `EmailJob`s onto an in-process queue and move on; a single
//! background worker drains it and talks SMTP. Delivery failures are logged,
//! never bubbled back to the request that queued the mail.

use log::{error, info};
use tokio::sync::mpsc;

use crate::config::SmtpConfig;

#[derive(Debug, Clone)]
pub struct EmailJob {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub fn welcome_email(to: &str, username: &str) -> EmailJob {
    EmailJob {
        to: to.to_string(),
        subject: "Welcome to OKR".to_string(),
        body: format!(
            "Hi {username},\n\n\
             Your account is ready. Create a company or ask an administrator\n\
             to add you to one, and start tracking your objectives.\n\n\
             The OKR Team"
        ),
    }
}

/// Spawns the delivery worker and returns the queue handle. The worker runs
/// until every sender is dropped.
pub fn start_worker(config: SmtpConfig) -> mpsc::UnboundedSender<EmailJob> {
    let (tx, mut rx) = mpsc::unbounded_channel::<EmailJob>();

    tokio::spawn(async move {
        info!("Mail worker started (SMTP host: {})", config.host);
        while let Some(job) = rx.recv().await {
            deliver(&config, job).await;
        }
        info!("Mail worker stopped");
    });

    tx
}

#[cfg(feature = "mail")]
async fn deliver(config: &SmtpConfig, job: EmailJob) {
    let config = config.clone();
    let to = job.to.clone();
    let result = tokio::task::spawn_blocking(move || send_smtp(&config, &job)).await;

    match result {
        Ok(Ok(())) => info!("Sent email to {to}"),
        Ok(Err(e)) => error!("Failed to send email to {to}: {e}"),
        Err(e) => error!("Mail worker task failed for {to}: {e}"),
    }
}

#[cfg(not(feature = "mail"))]
async fn deliver(_config: &SmtpConfig, job: EmailJob) {
    error!(
        "Built without the mail feature; dropping email to {}",
        job.to
    );
}

#[cfg(feature = "mail")]
fn send_smtp(config: &SmtpConfig, job: &EmailJob) -> Result<(), String> {
    use lettre::{
        message::header::ContentType,
        transport::smtp::authentication::Credentials,
        Message, SmtpTransport, Transport,
    };

    let email = Message::builder()
        .from(
            config
                .from
                .parse()
                .map_err(|e| format!("invalid from address: {e}"))?,
        )
        .to(job
            .to
            .parse()
            .map_err(|e| format!("invalid to address: {e}"))?)
        .subject(job.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(job.body.clone())
        .map_err(|e| format!("failed to build email: {e}"))?;

    let mailer = match (&config.username, &config.password) {
        (Some(user), Some(pass)) => {
            let creds = Credentials::new(user.clone(), pass.clone());
            SmtpTransport::relay(&config.host)
                .map_err(|e| format!("SMTP relay error: {e}"))?
                .credentials(creds)
                .build()
        }
        _ => SmtpTransport::builder_dangerous(&config.host).build(),
    };

    mailer
        .send(&email)
        .map_err(|e| format!("SMTP send error: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_email_addresses_the_user() {
        let job = welcome_email("new@example.com", "newuser");
        assert_eq!(job.to, "new@example.com");
        assert_eq!(job.subject, "Welcome to OKR");
        assert!(job.body.contains("Hi newuser"));
    }
}
