use crate::config::AppConfig;
use crate::mailer::EmailJob;
use crate::shared::utils::DbPool;
use tokio::sync::mpsc;

pub struct AppState {
    pub config: AppConfig,
    pub conn: DbPool,
    pub mail_queue: mpsc::UnboundedSender<EmailJob>,
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            conn: self.conn.clone(),
            mail_queue: self.mail_queue.clone(),
        }
    }
}
