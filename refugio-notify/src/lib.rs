pub mod mailer;

pub use mailer::{HttpMailer, MailerConfig, NotifyError};
