//! Outgoing mail
//!
//! Verification, login-link, password-reset and recruitment mails go through
//! the [`Mailer`] trait. With SMTP configured they are delivered by lettre;
//! without it they are only logged.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment as MailAttachment, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

use crate::config::MailConfig;

/// File attached to a mail
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<Attachment>,
}

impl Mail {
    pub fn verification(to: &str, link: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Xác minh email / メールアドレスの確認".to_string(),
            body: format!(
                "Vui lòng xác minh email của bạn trong vòng 6 giờ:\n\
                 6時間以内にメールアドレスを確認してください:\n\n{}\n",
                link
            ),
            attachment: None,
        }
    }

    pub fn login_link(to: &str, link: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Liên kết đăng nhập / ログインリンク".to_string(),
            body: format!(
                "Liên kết đăng nhập có hiệu lực trong 15 phút:\n\
                 ログインリンクの有効期限は15分です:\n\n{}\n",
                link
            ),
            attachment: None,
        }
    }

    pub fn password_reset(to: &str, link: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Đặt lại mật khẩu / パスワードの再設定".to_string(),
            body: format!(
                "Liên kết đặt lại mật khẩu có hiệu lực trong 1 giờ:\n\
                 パスワード再設定リンクの有効期限は1時間です:\n\n{}\n\n\
                 Nếu bạn không yêu cầu, hãy bỏ qua email này.\n",
                link
            ),
            attachment: None,
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: Mail) -> Result<()>;
}

/// SMTP delivery through lettre
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let credentials =
            Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
            .credentials(credentials)
            .port(config.smtp_port)
            .build();

        Ok(Self {
            transport,
            from: format!("{} <{}>", config.from_name, config.from_address),
        })
    }

    fn build_message(&self, mail: Mail) -> Result<Message> {
        let builder = Message::builder()
            .from(self.from.parse().map_err(|e| anyhow!("Invalid from address: {}", e))?)
            .to(mail.to.parse().map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(mail.subject);

        let message = match mail.attachment {
            None => builder.header(ContentType::TEXT_PLAIN).body(mail.body),
            Some(attachment) => {
                let content_type = ContentType::parse(&attachment.content_type)
                    .map_err(|e| anyhow!("Invalid attachment type: {}", e))?;
                builder.multipart(
                    MultiPart::mixed()
                        .singlepart(SinglePart::plain(mail.body))
                        .singlepart(
                            MailAttachment::new(attachment.file_name)
                                .body(attachment.data, content_type),
                        ),
                )
            }
        };

        message.map_err(|e| anyhow!("Failed to build email: {}", e))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: Mail) -> Result<()> {
        let to = mail.to.clone();
        let message = self.build_message(mail)?;
        self.transport
            .send(message)
            .await
            .with_context(|| format!("Failed to send email to {}", to))?;
        tracing::info!(to = %to, "Mail sent");
        Ok(())
    }
}

/// Logs mails instead of sending them; used when SMTP is not configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: Mail) -> Result<()> {
        tracing::info!(
            to = %mail.to,
            subject = %mail.subject,
            attachment = ?mail.attachment.as_ref().map(|a| a.file_name.as_str()),
            "SMTP not configured, mail not sent:\n{}",
            mail.body
        );
        Ok(())
    }
}

/// Keeps every mail in memory.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingMailer {
    sent: std::sync::Mutex<Vec<Mail>>,
}

#[cfg(test)]
impl RecordingMailer {
    pub fn sent(&self) -> Vec<Mail> {
        self.sent.lock().unwrap().clone()
    }

    /// Last link-looking line of the most recent mail to `to`
    pub fn last_link_to(&self, to: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|mail| mail.to == to)
            .and_then(|mail| {
                mail.body
                    .lines()
                    .rev()
                    .find(|line| line.starts_with("http"))
                    .map(str::to_string)
            })
    }
}

#[cfg(test)]
#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: Mail) -> Result<()> {
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

/// Pick the SMTP mailer when a host is configured, the log mailer otherwise.
pub fn build_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>> {
    if config.is_smtp_configured() {
        Ok(Arc::new(SmtpMailer::new(config)?))
    } else {
        tracing::warn!("SMTP is not configured; outgoing mail will only be logged");
        Ok(Arc::new(LogMailer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp_config() -> MailConfig {
        MailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_username: "user".to_string(),
            smtp_password: "pass".to_string(),
            from_address: "noreply@example.com".to_string(),
            from_name: "Agrinews".to_string(),
            ..MailConfig::default()
        }
    }

    #[test]
    fn test_templates_carry_link() {
        let link = "https://site.example/verify/u1/abc";
        for mail in [
            Mail::verification("a@example.com", link),
            Mail::login_link("a@example.com", link),
            Mail::password_reset("a@example.com", link),
        ] {
            assert_eq!(mail.to, "a@example.com");
            assert!(mail.body.contains(link));
            assert!(mail.attachment.is_none());
        }
    }

    #[tokio::test]
    async fn test_build_message_with_attachment() {
        let mailer = SmtpMailer::new(&smtp_config()).unwrap();
        let mail = Mail {
            to: "hr@example.com".to_string(),
            subject: "CV".to_string(),
            body: "Hello".to_string(),
            attachment: Some(Attachment {
                file_name: "cv.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                data: b"%PDF-1.4".to_vec(),
            }),
        };

        let formatted = String::from_utf8(mailer.build_message(mail).unwrap().formatted()).unwrap();
        assert!(formatted.contains("multipart/mixed"));
        assert!(formatted.contains("cv.pdf"));
    }

    #[tokio::test]
    async fn test_build_message_rejects_bad_recipient() {
        let mailer = SmtpMailer::new(&smtp_config()).unwrap();
        let mail = Mail::verification("not an address", "https://x");
        assert!(mailer.build_message(mail).is_err());
    }

    #[tokio::test]
    async fn test_log_mailer_never_fails() {
        let mailer = build_mailer(&MailConfig::default()).unwrap();
        mailer
            .send(Mail::password_reset("a@example.com", "https://x"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_recording_mailer_finds_link() {
        let mailer = RecordingMailer::default();
        mailer
            .send(Mail::login_link("a@example.com", "https://site.example/login/u/s"))
            .await
            .unwrap();
        assert_eq!(
            mailer.last_link_to("a@example.com").as_deref(),
            Some("https://site.example/login/u/s")
        );
        assert_eq!(mailer.last_link_to("b@example.com"), None);
    }
}
