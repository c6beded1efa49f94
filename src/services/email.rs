use anyhow::Context;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    config::Config,
    models::{
        order::{OrderResponse, OrderStatus},
        user::User,
    },
};

pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    mensa_name: String,
}

fn chf(amount: Decimal) -> String {
    format!("CHF {:.2}", amount)
}

impl EmailService {
    /// Returns None if SMTP is not fully configured.
    pub fn new(config: &Config) -> Option<Self> {
        let host = config.smtp_host.as_deref()?;
        let username = config.smtp_username.clone()?;
        let password = config.smtp_password.clone()?;
        let from_addr = config.smtp_from.as_deref()?;

        let port = config.smtp_port.unwrap_or(587);
        let creds = Credentials::new(username, password);

        let transport = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .ok()?
                .credentials(creds)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .ok()?
                .port(port)
                .credentials(creds)
                .build()
        };

        let from: Mailbox = from_addr.parse().ok()?;

        Some(Self {
            transport,
            from,
            mensa_name: config.mensa_name.clone(),
        })
    }

    // ─── Private helpers ─────────────────────────────────────────────────────

    fn new_message_id(&self) -> String {
        format!("<{}@{}>", Uuid::new_v4(), self.from.email.domain())
    }

    fn mailbox(name: &str, email: &str) -> anyhow::Result<Mailbox> {
        format!("{name} <{email}>")
            .parse::<Mailbox>()
            .or_else(|_| email.parse::<Mailbox>())
            .with_context(|| format!("Invalid recipient address: {email}"))
    }

    /// Wraps inner HTML content in the shared email layout.
    fn wrap_html(mensa_name: &str, content: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="de">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width,initial-scale=1">
  <title>{mensa_name}</title>
</head>
<body style="margin:0;padding:0;background-color:#f1f5f9;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,Helvetica,Arial,sans-serif">
  <table role="presentation" width="100%" cellpadding="0" cellspacing="0" style="background-color:#f1f5f9;padding:40px 16px">
    <tr>
      <td align="center">
        <table role="presentation" width="100%" cellpadding="0" cellspacing="0" style="max-width:560px">
          <tr>
            <td align="center" style="padding-bottom:28px">
              <p style="margin:0;font-size:20px;font-weight:700;color:#0f172a;text-align:center">{mensa_name}</p>
            </td>
          </tr>
          <tr>
            <td style="background:#ffffff;border-radius:12px;padding:40px;box-shadow:0 1px 3px rgba(0,0,0,0.08)">
              {content}
            </td>
          </tr>
          <tr>
            <td align="center" style="padding-top:20px">
              <p style="margin:0;font-size:12px;color:#94a3b8">Mit freundlichen Grüssen, Ihr {mensa_name}-Team</p>
            </td>
          </tr>
        </table>
      </td>
    </tr>
  </table>
</body>
</html>"#
        )
    }

    fn pickup_details_html(order: &OrderResponse) -> String {
        format!(
            r#"<p style="margin:0 0 6px 0;font-size:15px;color:#334155"><strong>Bestellnummer:</strong> {id}</p>
<p style="margin:0 0 6px 0;font-size:15px;color:#334155"><strong>Abholdatum:</strong> {date}</p>
<p style="margin:0 0 20px 0;font-size:15px;color:#334155"><strong>Abholzeit:</strong> {time} Uhr</p>"#,
            id = order.id,
            date = order.pickup_date.format("%d.%m.%Y"),
            time = order.pickup_time.format("%H:%M"),
        )
    }

    async fn send_email(&self, to: Mailbox, subject: &str, text: &str, html: &str) -> anyhow::Result<()> {
        let from = Mailbox::new(Some(self.mensa_name.clone()), self.from.email.clone());
        let email = Message::builder()
            .message_id(Some(self.new_message_id()))
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html.to_string()),
                    ),
            )
            .context("Failed to build email message")?;

        self.transport
            .send(email)
            .await
            .context("Failed to send email")?;

        Ok(())
    }

    // ─── Public methods ───────────────────────────────────────────────────────

    pub async fn send_order_confirmation(&self, order: &OrderResponse) -> anyhow::Result<()> {
        let to = Self::mailbox(&order.user_name, &order.user_email)?;
        let subject = format!("Bestätigung Ihrer {}-Bestellung #{}", self.mensa_name, order.id);

        let mut text_lines = String::new();
        let mut rows = String::new();
        for l in &order.lines {
            text_lines.push_str(&format!(
                "  {} x {} à {} = {}\n",
                l.line.quantity,
                l.line.item_name,
                chf(l.line.unit_price),
                chf(l.line_total)
            ));
            rows.push_str(&format!(
                r#"<tr><td style="padding:6px 8px;border-bottom:1px solid #e2e8f0">{}</td><td style="padding:6px 8px;border-bottom:1px solid #e2e8f0;text-align:right">{}</td><td style="padding:6px 8px;border-bottom:1px solid #e2e8f0;text-align:right">{}</td><td style="padding:6px 8px;border-bottom:1px solid #e2e8f0;text-align:right">{}</td></tr>"#,
                l.line.item_name,
                l.line.quantity,
                chf(l.line.unit_price),
                chf(l.line_total)
            ));
        }

        let text = format!(
            "Guten Tag {name},\n\n\
            vielen Dank für Ihre Bestellung. Wir stellen sie zur gewählten Zeit bereit.\n\n\
            Bestellnummer: {id}\n\
            Abholdatum: {date}\n\
            Abholzeit: {time} Uhr\n\n\
            {text_lines}\n\
            Gesamtbetrag: {total}\n\n\
            Ihre Bestellung wird erst nach Zahlungseingang zubereitet.",
            name = order.user_name,
            id = order.id,
            date = order.pickup_date.format("%d.%m.%Y"),
            time = order.pickup_time.format("%H:%M"),
            total = chf(order.total_price),
        );

        let content = format!(
            r#"<h1 style="margin:0 0 8px 0;font-size:22px;font-weight:700;color:#0f172a">Vielen Dank für Ihre Bestellung!</h1>
<p style="margin:0 0 20px 0;font-size:15px;color:#64748b;line-height:1.6">Guten Tag <strong style="color:#334155">{name}</strong>, wir haben Ihre Bestellung erhalten.</p>
{details}
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" style="margin-bottom:20px;font-size:14px;color:#334155">
  <tr><th style="text-align:left;padding:6px 8px">Artikel</th><th style="text-align:right;padding:6px 8px">Anzahl</th><th style="text-align:right;padding:6px 8px">Einzelpreis</th><th style="text-align:right;padding:6px 8px">Total</th></tr>
  {rows}
</table>
<p style="margin:0 0 20px 0;font-size:16px;color:#0f172a"><strong>Gesamtbetrag:</strong> {total}</p>
<p style="margin:0;font-size:13px;color:#94a3b8;border-top:1px solid #f1f5f9;padding-top:20px;line-height:1.5">Ihre Bestellung wird erst nach Zahlungseingang zubereitet.</p>"#,
            name = order.user_name,
            details = Self::pickup_details_html(order),
            total = chf(order.total_price),
        );

        let html = Self::wrap_html(&self.mensa_name, &content);
        self.send_email(to, &subject, &text, &html).await
    }

    pub async fn send_payment_confirmation(&self, order: &OrderResponse) -> anyhow::Result<()> {
        let to = Self::mailbox(&order.user_name, &order.user_email)?;
        let subject = format!("Zahlungsbestätigung für Ihre Bestellung #{}", order.id);
        let reference = order.payment_reference.as_deref().unwrap_or("-");

        let text = format!(
            "Guten Tag {name},\n\n\
            wir bestätigen den Erhalt Ihrer Zahlung.\n\n\
            Bestellnummer: {id}\n\
            Zahlungsreferenz: {reference}\n\
            Abholdatum: {date}\n\
            Abholzeit: {time} Uhr\n\
            Gesamtbetrag: {total}\n\n\
            Bitte halten Sie Ihre Bestellnummer bei der Abholung bereit.",
            name = order.user_name,
            id = order.id,
            date = order.pickup_date.format("%d.%m.%Y"),
            time = order.pickup_time.format("%H:%M"),
            total = chf(order.total_price),
        );

        let content = format!(
            r#"<h1 style="margin:0 0 8px 0;font-size:22px;font-weight:700;color:#0f172a">Zahlungsbestätigung</h1>
<p style="margin:0 0 20px 0;font-size:15px;color:#64748b;line-height:1.6">Guten Tag <strong style="color:#334155">{name}</strong>, wir bestätigen den Erhalt Ihrer Zahlung.</p>
{details}
<p style="margin:0 0 6px 0;font-size:15px;color:#334155"><strong>Zahlungsreferenz:</strong> {reference}</p>
<p style="margin:0 0 20px 0;font-size:16px;color:#0f172a"><strong>Gesamtbetrag:</strong> {total}</p>
<p style="margin:0;font-size:13px;color:#94a3b8;border-top:1px solid #f1f5f9;padding-top:20px;line-height:1.5">Bitte halten Sie Ihre Bestellnummer bei der Abholung bereit.</p>"#,
            name = order.user_name,
            details = Self::pickup_details_html(order),
            total = chf(order.total_price),
        );

        let html = Self::wrap_html(&self.mensa_name, &content);
        self.send_email(to, &subject, &text, &html).await
    }

    pub async fn send_status_update(&self, order: &OrderResponse) -> anyhow::Result<()> {
        let to = Self::mailbox(&order.user_name, &order.user_email)?;
        let subject = format!("Update zu Ihrer Bestellung #{}", order.id);
        let status_text = match order.status {
            OrderStatus::InPreparation => {
                "Ihre Bestellung wird nun zubereitet und ist pünktlich zur angegebenen Zeit bereit."
            }
            OrderStatus::Ready => {
                "Ihre Bestellung ist jetzt abholbereit! Bitte halten Sie Ihre Bestellnummer bereit."
            }
            OrderStatus::PickedUp => {
                "Vielen Dank, dass Sie Ihre Bestellung abgeholt haben. En Guete!"
            }
            OrderStatus::Cancelled => {
                "Ihre Bestellung wurde storniert. Bei Fragen wenden Sie sich bitte an das Mensa-Team."
            }
            OrderStatus::New => "Der Status Ihrer Bestellung hat sich geändert.",
        };

        let text = format!(
            "Guten Tag {name},\n\n\
            {status_text}\n\n\
            Bestellnummer: {id}\n\
            Abholdatum: {date}\n\
            Abholzeit: {time} Uhr",
            name = order.user_name,
            id = order.id,
            date = order.pickup_date.format("%d.%m.%Y"),
            time = order.pickup_time.format("%H:%M"),
        );

        let content = format!(
            r#"<h1 style="margin:0 0 8px 0;font-size:22px;font-weight:700;color:#0f172a">Update zu Ihrer Bestellung</h1>
<p style="margin:0 0 20px 0;font-size:15px;color:#64748b;line-height:1.6">Guten Tag <strong style="color:#334155">{name}</strong>,<br><br>{status_text}</p>
{details}"#,
            name = order.user_name,
            details = Self::pickup_details_html(order),
        );

        let html = Self::wrap_html(&self.mensa_name, &content);
        self.send_email(to, &subject, &text, &html).await
    }

    pub async fn send_account_locked(&self, user: &User, lock_minutes: i64) -> anyhow::Result<()> {
        let name = user.full_name();
        let to = Self::mailbox(&name, &user.email)?;
        let subject = format!("Ihr {}-Konto wurde vorübergehend gesperrt", self.mensa_name);

        let text = format!(
            "Guten Tag {name},\n\n\
            nach mehreren fehlgeschlagenen Anmeldeversuchen wurde Ihr Konto für {lock_minutes} Minuten gesperrt.\n\n\
            Falls Sie das nicht waren, ändern Sie bitte nach der Sperre Ihr Passwort."
        );

        let content = format!(
            r#"<h1 style="margin:0 0 8px 0;font-size:22px;font-weight:700;color:#0f172a">Konto vorübergehend gesperrt</h1>
<p style="margin:0 0 20px 0;font-size:15px;color:#64748b;line-height:1.6">Guten Tag <strong style="color:#334155">{name}</strong>,<br><br>nach mehreren fehlgeschlagenen Anmeldeversuchen wurde Ihr Konto für <strong style="color:#334155">{lock_minutes} Minuten</strong> gesperrt.</p>
<p style="margin:0;font-size:13px;color:#94a3b8;border-top:1px solid #f1f5f9;padding-top:20px;line-height:1.5">Falls Sie das nicht waren, ändern Sie bitte nach der Sperre Ihr Passwort.</p>"#
        );

        let html = Self::wrap_html(&self.mensa_name, &content);
        self.send_email(to, &subject, &text, &html).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_francs_with_two_decimals() {
        assert_eq!(chf(Decimal::new(135, 1)), "CHF 13.50");
        assert_eq!(chf(Decimal::new(4, 0)), "CHF 4.00");
    }

    #[test]
    fn layout_embeds_the_content() {
        let html = EmailService::wrap_html("Mensa Campus", "<p>Hallo</p>");
        assert!(html.contains("<p>Hallo</p>"));
        assert!(html.contains("Mensa Campus"));
    }
}
