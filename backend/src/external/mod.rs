//! External API integrations

pub mod auspost;
pub mod interparcel;
pub mod mailer;
pub mod stripe;
pub mod xero;

pub use auspost::AusPostClient;
pub use interparcel::InterparcelClient;
pub use mailer::MailerClient;
pub use stripe::StripeClient;
pub use xero::XeroClient;
