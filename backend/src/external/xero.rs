//! Xero accounting API client
//!
//! Holds a lazily refreshed OAuth access token behind `valid_token()` so
//! callers never deal with expiry. The client is constructed once and shared
//! through application state; settlement is its only writer of invoices.

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::XeroConfig;
use crate::error::{AppError, AppResult};

/// Refresh the token this long before it actually expires.
const EXPIRY_MARGIN_SECONDS: i64 = 60;

/// Xero accounting API client
#[derive(Clone)]
pub struct XeroClient {
    client: Client,
    config: XeroConfig,
    api_url: String,
    token_url: String,
    token: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    /// Xero rotates the refresh token on every grant
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

/// One line on a draft invoice. Amounts are major units.
#[derive(Debug, Clone)]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: i32,
    pub unit_amount: Decimal,
}

/// Draft invoice for one order.
#[derive(Debug, Clone)]
pub struct InvoiceDraft {
    pub contact_name: String,
    pub contact_email: String,
    pub reference: String,
    pub lines: Vec<InvoiceLine>,
}

impl InvoiceDraft {
    pub fn total(&self) -> Decimal {
        self.lines
            .iter()
            .map(|l| l.unit_amount * Decimal::from(l.quantity))
            .sum()
    }
}

/// Identifiers of a created invoice.
#[derive(Debug, Clone)]
pub struct XeroInvoiceRef {
    pub invoice_id: String,
    pub invoice_number: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct InvoicesRequest {
    invoices: Vec<InvoiceBody>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct InvoiceBody {
    #[serde(rename = "Type")]
    invoice_type: String,
    contact: ContactBody,
    line_items: Vec<LineItemBody>,
    status: String,
    reference: String,
    currency_code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ContactBody {
    name: String,
    email_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct LineItemBody {
    description: String,
    quantity: i32,
    unit_amount: Decimal,
    account_code: String,
}

#[derive(Debug, Deserialize)]
struct InvoicesResponse {
    #[serde(rename = "Invoices")]
    invoices: Vec<InvoiceCreated>,
}

#[derive(Debug, Deserialize)]
struct InvoiceCreated {
    #[serde(rename = "InvoiceID")]
    invoice_id: String,
    #[serde(rename = "InvoiceNumber")]
    invoice_number: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PaymentsRequest {
    payments: Vec<PaymentBody>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PaymentBody {
    invoice: PaymentInvoiceRef,
    account: PaymentAccountRef,
    amount: Decimal,
    date: String,
}

#[derive(Debug, Serialize)]
struct PaymentInvoiceRef {
    #[serde(rename = "InvoiceID")]
    invoice_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PaymentAccountRef {
    code: String,
}

impl XeroClient {
    /// Create a new XeroClient
    pub fn new(config: XeroConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            api_url: "https://api.xero.com/api.xro/2.0".to_string(),
            token_url: "https://identity.xero.com/connect/token".to_string(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Create a new XeroClient with custom endpoints (for testing)
    pub fn with_base_urls(config: XeroConfig, api_url: String, token_url: String) -> Self {
        Self {
            client: Client::new(),
            config,
            api_url,
            token_url,
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Get an access token, refreshing via the OAuth refresh grant when the
    /// cached one is absent or about to expire.
    async fn valid_token(&self) -> AppResult<String> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECONDS) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let mut cached = self.token.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECONDS) {
                return Ok(token.access_token.clone());
            }
        }

        let refresh_token = cached
            .as_ref()
            .map(|t| t.refresh_token.clone())
            .unwrap_or_else(|| self.config.refresh_token.clone());

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Accounting(format!("token refresh failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Accounting(format!(
                "token refresh returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Accounting(format!("failed to parse token response: {}", e)))?;

        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        });

        Ok(access_token)
    }

    /// Create an authorised sales invoice. One invoice per order, ever — the
    /// caller guards against re-creation.
    pub async fn create_invoice(&self, draft: &InvoiceDraft) -> AppResult<XeroInvoiceRef> {
        let token = self.valid_token().await?;

        let body = InvoicesRequest {
            invoices: vec![InvoiceBody {
                invoice_type: "ACCREC".to_string(),
                contact: ContactBody {
                    name: draft.contact_name.clone(),
                    email_address: draft.contact_email.clone(),
                },
                line_items: draft
                    .lines
                    .iter()
                    .map(|line| LineItemBody {
                        description: line.description.clone(),
                        quantity: line.quantity,
                        unit_amount: line.unit_amount,
                        account_code: self.config.sales_account_code.clone(),
                    })
                    .collect(),
                status: "AUTHORISED".to_string(),
                reference: draft.reference.clone(),
                currency_code: "AUD".to_string(),
            }],
        };

        let response = self
            .client
            .post(format!("{}/Invoices", self.api_url))
            .bearer_auth(&token)
            .header("Xero-Tenant-Id", &self.config.tenant_id)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Accounting(format!("invoice request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Accounting(format!(
                "invoice creation returned {}: {}",
                status, body
            )));
        }

        let created: InvoicesResponse = response
            .json()
            .await
            .map_err(|e| AppError::Accounting(format!("failed to parse invoice response: {}", e)))?;

        let invoice = created
            .invoices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Accounting("invoice response was empty".to_string()))?;

        Ok(XeroInvoiceRef {
            invoice_id: invoice.invoice_id,
            invoice_number: invoice.invoice_number,
        })
    }

    /// Record a payment against an existing invoice. Must only be called
    /// after `create_invoice` has succeeded for that invoice.
    pub async fn record_payment(&self, invoice_id: &str, amount: Decimal) -> AppResult<()> {
        let token = self.valid_token().await?;

        let body = PaymentsRequest {
            payments: vec![PaymentBody {
                invoice: PaymentInvoiceRef {
                    invoice_id: invoice_id.to_string(),
                },
                account: PaymentAccountRef {
                    code: self.config.payment_account_code.clone(),
                },
                amount,
                date: Utc::now().format("%Y-%m-%d").to_string(),
            }],
        };

        let response = self
            .client
            .put(format!("{}/Payments", self.api_url))
            .bearer_auth(&token)
            .header("Xero-Tenant-Id", &self.config.tenant_id)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Accounting(format!("payment request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Accounting(format!(
                "payment recording returned {}: {}",
                status, body
            )));
        }

        Ok(())
    }

    /// Ask Xero to email the invoice to the contact. Best-effort.
    pub async fn email_invoice(&self, invoice_id: &str) -> AppResult<()> {
        let token = self.valid_token().await?;

        let response = self
            .client
            .post(format!("{}/Invoices/{}/Email", self.api_url, invoice_id))
            .bearer_auth(&token)
            .header("Xero-Tenant-Id", &self.config.tenant_id)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| AppError::Accounting(format!("invoice email request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::Accounting(format!(
                "invoice email returned {}",
                status
            )));
        }

        Ok(())
    }
}
