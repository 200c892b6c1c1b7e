use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::error::ValidationError;

use super::AuthManager;

pub const MIN_PHONE_LEN: usize = 6;
pub const OTP_LEN: usize = 6;

/// Mock phone login: "sends" a code, then accepts any well-formed one.
pub struct OtpFlow {
    auth: Arc<AuthManager>,
    delay: Duration,
}

impl OtpFlow {
    pub fn new(auth: Arc<AuthManager>, delay: Duration) -> Self {
        Self { auth, delay }
    }

    /// Validates the number and simulates sending a code to it.
    /// Returns the full number (`country_code` followed by `phone_number`).
    pub async fn send_otp(
        &self,
        country_code: &str,
        phone_number: &str,
    ) -> Result<String, ValidationError> {
        let full = validate_phone(country_code, phone_number)?;
        tracing::debug!(phone_number = %full, "Sending OTP");
        sleep(self.delay).await;
        tracing::info!(phone_number = %full, "OTP sent");
        Ok(full)
    }

    /// Checks the code format, simulates verification and logs the user in.
    pub async fn verify_otp(&self, phone_number: &str, otp: &str) -> Result<(), anyhow::Error> {
        validate_otp(otp)?;
        tracing::debug!(%phone_number, "Verifying OTP");
        sleep(self.delay).await;
        self.auth.login(phone_number).await
    }
}

pub fn validate_phone(country_code: &str, phone_number: &str) -> Result<String, ValidationError> {
    let country_code = country_code.trim();
    if country_code.is_empty() {
        return Err(ValidationError::MissingCountryCode);
    }
    let phone_number = phone_number.trim();
    if phone_number.chars().count() < MIN_PHONE_LEN {
        return Err(ValidationError::PhoneTooShort { min: MIN_PHONE_LEN });
    }
    Ok(format!("{country_code}{phone_number}"))
}

pub fn validate_otp(otp: &str) -> Result<(), ValidationError> {
    let otp = otp.trim();
    if otp.len() != OTP_LEN || !otp.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidOtp { len: OTP_LEN });
    }
    Ok(())
}
