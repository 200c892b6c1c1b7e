use thiserror::Error;

/// Rejected user input, reported next to the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select a country")]
    MissingCountryCode,
    #[error("Phone number must be at least {min} digits")]
    PhoneTooShort { min: usize },
    #[error("OTP must be exactly {len} digits")]
    InvalidOtp { len: usize },
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Image size must be less than {limit_mb}MB")]
    ImageTooLarge { limit_mb: u64 },
    #[error("Unsupported image type: {0}")]
    UnsupportedImage(String),
}

impl ValidationError {
    /// Name of the form field the error belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingCountryCode => "countryCode",
            Self::PhoneTooShort { .. } => "phoneNumber",
            Self::InvalidOtp { .. } => "otp",
            Self::EmptyMessage => "message",
            Self::ImageTooLarge { .. } | Self::UnsupportedImage(_) => "image",
        }
    }
}
