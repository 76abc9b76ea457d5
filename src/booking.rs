//! Booking inquiries.
//!
//! The public site does not store inquiries. A visitor fills in the form,
//! answers a small sum captcha, and is handed off to WhatsApp with a
//! prefilled message addressed to the agency.

use crate::error::{BindError, Result, ValidationErrors};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// WhatsApp click-to-chat endpoint.
pub const WHATSAPP_SEND_URL: &str = "https://api.whatsapp.com/send";

/// Vacation types offered by the form.
pub const VACATION_TYPES: [&str; 6] = [
    "Honeymoon",
    "Family",
    "Friends",
    "Solo",
    "Religious",
    "Business",
];

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+]?[\s0-9]+)?([0-9]{3}|[(]?[0-9]+[)])?([-]?[\s]?[0-9])+$")
        .expect("phone pattern is valid")
});

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Z0-9_'+\-.]*[A-Z0-9_+\-]@([A-Z0-9][A-Z0-9\-]*\.)+[A-Z]{2,}$")
        .expect("email pattern is valid")
});

/// Where inquiries are sent.
#[derive(Clone, Debug)]
pub struct BookingConfig {
    /// Agency number in international form, digits only.
    /// Default: "918695172090"
    pub admin_phone: String,

    /// Prefix shown before the visitor's numbers.
    /// Default: "+91"
    pub dialing_prefix: String,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            admin_phone: "918695172090".to_string(),
            dialing_prefix: "+91".to_string(),
        }
    }
}

/// Raw form input, exactly as typed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingForm {
    pub name: String,
    pub city: String,
    pub email: String,
    pub phone: String,
    pub whatsapp: String,
    pub travel_date: String,
    pub people: String,
    pub vacation_type: String,
    pub destination: String,
    pub captcha: String,
}

impl BookingForm {
    /// Empty form, prefilled from a package page.
    pub fn for_destination(destination: Option<&str>) -> Self {
        Self {
            people: "1".to_string(),
            destination: destination.unwrap_or_default().to_string(),
            ..Default::default()
        }
    }

    /// Check every field. All rejected fields are reported together.
    pub fn validate(&self) -> std::result::Result<BookingInquiry, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.name.chars().count() < 2 {
            errors.push("name", "Name must be at least 2 characters.");
        }
        if self.city.chars().count() < 2 {
            errors.push("city", "City is required.");
        }
        if !is_valid_email(&self.email) {
            errors.push("email", "Please enter a valid email address.");
        }
        if let Some(message) = check_phone(&self.phone, "Invalid phone number", "Phone number") {
            errors.push("phone", message);
        }
        if let Some(message) =
            check_phone(&self.whatsapp, "Invalid WhatsApp number", "WhatsApp number")
        {
            errors.push("whatsapp", message);
        }
        if self.travel_date.is_empty() {
            errors.push("travelDate", "Date of travel is required.");
        }

        let people = match parse_number(&self.people) {
            None => {
                errors.push("people", "Expected number, received nan");
                0.0
            }
            Some(n) if n < 1.0 => {
                errors.push("people", "At least one person must travel.");
                n
            }
            Some(n) => n,
        };

        if self.vacation_type.is_empty() {
            errors.push("vacationType", "Please select a vacation type.");
        }
        if self.captcha.is_empty() {
            errors.push("captcha", "Please solve the captcha.");
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(BookingInquiry {
            name: self.name.clone(),
            city: self.city.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            whatsapp: self.whatsapp.clone(),
            travel_date: self.travel_date.clone(),
            people,
            vacation_type: self.vacation_type.clone(),
            destination: Some(self.destination.clone()).filter(|d| !d.is_empty()),
        })
    }

    /// Validate, then check the captcha answer.
    pub fn submit(&self, captcha: &Captcha) -> Result<BookingInquiry> {
        let inquiry = self.validate()?;
        if !captcha.check(&self.captcha) {
            let mut errors = ValidationErrors::default();
            errors.push("captcha", "Incorrect answer. Please try again.");
            return Err(BindError::Validation(errors));
        }
        tracing::debug!(
            destination = ?inquiry.destination,
            vacation_type = %inquiry.vacation_type,
            "booking inquiry accepted"
        );
        Ok(inquiry)
    }
}

/// A validated inquiry.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingInquiry {
    pub name: String,
    pub city: String,
    pub email: String,
    pub phone: String,
    pub whatsapp: String,
    pub travel_date: String,
    pub people: f64,
    pub vacation_type: String,
    pub destination: Option<String>,
}

impl BookingInquiry {
    /// WhatsApp-formatted message text.
    pub fn message(&self, config: &BookingConfig) -> String {
        let lines = [
            "*New Holiday Booking Inquiry*".to_string(),
            format!(
                "*Package/Destination:* {}",
                self.destination.as_deref().unwrap_or("Not specified")
            ),
            format!("*Name:* {}", self.name),
            format!("*City:* {}", self.city),
            format!("*Email:* {}", self.email),
            format!("*Phone:* {}{}", config.dialing_prefix, self.phone),
            format!("*WhatsApp:* {}{}", config.dialing_prefix, self.whatsapp),
            format!("*Travel Date:* {}", self.travel_date),
            format!("*No. of People:* {}", self.people),
            format!("*Vacation Type:* {}", self.vacation_type),
        ];
        lines.join("\n").trim().to_string()
    }

    /// Click-to-chat link carrying [`message`](Self::message).
    pub fn whatsapp_url(&self, config: &BookingConfig) -> Result<Url> {
        let text = self.message(config);
        let url = Url::parse_with_params(
            WHATSAPP_SEND_URL,
            &[("phone", config.admin_phone.as_str()), ("text", text.as_str())],
        )?;
        Ok(url)
    }
}

/// Sum captcha: two operands from 1 to 10.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Captcha {
    left: u8,
    right: u8,
}

impl Captcha {
    pub fn new(left: u8, right: u8) -> Self {
        Self { left, right }
    }

    /// Fresh operands; call again after every submission.
    pub fn random() -> Self {
        let mut rng = rand::rng();
        Self::new(rng.random_range(1..=10), rng.random_range(1..=10))
    }

    /// Question shown beside the answer box.
    pub fn prompt(&self) -> String {
        format!("{} + {} =", self.left, self.right)
    }

    /// Whether `answer` starts with the correct integer.
    ///
    /// Like a lenient integer parse: leading whitespace and trailing junk
    /// are ignored, so `" 7 "` and `"7?"` both answer `3 + 4`.
    pub fn check(&self, answer: &str) -> bool {
        leading_integer(answer) == Some(i64::from(self.left) + i64::from(self.right))
    }
}

fn is_valid_email(email: &str) -> bool {
    !email.starts_with('.') && !email.contains("..") && EMAIL_RE.is_match(email)
}

fn check_phone(value: &str, invalid: &str, label: &str) -> Option<String> {
    if !PHONE_RE.is_match(value) {
        Some(invalid.to_string())
    } else if value.chars().count() < 10 {
        Some(format!("{label} must be at least 10 digits."))
    } else {
        None
    }
}

/// Numeric coercion of a text field: blank is zero, garbage is `None`.
fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<i64>().ok().map(|n| sign * n)
}
