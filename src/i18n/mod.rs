//! Internationalization (i18n) support for freerooms
//!
//! User-facing messages and error descriptions are available in English (en)
//! and Russian (ru).
//!
//! # Environment Variables
//!
//! - `FREEROOMS_LANG`: Set the preferred language (en, ru). Defaults to English.
//!
//! # Usage
//!
//! ```rust,ignore
//! use freerooms::i18n::{t, set_locale};
//!
//! set_locale("ru");
//! let msg = t!("cli.query.free_rooms");
//! ```

use std::sync::RwLock;

// Note: rust_i18n::i18n! macro is declared in lib.rs (crate root)

static CURRENT_LOCALE: RwLock<&'static str> = RwLock::new("en");

/// Set the current locale for translations
pub fn set_locale(locale: &str) {
    let normalized = normalize_locale(locale);
    rust_i18n::set_locale(normalized);
    if let Ok(mut current) = CURRENT_LOCALE.write() {
        *current = normalized;
    }
}

/// Get the current locale
pub fn current_locale() -> &'static str {
    CURRENT_LOCALE.read().map(|locale| *locale).unwrap_or("en")
}

/// Initialize i18n from the `FREEROOMS_LANG` environment variable
///
/// Falls back to English if not set or unsupported.
pub fn init_from_env() {
    let locale = std::env::var("FREEROOMS_LANG").unwrap_or_else(|_| "en".to_string());
    set_locale(&locale);
}

/// Normalize locale code to a supported one
///
/// - ru-RU, ru_RU, russian -> ru
/// - anything else -> en
fn normalize_locale(locale: &str) -> &'static str {
    let lower = locale.trim().to_lowercase();

    if lower.starts_with("ru") || lower == "russian" || lower == "русский" {
        "ru"
    } else {
        "en"
    }
}

/// Translate a key with optional parameters
///
/// This is a re-export of rust_i18n::t! for convenience.
#[doc(inline)]
pub use rust_i18n::t;
